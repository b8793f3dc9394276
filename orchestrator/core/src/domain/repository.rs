// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the two request aggregates, following the DDD
//! Repository pattern: interface defined in the domain layer, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `ServiceRequestRepository` | `ServiceRequest` | `InMemoryServiceRequestRepository`, `PostgresServiceRequestRepository` |
//! | `UploadServiceRequestRepository` | `UploadServiceRequest` | `InMemoryUploadServiceRequestRepository`, `PostgresUploadServiceRequestRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! Concrete implementations are selected at startup from configuration
//! (`storage.backend`). In-memory implementations are used for development
//! and testing; PostgreSQL implementations for production.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::service_request::{
    Decision, NewServiceRequest, RequestKey, RequestStatus, ServiceRequest, ServiceRequestFilter,
    ServiceRequestPage, ServiceRequestSummaryPage,
};
use crate::domain::upload_request::{
    NewUploadServiceRequest, UploadKey, UploadServiceRequest, UploadServiceRequestFilter,
    UploadServiceRequestPage,
};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    InMemory,
    #[default]
    Postgres,
}

/// Repository interface for ServiceRequest rows
#[async_trait]
pub trait ServiceRequestRepository: Send + Sync {
    /// Insert a NOSTATUS row. `Conflict` if the tuple already exists.
    async fn create(&self, request: &NewServiceRequest) -> Result<ServiceRequest, RepositoryError>;

    /// Point lookup by unique tuple
    async fn get(&self, key: &RequestKey) -> Result<Option<ServiceRequest>, RepositoryError>;

    /// Filtered, sorted, paginated listing with total matching count
    async fn list(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestPage, RepositoryError>;

    /// Listing grouped per (org, service)
    async fn list_grouped(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestSummaryPage, RepositoryError>;

    /// Move every non-committed row of (org, service) to PENDING. Returns the rows moved.
    async fn apply(&self, org_id: &str, svc_name: &str, updated_by: &str) -> Result<Vec<ServiceRequest>, RepositoryError>;

    /// Set ACCEPTED and enable the row
    async fn accept(&self, decision: &Decision) -> Result<ServiceRequest, RepositoryError>;

    /// Set REJECTED
    async fn reject(&self, decision: &Decision) -> Result<ServiceRequest, RepositoryError>;

    /// Toggle `enabled` without touching status
    async fn set_enabled(&self, key: &RequestKey, enabled: bool, updated_by: &str) -> Result<ServiceRequest, RepositoryError>;

    /// Direct status override
    async fn set_status(&self, key: &RequestKey, status: RequestStatus, updated_by: &str) -> Result<ServiceRequest, RepositoryError>;

    /// Update remarks without touching status
    async fn add_remark(&self, key: &RequestKey, remarks: &str, updated_by: &str) -> Result<ServiceRequest, RepositoryError>;

    /// Hard delete, skipped for ACCEPTED / PENDING rows. Returns whether a row was removed.
    async fn remove(&self, key: &RequestKey) -> Result<bool, RepositoryError>;

    /// Stamp `notified_at` on unclaimed rows of (org, service) in `status`
    /// and return the partners claimed. Empty when already notified.
    async fn claim_notification(&self, org_id: &str, svc_name: &str, status: RequestStatus) -> Result<Vec<String>, RepositoryError>;
}

/// Repository interface for UploadServiceRequest rows
#[async_trait]
pub trait UploadServiceRequestRepository: Send + Sync {
    /// Insert a submitted row. `Conflict` if the tuple already exists.
    async fn create(&self, request: &NewUploadServiceRequest) -> Result<UploadServiceRequest, RepositoryError>;

    /// Create, or on conflict replace the file reference and reset verification
    async fn add(&self, request: &NewUploadServiceRequest) -> Result<UploadServiceRequest, RepositoryError>;

    async fn accept(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, RepositoryError>;

    async fn reject(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, RepositoryError>;

    async fn remove(&self, key: &UploadKey) -> Result<bool, RepositoryError>;

    async fn list(&self, filter: &UploadServiceRequestFilter) -> Result<UploadServiceRequestPage, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
