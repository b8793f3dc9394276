// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository and collaborator implementations based on the
//! storage backend configuration, keeping the domain layer free of
//! infrastructure dependencies.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::domain::notification::OrgContactResolver;
use crate::domain::partner::PartnerCatalog;
use crate::domain::repository::{StorageBackend, ServiceRequestRepository, UploadServiceRequestRepository};
use crate::infrastructure::contact::{InMemoryOrgContactResolver, PostgresOrgContactResolver};
use crate::infrastructure::db::Database;
use crate::infrastructure::partner_catalog::{FallbackPartnerCatalog, InMemoryPartnerCatalog, PostgresPartnerCatalog};
use crate::infrastructure::repositories::{
    InMemoryServiceRequestRepository, InMemoryUploadServiceRequestRepository,
    PostgresServiceRequestRepository, PostgresUploadServiceRequestRepository,
};

fn require_database<'a>(backend: &StorageBackend, database: Option<&'a Database>) -> Result<&'a Database> {
    database.ok_or_else(|| anyhow!("storage backend {:?} requires a database connection", backend))
}

/// Creates a ServiceRequestRepository implementation based on the configured backend
pub fn create_service_request_repository(
    backend: &StorageBackend,
    database: Option<&Database>,
) -> Result<Arc<dyn ServiceRequestRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryServiceRequestRepository::new()),
        StorageBackend::Postgres => Arc::new(PostgresServiceRequestRepository::new(
            require_database(backend, database)?.get_pool().clone(),
        )),
    })
}

/// Creates an UploadServiceRequestRepository implementation based on the configured backend
pub fn create_upload_request_repository(
    backend: &StorageBackend,
    database: Option<&Database>,
) -> Result<Arc<dyn UploadServiceRequestRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryUploadServiceRequestRepository::new()),
        StorageBackend::Postgres => Arc::new(PostgresUploadServiceRequestRepository::new(
            require_database(backend, database)?.get_pool().clone(),
        )),
    })
}

/// Dynamic catalog for the backend, falling back to the built-in enumeration.
pub fn create_partner_catalog(
    backend: &StorageBackend,
    database: Option<&Database>,
) -> Result<Arc<dyn PartnerCatalog>> {
    let primary: Arc<dyn PartnerCatalog> = match backend {
        StorageBackend::InMemory => Arc::new(InMemoryPartnerCatalog::new()),
        StorageBackend::Postgres => Arc::new(PostgresPartnerCatalog::new(
            require_database(backend, database)?.get_pool().clone(),
        )),
    };
    Ok(Arc::new(FallbackPartnerCatalog::with_builtin(primary)))
}

pub fn create_contact_resolver(
    backend: &StorageBackend,
    database: Option<&Database>,
) -> Result<Arc<dyn OrgContactResolver>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryOrgContactResolver::new()),
        StorageBackend::Postgres => Arc::new(PostgresOrgContactResolver::new(
            require_database(backend, database)?.get_pool().clone(),
        )),
    })
}
