// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! the domain layer, following the Repository pattern from DDD.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve service request rows
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresServiceRequestRepository** - `service_requests` table
//! - **PostgresUploadServiceRequestRepository** - `upload_service_requests` table
//!
//! ## In-Memory Repositories
//!
//! Lightweight implementations with the same filtering, ordering and guard
//! semantics as the SQL statements, for tests and local development:
//! - **InMemoryServiceRequestRepository**
//! - **InMemoryUploadServiceRequestRepository**

pub mod postgres_service_request;
pub mod postgres_upload_request;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::repository::{RepositoryError, ServiceRequestRepository, UploadServiceRequestRepository};
use crate::domain::service_request::{
    Decision, NewServiceRequest, RequestKey, RequestStatus, ServiceRequest, ServiceRequestFilter,
    ServiceRequestPage, ServiceRequestSummary, ServiceRequestSummaryPage, SortColumn, SortDirection,
};
use crate::domain::upload_request::{
    NewUploadServiceRequest, UploadKey, UploadServiceRequest, UploadServiceRequestFilter,
    UploadServiceRequestPage, UploadStatus,
};

pub use postgres_service_request::PostgresServiceRequestRepository;
pub use postgres_upload_request::PostgresUploadServiceRequestRepository;

fn validate_key(missing: Option<&'static str>) -> Result<(), RepositoryError> {
    match missing {
        Some(field) => Err(RepositoryError::Validation(format!("{} is required", field))),
        None => Ok(()),
    }
}

/// Skip / take with the "zero means unbounded" convention.
fn paginate<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let skip = offset.max(0) as usize;
    let iter = items.into_iter().skip(skip);
    if limit > 0 {
        iter.take(limit as usize).collect()
    } else {
        iter.collect()
    }
}

/// Orders `None` after every value, matching PostgreSQL's default NULL placement.
fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

// ============================================================================
// Service Requests
// ============================================================================

#[derive(Debug, Clone)]
struct StoredRequest {
    request: ServiceRequest,
    seq: u64,
    notified_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct RequestTable {
    rows: HashMap<RequestKey, StoredRequest>,
    next_seq: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryServiceRequestRepository {
    table: Arc<RwLock<RequestTable>>,
}

impl InMemoryServiceRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(filter: &ServiceRequestFilter, request: &ServiceRequest) -> bool {
        (filter.org_ids.is_empty() || filter.org_ids.contains(&request.org_id))
            && (filter.statuses.is_empty() || filter.statuses.contains(&request.status))
            && (filter.svc_names.is_empty() || filter.svc_names.contains(&request.svc_name))
            && (filter.partners.is_empty() || filter.partners.contains(&request.partner))
            && (filter.company_name.trim().is_empty()
                || request
                    .company_name
                    .to_lowercase()
                    .contains(&filter.company_name.trim().to_lowercase()))
    }

    fn compare(column: SortColumn, a: &ServiceRequest, b: &ServiceRequest) -> Ordering {
        match column {
            SortColumn::Created => a.created.cmp(&b.created),
            SortColumn::CompanyName => a.company_name.cmp(&b.company_name),
            SortColumn::ServiceName => a.svc_name.cmp(&b.svc_name),
            SortColumn::Status => a.status.as_db_str().cmp(b.status.as_db_str()),
            SortColumn::Partner => a.partner.cmp(&b.partner),
            SortColumn::LastUpdated => a.updated.cmp(&b.updated),
            SortColumn::UpdatedBy => a.updated_by.cmp(&b.updated_by),
            SortColumn::Applied => nulls_last(&a.applied, &b.applied),
        }
    }

    /// Matching rows in query order, before pagination.
    fn select(&self, filter: &ServiceRequestFilter) -> Vec<StoredRequest> {
        let table = self.table.read();
        let mut rows: Vec<StoredRequest> = table
            .rows
            .values()
            .filter(|row| Self::matches(filter, &row.request))
            .cloned()
            .collect();

        let column = filter.sort_by.unwrap_or(SortColumn::Created);
        rows.sort_by(|a, b| {
            directed(Self::compare(column, &a.request, &b.request), filter.sort_direction)
                .then(a.seq.cmp(&b.seq))
        });
        rows
    }

    /// Apply `mutate` to an existing row and stamp `updated`.
    fn update<F>(&self, key: &RequestKey, mutate: F) -> Result<ServiceRequest, RepositoryError>
    where
        F: FnOnce(&mut StoredRequest),
    {
        validate_key(key.missing_field())?;
        let mut table = self.table.write();
        let row = table
            .rows
            .get_mut(key)
            .ok_or_else(|| RepositoryError::NotFound(format!("Service request {} not found", key)))?;
        mutate(row);
        row.request.updated = Utc::now();
        Ok(row.request.clone())
    }

    fn decide(&self, decision: &Decision, status: RequestStatus) -> Result<ServiceRequest, RepositoryError> {
        self.update(&decision.key, |row| {
            if row.request.status != status {
                row.notified_at = None;
            }
            row.request.status = status;
            if status == RequestStatus::Accepted {
                row.request.enabled = true;
            }
            row.request.remarks = decision.remarks.clone();
            row.request.updated_by = decision.updated_by.clone();
        })
    }
}

#[async_trait]
impl ServiceRequestRepository for InMemoryServiceRequestRepository {
    async fn create(&self, request: &NewServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        let key = request.key();
        validate_key(key.missing_field())?;

        let mut table = self.table.write();
        if table.rows.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!("Service request {} already exists", key)));
        }

        let row = ServiceRequest::new(request);
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(
            key,
            StoredRequest {
                request: row.clone(),
                seq,
                notified_at: None,
            },
        );
        Ok(row)
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<ServiceRequest>, RepositoryError> {
        let table = self.table.read();
        Ok(table.rows.get(key).map(|row| row.request.clone()))
    }

    async fn list(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestPage, RepositoryError> {
        let rows = self.select(filter);
        let total = rows.len() as i64;
        let requests = paginate(rows, filter.limit, filter.offset)
            .into_iter()
            .map(|row| row.request)
            .collect();
        Ok(ServiceRequestPage { requests, total })
    }

    async fn list_grouped(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestSummaryPage, RepositoryError> {
        let mut groups: BTreeMap<(String, String), (u64, ServiceRequestSummary)> = BTreeMap::new();

        for row in self.select(&ServiceRequestFilter { sort_by: None, ..filter.clone() }) {
            let request = row.request;
            let entry = groups
                .entry((request.org_id.clone(), request.svc_name.clone()))
                .or_insert_with(|| {
                    (
                        row.seq,
                        ServiceRequestSummary {
                            org_id: request.org_id.clone(),
                            svc_name: request.svc_name.clone(),
                            company_name: request.company_name.clone(),
                            partners: Vec::new(),
                            pending: 0,
                            accepted: 0,
                            rejected: 0,
                            partner_count: 0,
                            created: request.created,
                            updated: request.updated,
                            applied: request.applied,
                        },
                    )
                });

            let summary = &mut entry.1;
            entry.0 = entry.0.min(row.seq);
            summary.partners.push(request.partner.clone());
            summary.partner_count += 1;
            match request.status {
                RequestStatus::Pending => summary.pending += 1,
                RequestStatus::Accepted => summary.accepted += 1,
                RequestStatus::Rejected => summary.rejected += 1,
                _ => {}
            }
            summary.company_name = summary.company_name.clone().max(request.company_name.clone());
            summary.created = summary.created.min(request.created);
            summary.updated = summary.updated.max(request.updated);
            summary.applied = summary.applied.max(request.applied);
        }

        let mut summaries: Vec<(u64, ServiceRequestSummary)> = groups
            .into_values()
            .map(|(seq, mut summary)| {
                summary.partners.sort();
                (seq, summary)
            })
            .collect();

        let column = filter.sort_by.unwrap_or(SortColumn::Created);
        summaries.sort_by(|(seq_a, a), (seq_b, b)| {
            let ordering = match column {
                SortColumn::Created => a.created.cmp(&b.created),
                SortColumn::CompanyName => a.company_name.cmp(&b.company_name),
                SortColumn::ServiceName => a.svc_name.cmp(&b.svc_name),
                SortColumn::Status => a.pending.cmp(&b.pending),
                SortColumn::Partner => a.partners.join(",").cmp(&b.partners.join(",")),
                SortColumn::LastUpdated | SortColumn::UpdatedBy => a.updated.cmp(&b.updated),
                SortColumn::Applied => nulls_last(&a.applied, &b.applied),
            };
            directed(ordering, filter.sort_direction).then(seq_a.cmp(seq_b))
        });

        let total = summaries.len() as i64;
        let summaries = paginate(summaries, filter.limit, filter.offset)
            .into_iter()
            .map(|(_, summary)| summary)
            .collect();
        Ok(ServiceRequestSummaryPage { summaries, total })
    }

    async fn apply(&self, org_id: &str, svc_name: &str, updated_by: &str) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let now = Utc::now();
        let mut table = self.table.write();
        let mut applied: Vec<(u64, ServiceRequest)> = Vec::new();

        for row in table.rows.values_mut() {
            let request = &mut row.request;
            if request.org_id != org_id || request.svc_name != svc_name || !request.status.can_apply() {
                continue;
            }
            request.status = RequestStatus::Pending;
            request.applied = Some(now);
            request.updated = now;
            request.updated_by = updated_by.to_string();
            row.notified_at = None;
            applied.push((row.seq, request.clone()));
        }

        applied.sort_by_key(|(seq, _)| *seq);
        Ok(applied.into_iter().map(|(_, request)| request).collect())
    }

    async fn accept(&self, decision: &Decision) -> Result<ServiceRequest, RepositoryError> {
        self.decide(decision, RequestStatus::Accepted)
    }

    async fn reject(&self, decision: &Decision) -> Result<ServiceRequest, RepositoryError> {
        self.decide(decision, RequestStatus::Rejected)
    }

    async fn set_enabled(&self, key: &RequestKey, enabled: bool, updated_by: &str) -> Result<ServiceRequest, RepositoryError> {
        self.update(key, |row| {
            row.request.enabled = enabled;
            row.request.updated_by = updated_by.to_string();
        })
    }

    async fn set_status(&self, key: &RequestKey, status: RequestStatus, updated_by: &str) -> Result<ServiceRequest, RepositoryError> {
        self.update(key, |row| {
            if row.request.status != status {
                row.notified_at = None;
            }
            row.request.status = status;
            row.request.updated_by = updated_by.to_string();
        })
    }

    async fn add_remark(&self, key: &RequestKey, remarks: &str, updated_by: &str) -> Result<ServiceRequest, RepositoryError> {
        self.update(key, |row| {
            row.request.remarks = remarks.to_string();
            row.request.updated_by = updated_by.to_string();
        })
    }

    async fn remove(&self, key: &RequestKey) -> Result<bool, RepositoryError> {
        validate_key(key.missing_field())?;
        let mut table = self.table.write();
        let removable = table
            .rows
            .get(key)
            .map(|row| !row.request.status.is_committed())
            .unwrap_or(false);
        if removable {
            table.rows.remove(key);
        }
        Ok(removable)
    }

    async fn claim_notification(&self, org_id: &str, svc_name: &str, status: RequestStatus) -> Result<Vec<String>, RepositoryError> {
        let now = Utc::now();
        let mut table = self.table.write();
        let mut claimed: Vec<String> = table
            .rows
            .values_mut()
            .filter(|row| {
                row.request.org_id == org_id
                    && row.request.svc_name == svc_name
                    && row.request.status == status
                    && row.notified_at.is_none()
            })
            .map(|row| {
                row.notified_at = Some(now);
                row.request.partner.clone()
            })
            .collect();
        claimed.sort();
        Ok(claimed)
    }
}

// ============================================================================
// Upload Service Requests
// ============================================================================

#[derive(Default)]
struct UploadTable {
    rows: HashMap<UploadKey, (u64, UploadServiceRequest)>,
    next_seq: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryUploadServiceRequestRepository {
    table: Arc<RwLock<UploadTable>>,
}

impl InMemoryUploadServiceRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn verify(&self, key: &UploadKey, status: UploadStatus, verify_by: &str) -> Result<UploadServiceRequest, RepositoryError> {
        validate_key(key.missing_field())?;
        let mut table = self.table.write();
        let (_, row) = table
            .rows
            .get_mut(key)
            .ok_or_else(|| RepositoryError::NotFound(format!("Upload request {} not found", key)))?;
        let now = Utc::now();
        row.status = status;
        row.verify_by = verify_by.to_string();
        row.verified = Some(now);
        row.updated = now;
        Ok(row.clone())
    }
}

#[async_trait]
impl UploadServiceRequestRepository for InMemoryUploadServiceRequestRepository {
    async fn create(&self, request: &NewUploadServiceRequest) -> Result<UploadServiceRequest, RepositoryError> {
        validate_key(request.key.missing_field())?;
        if request.file_id.trim().is_empty() {
            return Err(RepositoryError::Validation("file_id is required".to_string()));
        }

        let mut table = self.table.write();
        if table.rows.contains_key(&request.key) {
            return Err(RepositoryError::Conflict(format!("Upload request {} already exists", request.key)));
        }
        let row = UploadServiceRequest::new(request);
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(request.key.clone(), (seq, row.clone()));
        Ok(row)
    }

    async fn add(&self, request: &NewUploadServiceRequest) -> Result<UploadServiceRequest, RepositoryError> {
        match self.create(request).await {
            Err(RepositoryError::Conflict(_)) => {
                let mut table = self.table.write();
                let (_, row) = table
                    .rows
                    .get_mut(&request.key)
                    .ok_or_else(|| RepositoryError::NotFound(format!("Upload request {} not found", request.key)))?;
                row.file_id = request.file_id.clone();
                row.create_by = request.create_by.clone();
                row.status = UploadStatus::Submitted;
                row.verify_by = String::new();
                row.verified = None;
                row.updated = Utc::now();
                Ok(row.clone())
            }
            other => other,
        }
    }

    async fn accept(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, RepositoryError> {
        self.verify(key, UploadStatus::Accepted, verify_by)
    }

    async fn reject(&self, key: &UploadKey, verify_by: &str) -> Result<UploadServiceRequest, RepositoryError> {
        self.verify(key, UploadStatus::Rejected, verify_by)
    }

    async fn remove(&self, key: &UploadKey) -> Result<bool, RepositoryError> {
        validate_key(key.missing_field())?;
        let mut table = self.table.write();
        Ok(table.rows.remove(key).is_some())
    }

    async fn list(&self, filter: &UploadServiceRequestFilter) -> Result<UploadServiceRequestPage, RepositoryError> {
        let table = self.table.read();
        let mut rows: Vec<(u64, UploadServiceRequest)> = table
            .rows
            .values()
            .filter(|(_, row)| {
                (filter.org_ids.is_empty() || filter.org_ids.contains(&row.org_id))
                    && (filter.partners.is_empty() || filter.partners.contains(&row.partner))
                    && (filter.svc_names.is_empty() || filter.svc_names.contains(&row.svc_name))
                    && (filter.file_types.is_empty() || filter.file_types.contains(&row.file_type))
                    && (filter.statuses.is_empty() || filter.statuses.contains(&row.status))
            })
            .cloned()
            .collect();

        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            directed(a.created.cmp(&b.created), filter.sort_direction).then(seq_a.cmp(seq_b))
        });

        let total = rows.len() as i64;
        let uploads = paginate(rows, filter.limit, filter.offset)
            .into_iter()
            .map(|(_, row)| row)
            .collect();
        Ok(UploadServiceRequestPage { uploads, total })
    }
}
