// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! Service Request Lifecycle Service
//!
//! Owns transition legality and side effects for service requests:
//! submission reconciliation, apply / accept / reject, enablement toggles,
//! status overrides and resolution notifications.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrates the request store, partner catalog, contact
//!   resolver and notification sink
//!
//! # Resolution
//!
//! After every accept / reject the full row set for the (org, service) pair
//! is reloaded. Once every row carries a terminal decision, one notification
//! is sent per non-empty outcome group. The store's notification ledger
//! (`claim_notification`) guarantees a group is announced once per decision
//! cycle even when completions race.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::events::ServiceRequestEvent;
use crate::domain::notification::{NotificationSink, OrgContactResolver, ServiceNotification};
use crate::domain::partner::{PartnerCatalog, ServiceType};
use crate::domain::repository::{RepositoryError, ServiceRequestRepository};
use crate::domain::service_request::{
    Decision, NewServiceRequest, RequestKey, RequestStatus, ServiceRequest, ServiceRequestFilter,
    ServiceRequestPage, ServiceRequestSummaryPage,
};
use crate::infrastructure::event_bus::EventBus;

/// Errors surfaced to callers of the lifecycle services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceRequestError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Generic message only; the storage detail is logged, not returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceRequestError {
    /// Validation-class errors are caller mistakes and never worth retrying.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::InvalidTransition(_))
    }
}

/// Translate a store error, logging storage failures with their context.
pub(crate) fn map_repository_error(
    operation: &str,
    org_id: &str,
    partner: &str,
    svc_name: &str,
    err: RepositoryError,
) -> ServiceRequestError {
    match err {
        RepositoryError::NotFound(msg) => ServiceRequestError::NotFound(msg),
        RepositoryError::Conflict(msg) => ServiceRequestError::Conflict(msg),
        RepositoryError::Validation(msg) => ServiceRequestError::InvalidArgument(msg),
        RepositoryError::Database(msg) | RepositoryError::Serialization(msg) => {
            error!(operation, org_id, partner, svc_name, "Storage failure: {}", msg);
            ServiceRequestError::Internal(format!("failed to {}", operation))
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ServiceRequestError> {
    if value.trim().is_empty() {
        return Err(ServiceRequestError::InvalidArgument(format!("{} is required", field)));
    }
    Ok(())
}

fn require_key(key: &RequestKey) -> Result<(), ServiceRequestError> {
    match key.missing_field() {
        Some(field) => Err(ServiceRequestError::InvalidArgument(format!("{} is required", field))),
        None => Ok(()),
    }
}

fn parse_service_type(svc_name: &str) -> Result<ServiceType, ServiceRequestError> {
    svc_name
        .parse::<ServiceType>()
        .map_err(ServiceRequestError::InvalidArgument)
}

/// Desired partner selection for one (org, service) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitServiceRequest {
    pub org_id: String,
    pub svc_name: String,
    pub company_name: String,
    pub partners: Vec<String>,
    /// Request every enabled partner of the service type; skips validation
    /// of `partners`.
    #[serde(default)]
    pub all_partners: bool,
    pub updated_by: String,
}

/// Result of reconciling a submission against the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub created: Vec<String>,
    pub removed: Vec<String>,
    /// Row set for the pair after reconciliation.
    pub requests: Vec<ServiceRequest>,
}

#[async_trait]
pub trait ServiceRequestService: Send + Sync {
    /// Reconcile the stored rows for (org, service) with a partner selection.
    async fn submit(&self, request: SubmitServiceRequest) -> Result<SubmissionOutcome, ServiceRequestError>;

    /// Plain creation outside reconciliation; duplicates are a `Conflict`.
    async fn create(&self, request: NewServiceRequest) -> Result<ServiceRequest, ServiceRequestError>;

    async fn get(&self, key: &RequestKey) -> Result<ServiceRequest, ServiceRequestError>;

    async fn list(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestPage, ServiceRequestError>;

    async fn list_grouped(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestSummaryPage, ServiceRequestError>;

    async fn apply(&self, org_id: &str, svc_name: &str, updated_by: &str) -> Result<Vec<ServiceRequest>, ServiceRequestError>;

    async fn accept(&self, decision: Decision) -> Result<ServiceRequest, ServiceRequestError>;

    async fn reject(&self, decision: Decision) -> Result<ServiceRequest, ServiceRequestError>;

    async fn enable(&self, key: &RequestKey, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError>;

    async fn disable(&self, key: &RequestKey, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError>;

    async fn set_status(&self, key: &RequestKey, status: RequestStatus, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError>;

    async fn add_remark(&self, key: &RequestKey, remarks: &str, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError>;

    /// Returns false when nothing was removed (missing or committed row).
    async fn remove(&self, key: &RequestKey) -> Result<bool, ServiceRequestError>;
}

pub struct StandardServiceRequestService {
    repository: Arc<dyn ServiceRequestRepository>,
    catalog: Arc<dyn PartnerCatalog>,
    contacts: Arc<dyn OrgContactResolver>,
    notifications: Arc<dyn NotificationSink>,
    event_bus: Arc<EventBus>,
}

impl StandardServiceRequestService {
    pub fn new(
        repository: Arc<dyn ServiceRequestRepository>,
        catalog: Arc<dyn PartnerCatalog>,
        contacts: Arc<dyn OrgContactResolver>,
        notifications: Arc<dyn NotificationSink>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            repository,
            catalog,
            contacts,
            notifications,
            event_bus,
        }
    }

    fn record_transition(transition: &'static str) {
        metrics::counter!("dsa_service_request_transitions_total", "transition" => transition).increment(1);
    }

    /// Validated, de-duplicated partner set for a submission.
    async fn desired_partners(
        &self,
        request: &SubmitServiceRequest,
        service_type: ServiceType,
    ) -> Result<BTreeSet<String>, ServiceRequestError> {
        let mut desired: BTreeSet<String> = request
            .partners
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let directory = self
            .catalog
            .list_enabled_partners(service_type)
            .await
            .map_err(|e| {
                error!(operation = "submit", org_id = %request.org_id, svc_name = %request.svc_name, "Partner catalog lookup failed: {}", e);
                ServiceRequestError::Internal("failed to load partner catalog".to_string())
            })?;

        if request.all_partners {
            desired.extend(directory.keys().cloned());
            return Ok(desired);
        }

        let unknown: Vec<&str> = desired
            .iter()
            .filter(|p| !directory.contains_key(*p))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ServiceRequestError::InvalidArgument(format!(
                "partners not available for {}: {}",
                service_type,
                unknown.join(", ")
            )));
        }
        Ok(desired)
    }

    async fn load_pair(&self, operation: &str, org_id: &str, svc_name: &str) -> Result<Vec<ServiceRequest>, ServiceRequestError> {
        self.repository
            .list(&ServiceRequestFilter::for_service(org_id, svc_name))
            .await
            .map(|page| page.requests)
            .map_err(|e| map_repository_error(operation, org_id, "", svc_name, e))
    }

    async fn decide(&self, decision: Decision, status: RequestStatus) -> Result<ServiceRequest, ServiceRequestError> {
        require_key(&decision.key)?;
        require("updated_by", &decision.updated_by)?;
        let key = &decision.key;
        let operation = if status == RequestStatus::Accepted { "accept" } else { "reject" };
        let fail = |e| map_repository_error(operation, &key.org_id, &key.partner, &key.svc_name, e);

        let current = self
            .repository
            .get(key)
            .await
            .map_err(fail)?
            .ok_or_else(|| ServiceRequestError::NotFound(format!("Service request {} not found", key)))?;

        if !current.status.can_decide() {
            return Err(ServiceRequestError::InvalidTransition(format!(
                "cannot {} service request {} in status {}",
                operation, key, current.status
            )));
        }

        let updated = if status == RequestStatus::Accepted {
            self.repository.accept(&decision).await
        } else {
            self.repository.reject(&decision).await
        }
        .map_err(fail)?;

        Self::record_transition(operation);
        info!(org_id = %key.org_id, partner = %key.partner, svc_name = %key.svc_name, status = %status, "Service request decided");
        self.event_bus.publish(ServiceRequestEvent::RequestDecided {
            org_id: key.org_id.clone(),
            partner: key.partner.clone(),
            svc_name: key.svc_name.clone(),
            status,
            decided_by: decision.updated_by.clone(),
            decided_at: updated.updated,
        });

        self.resolve(&key.org_id, &key.svc_name).await?;
        Ok(updated)
    }

    /// Notify once every row of the pair carries a terminal decision.
    async fn resolve(&self, org_id: &str, svc_name: &str) -> Result<(), ServiceRequestError> {
        let rows = self.load_pair("resolve", org_id, svc_name).await?;

        let outstanding = rows.iter().filter(|r| !r.status.is_terminal()).count();
        if rows.is_empty() || outstanding > 0 {
            debug!(org_id, svc_name, outstanding, "Decisions outstanding, no notification");
            return Ok(());
        }

        let accepted: Vec<&ServiceRequest> = rows.iter().filter(|r| r.status == RequestStatus::Accepted).collect();
        let rejected: Vec<&ServiceRequest> = rows.iter().filter(|r| r.status == RequestStatus::Rejected).collect();

        for (status, group) in [(RequestStatus::Accepted, accepted), (RequestStatus::Rejected, rejected)] {
            if !group.is_empty() {
                self.notify_group(org_id, svc_name, status, &group).await;
            }
        }
        Ok(())
    }

    /// Failures here are logged only; the decision has already committed.
    async fn notify_group(&self, org_id: &str, svc_name: &str, status: RequestStatus, group: &[&ServiceRequest]) {
        let email = match self.contacts.contact_email(org_id).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                warn!(org_id, svc_name, status = %status, "No contact email for org, skipping notification");
                return;
            }
            Err(e) => {
                error!(org_id, svc_name, status = %status, "Contact lookup failed, skipping notification: {}", e);
                return;
            }
        };

        let service_type = match svc_name.parse::<ServiceType>() {
            Ok(service_type) => service_type,
            Err(e) => {
                warn!(org_id, svc_name, "Cannot resolve partner names: {}", e);
                return;
            }
        };
        let directory = match self.catalog.list_enabled_partners(service_type).await {
            Ok(directory) => directory,
            Err(e) => {
                error!(org_id, svc_name, "Partner catalog lookup failed, skipping notification: {}", e);
                return;
            }
        };

        let names: Vec<&str> = group
            .iter()
            .filter_map(|r| directory.get(&r.partner).map(String::as_str))
            .collect();
        if names.is_empty() {
            warn!(org_id, svc_name, status = %status, "No partner display names resolved, skipping notification");
            return;
        }

        let claimed = match self.repository.claim_notification(org_id, svc_name, status).await {
            Ok(claimed) => claimed,
            Err(e) => {
                error!(org_id, svc_name, status = %status, "Failed to claim notification: {}", e);
                return;
            }
        };
        if claimed.is_empty() {
            debug!(org_id, svc_name, status = %status, "Outcome already notified");
            return;
        }

        let remark = group
            .iter()
            .map(|r| r.remarks.trim())
            .find(|r| !r.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match status {
                RequestStatus::Accepted => "Accepted".to_string(),
                _ => "Rejected".to_string(),
            });

        self.notifications.dispatch(ServiceNotification {
            recipient_email: email,
            status,
            service_name: svc_name.to_string(),
            remark,
            partner_names: names.join(", "),
        });

        info!(org_id, svc_name, status = %status, partners = ?claimed, "Resolution notification queued");
        self.event_bus.publish(ServiceRequestEvent::ResolutionNotified {
            org_id: org_id.to_string(),
            svc_name: svc_name.to_string(),
            status,
            partners: claimed,
            notified_at: Utc::now(),
        });
    }

    async fn toggle(&self, key: &RequestKey, enabled: bool, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError> {
        require_key(key)?;
        let operation = if enabled { "enable" } else { "disable" };
        let updated = self
            .repository
            .set_enabled(key, enabled, updated_by)
            .await
            .map_err(|e| map_repository_error(operation, &key.org_id, &key.partner, &key.svc_name, e))?;

        Self::record_transition(operation);
        self.event_bus.publish(ServiceRequestEvent::EnablementChanged {
            org_id: key.org_id.clone(),
            partner: key.partner.clone(),
            svc_name: key.svc_name.clone(),
            enabled,
            updated_at: updated.updated,
        });
        Ok(updated)
    }
}

#[async_trait]
impl ServiceRequestService for StandardServiceRequestService {
    async fn submit(&self, request: SubmitServiceRequest) -> Result<SubmissionOutcome, ServiceRequestError> {
        require("org_id", &request.org_id)?;
        require("svc_name", &request.svc_name)?;
        let service_type = parse_service_type(&request.svc_name)?;
        let desired = self.desired_partners(&request, service_type).await?;

        let org_id = request.org_id.as_str();
        let svc_name = request.svc_name.as_str();
        let existing = self.load_pair("submit", org_id, svc_name).await?;

        let mut removed = Vec::new();
        for row in existing.iter().filter(|r| !desired.contains(&r.partner) && r.status.is_reconcilable()) {
            let deleted = self
                .repository
                .remove(&row.key())
                .await
                .map_err(|e| map_repository_error("submit", org_id, &row.partner, svc_name, e))?;
            if deleted {
                removed.push(row.partner.clone());
            }
        }

        let mut created = Vec::new();
        for partner in &desired {
            let new_request = NewServiceRequest {
                org_id: org_id.to_string(),
                partner: partner.clone(),
                svc_name: svc_name.to_string(),
                company_name: request.company_name.clone(),
                updated_by: request.updated_by.clone(),
            };
            match self.repository.create(&new_request).await {
                Ok(_) => created.push(partner.clone()),
                Err(RepositoryError::Conflict(_)) => {
                    debug!(org_id, partner = %partner, svc_name, "Service request already exists");
                }
                Err(e) => return Err(map_repository_error("submit", org_id, partner, svc_name, e)),
            }
        }

        metrics::counter!("dsa_service_requests_submitted_total").increment(1);
        info!(org_id, svc_name, created = ?created, removed = ?removed, "Partner selection reconciled");
        self.event_bus.publish(ServiceRequestEvent::PartnersReconciled {
            org_id: org_id.to_string(),
            svc_name: svc_name.to_string(),
            created: created.clone(),
            removed: removed.clone(),
            reconciled_at: Utc::now(),
        });

        let requests = self.load_pair("submit", org_id, svc_name).await?;
        Ok(SubmissionOutcome { created, removed, requests })
    }

    async fn create(&self, request: NewServiceRequest) -> Result<ServiceRequest, ServiceRequestError> {
        require_key(&request.key())?;
        self.repository
            .create(&request)
            .await
            .map_err(|e| map_repository_error("create", &request.org_id, &request.partner, &request.svc_name, e))
    }

    async fn get(&self, key: &RequestKey) -> Result<ServiceRequest, ServiceRequestError> {
        require_key(key)?;
        self.repository
            .get(key)
            .await
            .map_err(|e| map_repository_error("get", &key.org_id, &key.partner, &key.svc_name, e))?
            .ok_or_else(|| ServiceRequestError::NotFound(format!("Service request {} not found", key)))
    }

    async fn list(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestPage, ServiceRequestError> {
        if filter.limit < 0 || filter.offset < 0 {
            return Err(ServiceRequestError::InvalidArgument("limit and offset must not be negative".to_string()));
        }
        self.repository
            .list(filter)
            .await
            .map_err(|e| map_repository_error("list", &filter.org_ids.join(","), "", &filter.svc_names.join(","), e))
    }

    async fn list_grouped(&self, filter: &ServiceRequestFilter) -> Result<ServiceRequestSummaryPage, ServiceRequestError> {
        if filter.limit < 0 || filter.offset < 0 {
            return Err(ServiceRequestError::InvalidArgument("limit and offset must not be negative".to_string()));
        }
        self.repository
            .list_grouped(filter)
            .await
            .map_err(|e| map_repository_error("list_grouped", &filter.org_ids.join(","), "", &filter.svc_names.join(","), e))
    }

    async fn apply(&self, org_id: &str, svc_name: &str, updated_by: &str) -> Result<Vec<ServiceRequest>, ServiceRequestError> {
        require("org_id", org_id)?;
        require("svc_name", svc_name)?;

        let applied = self
            .repository
            .apply(org_id, svc_name, updated_by)
            .await
            .map_err(|e| map_repository_error("apply", org_id, "", svc_name, e))?;

        if applied.is_empty() {
            debug!(org_id, svc_name, "Nothing to apply");
            return Ok(applied);
        }

        Self::record_transition("apply");
        let partners: Vec<String> = applied.iter().map(|r| r.partner.clone()).collect();
        info!(org_id, svc_name, partners = ?partners, "Service requests applied");
        self.event_bus.publish(ServiceRequestEvent::RequestsApplied {
            org_id: org_id.to_string(),
            svc_name: svc_name.to_string(),
            partners,
            applied_at: Utc::now(),
        });
        Ok(applied)
    }

    async fn accept(&self, decision: Decision) -> Result<ServiceRequest, ServiceRequestError> {
        self.decide(decision, RequestStatus::Accepted).await
    }

    async fn reject(&self, decision: Decision) -> Result<ServiceRequest, ServiceRequestError> {
        self.decide(decision, RequestStatus::Rejected).await
    }

    async fn enable(&self, key: &RequestKey, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError> {
        self.toggle(key, true, updated_by).await
    }

    async fn disable(&self, key: &RequestKey, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError> {
        self.toggle(key, false, updated_by).await
    }

    async fn set_status(&self, key: &RequestKey, status: RequestStatus, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError> {
        require_key(key)?;
        let updated = self
            .repository
            .set_status(key, status, updated_by)
            .await
            .map_err(|e| map_repository_error("set_status", &key.org_id, &key.partner, &key.svc_name, e))?;

        Self::record_transition("set_status");
        info!(org_id = %key.org_id, partner = %key.partner, svc_name = %key.svc_name, status = %status, "Service request status overridden");
        self.event_bus.publish(ServiceRequestEvent::StatusOverridden {
            org_id: key.org_id.clone(),
            partner: key.partner.clone(),
            svc_name: key.svc_name.clone(),
            status,
            updated_by: updated_by.to_string(),
            updated_at: updated.updated,
        });
        Ok(updated)
    }

    async fn add_remark(&self, key: &RequestKey, remarks: &str, updated_by: &str) -> Result<ServiceRequest, ServiceRequestError> {
        require_key(key)?;
        self.repository
            .add_remark(key, remarks, updated_by)
            .await
            .map_err(|e| map_repository_error("add_remark", &key.org_id, &key.partner, &key.svc_name, e))
    }

    async fn remove(&self, key: &RequestKey) -> Result<bool, ServiceRequestError> {
        require_key(key)?;
        let removed = self
            .repository
            .remove(key)
            .await
            .map_err(|e| map_repository_error("remove", &key.org_id, &key.partner, &key.svc_name, e))?;

        if removed {
            Self::record_transition("remove");
            self.event_bus.publish(ServiceRequestEvent::RequestRemoved {
                org_id: key.org_id.clone(),
                partner: key.partner.clone(),
                svc_name: key.svc_name.clone(),
                removed_at: Utc::now(),
            });
        } else {
            debug!(org_id = %key.org_id, partner = %key.partner, svc_name = %key.svc_name, "Nothing removed (missing or committed)");
        }
        Ok(removed)
    }
}
