// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Domain events emitted by the service request lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::service_request::RequestStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServiceRequestEvent {
    PartnersReconciled {
        org_id: String,
        svc_name: String,
        created: Vec<String>,
        removed: Vec<String>,
        reconciled_at: DateTime<Utc>,
    },
    RequestsApplied {
        org_id: String,
        svc_name: String,
        partners: Vec<String>,
        applied_at: DateTime<Utc>,
    },
    RequestDecided {
        org_id: String,
        partner: String,
        svc_name: String,
        status: RequestStatus,
        decided_by: String,
        decided_at: DateTime<Utc>,
    },
    StatusOverridden {
        org_id: String,
        partner: String,
        svc_name: String,
        status: RequestStatus,
        updated_by: String,
        updated_at: DateTime<Utc>,
    },
    EnablementChanged {
        org_id: String,
        partner: String,
        svc_name: String,
        enabled: bool,
        updated_at: DateTime<Utc>,
    },
    RequestRemoved {
        org_id: String,
        partner: String,
        svc_name: String,
        removed_at: DateTime<Utc>,
    },
    ResolutionNotified {
        org_id: String,
        svc_name: String,
        status: RequestStatus,
        partners: Vec<String>,
        notified_at: DateTime<Utc>,
    },
}

impl ServiceRequestEvent {
    pub fn org_id(&self) -> &str {
        match self {
            Self::PartnersReconciled { org_id, .. }
            | Self::RequestsApplied { org_id, .. }
            | Self::RequestDecided { org_id, .. }
            | Self::StatusOverridden { org_id, .. }
            | Self::EnablementChanged { org_id, .. }
            | Self::RequestRemoved { org_id, .. }
            | Self::ResolutionNotified { org_id, .. } => org_id,
        }
    }
}
