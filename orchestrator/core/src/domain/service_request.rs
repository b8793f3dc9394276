// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! # Service Request Aggregate
//!
//! A `ServiceRequest` records one merchant's (DSA's) request to activate a
//! named service against one partner. Rows are unique per
//! `(org_id, partner, svc_name)`.
//!
//! ## Status State Machine
//!
//! ```text
//! NOSTATUS ──apply──► PENDING ──accept──► ACCEPTED (enabled = true)
//!                        └─────reject──► REJECTED
//! ANY ──set_status(PARTNERDRAFT)──► PARTNERDRAFT
//! ```
//!
//! `ACCEPTED` and `PENDING` are committed; reconciliation never deletes them.
//! `enabled` is orthogonal to `status` and only toggled by explicit calls
//! (accept sets it as a convenience default).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Value Objects
// ============================================================================

/// Review status of a single partner request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    /// Submitted but not yet applied. Stored as an empty string.
    #[default]
    NoStatus,
    Pending,
    Accepted,
    Rejected,
    PartnerDraft,
}

impl RequestStatus {
    /// Value persisted in the `status` column.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::NoStatus => "",
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::PartnerDraft => "PARTNERDRAFT",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "" | "NOSTATUS" => Some(Self::NoStatus),
            "PENDING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            "REJECTED" => Some(Self::Rejected),
            "PARTNERDRAFT" => Some(Self::PartnerDraft),
            _ => None,
        }
    }

    /// ACCEPTED and PENDING rows are in flight or final and survive
    /// reconciliation and removal.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Accepted | Self::Pending)
    }

    /// Rows that reconciliation may delete when the partner is de-selected.
    pub fn is_reconcilable(&self) -> bool {
        !self.is_committed()
    }

    /// A terminal decision ends the review workflow for the partner.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// Apply moves every non-committed row to PENDING.
    pub fn can_apply(&self) -> bool {
        !self.is_committed()
    }

    /// Accept / reject require the row to have been applied.
    pub fn can_decide(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted | Self::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStatus => write!(f, "NOSTATUS"),
            other => write!(f, "{}", other.as_db_str()),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(&s.to_ascii_uppercase())
            .ok_or_else(|| format!("unknown request status '{}'", s))
    }
}

/// Columns a request listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortColumn {
    Created,
    CompanyName,
    ServiceName,
    Status,
    Partner,
    LastUpdated,
    UpdatedBy,
    Applied,
}

impl SortColumn {
    /// Physical column backing the sort key.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::CompanyName => "company_name",
            Self::ServiceName => "svc_name",
            Self::Status => "status",
            Self::Partner => "partner",
            Self::LastUpdated => "updated",
            Self::UpdatedBy => "updated_by",
            Self::Applied => "applied",
        }
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Ok(Self::Created),
            "COMPANYNAME" => Ok(Self::CompanyName),
            "SERVICENAME" => Ok(Self::ServiceName),
            "STATUS" => Ok(Self::Status),
            "PARTNER" => Ok(Self::Partner),
            "LASTUPDATED" => Ok(Self::LastUpdated),
            "UPDATEDBY" => Ok(Self::UpdatedBy),
            "APPLIED" => Ok(Self::Applied),
            other => Err(format!("unknown sort column '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

// ============================================================================
// Aggregate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub org_id: String,
    pub partner: String,
    pub svc_name: String,
    pub company_name: String,
    pub status: RequestStatus,
    pub enabled: bool,
    pub remarks: String,
    pub updated_by: String,
    pub applied: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ServiceRequest {
    /// Build a fresh NOSTATUS row from a creation request.
    pub fn new(request: &NewServiceRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            org_id: request.org_id.clone(),
            partner: request.partner.clone(),
            svc_name: request.svc_name.clone(),
            company_name: request.company_name.clone(),
            status: RequestStatus::NoStatus,
            enabled: false,
            remarks: String::new(),
            updated_by: request.updated_by.clone(),
            applied: None,
            created: now,
            updated: now,
        }
    }

    pub fn key(&self) -> RequestKey {
        RequestKey {
            org_id: self.org_id.clone(),
            partner: self.partner.clone(),
            svc_name: self.svc_name.clone(),
        }
    }
}

/// The unique `(org_id, partner, svc_name)` tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub org_id: String,
    pub partner: String,
    pub svc_name: String,
}

impl RequestKey {
    pub fn new(
        org_id: impl Into<String>,
        partner: impl Into<String>,
        svc_name: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            partner: partner.into(),
            svc_name: svc_name.into(),
        }
    }

    /// Name of the first empty required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.org_id.trim().is_empty() {
            Some("org_id")
        } else if self.partner.trim().is_empty() {
            Some("partner")
        } else if self.svc_name.trim().is_empty() {
            Some("svc_name")
        } else {
            None
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org_id, self.partner, self.svc_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServiceRequest {
    pub org_id: String,
    pub partner: String,
    pub svc_name: String,
    pub company_name: String,
    pub updated_by: String,
}

impl NewServiceRequest {
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.org_id, &self.partner, &self.svc_name)
    }
}

/// Reviewer decision payload for accept / reject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub key: RequestKey,
    pub updated_by: String,
    pub remarks: String,
}

/// Filter for request listings. Empty collections mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestFilter {
    #[serde(default)]
    pub org_ids: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<RequestStatus>,
    #[serde(default)]
    pub svc_names: Vec<String>,
    #[serde(default)]
    pub partners: Vec<String>,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub sort_by: Option<SortColumn>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// Zero means unbounded.
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl ServiceRequestFilter {
    /// Every row of one (org, service) pair, unpaginated.
    pub fn for_service(org_id: &str, svc_name: &str) -> Self {
        Self {
            org_ids: vec![org_id.to_string()],
            svc_names: vec![svc_name.to_string()],
            ..Default::default()
        }
    }

    pub fn status_values(&self) -> Vec<String> {
        self.statuses
            .iter()
            .map(|s| s.as_db_str().to_string())
            .collect()
    }
}

/// One page of a request listing with the total matching row count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestPage {
    pub requests: Vec<ServiceRequest>,
    pub total: i64,
}

/// Per (org, service) aggregate returned by grouped listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestSummary {
    pub org_id: String,
    pub svc_name: String,
    pub company_name: String,
    pub partners: Vec<String>,
    pub pending: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub partner_count: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub applied: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestSummaryPage {
    pub summaries: Vec<ServiceRequestSummary>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_status_round_trips_through_empty_string() {
        assert_eq!(RequestStatus::NoStatus.as_db_str(), "");
        assert_eq!(RequestStatus::from_db_str(""), Some(RequestStatus::NoStatus));
        assert_eq!("nostatus".parse::<RequestStatus>().unwrap(), RequestStatus::NoStatus);
        assert_eq!(RequestStatus::NoStatus.to_string(), "NOSTATUS");
    }

    #[test]
    fn test_committed_statuses_are_not_reconcilable() {
        assert!(!RequestStatus::Accepted.is_reconcilable());
        assert!(!RequestStatus::Pending.is_reconcilable());
        assert!(RequestStatus::Rejected.is_reconcilable());
        assert!(RequestStatus::PartnerDraft.is_reconcilable());
        assert!(RequestStatus::NoStatus.is_reconcilable());
    }

    #[test]
    fn test_decisions_require_applied_row() {
        assert!(RequestStatus::Pending.can_decide());
        assert!(RequestStatus::Rejected.can_decide());
        assert!(!RequestStatus::NoStatus.can_decide());
        assert!(!RequestStatus::PartnerDraft.can_decide());
    }

    #[test]
    fn test_sort_enumerations_parse() {
        assert_eq!("lastupdated".parse::<SortColumn>().unwrap(), SortColumn::LastUpdated);
        assert_eq!(SortColumn::CompanyName.column(), "company_name");
        assert_eq!("".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn test_missing_field_reports_first_gap() {
        assert_eq!(RequestKey::new("", "WU", "REMITTANCE").missing_field(), Some("org_id"));
        assert_eq!(RequestKey::new("org", " ", "REMITTANCE").missing_field(), Some("partner"));
        assert_eq!(RequestKey::new("org", "WU", "REMITTANCE").missing_field(), None);
    }
}
