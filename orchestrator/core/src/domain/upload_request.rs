// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! File-backed variant of the service request: one row per
//! `(org_id, partner, svc_name, file_type)`, verified by a reviewer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::service_request::{SortDirection, RequestKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadStatus {
    /// Uploaded, not yet verified. Stored as an empty string.
    #[default]
    Submitted,
    Accepted,
    Rejected,
}

impl UploadStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Submitted => "",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "" | "SUBMITTED" => Some(Self::Submitted),
            "ACCEPTED" => Some(Self::Accepted),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            other => write!(f, "{}", other.as_db_str()),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(&s.to_ascii_uppercase())
            .ok_or_else(|| format!("unknown upload status '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadServiceRequest {
    pub id: Uuid,
    pub org_id: String,
    pub partner: String,
    pub svc_name: String,
    pub file_type: String,
    pub file_id: String,
    pub status: UploadStatus,
    pub create_by: String,
    pub verify_by: String,
    pub verified: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl UploadServiceRequest {
    pub fn new(request: &NewUploadServiceRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            org_id: request.key.org_id.clone(),
            partner: request.key.partner.clone(),
            svc_name: request.key.svc_name.clone(),
            file_type: request.key.file_type.clone(),
            file_id: request.file_id.clone(),
            status: UploadStatus::Submitted,
            create_by: request.create_by.clone(),
            verify_by: String::new(),
            verified: None,
            created: now,
            updated: now,
        }
    }

    pub fn key(&self) -> UploadKey {
        UploadKey {
            org_id: self.org_id.clone(),
            partner: self.partner.clone(),
            svc_name: self.svc_name.clone(),
            file_type: self.file_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UploadKey {
    pub org_id: String,
    pub partner: String,
    pub svc_name: String,
    pub file_type: String,
}

impl UploadKey {
    pub fn new(
        org_id: impl Into<String>,
        partner: impl Into<String>,
        svc_name: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            partner: partner.into(),
            svc_name: svc_name.into(),
            file_type: file_type.into(),
        }
    }

    pub fn missing_field(&self) -> Option<&'static str> {
        RequestKey::new(&self.org_id, &self.partner, &self.svc_name)
            .missing_field()
            .or_else(|| self.file_type.trim().is_empty().then_some("file_type"))
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.org_id, self.partner, self.svc_name, self.file_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUploadServiceRequest {
    pub key: UploadKey,
    pub file_id: String,
    pub create_by: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadServiceRequestFilter {
    #[serde(default)]
    pub org_ids: Vec<String>,
    #[serde(default)]
    pub partners: Vec<String>,
    #[serde(default)]
    pub svc_names: Vec<String>,
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<UploadStatus>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadServiceRequestPage {
    pub uploads: Vec<UploadServiceRequest>,
    pub total: i64,
}
