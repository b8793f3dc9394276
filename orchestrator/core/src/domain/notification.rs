// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Outbound notification contracts.
//!
//! The lifecycle engine never sends email itself. It resolves a recipient
//! through [`OrgContactResolver`], builds a [`ServiceNotification`] and hands
//! it to a [`NotificationSink`], which decides when and how the
//! [`NotificationDispatcher`] is invoked.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::service_request::RequestStatus;

/// Aggregate outcome message for one (org, service, outcome) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNotification {
    pub recipient_email: String,
    pub status: RequestStatus,
    pub service_name: String,
    pub remark: String,
    /// Comma-joined partner display names.
    pub partner_names: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notification rejected by endpoint (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("Contact lookup failed: {0}")]
    Lookup(String),
}

impl From<sqlx::Error> for ContactError {
    fn from(err: sqlx::Error) -> Self {
        ContactError::Lookup(err.to_string())
    }
}

/// Delivers a single notification (the email integration).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_notification(&self, notification: &ServiceNotification) -> Result<(), NotificationError>;
}

/// Fire-and-forget hand-off point. Must never block the caller and never
/// report delivery failures back to it.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, notification: ServiceNotification);
}

/// Resolves an org's contact email. `Ok(None)` means notification is not possible.
#[async_trait]
pub trait OrgContactResolver: Send + Sync {
    async fn contact_email(&self, org_id: &str) -> Result<Option<String>, ContactError>;
}
