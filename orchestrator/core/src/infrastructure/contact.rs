// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Org contact email resolution.

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::notification::{ContactError, OrgContactResolver};

/// Reads `org_contacts.contact_email`. Blank addresses resolve to `None`.
pub struct PostgresOrgContactResolver {
    pool: PgPool,
}

impl PostgresOrgContactResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrgContactResolver for PostgresOrgContactResolver {
    async fn contact_email(&self, org_id: &str) -> Result<Option<String>, ContactError> {
        let row = sqlx::query("SELECT contact_email FROM org_contacts WHERE org_id = $1")
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?;

        let email = match row {
            Some(row) => row.try_get::<String, _>("contact_email")?,
            None => return Ok(None),
        };
        Ok(Some(email).filter(|e| !e.trim().is_empty()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryOrgContactResolver {
    contacts: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryOrgContactResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, org_id: impl Into<String>, email: impl Into<String>) {
        self.contacts.write().insert(org_id.into(), email.into());
    }
}

#[async_trait]
impl OrgContactResolver for InMemoryOrgContactResolver {
    async fn contact_email(&self, org_id: &str) -> Result<Option<String>, ContactError> {
        Ok(self
            .contacts
            .read()
            .get(org_id)
            .filter(|e| !e.trim().is_empty())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_email_resolves_to_none() {
        let resolver = InMemoryOrgContactResolver::new();
        resolver.set("org-1", "  ");
        resolver.set("org-2", "ops@merchant.ph");

        assert_eq!(resolver.contact_email("org-1").await.unwrap(), None);
        assert_eq!(resolver.contact_email("org-3").await.unwrap(), None);
        assert_eq!(
            resolver.contact_email("org-2").await.unwrap().as_deref(),
            Some("ops@merchant.ph")
        );
    }
}
