// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Partner catalog implementations.
//!
//! - [`StaticPartnerCatalog`]: the built-in enumeration per service type
//! - [`PostgresPartnerCatalog`]: the `partner_catalog` table
//! - [`InMemoryPartnerCatalog`]: mutable map for tests and local runs
//! - [`FallbackPartnerCatalog`]: primary source, built-ins when it is empty

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::partner::{CatalogError, PartnerCatalog, PartnerDirectory, ServiceType};

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPartnerCatalog;

#[async_trait]
impl PartnerCatalog for StaticPartnerCatalog {
    async fn list_enabled_partners(&self, service_type: ServiceType) -> Result<PartnerDirectory, CatalogError> {
        Ok(service_type
            .builtin_partners()
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect())
    }
}

pub struct PostgresPartnerCatalog {
    pool: PgPool,
}

impl PostgresPartnerCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PartnerCatalog for PostgresPartnerCatalog {
    async fn list_enabled_partners(&self, service_type: ServiceType) -> Result<PartnerDirectory, CatalogError> {
        let rows = sqlx::query(
            "SELECT partner, name FROM partner_catalog WHERE service_type = $1 AND enabled ORDER BY partner",
        )
        .bind(service_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut directory = PartnerDirectory::new();
        for row in rows {
            directory.insert(row.try_get("partner")?, row.try_get("name")?);
        }
        Ok(directory)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPartnerCatalog {
    entries: Arc<RwLock<HashMap<ServiceType, PartnerDirectory>>>,
}

impl InMemoryPartnerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, service_type: ServiceType, code: impl Into<String>, name: impl Into<String>) {
        self.entries
            .write()
            .entry(service_type)
            .or_default()
            .insert(code.into(), name.into());
    }
}

#[async_trait]
impl PartnerCatalog for InMemoryPartnerCatalog {
    async fn list_enabled_partners(&self, service_type: ServiceType) -> Result<PartnerDirectory, CatalogError> {
        Ok(self
            .entries
            .read()
            .get(&service_type)
            .cloned()
            .unwrap_or_default())
    }
}

/// Consults `primary` and falls back when it has no enabled partners for
/// the service type. Primary errors are propagated, not masked.
pub struct FallbackPartnerCatalog {
    primary: Arc<dyn PartnerCatalog>,
    fallback: Arc<dyn PartnerCatalog>,
}

impl FallbackPartnerCatalog {
    pub fn new(primary: Arc<dyn PartnerCatalog>, fallback: Arc<dyn PartnerCatalog>) -> Self {
        Self { primary, fallback }
    }

    /// Primary catalog backed by the built-in enumeration.
    pub fn with_builtin(primary: Arc<dyn PartnerCatalog>) -> Self {
        Self::new(primary, Arc::new(StaticPartnerCatalog))
    }
}

#[async_trait]
impl PartnerCatalog for FallbackPartnerCatalog {
    async fn list_enabled_partners(&self, service_type: ServiceType) -> Result<PartnerDirectory, CatalogError> {
        let directory = self.primary.list_enabled_partners(service_type).await?;
        if !directory.is_empty() {
            return Ok(directory);
        }
        tracing::debug!(service_type = %service_type, "Partner catalog empty, using built-in enumeration");
        self.fallback.list_enabled_partners(service_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingCatalog;

    #[async_trait]
    impl PartnerCatalog for FailingCatalog {
        async fn list_enabled_partners(&self, _: ServiceType) -> Result<PartnerDirectory, CatalogError> {
            Err(CatalogError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_static_catalog_lists_builtins() {
        let directory = StaticPartnerCatalog
            .list_enabled_partners(ServiceType::CashInCashOut)
            .await
            .unwrap();
        assert_eq!(directory.get("GCASH").map(String::as_str), Some("GCash"));
        assert!(!directory.contains_key("WU"));
    }

    #[tokio::test]
    async fn test_fallback_only_when_primary_is_empty() {
        let primary = InMemoryPartnerCatalog::new();
        let catalog = FallbackPartnerCatalog::with_builtin(Arc::new(primary.clone()));

        let builtin = catalog.list_enabled_partners(ServiceType::Remittance).await.unwrap();
        assert!(builtin.contains_key("WU"));

        primary.insert(ServiceType::Remittance, "XP", "Xpress Padala");
        let dynamic = catalog.list_enabled_partners(ServiceType::Remittance).await.unwrap();
        assert_eq!(dynamic.len(), 1);
        assert!(dynamic.contains_key("XP"));
    }

    #[tokio::test]
    async fn test_fallback_propagates_primary_errors() {
        let catalog = FallbackPartnerCatalog::with_builtin(Arc::new(FailingCatalog));
        let result = catalog.list_enabled_partners(ServiceType::Remittance).await;
        assert!(matches!(result, Err(CatalogError::Unavailable(_))));
    }
}
