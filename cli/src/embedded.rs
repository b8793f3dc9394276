// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! In-process service wiring
//!
//! Loads configuration, connects storage and builds the lifecycle services
//! the commands call into.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use dsa_enablement_core::{
    application::{
        repository_factory, ServiceRequestService, StandardServiceRequestService,
        StandardUploadServiceRequestService, UploadServiceRequestService,
    },
    domain::{config::EnablementConfig, repository::StorageBackend},
    infrastructure::{
        db::Database,
        event_bus::EventBus,
        notification::{dispatcher_from_config, NotificationQueue},
    },
};

pub fn load_config(config_path: Option<PathBuf>) -> Result<EnablementConfig> {
    let config = EnablementConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// `--log-level` wins over `logging.level` from the config file.
pub fn resolve_log_level(cli_level: Option<String>, config_path: Option<PathBuf>) -> String {
    cli_level
        .or_else(|| {
            EnablementConfig::load_or_default(config_path)
                .ok()
                .map(|config| config.logging.level)
        })
        .unwrap_or_else(|| "info".to_string())
}

/// Connect to PostgreSQL when the configured backend needs it.
pub async fn connect(config: &EnablementConfig) -> Result<Option<Database>> {
    info!(backend = ?config.storage.backend, "Initializing storage");
    match config.storage.backend {
        StorageBackend::InMemory => Ok(None),
        StorageBackend::Postgres => Ok(Some(Database::from_config(&config.database).await?)),
    }
}

pub struct EmbeddedServices {
    pub requests: Arc<dyn ServiceRequestService>,
    pub uploads: Arc<dyn UploadServiceRequestService>,
    pub event_bus: Arc<EventBus>,
    notifications: Arc<NotificationQueue>,
}

impl EmbeddedServices {
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config(config_path)?;
        let database = connect(&config).await?;
        Self::from_parts(&config, database.as_ref())
    }

    pub fn from_parts(config: &EnablementConfig, database: Option<&Database>) -> Result<Self> {
        let backend = &config.storage.backend;

        let dispatcher = dispatcher_from_config(&config.notifications)
            .context("Failed to initialize notification dispatcher")?;
        let notifications = Arc::new(NotificationQueue::from_config(dispatcher, &config.notifications));
        let event_bus = Arc::new(EventBus::with_default_capacity());

        let requests = Arc::new(StandardServiceRequestService::new(
            repository_factory::create_service_request_repository(backend, database)?,
            repository_factory::create_partner_catalog(backend, database)?,
            repository_factory::create_contact_resolver(backend, database)?,
            notifications.clone(),
            event_bus.clone(),
        ));
        let uploads = Arc::new(StandardUploadServiceRequestService::new(
            repository_factory::create_upload_request_repository(backend, database)?,
        ));

        Ok(Self {
            requests,
            uploads,
            event_bus,
            notifications,
        })
    }

    /// Wait for queued notifications before the process exits.
    pub async fn shutdown(&self) {
        self.notifications.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_wiring_needs_no_database() {
        let config = EnablementConfig::from_yaml_str("storage:\n  backend: in_memory\n").unwrap();
        let services = EmbeddedServices::from_parts(&config, None).unwrap();
        services.shutdown().await;
    }

    #[tokio::test]
    async fn test_postgres_wiring_requires_database() {
        let config = EnablementConfig::default();
        assert!(EmbeddedServices::from_parts(&config, None).is_err());
    }
}
