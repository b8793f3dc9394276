// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Apply database schema migrations

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;

use dsa_enablement_core::domain::repository::StorageBackend;

use crate::embedded::{connect, load_config};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    if config.storage.backend != StorageBackend::Postgres {
        bail!("migrate requires storage.backend: postgres");
    }

    match connect(&config).await? {
        Some(database) => database.migrate().await?,
        None => bail!("no database connection configured"),
    }

    println!("{}", "Migrations applied".green());
    Ok(())
}
