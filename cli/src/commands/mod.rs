// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the enablement CLI

pub mod config;
pub mod migrate;
pub mod request;
pub mod upload;

pub use self::config::ConfigCommand;
pub use self::request::RequestCommand;
pub use self::upload::UploadCommand;

use anyhow::Result;
use serde::Serialize;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
