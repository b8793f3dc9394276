// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use dsa_enablement_core::domain::config::EnablementConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        #[arg(short, long, default_value = "./dsa-enablement.yaml")]
        output: PathBuf,

        /// Include every section with comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(&output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = EnablementConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. DSA_CONFIG_PATH: {}",
            std::env::var("DSA_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./dsa-enablement.yaml");
        println!("  4. ~/.dsa-enablement/config.yaml");
        println!("  5. /etc/dsa-enablement/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();
    println!("  Storage backend: {:?}", config.storage.backend);
    println!("  Database: {}", redact_url(&config.database.url));
    println!("  Max connections: {}", config.database.max_connections);
    println!(
        "  Notification endpoint: {}",
        config.notifications.endpoint.as_deref().unwrap_or("(log only)")
    );
    println!(
        "  Notification workers: {} (queue {})",
        config.notifications.workers, config.notifications.queue_capacity
    );
    println!("  Log level: {}", config.logging.level);

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = EnablementConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

fn generate(output: &Path, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());
    Ok(())
}

/// Hide the password component of a connection string.
fn redact_url(url: &str) -> String {
    if url.is_empty() {
        return "(not set)".to_string();
    }
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let credentials = &url[scheme + 3..at];
            match credentials.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &url[..scheme + 3], user, &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_hides_password() {
        assert_eq!(
            redact_url("postgres://dsa:secret@db:5432/dsa"),
            "postgres://dsa:***@db:5432/dsa"
        );
        assert_eq!(redact_url("postgres://db/dsa"), "postgres://db/dsa");
        assert_eq!(redact_url(""), "(not set)");
    }

    #[test]
    fn test_generated_templates_parse_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        for examples in [false, true] {
            let path = dir.path().join(format!("config-{}.yaml", examples));
            generate(&path, examples).unwrap();
            let config = EnablementConfig::from_yaml_file(&path).unwrap();
            config.validate().unwrap();
        }
    }
}
