// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Upload request commands
//!
//! Commands: add, accept, reject, remove, list

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use dsa_enablement_core::domain::service_request::SortDirection;
use dsa_enablement_core::domain::upload_request::{
    NewUploadServiceRequest, UploadKey, UploadServiceRequestFilter, UploadStatus,
};

use super::print_json;
use crate::embedded::EmbeddedServices;

#[derive(Args, Debug, Clone)]
pub struct UploadKeyArgs {
    #[arg(long)]
    pub org: String,

    #[arg(long)]
    pub partner: String,

    #[arg(long, default_value = "REMITTANCE")]
    pub service: String,

    /// Document type, e.g. DTI, BIR2303
    #[arg(long)]
    pub file_type: String,
}

impl UploadKeyArgs {
    fn key(&self) -> UploadKey {
        UploadKey::new(&self.org, &self.partner, &self.service, &self.file_type)
    }
}

#[derive(Subcommand)]
pub enum UploadCommand {
    /// Submit (or replace) an uploaded document
    Add {
        #[command(flatten)]
        key: UploadKeyArgs,

        /// Stored file reference
        #[arg(long)]
        file_id: String,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Mark a document verified
    Accept {
        #[command(flatten)]
        key: UploadKeyArgs,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Mark a document rejected
    Reject {
        #[command(flatten)]
        key: UploadKeyArgs,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Delete an uploaded document record
    Remove {
        #[command(flatten)]
        key: UploadKeyArgs,
    },

    /// List uploaded documents
    List {
        #[arg(long, value_delimiter = ',')]
        org: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        partner: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        service: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        file_type: Vec<String>,

        /// SUBMITTED, ACCEPTED or REJECTED
        #[arg(long, value_delimiter = ',')]
        status: Vec<UploadStatus>,

        #[arg(long, default_value = "ASC")]
        direction: SortDirection,

        #[arg(long, default_value_t = 0)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
}

pub async fn handle_command(command: UploadCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = EmbeddedServices::new(config_path).await?;
    let result = execute(command, &services).await;
    services.shutdown().await;
    result
}

async fn execute(command: UploadCommand, services: &EmbeddedServices) -> Result<()> {
    let uploads = &services.uploads;

    match command {
        UploadCommand::Add { key, file_id, by } => {
            let upload = uploads
                .add(NewUploadServiceRequest {
                    key: key.key(),
                    file_id,
                    create_by: by,
                })
                .await?;
            print_json(&upload)
        }
        UploadCommand::Accept { key, by } => print_json(&uploads.accept(&key.key(), &by).await?),
        UploadCommand::Reject { key, by } => print_json(&uploads.reject(&key.key(), &by).await?),
        UploadCommand::Remove { key } => {
            let removed = uploads.remove(&key.key()).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        UploadCommand::List { org, partner, service, file_type, status, direction, limit, offset } => {
            let filter = UploadServiceRequestFilter {
                org_ids: org,
                partners: partner,
                svc_names: service,
                file_types: file_type,
                statuses: status,
                sort_direction: direction,
                limit,
                offset,
            };
            print_json(&uploads.list(&filter).await?)
        }
    }
}
