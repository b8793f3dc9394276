// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Service request commands
//!
//! Commands: submit, create, get, list, summary, apply, accept, reject,
//! enable, disable, set-status, remark, remove

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use dsa_enablement_core::application::SubmitServiceRequest;
use dsa_enablement_core::domain::service_request::{
    Decision, NewServiceRequest, RequestKey, RequestStatus, ServiceRequestFilter, SortColumn,
    SortDirection,
};

use super::print_json;
use crate::embedded::EmbeddedServices;

/// Identifies one (org, partner, service) row
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Organization (DSA) id
    #[arg(long)]
    pub org: String,

    /// Partner code, e.g. WU
    #[arg(long)]
    pub partner: String,

    /// Service name
    #[arg(long, default_value = "REMITTANCE")]
    pub service: String,
}

impl KeyArgs {
    fn key(&self) -> RequestKey {
        RequestKey::new(&self.org, &self.partner, &self.service)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Organization ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub org: Vec<String>,

    /// Statuses (NOSTATUS, PENDING, ACCEPTED, REJECTED, PARTNERDRAFT)
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<RequestStatus>,

    /// Service names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub service: Vec<String>,

    /// Partner codes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub partner: Vec<String>,

    /// Company name substring
    #[arg(long, default_value = "")]
    pub company: String,

    /// Sort column (CREATED, COMPANYNAME, SERVICENAME, STATUS, PARTNER, LASTUPDATED, UPDATEDBY, APPLIED)
    #[arg(long)]
    pub sort_by: Option<SortColumn>,

    /// ASC or DESC
    #[arg(long, default_value = "ASC")]
    pub direction: SortDirection,

    /// Page size, 0 for unbounded
    #[arg(long, default_value_t = 0)]
    pub limit: i64,

    #[arg(long, default_value_t = 0)]
    pub offset: i64,
}

impl From<FilterArgs> for ServiceRequestFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            org_ids: args.org,
            statuses: args.status,
            svc_names: args.service,
            partners: args.partner,
            company_name: args.company,
            sort_by: args.sort_by,
            sort_direction: args.direction,
            limit: args.limit,
            offset: args.offset,
        }
    }
}

#[derive(Subcommand)]
pub enum RequestCommand {
    /// Reconcile the requested partner set for a service
    Submit {
        #[arg(long)]
        org: String,

        #[arg(long, default_value = "REMITTANCE")]
        service: String,

        #[arg(long, default_value = "")]
        company: String,

        /// Partner codes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        partners: Vec<String>,

        /// Request every enabled partner of the service type
        #[arg(long)]
        all: bool,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Create a single request row
    Create {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long, default_value = "")]
        company: String,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Show one request row
    Get {
        #[command(flatten)]
        key: KeyArgs,
    },

    /// List request rows
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List per (org, service) summaries
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Move every non-committed row of (org, service) to PENDING
    Apply {
        #[arg(long)]
        org: String,

        #[arg(long, default_value = "REMITTANCE")]
        service: String,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Accept a partner request
    Accept {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long, default_value = "")]
        remarks: String,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Reject a partner request
    Reject {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long, default_value = "")]
        remarks: String,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Enable a partner request
    Enable {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Disable a partner request
    Disable {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Override the status of a partner request
    #[command(name = "set-status")]
    SetStatus {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long)]
        status: RequestStatus,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Update remarks without changing status
    Remark {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long)]
        remarks: String,

        #[arg(long, env = "DSA_ACTOR")]
        by: String,
    },

    /// Delete a request row that is not ACCEPTED or PENDING
    Remove {
        #[command(flatten)]
        key: KeyArgs,
    },
}

pub async fn handle_command(command: RequestCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = EmbeddedServices::new(config_path).await?;
    let result = execute(command, &services).await;
    services.shutdown().await;
    result
}

async fn execute(command: RequestCommand, services: &EmbeddedServices) -> Result<()> {
    let requests = &services.requests;

    match command {
        RequestCommand::Submit { org, service, company, partners, all, by } => {
            let outcome = requests
                .submit(SubmitServiceRequest {
                    org_id: org,
                    svc_name: service,
                    company_name: company,
                    partners,
                    all_partners: all,
                    updated_by: by,
                })
                .await?;
            print_json(&outcome)
        }
        RequestCommand::Create { key, company, by } => {
            let created = requests
                .create(NewServiceRequest {
                    org_id: key.org,
                    partner: key.partner,
                    svc_name: key.service,
                    company_name: company,
                    updated_by: by,
                })
                .await?;
            print_json(&created)
        }
        RequestCommand::Get { key } => print_json(&requests.get(&key.key()).await?),
        RequestCommand::List { filter } => print_json(&requests.list(&filter.into()).await?),
        RequestCommand::Summary { filter } => print_json(&requests.list_grouped(&filter.into()).await?),
        RequestCommand::Apply { org, service, by } => print_json(&requests.apply(&org, &service, &by).await?),
        RequestCommand::Accept { key, remarks, by } => {
            let decision = Decision { key: key.key(), updated_by: by, remarks };
            print_json(&requests.accept(decision).await?)
        }
        RequestCommand::Reject { key, remarks, by } => {
            let decision = Decision { key: key.key(), updated_by: by, remarks };
            print_json(&requests.reject(decision).await?)
        }
        RequestCommand::Enable { key, by } => print_json(&requests.enable(&key.key(), &by).await?),
        RequestCommand::Disable { key, by } => print_json(&requests.disable(&key.key(), &by).await?),
        RequestCommand::SetStatus { key, status, by } => {
            print_json(&requests.set_status(&key.key(), status, &by).await?)
        }
        RequestCommand::Remark { key, remarks, by } => {
            print_json(&requests.add_remark(&key.key(), &remarks, &by).await?)
        }
        RequestCommand::Remove { key } => {
            let removed = requests.remove(&key.key()).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
    }
}
