// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! Partner catalog contract.
//!
//! The catalog answers "which partners are enabled for this service type"
//! and resolves partner codes to display names. Implementations live in
//! `crate::infrastructure::partner_catalog`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Partner code → display name.
pub type PartnerDirectory = BTreeMap<String, String>;

/// Category of partner integration a service request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceType {
    Remittance,
    CashInCashOut,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remittance => "REMITTANCE",
            Self::CashInCashOut => "CASHINCASHOUT",
        }
    }

    /// Built-in partner enumeration used when no dynamic catalog is available.
    pub fn builtin_partners(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Remittance => REMITTANCE_PARTNERS,
            Self::CashInCashOut => CICO_PARTNERS,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REMITTANCE" => Ok(Self::Remittance),
            "CASHINCASHOUT" | "CICO" => Ok(Self::CashInCashOut),
            other => Err(format!("unknown service type '{}'", other)),
        }
    }
}

const REMITTANCE_PARTNERS: &[(&str, &str)] = &[
    ("WU", "Western Union"),
    ("IR", "iRemit"),
    ("TF", "Transfast"),
    ("RM", "Remitly"),
    ("RIA", "Ria Money Transfer"),
    ("MB", "Metrobank"),
    ("BPI", "BPI"),
    ("USSC", "USSC"),
    ("JPR", "Japan Remit"),
    ("IE", "Instant Cash"),
    ("UNT", "Uniteller"),
    ("CEB", "Cebuana Lhuillier"),
    ("AYA", "Ayannah"),
    ("WISE", "Wise"),
];

const CICO_PARTNERS: &[(&str, &str)] = &[
    ("GCASH", "GCash"),
    ("MAYA", "Maya"),
    ("DRP", "DragonPay"),
    ("PERAHUB", "PeraHub"),
    ("ECP", "ECPay"),
    ("USSC", "USSC"),
];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Partner catalog unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait PartnerCatalog: Send + Sync {
    /// Enabled partners for a service type. May be empty.
    async fn list_enabled_partners(
        &self,
        service_type: ServiceType,
    ) -> Result<PartnerDirectory, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_parses_aliases() {
        assert_eq!("remittance".parse::<ServiceType>().unwrap(), ServiceType::Remittance);
        assert_eq!("CICO".parse::<ServiceType>().unwrap(), ServiceType::CashInCashOut);
        assert!("BILLS".parse::<ServiceType>().is_err());
    }

    #[test]
    fn test_builtin_enumerations_have_unique_codes() {
        for service_type in [ServiceType::Remittance, ServiceType::CashInCashOut] {
            let partners = service_type.builtin_partners();
            let codes: std::collections::HashSet<_> = partners.iter().map(|(c, _)| c).collect();
            assert_eq!(codes.len(), partners.len(), "{}", service_type);
        }
    }
}
