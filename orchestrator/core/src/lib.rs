// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Service enablement request lifecycle engine: tracks a DSA's request to
//! activate a service against a set of partners through review, reconciles
//! partner selections and emits aggregate outcome notifications.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain, application and infrastructure layers of the engine

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
