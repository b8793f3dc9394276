// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Entities, value objects and contracts of the service enablement lifecycle.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and traits; no I/O

pub mod config;
pub mod events;
pub mod notification;
pub mod partner;
pub mod repository;
pub mod service_request;
pub mod upload_request;
