// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0
//! Enablement CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Command parsing and in-process service wiring

pub mod commands;
pub mod embedded;
