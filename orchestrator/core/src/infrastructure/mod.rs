// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

pub mod contact;
pub mod db;
pub mod event_bus;
pub mod notification;
pub mod partner_catalog;
pub mod query_builder;
pub mod repositories;

pub use event_bus::EventBus;
pub use query_builder::{Comparison, QueryBuilder};
