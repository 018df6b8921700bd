// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Tidedesk support backend.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query operations for
//! conversations, messages, and knowledge-base usage. Composite operations in
//! [`queries::interactions`] are the transactional write path the memory
//! façade builds on.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
pub use queries::interactions::InteractionOutcome;
