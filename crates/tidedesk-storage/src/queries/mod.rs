// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD and composite operations on storage entities.

pub mod conversations;
pub mod interactions;
pub mod kb_usage;
pub mod messages;
