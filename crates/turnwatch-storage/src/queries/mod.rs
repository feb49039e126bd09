// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, grouped by table.

pub mod employees;
pub mod messages;
pub mod metrics;
pub mod summaries;
pub mod turns;
