// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for turnwatch.
//!
//! One background connection owns the database file; every access goes
//! through [`Database::connection`], which serializes writes on a single
//! thread. Engine transitions compose the `*_tx` functions from [`queries`]
//! inside a single transaction, so an inbound event commits all of its
//! writes or none of them.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::{Database, map_tr_err};
