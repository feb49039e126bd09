// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The turn tracking engine: sender classification and the per-event state
//! machine that opens, extends, replaces, and closes turns.

pub mod engine;
pub mod registry;

pub use engine::{EnginePolicy, Ingest, TurnEngine, TurnTransition};
pub use registry::EmployeeRegistry;
