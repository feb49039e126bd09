// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the turnwatch response tracker.
//!
//! Provides the shared error type, the domain types (events, turns, metrics,
//! summaries, notifications), and the trait seams to the chat transport.
//! Everything else in the workspace builds on this crate.

pub mod error;
pub mod traits;
pub mod types;

pub use error::TurnwatchError;
pub use traits::{EventSource, Notifier};
pub use types::{
    BotCommand, ChannelEvent, CommandRequest, DailySummary, EmployeeRecord, InboundEvent,
    MessageRef, NotificationRequest, NotifyTarget, ResponseMetric, SenderRole, StoredMessage, Turn,
    format_elapsed,
};
