// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport traits: event ingest and outbound notification delivery.

use async_trait::async_trait;

use crate::error::TurnwatchError;
use crate::types::{ChannelEvent, MessageRef, NotifyTarget};

/// Source of inbound channel events (tracked messages and bot commands).
///
/// Implementations own their own connection lifecycle; `next_event` yields
/// events in arrival order and may redeliver; the engine deduplicates.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Establish the transport connection and start receiving.
    async fn connect(&mut self) -> Result<(), TurnwatchError>;

    /// Receive the next inbound event, awaiting until one arrives.
    async fn next_event(&self) -> Result<ChannelEvent, TurnwatchError>;
}

/// Outbound notification delivery.
///
/// Delivery is at-least-once and never part of the transaction that produced
/// the request: failures are logged by the caller and never rolled back or
/// synchronously retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        target: NotifyTarget,
        text: &str,
        reference: Option<MessageRef>,
    ) -> Result<(), TurnwatchError>;
}
