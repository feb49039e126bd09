// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The turn lifecycle state machine.
//!
//! [`TurnEngine::process_event`] applies one inbound message to the store as
//! a single transaction: duplicate detection, the message append, and the
//! turn transition either all commit or none do. The engine's clock is the
//! message's own `sent_at`, so replaying a backlog of events produces the
//! same transitions as live traffic.

use std::sync::Arc;

use turnwatch_core::{
    InboundEvent, MessageRef, NotificationRequest, NotifyTarget, ResponseMetric, SenderRole,
    StoredMessage, TurnwatchError, format_elapsed,
};
use turnwatch_storage::{
    Database,
    queries::{messages, metrics, turns},
};

use crate::registry::EmployeeRegistry;

/// Thresholds the engine applies per event. Derived from configuration once
/// at startup.
#[derive(Debug, Clone, Copy)]
pub struct EnginePolicy {
    /// A partner message arriving more than this many seconds after the open
    /// turn's last activity replaces the turn instead of extending it.
    pub turn_timeout_secs: i64,
    /// Response durations above this raise an operator alert.
    pub slow_response_threshold_secs: i64,
    /// Whether slow-response alerts are raised at all.
    pub slow_response_alerts: bool,
}

/// What happened to the turn state as a result of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnTransition {
    /// A partner message opened a new turn.
    Opened { turn_id: i64 },
    /// A partner follow-up landed on its still-fresh open turn.
    Extended { turn_id: i64 },
    /// A partner message arrived after the turn timeout; the stale turn was
    /// discarded without a metric and a fresh one opened.
    Replaced { stale_turn_id: i64, turn_id: i64 },
    /// An employee message closed an open turn.
    Answered {
        turn_id: i64,
        duration_secs: i64,
        /// `false` when the metric row already existed (replayed reply).
        metric_recorded: bool,
    },
    /// An employee message that matched no open turn. Stored, nothing else.
    Unmatched,
}

/// Outcome of ingesting one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingest {
    /// The event was already in the log; nothing changed.
    Duplicate,
    Recorded {
        role: SenderRole,
        transition: TurnTransition,
        /// Outbound alerts to deliver after the transaction committed.
        /// Delivery failure must not undo the recorded state.
        notifications: Vec<NotificationRequest>,
    },
}

pub struct TurnEngine {
    db: Database,
    registry: Arc<EmployeeRegistry>,
    policy: EnginePolicy,
}

impl TurnEngine {
    pub fn new(db: Database, registry: Arc<EmployeeRegistry>, policy: EnginePolicy) -> Self {
        Self { db, registry, policy }
    }

    pub fn registry(&self) -> &Arc<EmployeeRegistry> {
        &self.registry
    }

    /// Apply one inbound message. All store writes happen in one transaction
    /// on the single writer connection, which also serializes concurrent
    /// events touching the same turn.
    pub async fn process_event(&self, event: &InboundEvent) -> Result<Ingest, TurnwatchError> {
        let role = self.registry.classify(event.sender_id);
        let policy = self.policy;
        let event = event.clone();

        let ingest = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let ingest = apply_event(&tx, &event, role, policy)?;
                tx.commit()?;
                Ok(ingest)
            })
            .await
            .map_err(turnwatch_storage::map_tr_err)?;

        match &ingest {
            Ingest::Duplicate => {
                tracing::debug!("redelivered event ignored");
            }
            Ingest::Recorded { role, transition, .. } => {
                tracing::debug!(?role, ?transition, "event recorded");
            }
        }
        Ok(ingest)
    }
}

fn apply_event(
    tx: &rusqlite::Connection,
    event: &InboundEvent,
    role: SenderRole,
    policy: EnginePolicy,
) -> rusqlite::Result<Ingest> {
    let now = event.sent_at;
    let stored = StoredMessage {
        conversation_id: event.conversation_id,
        message_id: event.message_id,
        sender_id: event.sender_id,
        sender_name: event.sender_name.clone(),
        sender_username: event.sender_username.clone(),
        text: event.text.clone(),
        sent_at: event.sent_at,
        replied_to: event.replied_to,
        is_from_employee: role == SenderRole::Employee,
        answered: false,
        turn_id: None,
    };
    if !messages::insert_message_tx(tx, &stored)? {
        return Ok(Ingest::Duplicate);
    }

    let transition = match role {
        SenderRole::Partner => apply_partner_message(tx, event, now, policy)?,
        SenderRole::Employee => return apply_employee_message(tx, event, role, now, policy),
    };
    Ok(Ingest::Recorded { role, transition, notifications: Vec::new() })
}

fn apply_partner_message(
    tx: &rusqlite::Connection,
    event: &InboundEvent,
    now: i64,
    policy: EnginePolicy,
) -> rusqlite::Result<TurnTransition> {
    let open = turns::find_open_turn_tx(tx, event.conversation_id, event.sender_id)?;
    let transition = match open {
        None => {
            let Some(turn) = turns::create_turn_tx(
                tx,
                event.conversation_id,
                event.sender_id,
                event.message_id,
                &event.text,
                now,
            )?
            else {
                // Cannot happen inside one transaction after the lookup above.
                return Err(rusqlite::Error::StatementChangedRows(0));
            };
            messages::set_turn_ref_tx(tx, event.conversation_id, event.message_id, turn.id)?;
            TurnTransition::Opened { turn_id: turn.id }
        }
        Some(turn) if turn.idle_secs(now) < policy.turn_timeout_secs => {
            turns::extend_turn_tx(tx, turn.id, event.message_id, &event.text, now)?;
            messages::set_turn_ref_tx(tx, event.conversation_id, event.message_id, turn.id)?;
            TurnTransition::Extended { turn_id: turn.id }
        }
        Some(stale) => {
            // Timed out: the old exchange is treated as abandoned. It is
            // deleted without recording a metric and a fresh turn opens.
            let turn = turns::replace_turn_tx(
                tx,
                stale.id,
                event.conversation_id,
                event.sender_id,
                event.message_id,
                &event.text,
                now,
            )?;
            messages::set_turn_ref_tx(tx, event.conversation_id, event.message_id, turn.id)?;
            TurnTransition::Replaced { stale_turn_id: stale.id, turn_id: turn.id }
        }
    };
    Ok(transition)
}

fn apply_employee_message(
    tx: &rusqlite::Connection,
    event: &InboundEvent,
    role: SenderRole,
    now: i64,
    policy: EnginePolicy,
) -> rusqlite::Result<Ingest> {
    let Some(partner_id) = resolve_target_partner(tx, event)? else {
        return Ok(Ingest::Recorded {
            role,
            transition: TurnTransition::Unmatched,
            notifications: Vec::new(),
        });
    };

    let Some(turn) = turns::close_turn_tx(tx, event.conversation_id, partner_id)? else {
        return Ok(Ingest::Recorded {
            role,
            transition: TurnTransition::Unmatched,
            notifications: Vec::new(),
        });
    };

    let duration_secs = (now - turn.last_activity_at).max(0);
    let metric_recorded = metrics::record_metric_tx(
        tx,
        &ResponseMetric {
            conversation_id: event.conversation_id,
            reply_message_id: event.message_id,
            original_message_id: turn.last_message_id,
            responder_id: event.sender_id,
            original_sender_id: turn.partner_id,
            duration_secs,
            recorded_at: now,
        },
    )?;
    messages::mark_turn_answered_tx(tx, turn.id)?;

    let mut notifications = Vec::new();
    if policy.slow_response_alerts && duration_secs > policy.slow_response_threshold_secs {
        notifications.push(NotificationRequest {
            target: NotifyTarget::Admin,
            text: format!(
                "Slow response: {} took {} to answer.",
                event.sender_name,
                format_elapsed(duration_secs)
            ),
            reference: Some(MessageRef {
                conversation_id: event.conversation_id,
                message_id: turn.last_message_id,
            }),
        });
    }

    Ok(Ingest::Recorded {
        role,
        transition: TurnTransition::Answered {
            turn_id: turn.id,
            duration_secs,
            metric_recorded,
        },
        notifications,
    })
}

/// Decide which partner an employee message answers.
///
/// An explicit reply link is authoritative: a link to a partner's message
/// attributes the answer to that partner, and a link to another employee's
/// message is a side exchange that answers nobody. Only a plain message
/// without a link falls back to the most recently active open turn in the
/// conversation, which matches how group chats are actually used: people
/// answer the thing that was just asked.
fn resolve_target_partner(
    tx: &rusqlite::Connection,
    event: &InboundEvent,
) -> rusqlite::Result<Option<i64>> {
    if let Some(replied_to) = event.replied_to
        && let Some(original) = messages::get_message_tx(tx, event.conversation_id, replied_to)?
    {
        if original.is_from_employee {
            return Ok(None);
        }
        return Ok(Some(original.sender_id));
    }
    Ok(turns::most_recent_open_turn_tx(tx, event.conversation_id)?.map(|t| t.partner_id))
}
