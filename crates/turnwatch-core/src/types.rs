// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the turnwatch workspace.
//!
//! All timestamps are unix epoch seconds. Calendar dates (daily summaries)
//! are `YYYY-MM-DD` strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Role of a message sender, derived from the employee registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum SenderRole {
    /// A registered responder.
    Employee,
    /// Any sender not in the registry; the party expected to be responded to.
    Partner,
}

/// An inbound chat message as surfaced by the transport.
///
/// The same event may be redelivered; `(conversation_id, message_id)`
/// identifies it uniquely and redelivery must be a no-op downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    /// Platform handle (e.g. Telegram @username), when the sender has one.
    pub sender_username: Option<String>,
    pub message_id: i64,
    pub text: String,
    /// Unix epoch seconds at which the transport timestamped the message.
    pub sent_at: i64,
    /// Message id this one explicitly replies to, when the transport
    /// surfaced a reply link.
    pub replied_to: Option<i64>,
}

/// Commands addressed to the bot rather than tracked as conversation traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Stats,
    TeamStats,
    Unanswered,
    AddEmployee(String),
    RemoveEmployee(String),
}

/// A parsed bot command together with where and who it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub command: BotCommand,
}

/// Everything the transport can hand to the runtime loop.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Message(InboundEvent),
    Command(CommandRequest),
}

/// A stored message row from the append-only log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub conversation_id: i64,
    pub message_id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub sender_username: Option<String>,
    pub text: String,
    pub sent_at: i64,
    pub replied_to: Option<i64>,
    /// Snapshot of the sender's role at ingest time; immutable once stored.
    pub is_from_employee: bool,
    pub answered: bool,
    /// Back-reference to the turn this message was filed under, if any.
    /// Outlives the turn row itself (turns are deleted on close/replace).
    pub turn_id: Option<i64>,
}

/// An open, unanswered exchange initiated by a partner.
///
/// At most one open turn exists per `(conversation_id, partner_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: i64,
    pub conversation_id: i64,
    pub partner_id: i64,
    pub last_message_id: i64,
    pub last_message_text: String,
    pub started_at: i64,
    pub last_activity_at: i64,
    /// Set once an escalation reminder fired for the current period of
    /// inactivity; cleared whenever the partner sends again.
    pub reminded: bool,
}

impl Turn {
    /// Seconds of partner inactivity as of `now`.
    pub fn idle_secs(&self, now: i64) -> i64 {
        now - self.last_activity_at
    }
}

/// A recorded response-duration sample; append-only, idempotent on
/// `(conversation_id, reply_message_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetric {
    pub conversation_id: i64,
    pub reply_message_id: i64,
    pub original_message_id: i64,
    pub responder_id: i64,
    pub original_sender_id: i64,
    pub duration_secs: i64,
    pub recorded_at: i64,
}

/// An entry in the employee registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeRecord {
    pub user_id: i64,
    pub display_name: String,
    pub added_by: String,
    pub added_at: i64,
}

/// Per-user, per-date activity rollup. Derived; never hand-edited.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub user_id: i64,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub message_count: i64,
    pub avg_response_secs: f64,
    pub turns_initiated: i64,
    pub turns_answered: i64,
}

/// Where an outbound notification should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTarget {
    /// The conversation the tracked activity happened in.
    Conversation(i64),
    /// The configured operator/admin channel.
    Admin,
}

/// A reference back to the message a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub conversation_id: i64,
    pub message_id: i64,
}

/// A request to send one outbound notification. Delivery is at-least-once
/// and fire-and-forget with respect to the state change that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub target: NotifyTarget,
    pub text: String,
    pub reference: Option<MessageRef>,
}

/// Human-readable elapsed time, e.g. `45m`, `2h 05m`, `3d 4h`.
pub fn format_elapsed(secs: i64) -> String {
    let secs = secs.max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn sender_role_round_trips_through_strings() {
        for role in [SenderRole::Employee, SenderRole::Partner] {
            let s = role.to_string();
            assert_eq!(SenderRole::from_str(&s).unwrap(), role);
        }
    }

    #[test]
    fn sender_role_serializes() {
        let json = serde_json::to_string(&SenderRole::Partner).unwrap();
        let parsed: SenderRole = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SenderRole::Partner);
    }

    #[test]
    fn turn_idle_seconds() {
        let turn = Turn {
            id: 1,
            conversation_id: 10,
            partner_id: 20,
            last_message_id: 30,
            last_message_text: "need help".into(),
            started_at: 1_000,
            last_activity_at: 1_600,
            reminded: false,
        };
        assert_eq!(turn.idle_secs(2_000), 400);
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "0m");
        assert_eq!(format_elapsed(59), "0m");
        assert_eq!(format_elapsed(45 * 60), "45m");
        assert_eq!(format_elapsed(2 * 3_600 + 5 * 60), "2h 05m");
        assert_eq!(format_elapsed(3 * 86_400 + 4 * 3_600), "3d 4h");
        assert_eq!(format_elapsed(-10), "0m");
    }

    #[test]
    fn inbound_event_round_trips_through_json() {
        let event = InboundEvent {
            conversation_id: -100123,
            sender_id: 42,
            sender_name: "Ada".into(),
            sender_username: Some("ada".into()),
            message_id: 7,
            text: "hello".into(),
            sent_at: 1_700_000_000,
            replied_to: Some(5),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: InboundEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
