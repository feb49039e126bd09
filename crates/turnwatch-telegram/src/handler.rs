// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing of raw Telegram updates into channel events.
//!
//! Group and supergroup messages become tracked [`InboundEvent`]s; slash
//! commands (from groups or DMs) become [`CommandRequest`]s; everything
//! else is dropped here before it reaches the engine.

use teloxide::prelude::*;

use turnwatch_core::{BotCommand, ChannelEvent, CommandRequest, InboundEvent};

/// Whether the message came from a group or supergroup chat. Only those are
/// tracked; channel posts and DMs carry no turn semantics.
pub fn is_group(msg: &Message) -> bool {
    msg.chat.is_group() || msg.chat.is_supergroup()
}

/// Parse a leading slash command. `@botname` suffixes (used in groups to
/// disambiguate between bots) are stripped before matching.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let text = text.trim();
    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    if !head.starts_with('/') {
        return None;
    }
    let name = head.split('@').next().unwrap_or(head);
    let arg = parts.collect::<Vec<_>>().join(" ");
    match name {
        "/start" => Some(BotCommand::Start),
        "/stats" => Some(BotCommand::Stats),
        "/teamstats" => Some(BotCommand::TeamStats),
        "/unanswered" => Some(BotCommand::Unanswered),
        "/add_employee" => Some(BotCommand::AddEmployee(arg)),
        "/remove_employee" => Some(BotCommand::RemoveEmployee(arg)),
        _ => None,
    }
}

/// Map a Telegram message to a channel event, or `None` when it carries
/// nothing the tracker should see.
pub fn to_channel_event(msg: &Message) -> Option<ChannelEvent> {
    let user = msg.from.as_ref()?;
    if user.is_bot {
        return None;
    }
    let text = msg.text()?;

    if let Some(command) = parse_command(text) {
        return Some(ChannelEvent::Command(CommandRequest {
            conversation_id: msg.chat.id.0,
            sender_id: user.id.0 as i64,
            sender_name: user.full_name(),
            command,
        }));
    }

    if !is_group(msg) {
        return None;
    }

    Some(ChannelEvent::Message(InboundEvent {
        conversation_id: msg.chat.id.0,
        sender_id: user.id.0 as i64,
        sender_name: user.full_name(),
        sender_username: user.username.clone(),
        message_id: i64::from(msg.id.0),
        text: text.to_string(),
        sent_at: msg.date.timestamp(),
        replied_to: msg.reply_to_message().map(|m| i64::from(m.id.0)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a mock supergroup message from JSON, matching the Bot API shape.
    fn make_group_message(user_id: u64, text: &str, reply_to: Option<i64>) -> Message {
        let mut json = serde_json::json!({
            "message_id": 42,
            "date": 1_700_000_000i64,
            "chat": {
                "id": -1001234567890i64,
                "type": "supergroup",
                "title": "Support",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Dana",
                "last_name": "K",
                "username": "dana_k",
            },
            "text": text,
        });
        if let Some(orig_id) = reply_to {
            json["reply_to_message"] = serde_json::json!({
                "message_id": orig_id,
                "date": 1_699_999_000i64,
                "chat": {
                    "id": -1001234567890i64,
                    "type": "supergroup",
                    "title": "Support",
                },
                "from": {
                    "id": 99,
                    "is_bot": false,
                    "first_name": "Earlier",
                },
                "text": "earlier message",
            });
        }
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_private_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 7,
            "date": 1_700_000_000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Dana",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Dana",
            },
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    #[test]
    fn group_text_becomes_a_tracked_event() {
        let msg = make_group_message(7, "when does my order ship?", None);
        let Some(ChannelEvent::Message(event)) = to_channel_event(&msg) else {
            panic!("expected a tracked message");
        };
        assert_eq!(event.conversation_id, -1001234567890);
        assert_eq!(event.sender_id, 7);
        assert_eq!(event.sender_name, "Dana K");
        assert_eq!(event.sender_username.as_deref(), Some("dana_k"));
        assert_eq!(event.message_id, 42);
        assert_eq!(event.sent_at, 1_700_000_000);
        assert_eq!(event.replied_to, None);
    }

    #[test]
    fn reply_link_is_carried_through() {
        let msg = make_group_message(7, "yes, that one", Some(30));
        let Some(ChannelEvent::Message(event)) = to_channel_event(&msg) else {
            panic!("expected a tracked message");
        };
        assert_eq!(event.replied_to, Some(30));
    }

    #[test]
    fn private_chat_text_is_not_tracked() {
        let msg = make_private_message(7, "hello");
        assert!(to_channel_event(&msg).is_none());
    }

    #[test]
    fn bot_senders_are_ignored() {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1_700_000_000i64,
            "chat": { "id": -1001i64, "type": "supergroup", "title": "G" },
            "from": { "id": 5, "is_bot": true, "first_name": "OtherBot" },
            "text": "beep",
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert!(to_channel_event(&msg).is_none());
    }

    #[test]
    fn commands_parse_with_and_without_mention() {
        assert_eq!(parse_command("/stats"), Some(BotCommand::Stats));
        assert_eq!(parse_command("/stats@turnwatch_bot"), Some(BotCommand::Stats));
        assert_eq!(parse_command("/teamstats"), Some(BotCommand::TeamStats));
        assert_eq!(parse_command("/unanswered"), Some(BotCommand::Unanswered));
        assert_eq!(parse_command("/start"), Some(BotCommand::Start));
        assert_eq!(
            parse_command("/add_employee @priya"),
            Some(BotCommand::AddEmployee("@priya".to_string()))
        );
        assert_eq!(
            parse_command("/remove_employee priya"),
            Some(BotCommand::RemoveEmployee("priya".to_string()))
        );
        // Missing argument still parses; the command layer answers with usage.
        assert_eq!(
            parse_command("/add_employee"),
            Some(BotCommand::AddEmployee(String::new()))
        );
        assert_eq!(parse_command("/unknown"), None);
        assert_eq!(parse_command("not a command"), None);
    }

    #[test]
    fn command_in_a_group_becomes_a_command_request() {
        let msg = make_group_message(7, "/stats@turnwatch_bot", None);
        let Some(ChannelEvent::Command(req)) = to_channel_event(&msg) else {
            panic!("expected a command");
        };
        assert_eq!(req.command, BotCommand::Stats);
        assert_eq!(req.conversation_id, -1001234567890);
        assert_eq!(req.sender_id, 7);
    }

    #[test]
    fn command_in_a_dm_is_accepted_too() {
        let msg = make_private_message(7, "/stats");
        let Some(ChannelEvent::Command(req)) = to_channel_event(&msg) else {
            panic!("expected a command");
        };
        assert_eq!(req.command, BotCommand::Stats);
        assert_eq!(req.conversation_id, 7);
    }
}
