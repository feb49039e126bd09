// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram-specific text helpers.

use turnwatch_core::MessageRef;

// Supergroup and channel chat ids are the internal id negated and shifted
// below this offset. Basic groups sit between here and zero.
const SUPERGROUP_ID_OFFSET: i64 = 1_000_000_000_000;

/// Deep link to a message in a supergroup, `https://t.me/c/<id>/<msg>`.
///
/// The `/c/` form takes the supergroup's internal id. Private chats and
/// basic groups have no stable link form, so `None` is returned and callers
/// send the notification without one.
pub fn message_link(reference: MessageRef) -> Option<String> {
    if reference.conversation_id >= -SUPERGROUP_ID_OFFSET {
        return None;
    }
    let internal = -reference.conversation_id - SUPERGROUP_ID_OFFSET;
    Some(format!("https://t.me/c/{internal}/{}", reference.message_id))
}

/// Notification body with the deep link appended when one exists.
pub fn with_link(text: &str, reference: Option<MessageRef>) -> String {
    match reference.and_then(message_link) {
        Some(link) => format!("{text}\n{link}"),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supergroup_reference_links_without_the_prefix() {
        let link = message_link(MessageRef {
            conversation_id: -1001234567890,
            message_id: 42,
        });
        assert_eq!(link.as_deref(), Some("https://t.me/c/1234567890/42"));
    }

    #[test]
    fn non_supergroup_chats_have_no_link() {
        assert!(message_link(MessageRef { conversation_id: 12345, message_id: 1 }).is_none());
        assert!(message_link(MessageRef { conversation_id: -4567, message_id: 1 }).is_none());
        // A basic group that happens to start with the -100 digits.
        assert!(message_link(MessageRef { conversation_id: -1009, message_id: 1 }).is_none());
    }

    #[test]
    fn with_link_appends_on_its_own_line() {
        let reference = MessageRef { conversation_id: -1000000000009, message_id: 3 };
        assert_eq!(with_link("overdue", Some(reference)), "overdue\nhttps://t.me/c/9/3");
        assert_eq!(with_link("overdue", None), "overdue");
    }
}
