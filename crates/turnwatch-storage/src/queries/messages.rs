// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log queries.
//!
//! Every processed chat event is appended here exactly once; the primary key
//! on `(conversation_id, message_id)` is what makes redelivered events
//! detectable. Rows also carry the `turn_id` back-reference so daily
//! aggregation can count turns after the turn rows themselves are gone.

use rusqlite::{OptionalExtension, params};

use turnwatch_core::{StoredMessage, TurnwatchError};

use crate::database::Database;

// --- Transaction-scoped operations ---

/// Append a message to the log. Returns `false` when the row already exists,
/// which identifies a redelivered event.
pub fn insert_message_tx(
    conn: &rusqlite::Connection,
    msg: &StoredMessage,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO messages
         (conversation_id, message_id, sender_id, sender_name, sender_username,
          text, sent_at, replied_to_message_id, is_from_employee, answered, turn_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            msg.conversation_id,
            msg.message_id,
            msg.sender_id,
            msg.sender_name,
            msg.sender_username,
            msg.text,
            msg.sent_at,
            msg.replied_to,
            msg.is_from_employee,
            msg.answered,
            msg.turn_id,
        ],
    )?;
    Ok(changed > 0)
}

/// Attach a message to the turn it opened or extended.
pub fn set_turn_ref_tx(
    conn: &rusqlite::Connection,
    conversation_id: i64,
    message_id: i64,
    turn_id: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE messages SET turn_id = ?3 WHERE conversation_id = ?1 AND message_id = ?2",
        params![conversation_id, message_id, turn_id],
    )?;
    Ok(())
}

/// Flag every message of a closed turn as answered.
pub fn mark_turn_answered_tx(conn: &rusqlite::Connection, turn_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE messages SET answered = 1 WHERE turn_id = ?1",
        params![turn_id],
    )?;
    Ok(())
}

/// Look up a single message by its key.
pub fn get_message_tx(
    conn: &rusqlite::Connection,
    conversation_id: i64,
    message_id: i64,
) -> rusqlite::Result<Option<StoredMessage>> {
    conn.query_row(
        "SELECT conversation_id, message_id, sender_id, sender_name, sender_username,
                text, sent_at, replied_to_message_id, is_from_employee, answered, turn_id
         FROM messages WHERE conversation_id = ?1 AND message_id = ?2",
        params![conversation_id, message_id],
        message_from_row,
    )
    .optional()
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        conversation_id: row.get(0)?,
        message_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_name: row.get(3)?,
        sender_username: row.get(4)?,
        text: row.get(5)?,
        sent_at: row.get(6)?,
        replied_to: row.get(7)?,
        is_from_employee: row.get(8)?,
        answered: row.get(9)?,
        turn_id: row.get(10)?,
    })
}

// --- Standalone store API ---

/// Look up a single message by its key.
pub async fn get_message(
    db: &Database,
    conversation_id: i64,
    message_id: i64,
) -> Result<Option<StoredMessage>, TurnwatchError> {
    db.connection()
        .call(move |conn| get_message_tx(conn, conversation_id, message_id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent display name a user was seen with, from the message log.
pub async fn last_known_name(
    db: &Database,
    user_id: i64,
) -> Result<Option<String>, TurnwatchError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT sender_name FROM messages WHERE sender_id = ?1
                 ORDER BY sent_at DESC LIMIT 1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve a chat username (without `@`) to the user id it was last seen
/// with. Used by the roster commands, which take usernames from operators.
pub async fn resolve_user_by_username(
    db: &Database,
    username: &str,
) -> Result<Option<(i64, String)>, TurnwatchError> {
    let username = username.trim_start_matches('@').to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT sender_id, sender_name FROM messages
                 WHERE sender_username = ?1 COLLATE NOCASE
                 ORDER BY sent_at DESC LIMIT 1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("messages.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn sample_message(message_id: i64) -> StoredMessage {
        StoredMessage {
            conversation_id: 100,
            message_id,
            sender_id: 7,
            sender_name: "Dana".to_string(),
            sender_username: Some("dana_k".to_string()),
            text: "when will the order ship?".to_string(),
            sent_at: 1_000,
            replied_to: None,
            is_from_employee: false,
            answered: false,
            turn_id: None,
        }
    }

    #[tokio::test]
    async fn insert_detects_redelivery() {
        let (db, _dir) = setup_db().await;

        let mut msg = sample_message(1);
        msg.replied_to = Some(900);
        let inserted = db
            .connection()
            .call({
                let msg = msg.clone();
                move |conn| insert_message_tx(conn, &msg)
            })
            .await
            .unwrap();
        assert!(inserted);

        // Same key again: not inserted, original row untouched.
        let mut dup = sample_message(1);
        dup.text = "different text".to_string();
        let inserted = db
            .connection()
            .call(move |conn| insert_message_tx(conn, &dup))
            .await
            .unwrap();
        assert!(!inserted);

        let stored = get_message(&db, 100, 1).await.unwrap().unwrap();
        assert_eq!(stored.text, "when will the order ship?");
        assert_eq!(stored.replied_to, Some(900));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn turn_ref_and_answered_flags() {
        let (db, _dir) = setup_db().await;

        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                insert_message_tx(conn, &sample_message(1))?;
                insert_message_tx(conn, &sample_message(2))?;
                set_turn_ref_tx(conn, 100, 1, 42)?;
                set_turn_ref_tx(conn, 100, 2, 42)?;
                mark_turn_answered_tx(conn, 42)?;
                Ok(())
            })
            .await
            .unwrap();

        for message_id in [1, 2] {
            let msg = get_message(&db, 100, message_id).await.unwrap().unwrap();
            assert_eq!(msg.turn_id, Some(42));
            assert!(msg.answered);
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn username_resolution_is_case_insensitive_and_latest_wins() {
        let (db, _dir) = setup_db().await;

        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                let mut early = sample_message(1);
                early.sender_name = "D.".to_string();
                insert_message_tx(conn, &early)?;
                let mut late = sample_message(2);
                late.sent_at = 2_000;
                insert_message_tx(conn, &late)?;
                Ok(())
            })
            .await
            .unwrap();

        let (user_id, name) = resolve_user_by_username(&db, "@Dana_K")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user_id, 7);
        assert_eq!(name, "Dana");

        assert!(resolve_user_by_username(&db, "nobody").await.unwrap().is_none());

        assert_eq!(last_known_name(&db, 7).await.unwrap().as_deref(), Some("Dana"));
        assert!(last_known_name(&db, 99).await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
