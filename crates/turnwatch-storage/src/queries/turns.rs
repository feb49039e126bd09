// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Turn Store: all lifecycle transitions for open turns.
//!
//! This module is the single choke point for turn mutation; nothing else
//! inserts into or deletes from `turns`. The `*_tx` functions operate on an
//! open connection/transaction so the engine can compose them with message
//! and metric writes into one atomic unit per inbound event; the async
//! functions are the standalone store API used by the scanner and reports.

use rusqlite::{OptionalExtension, params};

use turnwatch_core::{Turn, TurnwatchError};

use crate::database::Database;

const TURN_COLUMNS: &str =
    "id, conversation_id, partner_id, last_message_id, last_message_text, \
     started_at, last_activity_at, reminded";

fn turn_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Turn> {
    Ok(Turn {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        partner_id: row.get(2)?,
        last_message_id: row.get(3)?,
        last_message_text: row.get(4)?,
        started_at: row.get(5)?,
        last_activity_at: row.get(6)?,
        reminded: row.get(7)?,
    })
}

// --- Transaction-scoped operations (composed by the engine) ---

/// Find the open turn for a key, if any.
pub fn find_open_turn_tx(
    conn: &rusqlite::Connection,
    conversation_id: i64,
    partner_id: i64,
) -> rusqlite::Result<Option<Turn>> {
    conn.query_row(
        &format!("SELECT {TURN_COLUMNS} FROM turns WHERE conversation_id = ?1 AND partner_id = ?2"),
        params![conversation_id, partner_id],
        turn_from_row,
    )
    .optional()
}

/// Find the most recently active open turn in a conversation, regardless of
/// partner. Used by reply resolution when no explicit reply link exists.
pub fn most_recent_open_turn_tx(
    conn: &rusqlite::Connection,
    conversation_id: i64,
) -> rusqlite::Result<Option<Turn>> {
    conn.query_row(
        &format!(
            "SELECT {TURN_COLUMNS} FROM turns WHERE conversation_id = ?1
             ORDER BY last_activity_at DESC, id DESC LIMIT 1"
        ),
        params![conversation_id],
        turn_from_row,
    )
    .optional()
}

/// Open a new turn for a key.
///
/// Returns `None` when an open turn already exists, since the UNIQUE key rejects
/// the insert rather than allowing two opens, and the caller decides whether
/// that is a conflict or an already-applied transition.
pub fn create_turn_tx(
    conn: &rusqlite::Connection,
    conversation_id: i64,
    partner_id: i64,
    message_id: i64,
    text: &str,
    now: i64,
) -> rusqlite::Result<Option<Turn>> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO turns
         (conversation_id, partner_id, last_message_id, last_message_text,
          started_at, last_activity_at, reminded)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5, 0)",
        params![conversation_id, partner_id, message_id, text, now],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    Ok(Some(Turn {
        id: conn.last_insert_rowid(),
        conversation_id,
        partner_id,
        last_message_id: message_id,
        last_message_text: text.to_string(),
        started_at: now,
        last_activity_at: now,
        reminded: false,
    }))
}

/// Extend an open turn with a new partner message.
///
/// Updates the last-message fields, bumps `last_activity_at`, and clears
/// `reminded` (a new message starts a fresh period of inactivity).
/// Returns `false` if the turn no longer exists.
pub fn extend_turn_tx(
    conn: &rusqlite::Connection,
    turn_id: i64,
    message_id: i64,
    text: &str,
    now: i64,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE turns SET last_message_id = ?2, last_message_text = ?3,
         last_activity_at = ?4, reminded = 0
         WHERE id = ?1",
        params![turn_id, message_id, text, now],
    )?;
    Ok(changed > 0)
}

/// Replace a stale turn: delete the old row and create a fresh one for the
/// same key in the same transaction, so no concurrent scan observes the key
/// without (or with two) turns.
pub fn replace_turn_tx(
    conn: &rusqlite::Connection,
    stale_turn_id: i64,
    conversation_id: i64,
    partner_id: i64,
    message_id: i64,
    text: &str,
    now: i64,
) -> rusqlite::Result<Turn> {
    conn.execute("DELETE FROM turns WHERE id = ?1", params![stale_turn_id])?;
    conn.execute(
        "INSERT INTO turns
         (conversation_id, partner_id, last_message_id, last_message_text,
          started_at, last_activity_at, reminded)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5, 0)",
        params![conversation_id, partner_id, message_id, text, now],
    )?;
    Ok(Turn {
        id: conn.last_insert_rowid(),
        conversation_id,
        partner_id,
        last_message_id: message_id,
        last_message_text: text.to_string(),
        started_at: now,
        last_activity_at: now,
        reminded: false,
    })
}

/// Close the open turn for a key, returning the deleted row so the caller
/// can compute the response metric. Idempotent: returns `None` when no turn
/// was open.
pub fn close_turn_tx(
    conn: &rusqlite::Connection,
    conversation_id: i64,
    partner_id: i64,
) -> rusqlite::Result<Option<Turn>> {
    let turn = find_open_turn_tx(conn, conversation_id, partner_id)?;
    if let Some(ref t) = turn {
        conn.execute("DELETE FROM turns WHERE id = ?1", params![t.id])?;
    }
    Ok(turn)
}

// --- Standalone store API ---

/// Find the open turn for a key, if any.
pub async fn find_open_turn(
    db: &Database,
    conversation_id: i64,
    partner_id: i64,
) -> Result<Option<Turn>, TurnwatchError> {
    db.connection()
        .call(move |conn| find_open_turn_tx(conn, conversation_id, partner_id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Open a new turn for a key; fails with [`TurnwatchError::Conflict`] if an
/// open turn already exists.
pub async fn create_turn(
    db: &Database,
    conversation_id: i64,
    partner_id: i64,
    message_id: i64,
    text: &str,
    now: i64,
) -> Result<Turn, TurnwatchError> {
    let text = text.to_string();
    db.connection()
        .call(move |conn| create_turn_tx(conn, conversation_id, partner_id, message_id, &text, now))
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or_else(|| TurnwatchError::Conflict {
            detail: format!("open turn already exists for ({conversation_id}, {partner_id})"),
        })
}

/// Extend an open turn with a new partner message.
pub async fn extend_turn(
    db: &Database,
    turn_id: i64,
    message_id: i64,
    text: &str,
    now: i64,
) -> Result<(), TurnwatchError> {
    let text = text.to_string();
    let extended = db
        .connection()
        .call(move |conn| extend_turn_tx(conn, turn_id, message_id, &text, now))
        .await
        .map_err(crate::database::map_tr_err)?;
    if !extended {
        return Err(TurnwatchError::Conflict {
            detail: format!("turn {turn_id} no longer exists"),
        });
    }
    Ok(())
}

/// Replace a stale turn atomically (delete + create in one transaction).
pub async fn replace_turn(
    db: &Database,
    stale_turn_id: i64,
    conversation_id: i64,
    partner_id: i64,
    message_id: i64,
    text: &str,
    now: i64,
) -> Result<Turn, TurnwatchError> {
    let text = text.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let turn = replace_turn_tx(
                &tx,
                stale_turn_id,
                conversation_id,
                partner_id,
                message_id,
                &text,
                now,
            )?;
            tx.commit()?;
            Ok(turn)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Close the open turn for a key and return it; `None` if no turn was open.
pub async fn close_turn(
    db: &Database,
    conversation_id: i64,
    partner_id: i64,
) -> Result<Option<Turn>, TurnwatchError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let turn = close_turn_tx(&tx, conversation_id, partner_id)?;
            tx.commit()?;
            Ok(turn)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Return up to `limit` turns whose partner has been silent longer than
/// `threshold_secs` and that have not been reminded yet, oldest first.
///
/// Re-invoking after [`mark_reminded`] yields a disjoint set, so callers can
/// drain overdue turns batch by batch.
pub async fn scan_overdue(
    db: &Database,
    now: i64,
    threshold_secs: i64,
    limit: i64,
) -> Result<Vec<Turn>, TurnwatchError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TURN_COLUMNS} FROM turns
                 WHERE reminded = 0 AND ?1 - last_activity_at > ?2
                 ORDER BY last_activity_at ASC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![now, threshold_secs, limit], turn_from_row)?;
            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a turn as reminded so subsequent scans skip it until the partner
/// sends again.
pub async fn mark_reminded(db: &Database, turn_id: i64) -> Result<(), TurnwatchError> {
    db.connection()
        .call(move |conn| {
            conn.execute("UPDATE turns SET reminded = 1 WHERE id = ?1", params![turn_id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All currently open turns, oldest activity first. Reporting only.
pub async fn list_open_turns(db: &Database) -> Result<Vec<Turn>, TurnwatchError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TURN_COLUMNS} FROM turns ORDER BY last_activity_at ASC"
            ))?;
            let rows = stmt.query_map([], turn_from_row)?;
            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            Ok(turns)
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
        let db_path = dir.path().join("turns.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_then_find_open_turn() {
        let (db, _dir) = setup_db().await;

        let turn = create_turn(&db, 100, 7, 1, "need help", 1_000).await.unwrap();
        assert_eq!(turn.conversation_id, 100);
        assert_eq!(turn.partner_id, 7);
        assert_eq!(turn.started_at, 1_000);
        assert_eq!(turn.last_activity_at, 1_000);
        assert!(!turn.reminded);

        let found = find_open_turn(&db, 100, 7).await.unwrap().unwrap();
        assert_eq!(found, turn);

        // Different key: nothing.
        assert!(find_open_turn(&db, 100, 8).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_create_for_same_key_is_a_conflict() {
        let (db, _dir) = setup_db().await;

        create_turn(&db, 100, 7, 1, "first", 1_000).await.unwrap();
        let err = create_turn(&db, 100, 7, 2, "second", 1_100).await.unwrap_err();
        assert!(matches!(err, TurnwatchError::Conflict { .. }));

        // The original turn is untouched.
        let open = find_open_turn(&db, 100, 7).await.unwrap().unwrap();
        assert_eq!(open.last_message_id, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn extend_updates_activity_and_clears_reminded() {
        let (db, _dir) = setup_db().await;

        let turn = create_turn(&db, 100, 7, 1, "first", 1_000).await.unwrap();
        mark_reminded(&db, turn.id).await.unwrap();

        extend_turn(&db, turn.id, 2, "second", 1_500).await.unwrap();

        let open = find_open_turn(&db, 100, 7).await.unwrap().unwrap();
        assert_eq!(open.id, turn.id, "extend keeps the same turn");
        assert_eq!(open.last_message_id, 2);
        assert_eq!(open.last_message_text, "second");
        assert_eq!(open.last_activity_at, 1_500);
        assert_eq!(open.started_at, 1_000, "started_at is preserved");
        assert!(!open.reminded, "extend clears the reminded flag");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replace_swaps_in_a_fresh_turn_for_the_key() {
        let (db, _dir) = setup_db().await;

        let stale = create_turn(&db, 100, 7, 1, "old", 1_000).await.unwrap();
        let fresh = replace_turn(&db, stale.id, 100, 7, 9, "new", 9_000).await.unwrap();
        assert_ne!(fresh.id, stale.id);
        assert_eq!(fresh.started_at, 9_000);

        // Exactly one turn for the key, and it is the fresh one.
        let open = find_open_turn(&db, 100, 7).await.unwrap().unwrap();
        assert_eq!(open, fresh);

        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_returns_the_turn_and_is_idempotent() {
        let (db, _dir) = setup_db().await;

        let turn = create_turn(&db, 100, 7, 1, "hello", 1_000).await.unwrap();

        let closed = close_turn(&db, 100, 7).await.unwrap().unwrap();
        assert_eq!(closed, turn);
        assert!(find_open_turn(&db, 100, 7).await.unwrap().is_none());

        // Closing again is a no-op, not an error.
        assert!(close_turn(&db, 100, 7).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn scan_overdue_orders_oldest_first_and_skips_reminded() {
        let (db, _dir) = setup_db().await;

        let oldest = create_turn(&db, 100, 1, 1, "a", 1_000).await.unwrap();
        let middle = create_turn(&db, 100, 2, 2, "b", 2_000).await.unwrap();
        let _fresh = create_turn(&db, 100, 3, 3, "c", 9_500).await.unwrap();

        // threshold 1000s at now=10_000: turns older than 9_000 qualify.
        let overdue = scan_overdue(&db, 10_000, 1_000, 100).await.unwrap();
        assert_eq!(
            overdue.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![oldest.id, middle.id]
        );

        // After marking the oldest, a re-scan yields a disjoint set.
        mark_reminded(&db, oldest.id).await.unwrap();
        let overdue = scan_overdue(&db, 10_000, 1_000, 100).await.unwrap();
        assert_eq!(overdue.iter().map(|t| t.id).collect::<Vec<_>>(), vec![middle.id]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn scan_overdue_respects_the_batch_limit() {
        let (db, _dir) = setup_db().await;

        for partner in 1..=5 {
            create_turn(&db, 100, partner, partner, "x", 1_000 + partner)
                .await
                .unwrap();
        }

        let batch = scan_overdue(&db, 10_000, 100, 2).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch[0].last_activity_at <= batch[1].last_activity_at);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn most_recent_open_turn_prefers_latest_activity() {
        let (db, _dir) = setup_db().await;

        create_turn(&db, 100, 1, 1, "a", 1_000).await.unwrap();
        let newer = create_turn(&db, 100, 2, 2, "b", 2_000).await.unwrap();
        // A turn in another conversation must not be considered.
        create_turn(&db, 200, 3, 3, "c", 5_000).await.unwrap();

        let found = db
            .connection()
            .call(|conn| most_recent_open_turn_tx(conn, 100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, newer.id);

        db.close().await.unwrap();
    }
}
