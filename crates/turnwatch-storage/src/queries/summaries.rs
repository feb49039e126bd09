// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily per-user activity rollups.
//!
//! A rollup row is never edited incrementally. [`rebuild_for_date`] deletes
//! the day and recomputes it from the message log and the metrics table, so
//! re-running the aggregation for the same day always converges on the same
//! rows. Turn counts come from the `turn_id` back-references on messages,
//! which outlive the turn rows themselves.

use rusqlite::params;

use turnwatch_core::{DailySummary, TurnwatchError};

use crate::database::Database;

/// Recompute every user's rollup for one calendar date (UTC, `YYYY-MM-DD`).
pub async fn rebuild_for_date(db: &Database, date: &str) -> Result<(), TurnwatchError> {
    let date = date.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM daily_summaries WHERE date = ?1", params![date])?;
            tx.execute(
                "INSERT INTO daily_summaries
                 (user_id, date, message_count, avg_response_secs, turns_initiated, turns_answered)
                 SELECT sender_id, ?1, COUNT(*), 0.0, COUNT(DISTINCT turn_id), 0
                 FROM messages
                 WHERE DATE(sent_at, 'unixepoch') = ?1
                 GROUP BY sender_id",
                params![date],
            )?;
            // Reply-side figures merge into the rows above; a responder with
            // no message that day (possible after roster edits) still gets a
            // row of their own.
            tx.execute(
                "INSERT INTO daily_summaries
                 (user_id, date, message_count, avg_response_secs, turns_initiated, turns_answered)
                 SELECT responder_id, ?1, 0, AVG(duration_secs), 0, COUNT(*)
                 FROM response_metrics
                 WHERE DATE(recorded_at, 'unixepoch') = ?1
                 GROUP BY responder_id
                 ON CONFLICT(user_id, date) DO UPDATE SET
                     avg_response_secs = excluded.avg_response_secs,
                     turns_answered = excluded.turns_answered",
                params![date],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Rollup rows for one date.
pub async fn list_for_date(db: &Database, date: &str) -> Result<Vec<DailySummary>, TurnwatchError> {
    let date = date.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, date, message_count, avg_response_secs,
                        turns_initiated, turns_answered
                 FROM daily_summaries WHERE date = ?1 ORDER BY user_id",
            )?;
            let rows = stmt.query_map(params![date], summary_from_row)?;
            let mut summaries = Vec::new();
            for row in rows {
                summaries.push(row?);
            }
            Ok(summaries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Per-user totals across all rollups since a date (inclusive). The average
/// response time is weighted by each day's answered-turn count.
pub async fn team_summary(
    db: &Database,
    since_date: &str,
) -> Result<Vec<DailySummary>, TurnwatchError> {
    let since_date = since_date.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, MIN(date), SUM(message_count),
                        SUM(avg_response_secs * turns_answered), SUM(turns_initiated),
                        SUM(turns_answered)
                 FROM daily_summaries WHERE date >= ?1
                 GROUP BY user_id
                 ORDER BY SUM(message_count) DESC",
            )?;
            let rows = stmt.query_map(params![since_date], |row| {
                let weighted: f64 = row.get(3)?;
                let turns_answered: i64 = row.get(5)?;
                Ok(DailySummary {
                    user_id: row.get(0)?,
                    date: row.get(1)?,
                    message_count: row.get(2)?,
                    avg_response_secs: if turns_answered > 0 {
                        weighted / turns_answered as f64
                    } else {
                        0.0
                    },
                    turns_initiated: row.get(4)?,
                    turns_answered,
                })
            })?;
            let mut summaries = Vec::new();
            for row in rows {
                summaries.push(row?);
            }
            Ok(summaries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailySummary> {
    Ok(DailySummary {
        user_id: row.get(0)?,
        date: row.get(1)?,
        message_count: row.get(2)?,
        avg_response_secs: row.get(3)?,
        turns_initiated: row.get(4)?,
        turns_answered: row.get(5)?,
    })
}
