// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response-metric recording and per-responder statistics.

use rusqlite::params;

use turnwatch_core::{ResponseMetric, TurnwatchError};

use crate::database::Database;

/// Record a response metric. The primary key on
/// `(conversation_id, reply_message_id)` makes this idempotent: a redelivered
/// reply records nothing and the call reports `false`.
pub fn record_metric_tx(
    conn: &rusqlite::Connection,
    metric: &ResponseMetric,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO response_metrics
         (conversation_id, reply_message_id, original_message_id, responder_id,
          original_sender_id, duration_secs, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            metric.conversation_id,
            metric.reply_message_id,
            metric.original_message_id,
            metric.responder_id,
            metric.original_sender_id,
            metric.duration_secs,
            metric.recorded_at,
        ],
    )?;
    Ok(changed > 0)
}

/// Reply count and average response time for one responder since a cutoff.
/// Returns `None` when the responder has no recorded replies in the window.
pub async fn responder_stats(
    db: &Database,
    responder_id: i64,
    since: i64,
) -> Result<Option<(i64, f64)>, TurnwatchError> {
    db.connection()
        .call(move |conn| {
            let (count, avg): (i64, Option<f64>) = conn.query_row(
                "SELECT COUNT(*), AVG(duration_secs) FROM response_metrics
                 WHERE responder_id = ?1 AND recorded_at >= ?2",
                params![responder_id, since],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(avg.map(|avg| (count, avg)))
        })
        .await
        .map_err(crate::database::map_tr_err)
}
