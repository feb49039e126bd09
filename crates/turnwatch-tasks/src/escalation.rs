// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic scan for turns that have waited too long for an answer.
//!
//! Each pass drains overdue turns in batches and posts one reminder per
//! turn into the conversation the question was asked in, linked back to the
//! waiting message. A turn is marked reminded only after its
//! reminder was delivered, so a crashed or failed pass retries the
//! remaining turns on the next tick instead of losing them.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use turnwatch_core::{
    MessageRef, Notifier, NotifyTarget, Turn, TurnwatchError, format_elapsed,
};
use turnwatch_storage::{Database, queries};

const SNIPPET_MAX_CHARS: usize = 120;

pub struct EscalationScanner {
    db: Database,
    notifier: Arc<dyn Notifier>,
    /// Seconds of partner inactivity before a turn is escalated.
    threshold_secs: i64,
    batch_size: i64,
    /// Pause between consecutive reminders, to stay under chat rate limits.
    notify_pause: Duration,
    interval: Duration,
}

impl EscalationScanner {
    pub fn new(
        db: Database,
        notifier: Arc<dyn Notifier>,
        threshold_secs: i64,
        batch_size: i64,
        notify_pause: Duration,
        interval: Duration,
    ) -> Self {
        Self { db, notifier, threshold_secs, batch_size, notify_pause, interval }
    }

    /// Scan until no overdue turns remain. Returns the number of reminders
    /// delivered.
    pub async fn run_once(&self, now: i64) -> Result<usize, TurnwatchError> {
        let mut delivered = 0usize;
        loop {
            let batch =
                queries::turns::scan_overdue(&self.db, now, self.threshold_secs, self.batch_size)
                    .await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            let mut batch_delivered = 0usize;
            for turn in batch {
                if self.remind(&turn, now).await? {
                    batch_delivered += 1;
                }
                if !self.notify_pause.is_zero() {
                    tokio::time::sleep(self.notify_pause).await;
                }
            }
            delivered += batch_delivered;
            // A short batch means the table is drained. A batch with zero
            // deliveries would come back identical on the next iteration,
            // so leave it for the next tick instead of spinning.
            if (batch_len as i64) < self.batch_size || batch_delivered == 0 {
                break;
            }
        }
        if delivered > 0 {
            info!(delivered, "escalation reminders sent");
        } else {
            debug!("escalation scan found nothing overdue");
        }
        Ok(delivered)
    }

    /// Send one reminder and mark the turn. Returns `false` when delivery
    /// failed; the turn stays unmarked and the next scan retries it.
    async fn remind(&self, turn: &Turn, now: i64) -> Result<bool, TurnwatchError> {
        let partner = queries::messages::last_known_name(&self.db, turn.partner_id)
            .await?
            .unwrap_or_else(|| format!("user {}", turn.partner_id));
        let text = format!(
            "Unanswered for {}: {} asked \"{}\"",
            format_elapsed(turn.idle_secs(now)),
            partner,
            snippet(&turn.last_message_text),
        );
        let reference = MessageRef {
            conversation_id: turn.conversation_id,
            message_id: turn.last_message_id,
        };
        if let Err(e) = self
            .notifier
            .notify(NotifyTarget::Conversation(turn.conversation_id), &text, Some(reference))
            .await
        {
            warn!(
                turn_id = turn.id,
                conversation_id = turn.conversation_id,
                error = %e,
                "escalation reminder failed, will retry next scan"
            );
            return Ok(false);
        }
        queries::turns::mark_reminded(&self.db, turn.id).await?;
        Ok(true)
    }

    /// Run scans on the configured interval until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately; skip it so a
        // restart does not double up with the scan the previous run just did.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("escalation scanner stopping");
                    return;
                }
                _ = ticker.tick() => {
                    let now = chrono::Utc::now().timestamp();
                    if let Err(e) = self.run_once(now).await {
                        warn!(error = %e, "escalation scan failed");
                    }
                }
            }
        }
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_MAX_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
    format!("{cut}…")
}
