// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic rebuild of the per-user daily activity rollups.
//!
//! Every tick recomputes today and yesterday (UTC). Yesterday is included
//! so replies that land shortly after midnight, and ticks that straddle the
//! day boundary, still converge on correct rows. Rebuilds are idempotent,
//! so overlapping work is harmless.

use std::time::Duration;

use chrono::{Days, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use turnwatch_core::TurnwatchError;
use turnwatch_storage::{Database, queries::summaries};

pub struct DailyAggregator {
    db: Database,
    interval: Duration,
}

impl DailyAggregator {
    pub fn new(db: Database, interval: Duration) -> Self {
        Self { db, interval }
    }

    /// Rebuild the rollups for one date (`YYYY-MM-DD`).
    pub async fn rebuild_date(&self, date: &str) -> Result<(), TurnwatchError> {
        summaries::rebuild_for_date(&self.db, date).await?;
        debug!(date, "daily rollup rebuilt");
        Ok(())
    }

    /// One scheduled pass: rebuild today and yesterday.
    pub async fn run_once(&self) -> Result<(), TurnwatchError> {
        let today = Utc::now();
        let yesterday = today - Days::new(1);
        self.rebuild_date(&yesterday.format("%Y-%m-%d").to_string()).await?;
        self.rebuild_date(&today.format("%Y-%m-%d").to_string()).await?;
        Ok(())
    }

    /// Run passes on the configured interval until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("daily aggregator stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        warn!(error = %e, "daily rollup rebuild failed");
                    }
                }
            }
        }
    }
}
