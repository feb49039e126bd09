// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `turnwatch serve` command implementation.
//!
//! Wires the Telegram transport, the SQLite store, the turn engine, and the
//! background jobs together, then runs the inbound event loop until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use turnwatch_config::model::TurnwatchConfig;
use turnwatch_core::{ChannelEvent, EventSource, Notifier, NotifyTarget, TurnwatchError};
use turnwatch_engine::{EmployeeRegistry, EnginePolicy, Ingest, TurnEngine};
use turnwatch_storage::Database;
use turnwatch_tasks::{DailyAggregator, EscalationScanner};
use turnwatch_telegram::TelegramChannel;

use crate::commands::CommandContext;
use crate::shutdown;

pub async fn run_serve(config: TurnwatchConfig) -> Result<(), TurnwatchError> {
    init_tracing(&config.service.log_level);

    info!("starting turnwatch serve");

    let db = Database::open(&config.storage.database_path).await?;

    let registry = Arc::new(EmployeeRegistry::load(&db).await?);
    if registry.is_empty() {
        warn!("employee roster is empty; every sender will be tracked as a partner");
    } else {
        info!(employees = registry.len(), "employee roster loaded");
    }

    let mut channel = TelegramChannel::new(&config.telegram).map_err(|e| {
        error!(error = %e, "failed to initialize Telegram channel");
        eprintln!("error: Telegram bot token required. Set telegram.bot_token or TURNWATCH_TELEGRAM_BOT_TOKEN.");
        e
    })?;
    channel.connect().await?;
    let channel = Arc::new(channel);
    let notifier: Arc<dyn Notifier> = channel.clone();

    let engine = TurnEngine::new(
        db.clone(),
        registry.clone(),
        EnginePolicy {
            turn_timeout_secs: config.tracker.turn_timeout_secs,
            slow_response_threshold_secs: config.tracker.slow_response_threshold_secs,
            slow_response_alerts: config.tracker.slow_response_alerts,
        },
    );

    let commands = CommandContext {
        db: db.clone(),
        registry: registry.clone(),
        notifier: notifier.clone(),
        admin_chat_id: config.telegram.admin_chat_id,
    };

    let cancel = shutdown::install_signal_handler();

    // Escalation scanner.
    {
        let scanner = EscalationScanner::new(
            db.clone(),
            notifier.clone(),
            config.tracker.escalation_threshold_secs,
            config.tracker.overdue_batch_size,
            Duration::from_millis(config.tracker.notify_pause_ms),
            Duration::from_secs(config.tracker.scan_interval_secs),
        );
        let scan_cancel = cancel.clone();
        tokio::spawn(async move { scanner.run(scan_cancel).await });
        info!(
            interval_secs = config.tracker.scan_interval_secs,
            threshold_secs = config.tracker.escalation_threshold_secs,
            "escalation scanner started"
        );
    }

    // Daily rollup aggregator.
    {
        let aggregator = DailyAggregator::new(
            db.clone(),
            Duration::from_secs(config.tracker.summary_interval_secs),
        );
        let agg_cancel = cancel.clone();
        tokio::spawn(async move { aggregator.run(agg_cancel).await });
        info!(
            interval_secs = config.tracker.summary_interval_secs,
            "daily aggregator started"
        );
    }

    // Inbound event loop.
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = channel.next_event() => {
                match event {
                    Ok(ChannelEvent::Message(inbound)) => {
                        match engine.process_event(&inbound).await {
                            Ok(Ingest::Recorded { notifications, .. }) => {
                                for request in notifications {
                                    // Already committed; a failed alert is
                                    // logged and dropped.
                                    if let Err(e) = notifier
                                        .notify(request.target, &request.text, request.reference)
                                        .await
                                    {
                                        warn!(error = %e, "alert delivery failed");
                                    }
                                }
                            }
                            Ok(Ingest::Duplicate) => {}
                            Err(e) => {
                                // Fatal for this event only; the loop goes on.
                                error!(
                                    error = %e,
                                    conversation_id = inbound.conversation_id,
                                    message_id = inbound.message_id,
                                    "failed to record inbound message"
                                );
                                let report = format!(
                                    "Failed to record message {} in chat {}: {e}",
                                    inbound.message_id, inbound.conversation_id
                                );
                                if let Err(e) =
                                    notifier.notify(NotifyTarget::Admin, &report, None).await
                                {
                                    warn!(error = %e, "operator report failed");
                                }
                            }
                        }
                    }
                    Ok(ChannelEvent::Command(request)) => {
                        let now = chrono::Utc::now().timestamp();
                        commands.execute(&request, now).await;
                    }
                    Err(e) => {
                        error!(error = %e, "inbound channel failed");
                        return Err(e);
                    }
                }
            }
        }
    }

    db.close().await?;
    info!("turnwatch serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("turnwatch={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
