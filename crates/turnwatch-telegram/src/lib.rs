// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for turnwatch.
//!
//! Implements [`EventSource`] (long polling into an inbound queue) and
//! [`Notifier`] (plain-text sends with optional deep links) on top of
//! teloxide.

pub mod format;
pub mod handler;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Recipient};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use turnwatch_config::model::TelegramConfig;
use turnwatch_core::{
    ChannelEvent, EventSource, MessageRef, Notifier, NotifyTarget, TurnwatchError,
};

/// Telegram channel: one long-polling dispatcher feeding an inbound queue,
/// plus outbound notification delivery.
pub struct TelegramChannel {
    bot: Bot,
    admin_chat_id: Option<i64>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<ChannelEvent>>,
    inbound_tx: mpsc::Sender<ChannelEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Requires `telegram.bot_token` to be configured.
    pub fn new(config: &TelegramConfig) -> Result<Self, TurnwatchError> {
        let token = config
            .bot_token
            .as_deref()
            .ok_or_else(|| TurnwatchError::Config("telegram.bot_token is required".into()))?;
        if token.is_empty() {
            return Err(TurnwatchError::Config("telegram.bot_token cannot be empty".into()));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            admin_chat_id: config.admin_chat_id,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    fn resolve_target(&self, target: NotifyTarget) -> Result<ChatId, TurnwatchError> {
        match target {
            NotifyTarget::Conversation(id) => Ok(ChatId(id)),
            NotifyTarget::Admin => self.admin_chat_id.map(ChatId).ok_or_else(|| {
                TurnwatchError::Config("telegram.admin_chat_id is not configured".into())
            }),
        }
    }
}

#[async_trait]
impl EventSource for TelegramChannel {
    async fn connect(&mut self) -> Result<(), TurnwatchError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                async move {
                    match handler::to_channel_event(&msg) {
                        Some(event) => {
                            if tx.send(event).await.is_err() {
                                warn!("inbound queue closed, dropping message");
                            }
                        }
                        None => {
                            debug!(
                                chat_id = msg.chat.id.0,
                                msg_id = msg.id.0,
                                "ignoring untracked message"
                            );
                        }
                    }
                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {}) // Silently ignore non-message updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn next_event(&self) -> Result<ChannelEvent, TurnwatchError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| TurnwatchError::Channel {
            message: "Telegram inbound queue closed".into(),
            source: None,
        })
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn notify(
        &self,
        target: NotifyTarget,
        text: &str,
        reference: Option<MessageRef>,
    ) -> Result<(), TurnwatchError> {
        let chat_id = self.resolve_target(target)?;
        let body = format::with_link(text, reference);
        self.bot
            .send_message(Recipient::Id(chat_id), body)
            .await
            .map_err(|e| TurnwatchError::Channel {
                message: format!("failed to send notification: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>, admin: Option<i64>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            admin_chat_id: admin,
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(&config(None, None)).is_err());
        assert!(TelegramChannel::new(&config(Some(""), None)).is_err());
        assert!(TelegramChannel::new(&config(Some("123:abc"), None)).is_ok());
    }

    #[test]
    fn admin_target_requires_configuration() {
        let channel = TelegramChannel::new(&config(Some("123:abc"), None)).unwrap();
        assert!(channel.resolve_target(NotifyTarget::Admin).is_err());
        assert_eq!(
            channel.resolve_target(NotifyTarget::Conversation(-1009)).unwrap(),
            ChatId(-1009)
        );

        let channel = TelegramChannel::new(&config(Some("123:abc"), Some(777))).unwrap();
        assert_eq!(channel.resolve_target(NotifyTarget::Admin).unwrap(), ChatId(777));
    }
}
