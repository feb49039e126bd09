// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot command handling: reporting queries and roster management.
//!
//! Commands are answered in the chat they were issued from. Store failures
//! while answering are logged and reported to the user; they never take the
//! service down.

use std::sync::Arc;

use chrono::{Days, Utc};
use tracing::warn;

use turnwatch_core::{
    BotCommand, CommandRequest, EmployeeRecord, MessageRef, Notifier, NotifyTarget,
    TurnwatchError, format_elapsed,
};
use turnwatch_engine::EmployeeRegistry;
use turnwatch_storage::{Database, queries};

const STATS_WINDOW_DAYS: u64 = 7;
const UNANSWERED_LIMIT: usize = 10;

pub struct CommandContext {
    pub db: Database,
    pub registry: Arc<EmployeeRegistry>,
    pub notifier: Arc<dyn Notifier>,
    /// Chat allowed to manage the roster and view team statistics. `None`
    /// disables those commands.
    pub admin_chat_id: Option<i64>,
}

impl CommandContext {
    /// Handle one command and deliver the reply into the originating chat.
    pub async fn execute(&self, req: &CommandRequest, now: i64) {
        let reply = match self.handle(req, now).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, command = ?req.command, "command failed");
                "Sorry, that is temporarily unavailable. Please try again later.".to_string()
            }
        };
        if let Err(e) = self
            .notifier
            .notify(NotifyTarget::Conversation(req.conversation_id), &reply, None)
            .await
        {
            warn!(error = %e, conversation_id = req.conversation_id, "command reply failed");
        }
    }

    async fn handle(&self, req: &CommandRequest, now: i64) -> Result<String, TurnwatchError> {
        match &req.command {
            BotCommand::Start => Ok("\
Turnwatch tracks how quickly your team answers messages in this chat.\n\
Commands:\n\
/stats - your response stats for the last 7 days\n\
/teamstats - team totals for the last 7 days (operator channel only)\n\
/unanswered - currently unanswered messages\n\
/add_employee <@username or id> - add a responder (operator channel only)\n\
/remove_employee <@username or id> - remove a responder"
                .to_string()),
            BotCommand::Stats => self.personal_stats(req, now).await,
            BotCommand::TeamStats => self.team_stats(req).await,
            BotCommand::Unanswered => self.unanswered(now).await,
            BotCommand::AddEmployee(arg) => self.add_employee(req, arg, now).await,
            BotCommand::RemoveEmployee(arg) => self.remove_employee(req, arg).await,
        }
    }

    async fn personal_stats(&self, req: &CommandRequest, now: i64) -> Result<String, TurnwatchError> {
        let since = now - (STATS_WINDOW_DAYS as i64) * 86_400;
        match queries::metrics::responder_stats(&self.db, req.sender_id, since).await? {
            Some((count, avg)) => Ok(format!(
                "{}: {} answered in the last {} days, average response time {}.",
                req.sender_name,
                plural(count, "message"),
                STATS_WINDOW_DAYS,
                format_elapsed(avg.round() as i64),
            )),
            None => Ok(format!(
                "{}: no answered messages recorded in the last {} days.",
                req.sender_name, STATS_WINDOW_DAYS,
            )),
        }
    }

    async fn team_stats(&self, req: &CommandRequest) -> Result<String, TurnwatchError> {
        if !self.is_operator_chat(req) {
            return Ok("Only the operator channel can view team statistics.".to_string());
        }
        let since = Utc::now() - Days::new(STATS_WINDOW_DAYS - 1);
        let since_date = since.format("%Y-%m-%d").to_string();
        let totals = queries::summaries::team_summary(&self.db, &since_date).await?;
        let roster = queries::employees::list_all(&self.db).await?;

        let mut lines = vec![format!("Team activity since {since_date}:")];
        let mut any = false;
        for row in &totals {
            if !self.registry.is_employee(row.user_id) {
                continue;
            }
            any = true;
            let name = roster
                .iter()
                .find(|e| e.user_id == row.user_id)
                .map(|e| e.display_name.clone())
                .unwrap_or_else(|| format!("user {}", row.user_id));
            let avg = if row.turns_answered > 0 {
                format!(", avg response {}", format_elapsed(row.avg_response_secs.round() as i64))
            } else {
                String::new()
            };
            lines.push(format!(
                "{name}: {}, {} answered{avg}",
                plural(row.message_count, "message"),
                row.turns_answered,
            ));
        }
        if !any {
            return Ok("No team activity recorded yet.".to_string());
        }
        Ok(lines.join("\n"))
    }

    async fn unanswered(&self, now: i64) -> Result<String, TurnwatchError> {
        let open = queries::turns::list_open_turns(&self.db).await?;
        if open.is_empty() {
            return Ok("Nothing is waiting for an answer. \u{1F389}".to_string());
        }
        let total = open.len();
        let mut lines = vec![format!("{} waiting for an answer:", plural(total as i64, "message"))];
        for turn in open.into_iter().take(UNANSWERED_LIMIT) {
            let name = queries::messages::last_known_name(&self.db, turn.partner_id)
                .await?
                .unwrap_or_else(|| format!("user {}", turn.partner_id));
            let link = turnwatch_telegram::format::message_link(MessageRef {
                conversation_id: turn.conversation_id,
                message_id: turn.last_message_id,
            })
            .map(|l| format!("\n{l}"))
            .unwrap_or_default();
            lines.push(format!(
                "{} - {name}: \"{}\"{link}",
                format_elapsed(turn.idle_secs(now)),
                snippet(&turn.last_message_text),
            ));
        }
        if total > UNANSWERED_LIMIT {
            lines.push(format!("...and {} more.", total - UNANSWERED_LIMIT));
        }
        Ok(lines.join("\n"))
    }

    async fn add_employee(
        &self,
        req: &CommandRequest,
        arg: &str,
        now: i64,
    ) -> Result<String, TurnwatchError> {
        if !self.is_operator_chat(req) {
            return Ok("Only the operator channel can manage the roster.".to_string());
        }
        if arg.trim().is_empty() {
            return Ok("Usage: /add_employee <@username or user id>".to_string());
        }
        let Some((user_id, display_name)) = self.resolve_user(arg).await? else {
            return Ok(format!(
                "I have not seen any messages from {} yet, so I cannot resolve them.",
                arg.trim()
            ));
        };
        queries::employees::add(
            &self.db,
            EmployeeRecord {
                user_id,
                display_name: display_name.clone(),
                added_by: req.sender_name.clone(),
                added_at: now,
            },
        )
        .await?;
        self.registry.refresh(&self.db).await?;
        Ok(format!("Added {display_name} to the employee roster."))
    }

    async fn remove_employee(&self, req: &CommandRequest, arg: &str) -> Result<String, TurnwatchError> {
        if !self.is_operator_chat(req) {
            return Ok("Only the operator channel can manage the roster.".to_string());
        }
        if arg.trim().is_empty() {
            return Ok("Usage: /remove_employee <@username or user id>".to_string());
        }
        let Some((user_id, display_name)) = self.resolve_user(arg).await? else {
            return Ok(format!("I could not resolve {}.", arg.trim()));
        };
        if queries::employees::remove(&self.db, user_id).await? {
            self.registry.refresh(&self.db).await?;
            Ok(format!("Removed {display_name} from the employee roster."))
        } else {
            Ok(format!("{display_name} is not on the roster."))
        }
    }

    fn is_operator_chat(&self, req: &CommandRequest) -> bool {
        self.admin_chat_id == Some(req.conversation_id)
    }

    /// Resolve a user id or `@username` argument to `(user_id, display name)`.
    async fn resolve_user(&self, arg: &str) -> Result<Option<(i64, String)>, TurnwatchError> {
        let arg = arg.trim();
        if let Ok(user_id) = arg.parse::<i64>() {
            let name = queries::messages::last_known_name(&self.db, user_id)
                .await?
                .unwrap_or_else(|| format!("user {user_id}"));
            return Ok(Some((user_id, name)));
        }
        queries::messages::resolve_user_by_username(&self.db, arg).await
    }
}

fn plural(count: i64, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= 80 {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(80).collect();
    format!("{cut}…")
}
