// src/bot/admin.rs - Moderator training loop: forwarded spam and report buttons

use std::sync::Arc;
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use regex::Regex;

use crate::bot::engine::ban_user_or_channel;
use crate::bot::{join_errors, Bot, Locator};
use crate::platforms::telegram::{
    CallbackQuery, EditMessageReplyMarkup, EditMessageText, InlineKeyboardButton,
    InlineKeyboardMarkup, SendMessage, TgMessage, TgRequest,
};
use crate::platforms::MessengerApi;
use crate::types::{Message, ParseMode, User, PERMANENT_BAN};

/// First line of the detection-results block appended to a report. The
/// clean-text extraction cuts at it, so the two must stay in sync.
const SPAM_RESULTS_MARKER: &str = "spam detection results:";

/// Everything the admin flow needs to know about the deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminConfig {
    /// The moderated chat.
    pub primary_chat_id: i64,
    /// The chat where reports land and moderators click buttons.
    pub admin_chat_id: i64,
    pub dry: bool,
    pub training_mode: bool,
    pub keep_user: bool,
}

/// What a report button press asks for, parsed from the callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// `?<id>`: first press of "change ban", swap in the confirmation keyboard.
    RequestConfirm,
    /// `+<id>`: the ban stands, treat the message as verified spam.
    KeepBanned,
    /// `!<id>`: append stored check results to the report.
    ShowInfo,
    /// bare `<id>`: lift the ban and treat the message as ham.
    Unban,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Callback {
    pub action: CallbackAction,
    pub user_id: i64,
}

impl Callback {
    /// Parse callback data of the form `^([?+!])?[0-9]+$`.
    pub fn parse(data: &str) -> Result<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"^([?+!])?([0-9]+)$").expect("valid callback regex"));

        let caps = re
            .captures(data)
            .with_context(|| format!("unexpected callback data {data:?}"))?;
        let user_id: i64 = caps[2]
            .parse()
            .with_context(|| format!("failed to parse user id from callback data {data:?}"))?;
        let action = match caps.get(1).map(|m| m.as_str()) {
            Some("?") => CallbackAction::RequestConfirm,
            Some("+") => CallbackAction::KeepBanned,
            Some("!") => CallbackAction::ShowInfo,
            _ => CallbackAction::Unban,
        };
        Ok(Self { action, user_id })
    }
}

/// Moderator interaction handler: consumes forwarded spam examples and the
/// button presses on ban reports, feeding the training loop.
pub struct AdminFlow {
    api: Arc<dyn MessengerApi>,
    bot: Arc<dyn Bot>,
    locator: Arc<Locator>,
    cfg: AdminConfig,
}

impl AdminFlow {
    pub fn new(
        api: Arc<dyn MessengerApi>,
        bot: Arc<dyn Bot>,
        locator: Arc<Locator>,
        cfg: AdminConfig,
    ) -> Self {
        Self { api, bot, locator, cfg }
    }

    /// Handle a message posted in the admin chat by a super user. A forward
    /// of a missed spam message trains the filter and bans the original
    /// author; anything else is regular chatter and is ignored.
    pub async fn handle_forwarded(&self, wire: &TgMessage) -> Result<()> {
        if wire.forward_sender_name.is_empty() && wire.forward_from.is_none() {
            return Ok(());
        }

        let msg_txt = wire.text.replace('\n', " ");
        debug!("forwarded message to admin chat {}: {msg_txt:?}", self.cfg.admin_chat_id);

        // the messenger hides the original sender of a forward, recover the
        // author through the locator by exact text
        let Some(info) = self.locator.message(&wire.text).await else {
            bail!("not found {:?} in locator", shrink(&wire.text, 50));
        };
        debug!("locator found message {info}");

        let mut errs = Vec::new();

        self.bot.remove_approved_users(&[info.user_id]).await;

        // fresh detection results for the report
        let resp = self
            .bot
            .on_message(Message {
                text: wire.text.clone(),
                from: User { id: info.user_id, ..Default::default() },
                ..Default::default()
            })
            .await;
        let checks: Vec<String> = resp.check_results.iter().map(|c| format!("- {c}")).collect();
        let spam_info = if checks.is_empty() {
            "**can't get spam info**".to_string()
        } else {
            checks.join("\n")
        };

        let report = format!(
            "**original detection results for {:?} ({})**\n\n{}\n\n\n*the user banned and message deleted*",
            info.user_name, info.user_id, spam_info
        );
        let send_result = self
            .api
            .send(TgRequest::SendMessage(SendMessage {
                chat_id: self.cfg.admin_chat_id,
                text: report,
                parse_mode: Some(ParseMode::Markdown),
                disable_web_page_preview: true,
                ..Default::default()
            }))
            .await;
        if let Err(err) = send_result {
            errs.push(anyhow::anyhow!("failed to send detection results to admin chat: {err}"));
        }

        if !self.cfg.dry {
            match self.bot.update_spam(&msg_txt).await {
                Ok(()) => info!("spam updated with {:?}", shrink(&wire.text, 50)),
                Err(err) => errs.push(anyhow::anyhow!("failed to update spam for {msg_txt:?}: {err}")),
            }
        }

        if self.cfg.dry || self.cfg.training_mode {
            return join_errors(errs);
        }

        match self
            .api
            .request(TgRequest::DeleteMessage {
                chat_id: self.cfg.primary_chat_id,
                message_id: info.msg_id,
            })
            .await
        {
            Ok(_) => info!("message {} deleted", info.msg_id),
            Err(err) => errs.push(anyhow::anyhow!("failed to delete message {}: {err}", info.msg_id)),
        }

        if let Err(err) = ban_user_or_channel(
            self.api.as_ref(),
            self.cfg.dry,
            self.cfg.training_mode,
            PERMANENT_BAN,
            self.cfg.primary_chat_id,
            info.user_id,
            0,
        )
        .await
        {
            errs.push(anyhow::anyhow!("failed to ban user {}: {err}", info.user_id));
        } else {
            info!("user {:?} ({}) banned", wire.forward_sender_name, info.user_id);
        }

        join_errors(errs)
    }

    /// Route a button press on a ban report. Callbacks from chats other
    /// than the admin chat are silently ignored.
    pub async fn handle_callback(&self, query: &CallbackQuery) -> Result<()> {
        let Some(message) = &query.message else {
            debug!("callback {:?} without a message, ignored", query.data);
            return Ok(());
        };
        let chat_id = message.chat.as_ref().map_or(0, |c| c.id);
        if chat_id != self.cfg.admin_chat_id {
            return Ok(());
        }

        let callback = Callback::parse(&query.data)?;
        match callback.action {
            CallbackAction::RequestConfirm => self.request_confirmation(message, callback.user_id).await,
            CallbackAction::KeepBanned => self.confirm_ban(query, message).await,
            CallbackAction::ShowInfo => self.show_spam_info(message, callback.user_id).await,
            CallbackAction::Unban => self.unban(query, message, callback.user_id).await,
        }
    }

    // swap the report keyboard for an explicit yes/no pair
    async fn request_confirmation(&self, message: &TgMessage, user_id: i64) -> Result<()> {
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                InlineKeyboardButton::new("Unban for real", user_id.to_string()),
                InlineKeyboardButton::new("Keep it banned", format!("+{user_id}")),
            ]],
        };
        self.api
            .send(TgRequest::EditMessageReplyMarkup(EditMessageReplyMarkup {
                chat_id: self.cfg.admin_chat_id,
                message_id: message.message_id,
                reply_markup: keyboard,
            }))
            .await
            .with_context(|| {
                format!(
                    "failed to make confirmation, chat {}, msg {}",
                    self.cfg.admin_chat_id, message.message_id
                )
            })?;
        debug!("unban confirmation sent for user {user_id}, msg {}", message.message_id);
        Ok(())
    }

    // the moderator confirmed the ban: clear the keyboard and record the
    // original text as a verified spam sample
    async fn confirm_ban(&self, query: &CallbackQuery, message: &TgMessage) -> Result<()> {
        let upd_text = format!(
            "{}\n\n_ban confirmed by {} in {}_",
            message.text,
            query.from.username,
            elapsed_since(message.date)
        );
        self.api
            .send(TgRequest::EditMessageText(EditMessageText {
                chat_id: self.cfg.admin_chat_id,
                message_id: message.message_id,
                text: upd_text,
                parse_mode: Some(ParseMode::Markdown),
                reply_markup: Some(InlineKeyboardMarkup::default()),
            }))
            .await
            .with_context(|| {
                format!(
                    "failed to clear confirmation, chat {}, msg {}",
                    self.cfg.admin_chat_id, message.message_id
                )
            })?;

        let clean = clean_report_text(&message.text)?;
        self.bot
            .update_spam(&clean)
            .await
            .with_context(|| format!("failed to update spam for {clean:?}"))?;
        debug!("ban confirmed by {}, msg {}", query.from.username, message.message_id);
        Ok(())
    }

    // append the stored detection results and drop the info button
    async fn show_spam_info(&self, message: &TgMessage, user_id: i64) -> Result<()> {
        let mut checks = Vec::new();
        if user_id != 0 {
            if let Some(data) = self.locator.spam(user_id).await {
                for check in &data.checks {
                    checks.push(format!("- {check}"));
                }
            }
        }
        let spam_info = if checks.is_empty() {
            "**can't get spam info**".to_string()
        } else {
            checks.join("\n")
        };

        let upd_text = format!("{}\n\n**spam detection results**\n{spam_info}", message.text);
        let mut keyboard = message.reply_markup.clone().unwrap_or_default();
        if let Some(first_row) = keyboard.inline_keyboard.first_mut() {
            first_row.truncate(1);
        }

        self.api
            .send(TgRequest::EditMessageText(EditMessageText {
                chat_id: self.cfg.admin_chat_id,
                message_id: message.message_id,
                text: upd_text,
                parse_mode: Some(ParseMode::Markdown),
                reply_markup: Some(keyboard),
            }))
            .await
            .with_context(|| {
                format!(
                    "failed to add spam info, chat {}, msg {}",
                    self.cfg.admin_chat_id, message.message_id
                )
            })?;
        debug!("spam info sent for user {user_id}, msg {}", message.message_id);
        Ok(())
    }

    // lift the ban: the report text becomes a ham sample and the user is
    // approved so the filter skips them from now on
    async fn unban(&self, query: &CallbackQuery, message: &TgMessage, user_id: i64) -> Result<()> {
        debug!("unban activated for user {user_id}, msg {}", message.message_id);

        self.api
            .request(TgRequest::CallbackAnswer {
                callback_query_id: query.id.clone(),
                text: "accepted".to_string(),
            })
            .await
            .context("failed to send callback response")?;

        let clean = clean_report_text(&message.text)?;
        self.bot
            .update_ham(&clean)
            .await
            .with_context(|| format!("failed to update ham for {clean:?}"))?;

        if !self.cfg.training_mode {
            self.api
                .request(TgRequest::UnbanChatMember {
                    chat_id: self.cfg.primary_chat_id,
                    user_id,
                    only_if_banned: self.cfg.keep_user,
                })
                .await
                .with_context(|| format!("failed to unban user {user_id}"))?;
        }

        self.bot.add_approved_users(&[user_id]).await;

        let upd_text = format!(
            "{}\n\n_unbanned by {} in {}_",
            message.text,
            query.from.username,
            elapsed_since(message.date)
        );
        self.api
            .send(TgRequest::EditMessageText(EditMessageText {
                chat_id: self.cfg.admin_chat_id,
                message_id: message.message_id,
                text: upd_text,
                parse_mode: Some(ParseMode::Markdown),
                reply_markup: Some(InlineKeyboardMarkup::default()),
            }))
            .await
            .with_context(|| {
                format!(
                    "failed to edit message, chat {}, msg {}",
                    self.cfg.admin_chat_id, message.message_id
                )
            })?;
        Ok(())
    }

    /// Post a ban report to the admin chat with the change-ban and info
    /// buttons. Failures are logged, not propagated: reporting is best
    /// effort on the hot path.
    pub async fn report_ban(&self, ban_user: &str, msg: &Message) {
        debug!("report to admin chat, ban for {ban_user}, group {}", self.cfg.admin_chat_id);
        let text = escape_markdown(&msg.text).replace('\n', " ");
        let report = format!(
            "**permanently banned [{ban_user}](tg://user?id={})**\n\n{text}\n\n",
            msg.from.id
        );

        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                InlineKeyboardButton::new("⛔︎ change ban", format!("?{}", msg.from.id)),
                InlineKeyboardButton::new("⚑ info", format!("!{}", msg.from.id)),
            ]],
        };
        let send_result = self
            .api
            .send(TgRequest::SendMessage(SendMessage {
                chat_id: self.cfg.admin_chat_id,
                text: report,
                parse_mode: Some(ParseMode::Markdown),
                disable_web_page_preview: true,
                reply_markup: Some(keyboard),
                ..Default::default()
            }))
            .await;
        if let Err(err) = send_result {
            warn!("failed to send admin message, {err}");
        }
    }
}

/// Recover the original message text from a ban report: everything between
/// the title line and the detection-results block, flattened to one line.
pub fn clean_report_text(text: &str) -> Result<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < 2 {
        bail!("unexpected report message {text:?}");
    }

    let results_at = lines
        .iter()
        .position(|line| line.starts_with(SPAM_RESULTS_MARKER))
        .unwrap_or(lines.len());

    Ok(lines[1..results_at].join(" ").trim().to_string())
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = text.to_string();
    for symbol in ["_", "*", "`", "["] {
        escaped = escaped.replace(symbol, &format!("\\{symbol}"));
    }
    escaped
}

// human-oriented elapsed time since a unix timestamp, seconds resolution
fn elapsed_since(date: i64) -> String {
    let secs = (Utc::now().timestamp() - date).max(0);
    let (hours, mins, rest) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h{mins}m{rest}s")
    } else if mins > 0 {
        format!("{mins}m{rest}s")
    } else {
        format!("{rest}s")
    }
}

fn shrink(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::mocks::{MockApi, MockBot};
    use crate::platforms::telegram::TgChat;
    use crate::types::{CheckResult, Response};

    const ADMIN_CHAT: i64 = 200;
    const PRIMARY_CHAT: i64 = 100;

    fn flow(api: Arc<MockApi>, bot: Arc<MockBot>, locator: Arc<Locator>) -> AdminFlow {
        AdminFlow::new(
            api,
            bot,
            locator,
            AdminConfig {
                primary_chat_id: PRIMARY_CHAT,
                admin_chat_id: ADMIN_CHAT,
                ..Default::default()
            },
        )
    }

    fn admin_chat_message(text: &str) -> TgMessage {
        TgMessage {
            message_id: 5,
            chat: Some(TgChat { id: ADMIN_CHAT, ..Default::default() }),
            text: text.to_string(),
            date: Utc::now().timestamp(),
            ..Default::default()
        }
    }

    fn callback(data: &str, message: TgMessage) -> CallbackQuery {
        CallbackQuery {
            id: "cb1".to_string(),
            from: crate::platforms::telegram::TgUser {
                id: 7,
                username: "moderator".to_string(),
                ..Default::default()
            },
            message: Some(message),
            data: data.to_string(),
        }
    }

    #[test]
    fn callback_data_parses_into_actions() {
        assert_eq!(
            Callback::parse("?42").unwrap(),
            Callback { action: CallbackAction::RequestConfirm, user_id: 42 }
        );
        assert_eq!(
            Callback::parse("+42").unwrap(),
            Callback { action: CallbackAction::KeepBanned, user_id: 42 }
        );
        assert_eq!(
            Callback::parse("!42").unwrap(),
            Callback { action: CallbackAction::ShowInfo, user_id: 42 }
        );
        assert_eq!(
            Callback::parse("42").unwrap(),
            Callback { action: CallbackAction::Unban, user_id: 42 }
        );

        assert!(Callback::parse("").is_err());
        assert!(Callback::parse("?").is_err());
        assert!(Callback::parse("*42").is_err());
        assert!(Callback::parse("42x").is_err());
    }

    #[test]
    fn clean_report_text_cuts_title_and_results() {
        let report = "banned john\nhello world\nspam detection results:\n- bayes: true, x";
        assert_eq!(clean_report_text(report).unwrap(), "hello world");

        let report = "banned john\n\nhello world\n\n";
        assert_eq!(clean_report_text(report).unwrap(), "hello world");

        assert!(clean_report_text("single line").is_err());
    }

    #[test]
    fn elapsed_since_formats_units() {
        let now = Utc::now().timestamp();
        assert_eq!(elapsed_since(now), "0s");
        assert_eq!(elapsed_since(now - 59), "59s");
        assert_eq!(elapsed_since(now - 61), "1m1s");
        assert_eq!(elapsed_since(now - 3723), "1h2m3s");
    }

    #[tokio::test]
    async fn callback_from_other_chat_is_ignored() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot, Arc::new(Locator::default()));

        let mut message = admin_chat_message("whatever");
        message.chat = Some(TgChat { id: 999, ..Default::default() });
        admin.handle_callback(&callback("?42", message)).await.expect("ignored");

        assert!(api.sent().is_empty());
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn request_confirmation_swaps_keyboard() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot, Arc::new(Locator::default()));

        admin
            .handle_callback(&callback("?42", admin_chat_message("report text\nhello")))
            .await
            .expect("callback");

        let sent = api.sent();
        assert_eq!(sent.len(), 1);
        let TgRequest::EditMessageReplyMarkup(edit) = &sent[0] else {
            panic!("expected EditMessageReplyMarkup, got {:?}", sent[0]);
        };
        assert_eq!(edit.chat_id, ADMIN_CHAT);
        assert_eq!(edit.message_id, 5);
        let row = &edit.reply_markup.inline_keyboard[0];
        assert_eq!(row[0].text, "Unban for real");
        assert_eq!(row[0].callback_data, "42");
        assert_eq!(row[1].text, "Keep it banned");
        assert_eq!(row[1].callback_data, "+42");
    }

    #[tokio::test]
    async fn keep_banned_updates_spam_and_clears_keyboard() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot.clone(), Arc::new(Locator::default()));

        admin
            .handle_callback(&callback("+42", admin_chat_message("banned john\nhello world")))
            .await
            .expect("callback");

        assert_eq!(*bot.update_spam_calls.lock().unwrap(), ["hello world"]);

        let sent = api.sent();
        assert_eq!(sent.len(), 1);
        let TgRequest::EditMessageText(edit) = &sent[0] else {
            panic!("expected EditMessageText, got {:?}", sent[0]);
        };
        assert!(edit.text.contains("\n\n_ban confirmed by moderator in "));
        assert_eq!(edit.reply_markup, Some(InlineKeyboardMarkup::default()));
    }

    #[tokio::test]
    async fn show_info_appends_checks_and_trims_keyboard() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let locator = Arc::new(Locator::default());
        locator
            .add_spam(
                42,
                vec![CheckResult {
                    name: "bayes".to_string(),
                    spam: true,
                    details: "90%".to_string(),
                }],
            )
            .await;
        let admin = flow(api.clone(), bot, locator);

        let mut message = admin_chat_message("banned john\nhello world");
        message.reply_markup = Some(InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                InlineKeyboardButton::new("⛔︎ change ban", "?42"),
                InlineKeyboardButton::new("⚑ info", "!42"),
            ]],
        });

        admin.handle_callback(&callback("!42", message)).await.expect("callback");

        let sent = api.sent();
        let TgRequest::EditMessageText(edit) = &sent[0] else {
            panic!("expected EditMessageText, got {:?}", sent[0]);
        };
        assert!(edit.text.contains("**spam detection results**"));
        assert!(edit.text.contains("- bayes: true, 90%"));
        let keyboard = edit.reply_markup.as_ref().expect("keyboard expected");
        assert_eq!(keyboard.inline_keyboard[0].len(), 1);
        assert_eq!(keyboard.inline_keyboard[0][0].callback_data, "?42");
    }

    #[tokio::test]
    async fn show_info_without_stored_checks() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot, Arc::new(Locator::default()));

        admin
            .handle_callback(&callback("!42", admin_chat_message("banned john\nhello world")))
            .await
            .expect("callback");

        let sent = api.sent();
        let TgRequest::EditMessageText(edit) = &sent[0] else {
            panic!("expected EditMessageText, got {:?}", sent[0]);
        };
        assert!(edit.text.contains("**can't get spam info**"));
    }

    #[tokio::test]
    async fn unban_acks_trains_ham_and_lifts_ban() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot.clone(), Arc::new(Locator::default()));

        admin
            .handle_callback(&callback("42", admin_chat_message("banned john\nhello world")))
            .await
            .expect("callback");

        assert_eq!(*bot.update_ham_calls.lock().unwrap(), ["hello world"]);
        assert_eq!(*bot.added_users.lock().unwrap(), [vec![42]]);

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(
            &requests[0],
            TgRequest::CallbackAnswer { callback_query_id, text }
                if callback_query_id == "cb1" && text == "accepted"
        ));
        assert!(matches!(
            requests[1],
            TgRequest::UnbanChatMember { chat_id: PRIMARY_CHAT, user_id: 42, only_if_banned: false }
        ));

        let sent = api.sent();
        let TgRequest::EditMessageText(edit) = &sent[0] else {
            panic!("expected EditMessageText, got {:?}", sent[0]);
        };
        assert!(edit.text.contains("\n\n_unbanned by moderator in "));
        assert_eq!(edit.reply_markup, Some(InlineKeyboardMarkup::default()));
    }

    #[tokio::test]
    async fn unban_in_training_mode_skips_messenger_unban() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = AdminFlow::new(
            api.clone(),
            bot.clone(),
            Arc::new(Locator::default()),
            AdminConfig {
                primary_chat_id: PRIMARY_CHAT,
                admin_chat_id: ADMIN_CHAT,
                training_mode: true,
                ..Default::default()
            },
        );

        admin
            .handle_callback(&callback("42", admin_chat_message("banned john\nhello world")))
            .await
            .expect("callback");

        // only the ACK, no unban request
        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0], TgRequest::CallbackAnswer { .. }));
        assert_eq!(*bot.update_ham_calls.lock().unwrap(), ["hello world"]);
        assert_eq!(*bot.added_users.lock().unwrap(), [vec![42]]);
    }

    #[tokio::test]
    async fn forwarded_spam_trains_and_bans_original_author() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::with_response(Response {
            check_results: vec![CheckResult {
                name: "bayes".to_string(),
                spam: true,
                details: "90%".to_string(),
            }],
            ..Default::default()
        }));
        let locator = Arc::new(Locator::default());
        locator.add_message("buy viagra", PRIMARY_CHAT, 9, "eve", 42).await;
        let admin = flow(api.clone(), bot.clone(), locator);

        let mut wire = admin_chat_message("buy viagra");
        wire.forward_sender_name = "eve".to_string();
        admin.handle_forwarded(&wire).await.expect("forwarded");

        assert_eq!(*bot.removed_users.lock().unwrap(), [vec![9]]);
        assert_eq!(*bot.update_spam_calls.lock().unwrap(), ["buy viagra"]);
        // re-check ran against the original author
        assert_eq!(bot.on_message_calls.lock().unwrap()[0].from.id, 9);

        let sent = api.sent();
        let TgRequest::SendMessage(report) = &sent[0] else {
            panic!("expected SendMessage, got {:?}", sent[0]);
        };
        assert_eq!(report.chat_id, ADMIN_CHAT);
        assert!(report.text.contains(r#"original detection results for "eve" (9)"#));
        assert!(report.text.contains("- bayes: true, 90%"));
        assert!(report.text.contains("the user banned and message deleted"));

        let requests = api.requests();
        assert!(matches!(
            requests[0],
            TgRequest::DeleteMessage { chat_id: PRIMARY_CHAT, message_id: 42 }
        ));
        assert!(matches!(
            requests[1],
            TgRequest::RestrictChatMember { chat_id: PRIMARY_CHAT, user_id: 9, .. }
        ));
    }

    #[tokio::test]
    async fn forwarded_unknown_text_reports_locator_miss() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot, Arc::new(Locator::default()));

        let mut wire = admin_chat_message("never seen before");
        wire.forward_sender_name = "eve".to_string();
        let err = admin.handle_forwarded(&wire).await.expect_err("expected miss");
        assert!(err.to_string().contains("in locator"), "unexpected: {err}");
    }

    #[tokio::test]
    async fn forwarded_regular_message_is_ignored() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot.clone(), Arc::new(Locator::default()));

        admin.handle_forwarded(&admin_chat_message("just chatting")).await.expect("ignored");
        assert!(api.sent().is_empty());
        assert!(bot.on_message_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn forwarded_in_training_mode_skips_delete_and_ban() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let locator = Arc::new(Locator::default());
        locator.add_message("buy viagra", PRIMARY_CHAT, 9, "eve", 42).await;
        let admin = AdminFlow::new(
            api.clone(),
            bot.clone(),
            locator,
            AdminConfig {
                primary_chat_id: PRIMARY_CHAT,
                admin_chat_id: ADMIN_CHAT,
                training_mode: true,
                ..Default::default()
            },
        );

        let mut wire = admin_chat_message("buy viagra");
        wire.forward_sender_name = "eve".to_string();
        admin.handle_forwarded(&wire).await.expect("forwarded");

        // samples still update, no messenger side effects
        assert_eq!(*bot.update_spam_calls.lock().unwrap(), ["buy viagra"]);
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn report_ban_escapes_markdown_and_attaches_buttons() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot, Arc::new(Locator::default()));

        let msg = Message {
            text: "click [here]\nbuy *now* _cheap_ `stuff`".to_string(),
            from: User { id: 9, username: "eve".to_string(), ..Default::default() },
            ..Default::default()
        };
        admin.report_ban("eve", &msg).await;

        let sent = api.sent();
        let TgRequest::SendMessage(report) = &sent[0] else {
            panic!("expected SendMessage, got {:?}", sent[0]);
        };
        assert!(report.text.starts_with("**permanently banned [eve](tg://user?id=9)**\n\n"));
        assert!(report.text.contains(r"click \[here] buy \*now\* \_cheap\_ \`stuff\`"));

        let keyboard = report.reply_markup.as_ref().expect("keyboard expected");
        let row = &keyboard.inline_keyboard[0];
        assert_eq!(row[0].callback_data, "?9");
        assert_eq!(row[1].callback_data, "!9");
    }

    #[tokio::test]
    async fn report_round_trips_through_clean_text() {
        let (api, _updates) = MockApi::new();
        let api = Arc::new(api);
        let bot = Arc::new(MockBot::default());
        let admin = flow(api.clone(), bot, Arc::new(Locator::default()));

        let msg = Message {
            text: "suspicious offer\nwith a second line".to_string(),
            from: User { id: 9, username: "eve".to_string(), ..Default::default() },
            ..Default::default()
        };
        admin.report_ban("eve", &msg).await;

        let sent = api.sent();
        let TgRequest::SendMessage(report) = &sent[0] else {
            panic!("expected SendMessage, got {:?}", sent[0]);
        };
        assert_eq!(
            clean_report_text(&report.text).unwrap(),
            "suspicious offer with a second line"
        );
    }
}
