// src/bot/engine.rs - Main event loop: update stream in, moderation actions out

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc};

use crate::bot::admin::{AdminConfig, AdminFlow};
use crate::bot::{join_errors, Bot, Locator, SpamLogger, SuperUsers};
use crate::platforms::telegram::{
    ChatPermissions, SendMessage, TgMessage, TgRequest, Update, UpdateConfig,
};
use crate::platforms::{transform::transform, MessengerApi};
use crate::types::{Message, ParseMode, Response, SenderChat};

const UPDATES_TIMEOUT_SEC: u64 = 60;
const SUBMIT_BUFFER: usize = 100;
const DEFAULT_IDLE: Duration = Duration::from_secs(30);

/// Engine knobs, all deployment-level.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Moderated group: numeric chat ID or public group username without `@`.
    pub group: String,
    /// Admin group, same format as `group`; empty disables admin reporting.
    pub admin_group: String,
    /// Idle handler interval; zero means the 30 s default.
    pub idle_duration: Duration,
    pub super_users: SuperUsers,
    /// Extra chat IDs processed as if they were the moderated group.
    pub testing_ids: Vec<i64>,
    pub startup_msg: String,
    pub no_spam_reply: bool,
    pub training_mode: bool,
    pub dry: bool,
    pub keep_user: bool,
}

/// Handle for ad-hoc outbound messages to the moderated chat. Sends block
/// while the engine's buffer is full.
#[derive(Clone)]
pub struct Submitter {
    tx: mpsc::Sender<Response>,
}

impl Submitter {
    pub async fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(Response { send: true, text: text.into(), ..Default::default() })
            .await
            .map_err(|_| anyhow!("submit channel closed"))
    }

    pub async fn submit_html(&self, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(Response {
                send: true,
                text: text.into(),
                parse_mode: Some(ParseMode::Html),
                ..Default::default()
            })
            .await
            .map_err(|_| anyhow!("submit channel closed"))
    }
}

/// Consumes the messenger update stream, routes every update through the
/// spam filter or the admin flow and performs the resulting ban, delete and
/// report actions. `run` is the blocking entry point.
pub struct EventEngine {
    api: Arc<dyn MessengerApi>,
    bot: Arc<dyn Bot>,
    spam_logger: Arc<dyn SpamLogger>,
    locator: Arc<Locator>,
    config: EngineConfig,
    submit_tx: mpsc::Sender<Response>,
    submit_rx: Option<mpsc::Receiver<Response>>,
    chat_id: i64,
    admin_chat_id: i64,
}

impl EventEngine {
    pub fn new(
        api: Arc<dyn MessengerApi>,
        bot: Arc<dyn Bot>,
        spam_logger: Arc<dyn SpamLogger>,
        locator: Arc<Locator>,
        config: EngineConfig,
    ) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel(SUBMIT_BUFFER);
        Self {
            api,
            bot,
            spam_logger,
            locator,
            config,
            submit_tx,
            submit_rx: Some(submit_rx),
            chat_id: 0,
            admin_chat_id: 0,
        }
    }

    /// Producer handle for ad-hoc messages, valid before and during `run`.
    pub fn submitter(&self) -> Submitter {
        Submitter { tx: self.submit_tx.clone() }
    }

    /// Process all events until shutdown or a dead update stream.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!("start listener for group {:?}", self.config.group);
        if self.config.training_mode {
            warn!("training mode, no bans");
        }

        self.chat_id = self
            .get_chat_id(&self.config.group)
            .await
            .with_context(|| format!("failed to get chat ID for group {:?}", self.config.group))?;

        if let Err(err) = self.update_supers().await {
            warn!("failed to update superusers: {err}");
        }

        if !self.config.admin_group.is_empty() {
            self.admin_chat_id = self.get_chat_id(&self.config.admin_group).await.with_context(
                || format!("failed to get chat ID for admin group {:?}", self.config.admin_group),
            )?;
            info!("admin chat ID: {}", self.admin_chat_id);
        }

        if self.config.idle_duration.is_zero() {
            self.config.idle_duration = DEFAULT_IDLE;
        }

        if !self.config.startup_msg.is_empty() && !self.config.training_mode && !self.config.dry {
            let startup = Response {
                send: true,
                text: self.config.startup_msg.clone(),
                ..Default::default()
            };
            if let Err(err) = self.send_response(startup, self.chat_id).await {
                warn!("failed to send startup message, {err}");
            }
        }

        let admin = AdminFlow::new(
            self.api.clone(),
            self.bot.clone(),
            self.locator.clone(),
            AdminConfig {
                primary_chat_id: self.chat_id,
                admin_chat_id: self.admin_chat_id,
                dry: self.config.dry,
                training_mode: self.config.training_mode,
                keep_user: self.config.keep_user,
            },
        );

        let mut updates = self
            .api
            .get_updates_chan(UpdateConfig { offset: 0, timeout: UPDATES_TIMEOUT_SEC })
            .await;
        let mut submit_rx = self.submit_rx.take().context("engine already running")?;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("listener stopped");
                    return Err(anyhow!("shutdown requested"));
                }

                maybe_update = updates.recv() => {
                    let Some(update) = maybe_update else {
                        bail!("update chan closed");
                    };
                    if let Err(err) = self.process_update(&admin, &update).await {
                        warn!("failed to process update: {err}");
                    }
                }

                Some(resp) = submit_rx.recv() => {
                    if let Err(err) = self.send_response(resp, self.chat_id).await {
                        warn!("failed to send submitted message, {err}");
                    }
                }

                _ = tokio::time::sleep(self.config.idle_duration) => {
                    let resp = self.bot.on_message(Message {
                        text: "idle".to_string(),
                        ..Default::default()
                    }).await;
                    if let Err(err) = self.send_response(resp, self.chat_id).await {
                        warn!("failed to respond on idle, {err}");
                    }
                }
            }
        }
    }

    async fn process_update(&self, admin: &AdminFlow, update: &Update) -> Result<()> {
        if let Some(query) = &update.callback_query {
            if let Err(err) = admin.handle_callback(query).await {
                warn!("failed to process callback: {err}");
                let notice = Response { send: true, text: format!("error: {err}"), ..Default::default() };
                let _ = self.send_response(notice, self.admin_chat_id).await;
            }
            return Ok(());
        }

        let Some(wire) = &update.message else {
            return Ok(());
        };
        if wire.chat.is_none() {
            debug!("ignoring message not from chat");
            return Ok(());
        }
        if let Ok(dump) = serde_json::to_string(wire) {
            debug!("{dump}");
        }

        let msg = transform(wire);
        let from_chat = msg.chat_id;

        // moderator feedback arrives in the admin chat
        if self.is_admin_chat(from_chat, &msg.from.username) {
            if let Err(err) = admin.handle_forwarded(wire).await {
                warn!("failed to process admin chat message: {err}");
            }
            return Ok(());
        }

        if !self.is_chat_allowed(from_chat) {
            return Ok(());
        }
        if msg.text.trim().is_empty() {
            return Ok(());
        }

        debug!("incoming msg: {:?}", msg.text.replace('\n', " "));
        self.locator
            .add_message(&wire.text, from_chat, msg.from.id, &msg.from.username, msg.id)
            .await;

        let resp = self.bot.on_message(msg.clone()).await;

        if resp.send && !self.config.no_spam_reply && !self.config.training_mode {
            if let Err(err) = self.send_response(resp.clone(), from_chat).await {
                warn!("failed to respond on update, {err}");
            }
        }

        let mut errs = Vec::new();

        // ban if requested by the filter
        if resp.send && !resp.ban_interval.is_zero() {
            debug!("ban initiated for {:?}", resp);
            self.spam_logger.save(&msg, &resp);
            self.locator.add_spam(msg.from.id, resp.check_results.clone()).await;
            let ban_user = self.ban_username(&resp, wire);

            if self.config.super_users.is_super(&msg.from.username) {
                // exempt from ban, but training mode still wants the report
                if self.config.training_mode {
                    admin.report_ban(&ban_user, &msg).await;
                }
                debug!("superuser {ban_user} requested ban, ignored");
                return Ok(());
            }

            match ban_user_or_channel(
                self.api.as_ref(),
                self.config.dry,
                self.config.training_mode,
                resp.ban_interval,
                from_chat,
                resp.user.id,
                resp.channel_id,
            )
            .await
            {
                Ok(()) => {
                    info!("{ban_user} banned by bot for {:?}", resp.ban_interval);
                    if self.admin_chat_id != 0 && msg.from.id != 0 {
                        admin.report_ban(&ban_user, &msg).await;
                    }
                }
                Err(err) => errs.push(anyhow!("failed to ban {ban_user}: {err}")),
            }
        }

        // delete the message if requested by the filter
        if resp.delete_reply_to
            && resp.reply_to != 0
            && !self.config.dry
            && !self.config.training_mode
            && !self.config.super_users.is_super(&msg.from.username)
        {
            if let Err(err) = self
                .api
                .request(TgRequest::DeleteMessage { chat_id: self.chat_id, message_id: resp.reply_to })
                .await
            {
                errs.push(anyhow!("failed to delete message {}: {err}", resp.reply_to));
            }
        }

        join_errors(errs)
    }

    fn is_chat_allowed(&self, from_chat: i64) -> bool {
        from_chat == self.chat_id || self.config.testing_ids.contains(&from_chat)
    }

    fn is_admin_chat(&self, from_chat: i64, from_user: &str) -> bool {
        if from_chat != self.admin_chat_id || self.admin_chat_id == 0 {
            return false;
        }
        debug!("message in admin chat {from_chat}, from {from_user}");
        if !self.config.super_users.is_super(from_user) {
            debug!("{from_user} is not superuser in admin chat, ignored");
            return false;
        }
        true
    }

    // display name for ban logs and reports; for channel bans prefer the
    // sender chat, falling back to the reply-to message's sender chat
    fn ban_username(&self, resp: &Response, wire: &TgMessage) -> String {
        if resp.channel_id == 0 {
            return resp.user.to_string();
        }

        let mut chat = SenderChat { id: resp.channel_id, ..Default::default() };
        if let Some(sender_chat) = &wire.sender_chat {
            chat.username = sender_chat.username.clone();
        }
        if chat.username.is_empty() {
            if let Some(reply_chat) = wire.reply_to_message.as_ref().and_then(|r| r.sender_chat.as_ref()) {
                chat.username = reply_chat.username.clone();
            }
        }
        chat.to_string()
    }

    async fn send_response(&self, resp: Response, chat_id: i64) -> Result<()> {
        if !resp.send {
            return Ok(());
        }

        debug!("bot response - {:?}, reply-to: {}", resp.text.replace('\n', "\\n"), resp.reply_to);
        let msg = SendMessage {
            chat_id,
            text: resp.text.clone(),
            parse_mode: Some(resp.parse_mode.unwrap_or(ParseMode::Markdown)),
            reply_to_message_id: resp.reply_to,
            disable_web_page_preview: true,
            reply_markup: None,
        };
        self.api
            .send(TgRequest::SendMessage(msg))
            .await
            .with_context(|| format!("can't send message to telegram {:?}", resp.text))?;
        Ok(())
    }

    async fn get_chat_id(&self, group: &str) -> Result<i64> {
        if let Ok(chat_id) = group.parse::<i64>() {
            return Ok(chat_id);
        }

        let chat = self
            .api
            .get_chat(&format!("@{group}"))
            .await
            .with_context(|| format!("can't get chat for {group}"))?;
        Ok(chat.id)
    }

    // merge the chat administrators into the configured super users
    async fn update_supers(&mut self) -> Result<()> {
        let admins = self
            .api
            .get_chat_administrators(self.chat_id)
            .await
            .context("failed to get chat administrators")?;

        for admin in admins {
            self.config.super_users.push(admin.user.username.trim());
        }

        info!("full list of supers: {{{}}}", self.config.super_users.names().join(", "));
        Ok(())
    }
}

/// Apply a ban: restrict the user, or ban the whole channel when
/// `channel_id` is set. Dry and training modes log and skip the messenger.
///
/// The messenger treats restrictions shorter than 30 seconds (or longer
/// than 366 days) as permanent, so short intervals are raised to a minute
/// to stay out of the accidental-lifetime-ban window.
pub(crate) async fn ban_user_or_channel(
    api: &dyn MessengerApi,
    dry: bool,
    training_mode: bool,
    duration: Duration,
    chat_id: i64,
    user_id: i64,
    channel_id: i64,
) -> Result<()> {
    if dry {
        info!("dry run: ban {user_id} for {duration:?}");
        return Ok(());
    }
    if training_mode {
        info!("training mode: ban {user_id} for {duration:?}");
        return Ok(());
    }

    let duration = if duration < Duration::from_secs(30) { Duration::from_secs(60) } else { duration };
    let until_date = Utc::now().timestamp() + duration.as_secs() as i64;

    if channel_id != 0 {
        let resp = api
            .request(TgRequest::BanChatSenderChat { chat_id, sender_chat_id: channel_id, until_date })
            .await?;
        if !resp.ok {
            bail!("response is not Ok: {}", resp.result);
        }
        return Ok(());
    }

    let resp = api
        .request(TgRequest::RestrictChatMember {
            chat_id,
            user_id,
            until_date,
            permissions: ChatPermissions::default(),
        })
        .await?;
    if !resp.ok {
        bail!("response is not Ok: {}", resp.result);
    }

    Ok(())
}
