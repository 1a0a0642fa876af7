// src/bot/mocks.rs - Hand-rolled fakes for the seam traits, test builds only

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bot::Bot;
use crate::platforms::telegram::{
    ApiResponse, ChatMember, TgChat, TgMessage, TgRequest, Update, UpdateConfig,
};
use crate::platforms::MessengerApi;
use crate::types::{Message, Response};

/// Recording messenger fake. `send` and `request` calls are captured for
/// assertions; the update stream is fed by the test through `updates_tx`.
#[derive(Default)]
pub(crate) struct MockApi {
    pub sent: Mutex<Vec<TgRequest>>,
    pub requests: Mutex<Vec<TgRequest>>,
    pub chats: HashMap<String, i64>,
    pub admins: Vec<ChatMember>,
    pub fail_requests: bool,
    pub request_not_ok: bool,
    updates_rx: Mutex<Option<mpsc::Receiver<Update>>>,
}

impl MockApi {
    pub fn new() -> (Self, mpsc::Sender<Update>) {
        let (tx, rx) = mpsc::channel(100);
        let api = Self { updates_rx: Mutex::new(Some(rx)), ..Default::default() };
        (api, tx)
    }

    pub fn sent(&self) -> Vec<TgRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<TgRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessengerApi for MockApi {
    async fn get_updates_chan(&self, _config: UpdateConfig) -> mpsc::Receiver<Update> {
        self.updates_rx
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| mpsc::channel(1).1)
    }

    async fn send(&self, req: TgRequest) -> Result<TgMessage> {
        self.sent.lock().unwrap().push(req);
        Ok(TgMessage::default())
    }

    async fn request(&self, req: TgRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(req);
        if self.fail_requests {
            anyhow::bail!("request failed");
        }
        Ok(ApiResponse {
            ok: !self.request_not_ok,
            result: if self.request_not_ok { "false".to_string() } else { "true".to_string() },
            ..Default::default()
        })
    }

    async fn get_chat(&self, username: &str) -> Result<TgChat> {
        let id = self
            .chats
            .get(username)
            .with_context(|| format!("can't get chat for {username}"))?;
        Ok(TgChat { id: *id, ..Default::default() })
    }

    async fn get_chat_administrators(&self, _chat_id: i64) -> Result<Vec<ChatMember>> {
        Ok(self.admins.clone())
    }
}

/// Recording bot fake with a programmable `on_message` response.
#[derive(Default)]
pub(crate) struct MockBot {
    pub response: Mutex<Response>,
    pub on_message_calls: Mutex<Vec<Message>>,
    pub update_spam_calls: Mutex<Vec<String>>,
    pub update_ham_calls: Mutex<Vec<String>>,
    pub added_users: Mutex<Vec<Vec<i64>>>,
    pub removed_users: Mutex<Vec<Vec<i64>>>,
    pub fail_updates: bool,
}

impl MockBot {
    pub fn with_response(response: Response) -> Self {
        Self { response: Mutex::new(response), ..Default::default() }
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn on_message(&self, msg: Message) -> Response {
        self.on_message_calls.lock().unwrap().push(msg);
        self.response.lock().unwrap().clone()
    }

    async fn update_spam(&self, msg: &str) -> Result<()> {
        if self.fail_updates {
            anyhow::bail!("update spam failed");
        }
        self.update_spam_calls.lock().unwrap().push(msg.to_string());
        Ok(())
    }

    async fn update_ham(&self, msg: &str) -> Result<()> {
        if self.fail_updates {
            anyhow::bail!("update ham failed");
        }
        self.update_ham_calls.lock().unwrap().push(msg.to_string());
        Ok(())
    }

    async fn add_approved_users(&self, ids: &[i64]) {
        self.added_users.lock().unwrap().push(ids.to_vec());
    }

    async fn remove_approved_users(&self, ids: &[i64]) {
        self.removed_users.lock().unwrap().push(ids.to_vec());
    }
}
