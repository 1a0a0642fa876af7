// src/platforms/telegram.rs - Telegram wire types, the subset the engine touches

use serde::{Deserialize, Serialize};

use crate::types::ParseMode;

/// Parameters for opening the update stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateConfig {
    pub offset: i64,
    /// Long-poll timeout in seconds.
    pub timeout: u64,
}

/// Single event from the update stream: either a chat message or a
/// callback query from an inline keyboard button.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TgMessage {
    #[serde(default)]
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TgUser>,
    /// Unix timestamp of the message.
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub chat: Option<TgChat>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: Vec<TgEntity>,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub caption_entities: Vec<TgEntity>,
    #[serde(default)]
    pub reply_to_message: Option<Box<TgMessage>>,
    #[serde(default)]
    pub sender_chat: Option<TgChat>,
    #[serde(default)]
    pub forward_from: Option<TgUser>,
    /// Set for forwards from users who hide their account; empty otherwise.
    #[serde(default)]
    pub forward_sender_name: String,
    #[serde(default)]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TgUser {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TgChat {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TgEntity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub length: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: Option<TgUser>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoSize {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMember {
    #[serde(default)]
    pub user: TgUser,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from: TgUser,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self { text: text.into(), callback_data: callback_data.into() }
    }
}

/// Chat permissions applied by a restriction. All false means a full mute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPermissions {
    pub can_send_messages: bool,
    pub can_send_media_messages: bool,
    pub can_send_other_messages: bool,
    pub can_add_web_page_previews: bool,
}

/// Outgoing chat message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub reply_to_message_id: i64,
    pub disable_web_page_preview: bool,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Edit of a previously posted message's text (and optionally its keyboard).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditMessageText {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Replacement of a posted message's inline keyboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditMessageReplyMarkup {
    pub chat_id: i64,
    pub message_id: i64,
    pub reply_markup: InlineKeyboardMarkup,
}

/// The requests the engine issues, one variant per messenger method used.
#[derive(Debug, Clone, PartialEq)]
pub enum TgRequest {
    SendMessage(SendMessage),
    EditMessageText(EditMessageText),
    EditMessageReplyMarkup(EditMessageReplyMarkup),
    DeleteMessage {
        chat_id: i64,
        message_id: i64,
    },
    RestrictChatMember {
        chat_id: i64,
        user_id: i64,
        until_date: i64,
        permissions: ChatPermissions,
    },
    BanChatSenderChat {
        chat_id: i64,
        sender_chat_id: i64,
        until_date: i64,
    },
    UnbanChatMember {
        chat_id: i64,
        user_id: i64,
        only_if_banned: bool,
    },
    CallbackAnswer {
        callback_query_id: String,
        text: String,
    },
}

/// Bare API response for action requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub description: String,
}
