// src/types/mod.rs - Core message and response types flowing through the engine

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ban interval that the messenger treats as a forever-ban.
pub const PERMANENT_BAN: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Incoming chat message after transformation from the wire format.
/// Immutable once constructed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sent: chrono::DateTime<chrono::Utc>,
    pub text: String,
    pub from: User,
    pub sender_chat: Option<SenderChat>,
    pub entities: Option<Vec<Entity>>,
    pub image: Option<Image>,
    pub reply_to: Option<Box<Message>>,
}

/// Message author. `id == 0` means the sender is unknown, which is the
/// common case for forwarded messages where the messenger strips the
/// original sender for privacy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.display_name.is_empty(), self.username.is_empty()) {
            (false, false) => write!(f, "{} ({})", self.display_name, self.username),
            (false, true) => write!(f, "{}", self.display_name),
            (true, false) => write!(f, "{}", self.username),
            (true, true) => write!(f, "{}", self.id),
        }
    }
}

/// Channel or group posting on its own behalf instead of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenderChat {
    pub id: i64,
    pub username: String,
}

impl fmt::Display for SenderChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.username.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.username, self.id)
        }
    }
}

/// Text markup entity (link, mention, formatting span).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub offset: i64,
    pub length: i64,
    pub url: String,
    pub user: Option<User>,
}

/// Attached image, the largest size of the photo with its caption.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub file_id: String,
    pub width: i64,
    pub height: i64,
    pub caption: String,
    pub entities: Option<Vec<Entity>>,
}

/// Text rendering mode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    Markdown,
    Html,
}

/// Bot output for a processed message. The engine interprets the flags:
/// `send` posts `text`, `ban_interval > 0` requests a ban and
/// `delete_reply_to` requests removal of the offending message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub send: bool,
    pub text: String,
    pub reply_to: i64,
    pub ban_interval: Duration,
    pub delete_reply_to: bool,
    pub user: User,
    pub channel_id: i64,
    pub check_results: Vec<CheckResult>,
    pub parse_mode: Option<ParseMode>,
}

/// Single classifier verdict, one per check performed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub spam: bool,
    pub details: String,
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}, {}", self.name, self.spam, self.details)
    }
}

/// Classifier input for a single message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckRequest {
    pub text: String,
    pub user_id: String,
    pub user_name: String,
}

/// Corpus sizes reported by the classifier after a reload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadResult {
    pub excluded_tokens: usize,
    pub spam_samples: usize,
    pub ham_samples: usize,
    pub stop_words: usize,
}

/// Approved-user record as the classifier reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub user_id: String,
    pub user_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_result_display() {
        let res = CheckResult {
            name: "bayes".to_string(),
            spam: true,
            details: "probability of spam: 92.3%".to_string(),
        };
        assert_eq!(res.to_string(), "bayes: true, probability of spam: 92.3%");
    }

    #[test]
    fn user_display_variants() {
        let full = User { id: 1, username: "john".into(), display_name: "John Doe".into() };
        assert_eq!(full.to_string(), "John Doe (john)");

        let name_only = User { id: 1, username: String::new(), display_name: "John Doe".into() };
        assert_eq!(name_only.to_string(), "John Doe");

        let username_only = User { id: 1, username: "john".into(), display_name: String::new() };
        assert_eq!(username_only.to_string(), "john");

        let id_only = User { id: 42, ..Default::default() };
        assert_eq!(id_only.to_string(), "42");
    }

    #[test]
    fn permanent_ban_is_years() {
        assert!(PERMANENT_BAN > Duration::from_secs(366 * 24 * 60 * 60));
    }
}
