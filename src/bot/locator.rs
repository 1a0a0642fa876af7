// src/bot/locator.rs - Bounded index correlating message text to its origin
//
// The messenger strips the original sender from forwarded messages, so the
// admin training flow recovers the offender by exact text match against
// recently seen messages.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::types::CheckResult;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_MAX_SIZE: usize = 1000;

/// Origin of a recently seen message.
#[derive(Debug, Clone, PartialEq)]
pub struct MsgMeta {
    pub chat_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub msg_id: i64,
    added_at: DateTime<Utc>,
}

impl fmt::Display for MsgMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chat: {}, user: {} ({}), msg: {}",
            self.chat_id, self.user_name, self.user_id, self.msg_id
        )
    }
}

/// Classifier verdicts stored per user for the admin "info" button.
#[derive(Debug, Clone, PartialEq)]
pub struct SpamData {
    pub checks: Vec<CheckResult>,
    added_at: DateTime<Utc>,
}

#[derive(Default)]
struct Maps {
    msgs: HashMap<String, MsgMeta>,
    spam: HashMap<i64, SpamData>,
}

/// Concurrent-safe two-map index, bounded by size and entry age.
/// Collisions on identical text resolve to the most recent insertion.
pub struct Locator {
    ttl: Duration,
    max_size: usize,
    maps: RwLock<Maps>,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_SIZE)
    }
}

impl Locator {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self { ttl, max_size, maps: RwLock::new(Maps::default()) }
    }

    /// Insert or overwrite the entry keyed by the exact message text.
    pub async fn add_message(
        &self,
        text: &str,
        chat_id: i64,
        user_id: i64,
        user_name: &str,
        msg_id: i64,
    ) {
        let mut maps = self.maps.write().await;
        maps.msgs.insert(
            text.to_string(),
            MsgMeta {
                chat_id,
                user_id,
                user_name: user_name.to_string(),
                msg_id,
                added_at: Utc::now(),
            },
        );
        Self::evict(&mut maps.msgs, self.ttl, self.max_size);
    }

    /// Exact-match lookup by message text.
    pub async fn message(&self, text: &str) -> Option<MsgMeta> {
        self.maps.read().await.msgs.get(text).cloned()
    }

    /// Store classifier verdicts for the user.
    pub async fn add_spam(&self, user_id: i64, checks: Vec<CheckResult>) {
        let mut maps = self.maps.write().await;
        maps.spam.insert(user_id, SpamData { checks, added_at: Utc::now() });
        Self::evict(&mut maps.spam, self.ttl, self.max_size);
    }

    /// Verdicts previously stored for the user, if still retained.
    pub async fn spam(&self, user_id: i64) -> Option<SpamData> {
        self.maps.read().await.spam.get(&user_id).cloned()
    }

    // Size bound first, then TTL: drop oldest insertions while over
    // capacity, then anything past its lifetime.
    fn evict<K: std::hash::Hash + Eq + Clone>(
        map: &mut HashMap<K, impl Aged>,
        ttl: Duration,
        max_size: usize,
    ) {
        while map.len() > max_size {
            let oldest = map
                .iter()
                .min_by_key(|(_, v)| v.added_at())
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => map.remove(&key),
                None => break,
            };
        }

        let cutoff = Utc::now() - chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(24));
        map.retain(|_, v| v.added_at() >= cutoff);
    }
}

trait Aged {
    fn added_at(&self) -> DateTime<Utc>;
}

impl Aged for MsgMeta {
    fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }
}

impl Aged for SpamData {
    fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }
}
