use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod telegram;
pub mod transform;

use self::telegram::{ApiResponse, ChatMember, TgChat, TgMessage, TgRequest, Update, UpdateConfig};

/// Subset of the messenger client API the engine consumes. The real client
/// lives in the embedding application; tests substitute fakes.
#[async_trait]
pub trait MessengerApi: Send + Sync {
    /// Open the long-poll update stream. The receiver is closed when the
    /// client shuts the stream down.
    async fn get_updates_chan(&self, config: UpdateConfig) -> mpsc::Receiver<Update>;

    /// Send a message-producing request, returns the posted message.
    async fn send(&self, req: TgRequest) -> Result<TgMessage>;

    /// Perform a request that returns a bare API response (bans, deletions,
    /// callback acknowledgements).
    async fn request(&self, req: TgRequest) -> Result<ApiResponse>;

    /// Resolve a public group username (without the `@` prefix already applied).
    async fn get_chat(&self, username: &str) -> Result<TgChat>;

    /// List administrators of the chat.
    async fn get_chat_administrators(&self, chat_id: i64) -> Result<Vec<ChatMember>>;
}
