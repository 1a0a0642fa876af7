//! # spamgate
//!
//! Self-learning anti-spam moderation engine for Telegram groups.
//!
//! The engine consumes the messenger update stream, routes every message
//! through a pluggable spam classifier and enforces the verdicts: ban the
//! author, delete the message, report to an admin chat. Moderators drive a
//! supervised training loop from the admin chat by forwarding missed spam
//! and clicking unban/confirm buttons on ban reports; sample corpora on
//! disk hot-reload through a debounced filesystem watcher.
//!
//! The heavyweight collaborators stay outside: the classifier is consumed
//! through [`bot::Detector`] and the messenger client through
//! [`platforms::MessengerApi`], so the engine runs the same against the
//! real services or test fakes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use spamgate::prelude::*;
//!
//! # async fn run(detector: Arc<dyn spamgate::bot::Detector>, api: Arc<dyn spamgate::platforms::MessengerApi>) -> anyhow::Result<()> {
//! let settings = Settings::from_file("spamgate.yml".as_ref())?;
//! let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
//!
//! let filter = Arc::new(SpamFilter::new(detector, settings.spam_config(), shutdown_tx.subscribe()));
//! filter.reload_samples().await?;
//!
//! let locator = Arc::new(Locator::default());
//! let logger = Arc::new(|msg: &Message, resp: &Response| {
//!     log::info!("spam from {}: {:?}", msg.from, resp.text);
//! });
//!
//! let mut engine = EventEngine::new(api, filter, logger, locator, settings.engine_config());
//! engine.run(shutdown_tx.subscribe()).await?;
//! # Ok(())
//! # }
//! ```

pub mod bot;
pub mod config;
pub mod platforms;
pub mod types;

// Re-export commonly used items
pub mod prelude {
    pub use crate::bot::{
        Bot, Detector, EngineConfig, EventEngine, Locator, SpamConfig, SpamFilter, SpamLogger,
        Submitter, SuperUsers,
    };
    pub use crate::config::Settings;
    pub use crate::platforms::MessengerApi;
    pub use crate::types::{CheckResult, Message, Response, User, PERMANENT_BAN};
    pub use anyhow::Result;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
