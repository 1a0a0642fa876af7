use std::io::Read;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{CheckRequest, CheckResult, LoadResult, Message, Response, UserInfo};

pub mod admin;
pub mod engine;
pub mod locator;
pub mod samples;
pub mod spam;
pub mod supers;
pub mod watcher;

#[cfg(test)]
pub(crate) mod mocks;

pub use engine::{EngineConfig, EventEngine, Submitter};
pub use locator::Locator;
pub use spam::{SpamConfig, SpamFilter};
pub use supers::SuperUsers;

/// Bot reacts to chat events and owns the training operations. Implemented
/// by [`SpamFilter`], consumed by the engine and the admin flow.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Classify the message and describe the action to take.
    async fn on_message(&self, msg: Message) -> Response;

    /// Record the text as a confirmed spam sample.
    async fn update_spam(&self, msg: &str) -> Result<()>;

    /// Record the text as a confirmed ham sample.
    async fn update_ham(&self, msg: &str) -> Result<()>;

    /// Mark users as approved, exempting them from future checks.
    async fn add_approved_users(&self, ids: &[i64]);

    /// Drop users from the approved set.
    async fn remove_approved_users(&self, ids: &[i64]);
}

/// Spam classifier contract. The models behind it (token, cosine, bayes,
/// stop words) live in the classifier crate; this engine only drives them.
/// Implementations must be internally synchronized: `check` running
/// concurrently with a load never sees partial state.
pub trait Detector: Send + Sync {
    fn check(&self, req: &CheckRequest) -> (bool, Vec<CheckResult>);

    fn load_samples(
        &self,
        excluded_tokens: &mut dyn Read,
        spam: &mut [&mut dyn Read],
        ham: &mut [&mut dyn Read],
    ) -> Result<LoadResult>;

    fn load_stop_words(&self, readers: &mut [&mut dyn Read]) -> Result<LoadResult>;

    fn update_spam(&self, msg: &str) -> Result<()>;

    fn update_ham(&self, msg: &str) -> Result<()>;

    fn add_approved_users(&self, ids: &[String]);

    fn remove_approved_users(&self, ids: &[String]);

    fn approved_users(&self) -> Vec<UserInfo>;

    fn is_approved_user(&self, user_id: &str) -> bool;
}

/// Sink for detected spam, e.g. an append-only journal.
pub trait SpamLogger: Send + Sync {
    fn save(&self, msg: &Message, response: &Response);
}

/// Closures work as spam loggers directly.
impl<F> SpamLogger for F
where
    F: Fn(&Message, &Response) + Send + Sync,
{
    fn save(&self, msg: &Message, response: &Response) {
        self(msg, response)
    }
}

// Multi-step handlers attempt every independent step and hand back whatever
// failed, joined into one error.
pub(crate) fn join_errors(errs: Vec<anyhow::Error>) -> Result<()> {
    if errs.is_empty() {
        return Ok(());
    }
    let joined = errs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
    Err(anyhow::anyhow!(joined))
}
