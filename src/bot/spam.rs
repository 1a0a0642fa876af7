// src/bot/spam.rs - Spam filter: classification front-end and training operations

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::{broadcast, RwLock};

use crate::bot::{samples, watcher, Bot, Detector};
use crate::types::{CheckRequest, Message, Response, PERMANENT_BAN};

/// Filter knobs. File paths left as `None` are simply not used; the primary
/// spam and ham corpora are required for reloads.
#[derive(Debug, Clone)]
pub struct SpamConfig {
    /// Reply template for a detected spammer.
    pub spam_msg: String,
    /// Reply template used instead of `spam_msg` in dry mode.
    pub spam_dry_msg: String,
    pub spam_samples_file: Option<PathBuf>,
    pub ham_samples_file: Option<PathBuf>,
    pub stop_words_file: Option<PathBuf>,
    pub excluded_tokens_file: Option<PathBuf>,
    pub spam_dynamic_file: Option<PathBuf>,
    pub ham_dynamic_file: Option<PathBuf>,
    /// Quiet time after the last filesystem event before a reload fires.
    pub watch_delay: Duration,
    pub dry: bool,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            spam_msg: String::new(),
            spam_dry_msg: String::new(),
            spam_samples_file: None,
            ham_samples_file: None,
            stop_words_file: None,
            excluded_tokens_file: None,
            spam_dynamic_file: None,
            ham_dynamic_file: None,
            watch_delay: Duration::from_secs(5),
            dry: false,
        }
    }
}

/// Classification front-end over a [`Detector`]. Translates messages into
/// check-and-react responses and owns the runtime training operations.
/// Construction spawns the sample-file watcher when any watchable path is
/// configured.
#[derive(Clone)]
pub struct SpamFilter {
    inner: Arc<Inner>,
}

struct Inner {
    detector: Arc<dyn Detector>,
    params: SpamConfig,
    // write-held for reloads, read-held for checks: a check never observes
    // a half-loaded detector
    gate: RwLock<()>,
}

#[async_trait]
impl watcher::Reloader for Inner {
    async fn reload(&self) -> Result<()> {
        let _guard = self.gate.write().await;
        reload_locked(self.detector.as_ref(), &self.params)
    }
}

impl SpamFilter {
    pub fn new(
        detector: Arc<dyn Detector>,
        params: SpamConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let inner = Arc::new(Inner { detector, params, gate: RwLock::new(()) });

        let watch_files: Vec<PathBuf> = [
            &inner.params.spam_samples_file,
            &inner.params.ham_samples_file,
            &inner.params.stop_words_file,
            &inner.params.excluded_tokens_file,
        ]
        .into_iter()
        .filter_map(|f| f.clone())
        .collect();

        if !watch_files.is_empty() {
            let _ = watcher::spawn(
                inner.clone() as Arc<dyn watcher::Reloader>,
                watch_files,
                inner.params.watch_delay,
                shutdown,
            );
        }

        Self { inner }
    }

    /// Re-read all sample corpora and hand them to the detector. Missing
    /// optional files (stop words, excluded tokens, dynamic corpora) are
    /// skipped; missing primary corpora fail naming the offending path.
    pub async fn reload_samples(&self) -> Result<()> {
        watcher::Reloader::reload(self.inner.as_ref()).await
    }

    /// Dynamic spam and ham samples accumulated at runtime. A missing file
    /// yields an empty list.
    pub fn dynamic_samples(&self) -> Result<(Vec<String>, Vec<String>)> {
        let spam = match &self.inner.params.spam_dynamic_file {
            Some(path) => samples::read(path).context("failed to read dynamic spam samples")?,
            None => Vec::new(),
        };
        let ham = match &self.inner.params.ham_dynamic_file {
            Some(path) => samples::read(path).context("failed to read dynamic ham samples")?,
            None => Vec::new(),
        };
        Ok((spam, ham))
    }

    /// Remove all lines matching the sample from the dynamic spam corpus,
    /// returns the number removed, then reloads the detector.
    pub async fn remove_dynamic_spam_sample(&self, sample: &str) -> Result<usize> {
        self.remove_dynamic_sample(sample, true).await
    }

    /// Same as [`Self::remove_dynamic_spam_sample`] for the ham corpus.
    pub async fn remove_dynamic_ham_sample(&self, sample: &str) -> Result<usize> {
        self.remove_dynamic_sample(sample, false).await
    }

    async fn remove_dynamic_sample(&self, sample: &str, spam: bool) -> Result<usize> {
        let kind = if spam { "spam" } else { "ham" };
        let path = if spam {
            &self.inner.params.spam_dynamic_file
        } else {
            &self.inner.params.ham_dynamic_file
        };
        let path = path
            .as_ref()
            .ok_or_else(|| anyhow!("failed to remove dynamic {kind} sample: file not configured"))?;

        let count = samples::remove(path, sample)
            .map_err(|err| anyhow!("failed to remove dynamic {kind} sample: {err}"))?;
        info!("removed {count} dynamic {kind} sample(s) matching {sample:?}");

        self.reload_samples().await?;
        Ok(count)
    }
}

#[async_trait]
impl Bot for SpamFilter {
    async fn on_message(&self, msg: Message) -> Response {
        let _guard = self.inner.gate.read().await;

        let req = CheckRequest {
            text: msg.text.clone(),
            user_id: msg.from.id.to_string(),
            user_name: msg.from.username.clone(),
        };
        let (is_spam, check_results) = self.inner.detector.check(&req);

        if !is_spam {
            return Response { check_results, ..Default::default() };
        }

        info!(
            "spam detected from {} ({}), message: {:?}",
            msg.from.username,
            msg.from.id,
            msg.text.replace('\n', " ")
        );

        let prefix = if self.inner.params.dry {
            &self.inner.params.spam_dry_msg
        } else {
            &self.inner.params.spam_msg
        };

        Response {
            send: true,
            text: format!("{}: {:?} ({})", prefix, msg.from.username, msg.from.id),
            reply_to: msg.id,
            ban_interval: PERMANENT_BAN,
            delete_reply_to: true,
            user: msg.from.clone(),
            channel_id: msg.sender_chat.as_ref().map_or(0, |sc| sc.id),
            check_results,
            ..Default::default()
        }
    }

    async fn update_spam(&self, msg: &str) -> Result<()> {
        let clean = msg.replace('\n', " ");
        info!("update spam samples with {clean:?}");
        self.inner.detector.update_spam(&clean)
    }

    async fn update_ham(&self, msg: &str) -> Result<()> {
        let clean = msg.replace('\n', " ");
        info!("update ham samples with {clean:?}");
        self.inner.detector.update_ham(&clean)
    }

    async fn add_approved_users(&self, ids: &[i64]) {
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        self.inner.detector.add_approved_users(&ids);
    }

    async fn remove_approved_users(&self, ids: &[i64]) {
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        self.inner.detector.remove_approved_users(&ids);
    }
}

// Open everything first, then feed the detector. The caller holds the gate
// write lock, so checks in flight never interleave with a partial load.
fn reload_locked(detector: &dyn Detector, params: &SpamConfig) -> Result<()> {
    let spam_path = params
        .spam_samples_file
        .as_ref()
        .context("spam samples file is not configured")?;
    let ham_path = params
        .ham_samples_file
        .as_ref()
        .context("ham samples file is not configured")?;

    let spam_file = File::open(spam_path)
        .with_context(|| format!("failed to open spam samples file {spam_path:?}"))?;
    let ham_file = File::open(ham_path)
        .with_context(|| format!("failed to open ham samples file {ham_path:?}"))?;

    let mut spam_readers: Vec<Box<dyn Read>> = vec![Box::new(spam_file)];
    if let Some(file) = open_optional(&params.spam_dynamic_file) {
        spam_readers.push(Box::new(file));
    }
    let mut ham_readers: Vec<Box<dyn Read>> = vec![Box::new(ham_file)];
    if let Some(file) = open_optional(&params.ham_dynamic_file) {
        ham_readers.push(Box::new(file));
    }

    let mut excluded: Box<dyn Read> = match open_optional(&params.excluded_tokens_file) {
        Some(file) => Box::new(file),
        None => Box::new(std::io::empty()),
    };

    let mut spam_refs: Vec<&mut dyn Read> = Vec::new();
    for r in spam_readers.iter_mut() {
        spam_refs.push(r.as_mut());
    }
    let mut ham_refs: Vec<&mut dyn Read> = Vec::new();
    for r in ham_readers.iter_mut() {
        ham_refs.push(r.as_mut());
    }

    let loaded = detector
        .load_samples(excluded.as_mut(), &mut spam_refs, &mut ham_refs)
        .context("failed to load samples")?;
    info!(
        "samples loaded: {} spam, {} ham, {} excluded tokens",
        loaded.spam_samples, loaded.ham_samples, loaded.excluded_tokens
    );

    let mut stop_words_readers: Vec<Box<dyn Read>> = Vec::new();
    if let Some(file) = open_optional(&params.stop_words_file) {
        stop_words_readers.push(Box::new(file));
    }
    let mut stop_words_refs: Vec<&mut dyn Read> = Vec::new();
    for r in stop_words_readers.iter_mut() {
        stop_words_refs.push(r.as_mut());
    }
    let loaded = detector
        .load_stop_words(&mut stop_words_refs)
        .context("failed to load stop words")?;
    info!("stop words loaded: {}", loaded.stop_words);

    Ok(())
}

// Missing optional files are an empty corpus; anything else is worth a warning.
fn open_optional(path: &Option<PathBuf>) -> Option<File> {
    let path = path.as_ref()?;
    match File::open(path) {
        Ok(file) => Some(file),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            warn!("failed to open optional file {}: {err}", path.display());
            None
        }
    }
}
