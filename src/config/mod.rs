// src/config/mod.rs - Deployment settings loaded from a YAML file

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bot::{EngineConfig, SpamConfig, SuperUsers};

/// Deployment settings, one file for the engine and the filter. Everything
/// except `group` has a sensible default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Moderated group: numeric chat ID or public username without `@`.
    pub group: String,
    #[serde(default)]
    pub admin_group: String,
    #[serde(default = "default_idle_sec")]
    pub idle_sec: u64,
    #[serde(default)]
    pub super_users: Vec<String>,
    #[serde(default)]
    pub testing_ids: Vec<i64>,
    #[serde(default)]
    pub startup_msg: String,
    #[serde(default)]
    pub no_spam_reply: bool,
    #[serde(default)]
    pub training_mode: bool,
    #[serde(default)]
    pub dry: bool,
    #[serde(default)]
    pub keep_user: bool,
    #[serde(default)]
    pub spam: SpamSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamSettings {
    #[serde(default = "default_spam_msg")]
    pub spam_msg: String,
    #[serde(default = "default_spam_dry_msg")]
    pub spam_dry_msg: String,
    #[serde(default)]
    pub spam_samples_file: Option<PathBuf>,
    #[serde(default)]
    pub ham_samples_file: Option<PathBuf>,
    #[serde(default)]
    pub stop_words_file: Option<PathBuf>,
    #[serde(default)]
    pub excluded_tokens_file: Option<PathBuf>,
    #[serde(default)]
    pub spam_dynamic_file: Option<PathBuf>,
    #[serde(default)]
    pub ham_dynamic_file: Option<PathBuf>,
    #[serde(default = "default_watch_delay_ms")]
    pub watch_delay_ms: u64,
}

impl Default for SpamSettings {
    fn default() -> Self {
        Self {
            spam_msg: default_spam_msg(),
            spam_dry_msg: default_spam_dry_msg(),
            spam_samples_file: None,
            ham_samples_file: None,
            stop_words_file: None,
            excluded_tokens_file: None,
            spam_dynamic_file: None,
            ham_dynamic_file: None,
            watch_delay_ms: default_watch_delay_ms(),
        }
    }
}

fn default_idle_sec() -> u64 {
    30
}

fn default_spam_msg() -> String {
    "this is spam".to_string()
}

fn default_spam_dry_msg() -> String {
    "this is spam (dry mode)".to_string()
}

fn default_watch_delay_ms() -> u64 {
    5000
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {path:?}"))?;
        let settings: Settings =
            serde_yaml::from_str(&content).context("failed to parse settings file")?;
        Ok(settings)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            group: self.group.clone(),
            admin_group: self.admin_group.clone(),
            idle_duration: Duration::from_secs(self.idle_sec),
            super_users: SuperUsers::new(&self.super_users),
            testing_ids: self.testing_ids.clone(),
            startup_msg: self.startup_msg.clone(),
            no_spam_reply: self.no_spam_reply,
            training_mode: self.training_mode,
            dry: self.dry,
            keep_user: self.keep_user,
        }
    }

    pub fn spam_config(&self) -> SpamConfig {
        SpamConfig {
            spam_msg: self.spam.spam_msg.clone(),
            spam_dry_msg: self.spam.spam_dry_msg.clone(),
            spam_samples_file: self.spam.spam_samples_file.clone(),
            ham_samples_file: self.spam.ham_samples_file.clone(),
            stop_words_file: self.spam.stop_words_file.clone(),
            excluded_tokens_file: self.spam.excluded_tokens_file.clone(),
            spam_dynamic_file: self.spam.spam_dynamic_file.clone(),
            ham_dynamic_file: self.spam.ham_dynamic_file.clone(),
            watch_delay: Duration::from_millis(self.spam.watch_delay_ms),
            dry: self.dry,
        }
    }
}
