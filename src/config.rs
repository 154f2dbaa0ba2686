// src/config.rs
//! # Pipeline Configuration
//!
//! Runtime configuration for the ingestion pipeline, loaded from TOML with
//! serde defaults for every field, so a missing or partial file still yields
//! a runnable setup. Credentials never live in the file: they come from the
//! environment only and stay in process memory.

use std::{env, fs, path::Path};

use serde::Deserialize;
use tracing::{info, warn};

use crate::client::auth::SourceCredential;
use crate::client::ClientConfig;
use crate::orchestrator::ChannelSpec;

/// Environment variable pointing at an alternative config file.
pub const ENV_CONFIG_PATH: &str = "TRENDPULSE_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

const ENV_CLIENT_ID: &str = "SOURCE_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "SOURCE_CLIENT_SECRET";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub anon_base: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_user_agent() -> String {
    "trendpulse/0.1 (content trend monitor)".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            api_base: None,
            anon_base: None,
            token_url: None,
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    600
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
        }
    }
}

impl PipelineConfig {
    /// Load from `TRENDPULSE_CONFIG_PATH` or `config/pipeline.toml`, falling
    /// back to serde defaults when the file is missing or malformed.
    pub fn load_default() -> Self {
        let path = env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_file(&path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(s) => match toml::from_str(&s) {
                Ok(cfg) => {
                    info!(path = %path.as_ref().display(), "pipeline config loaded");
                    cfg
                }
                Err(e) => {
                    warn!(path = %path.as_ref().display(), error = %e, "config parse failed, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.as_ref().display(), "no config file, using defaults");
                Self::default()
            }
        }
    }

    /// Build a [`ClientConfig`], applying any file-level URL overrides on
    /// top of the built-in endpoints.
    pub fn client_config(&self) -> ClientConfig {
        let mut cfg = ClientConfig {
            user_agent: self.client.user_agent.clone(),
            request_timeout_secs: self.client.request_timeout_secs,
            ..ClientConfig::default()
        };
        if let Some(u) = &self.client.api_base {
            cfg.api_base = u.clone();
        }
        if let Some(u) = &self.client.anon_base {
            cfg.anon_base = u.clone();
        }
        if let Some(u) = &self.client.token_url {
            cfg.token_url = u.clone();
        }
        cfg
    }
}

/// Credentials come from the environment only. `None` means the anonymous
/// tier; the client degrades to it on its own when exchanges fail.
pub fn credential_from_env() -> Option<SourceCredential> {
    let id = env::var(ENV_CLIENT_ID).ok()?;
    let secret = env::var(ENV_CLIENT_SECRET).ok()?;
    if id.trim().is_empty() || secret.trim().is_empty() {
        return None;
    }
    Some(SourceCredential {
        client_id: id,
        client_secret: secret,
    })
}
