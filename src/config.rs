//! Credentials and HTTP settings, read from a TOML file with environment overrides.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{Result, ScrapeError};

pub const DEFAULT_USER_AGENT: &str = concat!("gameday_scraper/", env!("CARGO_PKG_VERSION"));

const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Forum API application credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (client default when unset)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Accepts both a `[reddit]` table and top-level keys
    #[serde(default, alias = "credentials")]
    pub reddit: Credentials,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(flatten)]
    top_level: TopLevelCredentials,
}

/// Secrets files often carry the credentials as bare top-level keys.
#[derive(Debug, Clone, Default, Deserialize)]
struct TopLevelCredentials {
    client_id: Option<String>,
    client_secret: Option<String>,
    user_agent: Option<String>,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

// ============================================================================
// LOADING
// ============================================================================

impl Config {
    /// Parses config from TOML text without consulting the environment.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        let top = std::mem::take(&mut config.top_level);
        if let Some(id) = top.client_id {
            config.reddit.client_id = id;
        }
        if let Some(secret) = top.client_secret {
            config.reddit.client_secret = secret;
        }
        if let Some(agent) = top.user_agent {
            config.reddit.user_agent = agent;
        }
        if config.reddit.user_agent.trim().is_empty() {
            config.reddit.user_agent = default_user_agent();
        }
        Ok(config)
    }

    /// Loads the optional config file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                debug!("Reading config from {}", path.display());
                let content = fs::read_to_string(path).map_err(|e| {
                    ScrapeError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&content)?
            }
            None => Config {
                reddit: Credentials {
                    user_agent: default_user_agent(),
                    ..Default::default()
                },
                ..Default::default()
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = non_empty(ENV_CLIENT_ID) {
            self.reddit.client_id = id;
        }
        if let Some(secret) = non_empty(ENV_CLIENT_SECRET) {
            self.reddit.client_secret = secret;
        }
        if let Some(agent) = non_empty(ENV_USER_AGENT) {
            self.reddit.user_agent = agent;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.http.timeout_secs.map(Duration::from_secs)
    }
}

impl Credentials {
    /// Fails when either credential is missing.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(ScrapeError::Config(format!(
                "missing client_id (set it in the config file or {})",
                ENV_CLIENT_ID
            )));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ScrapeError::Config(format!(
                "missing client_secret (set it in the config file or {})",
                ENV_CLIENT_SECRET
            )));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
