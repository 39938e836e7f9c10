//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so an embedder can start with zero
//! configuration.

use std::time::Duration;

use metalhead_shared::constants::{ADVISORY_SESSION_KEY, GATEWAY_FAILURE_THRESHOLD};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Public URL the app is served from. Used to compute the raw gateway
    /// alternative offered by the cache advisory.
    /// Env: `METALHEAD_GATEWAY_URL`
    /// Default: none.
    pub gateway_url: Option<Url>,

    /// Consecutive gateway failures before the status flips to failed.
    /// Env: `METALHEAD_FAILURE_THRESHOLD`
    /// Default: `3`
    pub failure_threshold: u32,

    /// Session storage key that remembers the advisory was shown.
    /// Env: `METALHEAD_ADVISORY_KEY`
    /// Default: `"metalhead-cache-modal-shown"`
    pub advisory_session_key: String,

    /// User-agent string used for device and in-app browser detection.
    /// Env: `METALHEAD_USER_AGENT`
    /// Default: empty.
    pub user_agent: String,

    /// How long a fetched read may be served from the query cache before
    /// the next read refetches it.
    /// Env: `METALHEAD_STALE_TIME_MS`
    /// Default: `0` (every read refetches)
    pub stale_time: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            failure_threshold: GATEWAY_FAILURE_THRESHOLD,
            advisory_session_key: ADVISORY_SESSION_KEY.to_string(),
            user_agent: String::new(),
            stale_time: Duration::ZERO,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] but reading from `lookup`, so
    /// tests never touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("METALHEAD_GATEWAY_URL") {
            match Url::parse(raw.trim()) {
                Ok(url) => config.gateway_url = Some(url),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Invalid METALHEAD_GATEWAY_URL, ignoring");
                }
            }
        }

        if let Some(raw) = lookup("METALHEAD_FAILURE_THRESHOLD") {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.failure_threshold = n,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        "Invalid METALHEAD_FAILURE_THRESHOLD, using default"
                    );
                }
            }
        }

        if let Some(key) = lookup("METALHEAD_ADVISORY_KEY") {
            if !key.trim().is_empty() {
                config.advisory_session_key = key.trim().to_string();
            }
        }

        if let Some(agent) = lookup("METALHEAD_USER_AGENT") {
            config.user_agent = agent;
        }

        if let Some(raw) = lookup("METALHEAD_STALE_TIME_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.stale_time = Duration::from_millis(ms),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Invalid METALHEAD_STALE_TIME_MS, using default");
                }
            }
        }

        // RUST_LOG is read by the tracing subscriber directly.

        config
    }
}
