use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::models::role::UnknownRolePolicy;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub role_url: String,
    pub oauth_token: Option<String>,
    pub polling: PollingConfig,
    pub unknown_role_policy: UnknownRolePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let api_url = env::var("PORTAL_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let role_url = env::var("PORTAL_ROLE_URL")
            .unwrap_or_else(|_| format!("{}/user/role", api_url));

        let unknown_role_policy = env::var("PORTAL_UNKNOWN_ROLE_POLICY")
            .unwrap_or_else(|_| "deny".to_string())
            .parse()?;

        Ok(Config {
            api_url,
            role_url,
            oauth_token: env::var("PORTAL_OAUTH_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            polling: PollingConfig {
                interval: secs_or_default(env::var("PORTAL_POLL_INTERVAL_SECS").ok(), 5),
                request_timeout: secs_or_default(env::var("PORTAL_REQUEST_TIMEOUT_SECS").ok(), 10),
            },
            unknown_role_policy,
        })
    }
}

/// Whole seconds from an env value. Zero or garbage falls back to `default`.
fn secs_or_default(raw: Option<String>, default: u64) -> Duration {
    let secs = raw
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            role_url: format!("{}/user/role", DEFAULT_API_URL),
            oauth_token: None,
            polling: PollingConfig::default(),
            unknown_role_policy: UnknownRolePolicy::Deny,
        }
    }
}
