use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::{
    domain::UserId,
    protocol::{user_route, USERS_ROUTE},
};
use url::Url;

pub const SETTINGS_FILE: &str = "users_client.toml";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Settings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn users_endpoint(&self) -> String {
        format!("{}{USERS_ROUTE}", self.base_url)
    }

    pub fn user_endpoint(&self, id: &UserId) -> String {
        format!("{}{}", self.base_url, user_route(id))
    }

    /// Checks the base URL and strips any trailing slash so endpoint joins
    /// never produce `//api/users`.
    pub fn normalized(mut self) -> anyhow::Result<Self> {
        self.base_url = normalize_base_url(&self.base_url)?;
        if self.poll_interval_ms == 0 {
            bail!("poll interval must be greater than zero");
        }
        if self.request_timeout_ms == 0 {
            bail!("request timeout must be greater than zero");
        }
        Ok(self)
    }
}

/// Defaults, then `users_client.toml` in the working directory, then the
/// environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", file.display()))?;
        if let Some(v) = file_cfg.get("base_url").and_then(toml::Value::as_str) {
            settings.base_url = v.to_string();
        }
        if let Some(v) = file_cfg.get("poll_interval_ms").and_then(toml::Value::as_integer) {
            settings.poll_interval_ms = u64::try_from(v)
                .with_context(|| format!("invalid poll_interval_ms in '{}'", file.display()))?;
        }
        if let Some(v) = file_cfg
            .get("request_timeout_ms")
            .and_then(toml::Value::as_integer)
        {
            settings.request_timeout_ms = u64::try_from(v)
                .with_context(|| format!("invalid request_timeout_ms in '{}'", file.display()))?;
        }
    }

    if let Some(v) = env("USERS_API_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("APP__POLL_INTERVAL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.poll_interval_ms = parsed;
        }
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_ms = parsed;
        }
    }

    settings.normalized()
}

fn normalize_base_url(raw_base_url: &str) -> anyhow::Result<String> {
    let trimmed = raw_base_url.trim();
    if trimmed.is_empty() {
        return Ok(Settings::default().base_url);
    }

    let parsed =
        Url::parse(trimmed).with_context(|| format!("invalid base url '{trimmed}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "base url '{trimmed}' must use http or https, got '{}'",
            parsed.scheme()
        );
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
