use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use checkin_core::{
    service::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL},
    ServiceConfig,
};
use checkin_shared::{domain::SessionMode, protocol::GET_FEEDBACK_PATH};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "checkin.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub feedback_path: String,
    pub default_mode: SessionMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            feedback_path: GET_FEEDBACK_PATH.into(),
            default_mode: SessionMode::Quiz,
        }
    }
}

impl Settings {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            server_url: self.server_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            feedback_path: self.feedback_path.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    feedback_path: Option<String>,
    default_mode: Option<String>,
}

/// Defaults, then the config file, then `CHECKIN_*` / `APP__*` variables.
pub fn load_settings(explicit_path: Option<&Path>) -> Result<Settings> {
    load_settings_with(explicit_path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    explicit_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    let path = explicit_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
            apply_file(&mut settings, file_cfg)?;
        }
        Err(err) if explicit_path.is_some() => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
        Err(_) => {}
    }

    if let Some(v) = env("CHECKIN_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("CHECKIN_REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v
            .trim()
            .parse()
            .with_context(|| format!("CHECKIN_REQUEST_TIMEOUT_SECS is not a number: '{v}'"))?;
    }
    if let Some(v) = env("CHECKIN_FEEDBACK_PATH") {
        settings.feedback_path = v;
    }
    if let Some(v) = env("CHECKIN_DEFAULT_MODE") {
        settings.default_mode = parse_mode(&v)?;
    }

    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) -> Result<()> {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.feedback_path {
        settings.feedback_path = v;
    }
    if let Some(v) = file_cfg.default_mode {
        settings.default_mode = parse_mode(&v)?;
    }
    Ok(())
}

pub fn parse_mode(value: &str) -> Result<SessionMode> {
    SessionMode::parse(value)
        .ok_or_else(|| anyhow!("unknown mode '{value}', expected quiz or summary"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
