use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "controller.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub service_url: String,
    pub poll_interval_ms: u64,
    pub audio_only: bool,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:5000".into(),
            poll_interval_ms: 2500,
            audio_only: true,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn service_url(&self) -> anyhow::Result<Url> {
        Url::parse(self.service_url.trim())
            .with_context(|| format!("invalid service url '{}'", self.service_url))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    service_url: Option<String>,
    poll_interval_ms: Option<u64>,
    audio_only: Option<bool>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then the config file, then environment overrides.
///
/// An explicit `path` must exist; the default `controller.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        let file_cfg: FileSettings = toml::from_str(&raw).context("failed to parse config")?;
        apply_file(&mut settings, file_cfg);
    }

    if let Some(v) = env("SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = env("APP__SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = env("APP__POLL_INTERVAL_MS") {
        settings.poll_interval_ms = v
            .parse()
            .with_context(|| format!("APP__POLL_INTERVAL_MS is not a number: '{v}'"))?;
    }
    if let Some(v) = env("APP__AUDIO_ONLY") {
        settings.audio_only = parse_flag(&v)
            .with_context(|| format!("APP__AUDIO_ONLY is not a boolean: '{v}'"))?;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = Some(
            v.parse()
                .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS is not a number: '{v}'"))?,
        );
    }

    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.service_url {
        settings.service_url = v;
    }
    if let Some(v) = file_cfg.poll_interval_ms {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = file_cfg.audio_only {
        settings.audio_only = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = Some(v);
    }
}

pub fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("expected on/off, got '{other}'"),
    }
}
