use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::ConfigError;

pub const SETTINGS_FILE: &str = "analyzer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Normalised, without a trailing slash.
    pub backend_base_url: String,
    pub request_timeout_secs: u64,
    pub download_dir: PathBuf,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_base_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: 300,
            download_dir: default_download_dir(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Applies command-line overrides on top of the loaded settings.
    pub fn with_overrides(
        mut self,
        backend_url: Option<&str>,
        download_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = backend_url {
            self.backend_base_url = normalize_base_url(raw)?;
        }
        if let Some(dir) = download_dir {
            self.download_dir = dir;
        }
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    backend_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    download_dir: Option<PathBuf>,
}

pub fn load_settings() -> Result<ClientSettings, ConfigError> {
    load_settings_from(Path::new(SETTINGS_FILE), |name| std::env::var(name).ok())
}

/// Defaults, then the settings file (if present), then the environment.
pub fn load_settings_from(
    settings_path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, ConfigError> {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(settings_path) {
        let file_cfg: FileSettings = toml::from_str(&raw).map_err(|e| ConfigError::File {
            path: settings_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %settings_path.display(), "config: loaded settings file");
        if let Some(v) = file_cfg.backend_base_url {
            settings.backend_base_url = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.download_dir {
            settings.download_dir = v;
        }
    }

    let read = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    if let Some(v) = read("BACKEND_API_URL") {
        settings.backend_base_url = v;
    }
    if let Some(v) = read("APP__BACKEND_API_URL") {
        settings.backend_base_url = v;
    }
    if let Some(v) = read("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout { value: v.clone() })?;
    }
    if let Some(v) = read("APP__DOWNLOAD_DIR") {
        settings.download_dir = PathBuf::from(v);
    }

    if settings.request_timeout_secs == 0 {
        return Err(ConfigError::InvalidTimeout {
            value: "0".to_string(),
        });
    }
    settings.backend_base_url = normalize_base_url(&settings.backend_base_url)?;

    Ok(settings)
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::UnsupportedScheme {
                value: raw.to_string(),
                scheme: other.to_string(),
            })
        }
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
