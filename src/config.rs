//! Settings layering: built-in defaults < config file < environment < command line.

use crate::model::RunConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(4);

pub const ENV_BASE_URL: &str = "PDF_MERGE_BASE_URL";
pub const ENV_DOWNLOAD_DIR: &str = "PDF_MERGE_DOWNLOAD_DIR";

/// Contents of `config.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub download_dir: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub notice_ttl: Option<Duration>,
}

/// Values given on the command line, already parsed.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub notice_ttl: Option<Duration>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pdf-merge-cli").join("config.toml"))
}

/// Read the config file. An explicit path must exist; the default one is optional.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(FileConfig::default()),
        },
    };

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(FileConfig::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("read config {}", path.display()));
        }
    };
    let cfg = toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(cfg)
}

/// Merge the layers into a [`RunConfig`]. `env` looks up environment variables.
pub fn resolve(
    file: FileConfig,
    overrides: Overrides,
    env: impl Fn(&str) -> Option<String>,
) -> RunConfig {
    let base_url = overrides
        .base_url
        .or_else(|| env(ENV_BASE_URL))
        .or(file.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let download_dir = overrides
        .download_dir
        .or_else(|| env(ENV_DOWNLOAD_DIR).map(PathBuf::from))
        .or(file.download_dir)
        .unwrap_or_else(crate::storage::default_download_dir);

    RunConfig {
        base_url,
        download_dir,
        timeout: overrides.timeout.or(file.timeout),
        notice_ttl: overrides
            .notice_ttl
            .or(file.notice_ttl)
            .unwrap_or(DEFAULT_NOTICE_TTL),
        user_agent: format!("pdf-merge-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}
