//! Global configuration loaded from `~/.config/ddm/config.toml`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default User-Agent sent with every request when the caller does not override it.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:139.0) Gecko/20100101 Firefox/139.0";

/// Engine configuration: request identity, segmentation, retry, and I/O tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DdmConfig {
    /// Sent as the `User-Agent` header on every request.
    pub user_agent: String,
    /// Default segment count when the caller does not override it.
    pub segments_amount: usize,
    /// Default output directory when the caller passes neither a file nor a directory.
    pub download_path: PathBuf,
    /// Maximum attempts per segment before giving up.
    pub retry_times: u32,
    /// Streaming chunk size used by fetchers for progress/backpressure.
    pub chunk_size: usize,
    /// Per-request total timeout, in seconds.
    pub timeout: u64,
}

impl Default for DdmConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            segments_amount: 64,
            download_path: default_download_path(),
            retry_times: 32,
            chunk_size: 8192,
            timeout: 3600,
        }
    }
}

fn default_download_path() -> PathBuf {
    home_dir().join("downloads")
}

/// Resolves `$HOME`, falling back to `.` if unset (e.g. a stripped-down container).
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ddm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
/// Missing keys in an on-disk file fall back to defaults via `#[serde(default)]`.
pub fn load_or_init() -> Result<DdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}
