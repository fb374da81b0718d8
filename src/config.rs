use crate::upload::{BatchSettings, DEFAULT_GROUP_SIZE, DEFAULT_REQUEST_TIMEOUT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "activity-uploader";

/// How the file travels in the POST body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    /// The file bytes are the request body.
    #[default]
    Raw,
    /// One `multipart/form-data` field holding the file.
    Multipart,
}

/// Configuration loaded from `~/.config/activity-uploader/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the activity server.
    pub server_url: String,
    /// Account to upload to. When unset, the server is asked via `/username`.
    pub user_id: Option<String>,
    /// Maximum number of uploads in flight at once.
    pub group_size: usize,
    /// Per-request timeout; a request still running after this settles as
    /// timed out. Values below one second are raised to one second.
    pub request_timeout_secs: u64,
    pub body: BodyMode,
    /// Form field name used when `body = "multipart"`.
    pub multipart_field: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            user_id: None,
            group_size: DEFAULT_GROUP_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            body: BodyMode::Raw,
            multipart_field: "fileupload".to_string(),
        }
    }
}

impl AppConfig {
    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings::new(
            self.group_size,
            Duration::from_secs(self.request_timeout_secs),
        )
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME)?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from the default location, creating it if none exists.
pub fn load_or_init() -> Result<AppConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let default_cfg = AppConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}
