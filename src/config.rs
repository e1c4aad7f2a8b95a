// File: ./src/config.rs
use crate::service::ServiceSettings;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const CONFIG_ENV: &str = "TODOBIN_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub storage: StorageBackend,
    /// Where the file backend keeps lists. Defaults to `<data dir>/lists`.
    pub data_dir: Option<PathBuf>,
    pub enable_websocket: bool,
    pub default_expiration_hours: i64,
    pub max_expiration_hours: i64,
    pub cleanup_interval_secs: u64,
    pub max_body_bytes: usize,
    pub max_items: usize,
    pub max_content_len: usize,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let service = ServiceSettings::default();
        Self {
            bind: "0.0.0.0:8080".to_string(),
            storage: StorageBackend::Memory,
            data_dir: None,
            enable_websocket: true,
            default_expiration_hours: service.default_expiration_hours,
            max_expiration_hours: service.max_expiration_hours,
            cleanup_interval_secs: 3600,
            max_body_bytes: 256 * 1024,
            max_items: service.max_items,
            max_content_len: service.max_content_len,
            log_json: false,
        }
    }
}

impl ServerConfig {
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            default_expiration_hours: self.default_expiration_hours.max(1),
            max_expiration_hours: self.max_expiration_hours.max(1),
            max_items: self.max_items,
            max_content_len: self.max_content_len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    /// Base of the share links printed for humans.
    pub web_url: String,
    pub enable_websocket: bool,
    pub poll_interval_secs: u64,
    pub reconnect_delay_secs: u64,
    pub allow_insecure_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            web_url: "http://localhost:3000".to_string(),
            enable_websocket: false,
            poll_interval_secs: 5,
            reconnect_delay_secs: 2,
            allow_insecure_certs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl Config {
    pub fn get_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("com", "todobin", "todobin")
            .map(|proj| proj.config_dir().join("config.toml"))
    }

    /// File (if any), then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::get_path() {
            Some(path) if path.exists() => {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            _ => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.server.bind = format!("0.0.0.0:{}", port.trim());
        }
        if let Some(bind) = get("TODOBIN_BIND") {
            self.server.bind = bind;
        }
        if let Some(v) = get("ENABLE_WEBSOCKET") {
            self.server.enable_websocket = !v.eq_ignore_ascii_case("false");
        }
        if let Some(v) = get("TODOBIN_STORAGE") {
            match v.to_lowercase().as_str() {
                "memory" => self.server.storage = StorageBackend::Memory,
                "file" => self.server.storage = StorageBackend::File,
                other => tracing::warn!(value = other, "ignoring unknown TODOBIN_STORAGE"),
            }
        }
        if let Some(dir) = get("TODOBIN_DATA_DIR") {
            self.server.data_dir = Some(PathBuf::from(dir).join("lists"));
        }
        if let Some(v) = get("TODOBIN_LOG_JSON") {
            self.server.log_json = parse_bool(&v);
        }
        if let Some(url) = get("TODOBIN_API_URL") {
            self.client.api_url = url;
        }
        if let Some(url) = get("TODOBIN_WEB_URL") {
            self.client.web_url = url;
        }
        if let Some(v) = get("TODOBIN_CLIENT_WEBSOCKET") {
            self.client.enable_websocket = parse_bool(&v);
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
