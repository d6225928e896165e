use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TABLE_NAME: &str = "delayq_jobs";
pub const DEFAULT_SLEEP_DURATION_MS: u64 = 1_000;

/// Top-level config (delayq.toml + DELAYQ_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelayqConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Dispatch loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Pause between two poll cycles, in milliseconds (default: 1000).
    /// Override with env var: DELAYQ_SCHEDULER__SLEEP_DURATION_MS=250
    #[serde(default = "default_sleep_duration_ms")]
    pub sleep_duration_ms: u64,
}

impl SchedulerConfig {
    pub fn sleep_duration(&self) -> Duration {
        Duration::from_millis(self.sleep_duration_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sleep_duration_ms: DEFAULT_SLEEP_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Database file (sqlite) or JSON state file (file). Defaults to a
    /// backend-specific file under ~/.delayq/.
    #[serde(default)]
    pub path: Option<String>,
    /// Table holding scheduled entries (sqlite backend only).
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl StorageConfig {
    /// The configured path, or the backend's default location.
    pub fn resolved_path(&self) -> String {
        if let Some(ref path) = self.path {
            return path.clone();
        }
        let file = match self.backend {
            StorageBackend::Sqlite => "delayq.db",
            StorageBackend::File => "scheduler_state.json",
        };
        format!("{}/{}", delayq_home(), file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
            table_name: default_table_name(),
        }
    }
}

fn default_sleep_duration_ms() -> u64 {
    DEFAULT_SLEEP_DURATION_MS
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn delayq_home() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.delayq", home)
}

fn default_config_path() -> String {
    format!("{}/delayq.toml", delayq_home())
}

impl DelayqConfig {
    /// Load config from a TOML file with DELAYQ_* env var overrides.
    ///
    /// Layers, later ones winning per key:
    ///   1. field defaults
    ///   2. the TOML file (explicit path, else ~/.delayq/delayq.toml; a missing file is skipped)
    ///   3. env vars, `__` separating sections: DELAYQ_STORAGE__TABLE_NAME=jobs
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: DelayqConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("DELAYQ_").split("__"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}
