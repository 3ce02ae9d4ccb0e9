use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::PoolOptions;

/// Server and store settings, read from `constituency.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: PathBuf,
    pub bind: String,
    pub port: u16,
    pub pool_size: usize,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_ms: u64,
    pub upload_dir: PathBuf,
    /// Base URL used when handing out links to uploaded files
    pub public_url: String,
    pub max_upload_bytes: usize,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("constituency.db"),
            bind: "0.0.0.0".to_string(),
            port: 4000,
            pool_size: 10,
            acquire_timeout_secs: 20,
            busy_timeout_ms: 5000,
            upload_dir: PathBuf::from("uploads"),
            public_url: "http://localhost:4000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            size: self.pool_size,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }

    /// Apply `CONSTITUENCY_DB`, `PORT` and `BACKEND_URL` overrides
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup("CONSTITUENCY_DB").filter(|v| !v.is_empty()) {
            self.database = PathBuf::from(db);
        }
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Some(url) = lookup("BACKEND_URL").filter(|v| !v.is_empty()) {
            self.public_url = url;
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("constituency.toml")
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &AppConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.pool_size, 10);
    }

    #[test]
    fn test_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("constituency.toml");

        std::fs::write(&path, "port = 8080\nupload_dir = \"files\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.upload_dir, PathBuf::from("files"));
        assert_eq!(config.busy_timeout_ms, 5000);

        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "PORT" => Some("5050".to_string()),
            "CONSTITUENCY_DB" => Some("/tmp/x.db".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 5050);
        assert_eq!(config.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.public_url, "http://localhost:4000");
    }
}
