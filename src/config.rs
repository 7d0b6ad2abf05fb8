use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const CONFIG_ENV_VAR: &str = "MUSIC_LIBRARY_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_server_address")]
    pub server_address: String,

    /// Base URL of the song details API; `/info` is appended per request.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    pub migrations_dir: Option<PathBuf>,

    #[serde(default)]
    pub strict_updates: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("music-library");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("songs.db").to_string_lossy().to_string()
}

fn default_server_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            server_address: default_server_address(),
            api_url: default_api_url(),
            migrations_dir: None,
            strict_updates: false,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Reads the config file if one exists, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                toml::from_str(&content)?
            }
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// First existing file among `$MUSIC_LIBRARY_CONFIG`, `./config.toml` and
    /// the user config directory.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from("config.toml");
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("music-library").join("config.toml"))
            .filter(|path| path.is_file())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("DB_PATH") {
            self.db_path = value;
        }
        if let Some(value) = lookup("SERVER_ADDRESS") {
            self.server_address = value;
        }
        if let Some(value) = lookup("API_URL") {
            self.api_url = value;
        }
        if let Some(value) = lookup("MIGRATIONS_DIR") {
            self.migrations_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("STRICT_UPDATES") {
            self.strict_updates = value
                .parse()
                .map_err(|_| AppError::Config(format!("STRICT_UPDATES must be true or false, got {value:?}")))?;
        }
        if let Some(value) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = value
                .parse()
                .map_err(|_| AppError::Config(format!("REQUEST_TIMEOUT_SECS must be a number, got {value:?}")))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_url)
            .map_err(|e| AppError::Config(format!("invalid api_url {:?}: {}", self.api_url, e)))?;
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_values_fill_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/songs.db"
            api_url = "http://music-info:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, "/tmp/songs.db");
        assert_eq!(config.api_url, "http://music-info:9000");
        assert_eq!(config.server_address, "0.0.0.0:8080");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.strict_updates);
        assert!(config.migrations_dir.is_none());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("DB_PATH", "/data/music.db"),
                ("SERVER_ADDRESS", "127.0.0.1:3000"),
                ("API_URL", "http://api.local"),
                ("MIGRATIONS_DIR", "./migrations"),
                ("STRICT_UPDATES", "true"),
                ("REQUEST_TIMEOUT_SECS", "5"),
            ]))
            .unwrap();
        assert_eq!(config.db_path, "/data/music.db");
        assert_eq!(config.server_address, "127.0.0.1:3000");
        assert_eq!(config.api_url, "http://api.local");
        assert_eq!(config.migrations_dir, Some(PathBuf::from("./migrations")));
        assert!(config.strict_updates);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn malformed_environment_values_are_rejected() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("STRICT_UPDATES", "maybe")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn api_url_must_be_a_url() {
        let config = Config {
            api_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
        assert!(Config::default().validate().is_ok());
    }
}
