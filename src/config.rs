//! Application configuration loaded from TOML.
//!
//! Every section is optional; missing keys fall back to the defaults the
//! form was designed around (local SQLite database, three connection
//! attempts one second apart, five rows of history).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::{DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "STUDENT_PERF_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub history: HistoryConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://student_performance.db`.
    pub url: String,
    /// Connection attempts per `ensure` call.
    pub max_retries: u32,
    /// Wait between failed attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://student_performance.db".to_string(),
            max_retries: 3,
            backoff_ms: 1000,
        }
    }
}

impl DatabaseConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/performance_model.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Rows shown under "Recent Predictions".
    pub recent_limit: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { recent_limit: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Browser sessions kept at once; the least recently used is dropped.
    pub max_sessions: usize,
    /// Sessions unused for this long are dropped with their connection.
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl AppConfig {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Loads the file named by `STUDENT_PERF_CONFIG`, or the default path.
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an
    /// error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(&path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        if self.database.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "database.max_retries must be at least 1".into(),
            ));
        }
        if self.history.recent_limit == 0 {
            return Err(ConfigError::Invalid(
                "history.recent_limit must be at least 1".into(),
            ));
        }
        if self.session.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "session.max_sessions must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database.max_retries, 3);
        assert_eq!(config.database.backoff(), Duration::from_secs(1));
        assert_eq!(config.history.recent_limit, 5);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            url = "sqlite::memory:"
            backoff_ms = 10

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.backoff_ms, 10);
        assert_eq!(config.database.max_retries, 3);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn rejects_zero_retries() {
        let err = AppConfig::from_toml("[database]\nmax_retries = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn session_limits_are_configurable() {
        let config =
            AppConfig::from_toml("[session]\nmax_sessions = 8\nidle_timeout_secs = 60\n").unwrap();
        assert_eq!(config.session.max_sessions, 8);
        assert_eq!(config.session.idle_timeout(), Duration::from_secs(60));

        let err = AppConfig::from_toml("[session]\nmax_sessions = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = AppConfig::from_toml("[server\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[history]\nrecent_limit = 10").unwrap();
        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.history.recent_limit, 10);
    }
}
