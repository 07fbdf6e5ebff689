//! Environment configuration for the HTTP server.
//!
//! Every key has a default; a present but unparsable value is an error.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use log::info;
use santa_core::{default_log_level, StoreBackend};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub roster_path: Option<PathBuf>,
    pub base_url: String,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub store_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwd = env::current_dir().map_err(ConfigError::WorkingDir)?;
        Self::from_lookup(|key| env::var(key).ok(), cwd)
    }

    /// Builds a config from an arbitrary key lookup; relative paths resolve against `cwd`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        cwd: PathBuf,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port: u16 = try_load(&var, "SANTA_PORT", "8080")?;
        let store_timeout_ms: u64 = try_load(&var, "SANTA_STORE_TIMEOUT_MS", "5000")?;
        if store_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "SANTA_STORE_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        let store_timeout = Duration::from_millis(store_timeout_ms);

        let backend = match load_or(&var, "SANTA_BACKEND", "sqlite").as_str() {
            "sqlite" => StoreBackend::Sqlite {
                path: cwd.join(load_or(&var, "SANTA_DB_PATH", "santa.sqlite3")),
                busy_timeout: store_timeout,
            },
            "document" | "json" => StoreBackend::Document {
                path: cwd.join(load_or(&var, "SANTA_DOCUMENT_PATH", "santa.json")),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "SANTA_BACKEND",
                    value: other.to_string(),
                    reason: "expected `sqlite` or `document`".to_string(),
                })
            }
        };

        let default_base_url = format!("http://localhost:{port}");
        Ok(Self {
            bind: load_or(&var, "SANTA_BIND", "0.0.0.0"),
            port,
            backend,
            roster_path: var("SANTA_ROSTER").map(|path| cwd.join(path)),
            base_url: load_or(&var, "SANTA_BASE_URL", &default_base_url),
            log_level: load_or(&var, "SANTA_LOG_LEVEL", default_log_level()),
            log_dir: cwd.join(load_or(&var, "SANTA_LOG_DIR", "logs")),
            store_timeout,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn load_or(var: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| {
        info!("event=config_default module=config key={key} value={default}");
        default.to_string()
    })
}

fn try_load<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = load_or(var, key, default);
    raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned(), PathBuf::from("/srv/santa"))
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.log_dir, PathBuf::from("/srv/santa/logs"));
        assert_eq!(config.roster_path, None);
        assert_eq!(
            config.backend,
            StoreBackend::Sqlite {
                path: PathBuf::from("/srv/santa/santa.sqlite3"),
                busy_timeout: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn document_backend_and_absolute_paths() {
        let config = config(&[
            ("SANTA_BACKEND", "document"),
            ("SANTA_DOCUMENT_PATH", "/data/draw.json"),
            ("SANTA_ROSTER", "roster.json"),
            ("SANTA_PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(
            config.backend,
            StoreBackend::Document {
                path: PathBuf::from("/data/draw.json")
            }
        );
        assert_eq!(
            config.roster_path,
            Some(PathBuf::from("/srv/santa/roster.json"))
        );
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config(&[("SANTA_PORT", "  ")]).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            config(&[("SANTA_PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "SANTA_PORT", .. })
        ));
        assert!(matches!(
            config(&[("SANTA_BACKEND", "redis")]),
            Err(ConfigError::Invalid { key: "SANTA_BACKEND", .. })
        ));
        assert!(matches!(
            config(&[("SANTA_STORE_TIMEOUT_MS", "0")]),
            Err(ConfigError::Invalid { key: "SANTA_STORE_TIMEOUT_MS", .. })
        ));
    }
}
