//! Runtime configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATAPREP_CATALOG_DIR` | `.dataprep` |
//! | `DATAPREP_PORT` | `3000` |
//! | `DATAPREP_FALLBACK_OWNER` | unset |
//! | `DATAPREP_FETCH_TIMEOUT_SECS` | `30` |
//!
//! A `.env` file is loaded by the binary before this is read.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::catalog::DEFAULT_CATALOG_DIR;
use crate::error::ConfigError;

pub const ENV_CATALOG_DIR: &str = "DATAPREP_CATALOG_DIR";
pub const ENV_PORT: &str = "DATAPREP_PORT";
pub const ENV_FALLBACK_OWNER: &str = "DATAPREP_FALLBACK_OWNER";
pub const ENV_FETCH_TIMEOUT: &str = "DATAPREP_FETCH_TIMEOUT_SECS";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub catalog_dir: PathBuf,
    pub port: u16,
    pub fallback_owner: Option<String>,
    pub fetch_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from(DEFAULT_CATALOG_DIR),
            port: DEFAULT_PORT,
            fallback_owner: None,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            catalog_dir: get(ENV_CATALOG_DIR).map(PathBuf::from).unwrap_or(defaults.catalog_dir),
            port: parse_var(ENV_PORT, get(ENV_PORT))?.unwrap_or(defaults.port),
            fallback_owner: get(ENV_FALLBACK_OWNER),
            fetch_timeout: parse_var::<u64>(ENV_FETCH_TIMEOUT, get(ENV_FETCH_TIMEOUT))?
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
        })
    }

    pub fn with_catalog_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.catalog_dir = dir;
        }
        self
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

fn parse_var<T>(name: &str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.parse::<T>()
            .map_err(|e| ConfigError::invalid(name, format!("'{}': {}", v, e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.catalog_dir, PathBuf::from(".dataprep"));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_values_read() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_CATALOG_DIR, "/srv/presets"),
            (ENV_PORT, "8080"),
            (ENV_FALLBACK_OWNER, "eddy"),
            (ENV_FETCH_TIMEOUT, "5"),
        ]))
        .unwrap();
        assert_eq!(config.catalog_dir, PathBuf::from("/srv/presets"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.fallback_owner.as_deref(), Some("eddy"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_number_names_variable() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_PORT, "eighty")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
    }

    #[test]
    fn test_blank_is_unset_and_overrides() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_FALLBACK_OWNER, "  ")]))
            .unwrap()
            .with_port(Some(9000))
            .with_catalog_dir(None);
        assert_eq!(config.fallback_owner, None);
        assert_eq!(config.port, 9000);
        assert_eq!(config.catalog_dir, PathBuf::from(".dataprep"));
    }
}
