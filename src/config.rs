//! Runtime settings, read from `ROOMHUB_*` environment variables.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_POSTAL_BASE_URL: &str = "https://api.copomex.com/query";
/// COPOMEX's public test token; real deployments set `ROOMHUB_POSTAL_TOKEN`.
pub const DEFAULT_POSTAL_TOKEN: &str = "pruebas";
pub const DEFAULT_ROOMS_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub postal_base_url: String,
    pub postal_token: String,
    pub rooms_base_url: String,
    pub http_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub token_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            postal_base_url: DEFAULT_POSTAL_BASE_URL.into(),
            postal_token: DEFAULT_POSTAL_TOKEN.into(),
            rooms_base_url: DEFAULT_ROOMS_BASE_URL.into(),
            http_timeout: Duration::from_secs(10),
            host: "127.0.0.1".into(),
            port: 8080,
            token_path: default_token_path(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            postal_base_url: load(&lookup, "ROOMHUB_POSTAL_BASE_URL", defaults.postal_base_url)?,
            postal_token: lookup("ROOMHUB_POSTAL_TOKEN").unwrap_or(defaults.postal_token),
            rooms_base_url: load(&lookup, "ROOMHUB_ROOMS_BASE_URL", defaults.rooms_base_url)?,
            http_timeout: Duration::from_secs(load(&lookup, "ROOMHUB_HTTP_TIMEOUT_SECS", 10u64)?),
            host: load(&lookup, "ROOMHUB_HOST", defaults.host)?,
            port: load(&lookup, "ROOMHUB_PORT", defaults.port)?,
            token_path: lookup("ROOMHUB_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_path),
        })
    }
}

fn load<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => {
            debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn default_token_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".roomhub")
        .join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings.postal_base_url, DEFAULT_POSTAL_BASE_URL);
        assert_eq!(settings.rooms_base_url, DEFAULT_ROOMS_BASE_URL);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.http_timeout, Duration::from_secs(10));
        assert!(settings.token_path.ends_with(".roomhub/session.json"));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("ROOMHUB_POSTAL_TOKEN", "secret"),
            ("ROOMHUB_PORT", " 9000 "),
            ("ROOMHUB_HTTP_TIMEOUT_SECS", "3"),
            ("ROOMHUB_TOKEN_PATH", "/tmp/rh.json"),
        ]))
        .unwrap();
        assert_eq!(settings.postal_token, "secret");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.http_timeout, Duration::from_secs(3));
        assert_eq!(settings.token_path, PathBuf::from("/tmp/rh.json"));
    }

    #[test]
    fn test_invalid_port() {
        let err = Settings::from_lookup(lookup_from(&[("ROOMHUB_PORT", "http")])).unwrap_err();
        assert!(err.to_string().starts_with("invalid ROOMHUB_PORT value 'http'"));
    }
}
