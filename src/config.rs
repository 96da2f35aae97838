//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use time::{UtcOffset, macros::format_description};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GUESS_POOL_CONFIG_PATH";
/// Environment variable overriding the configured UTC offset.
const UTC_OFFSET_ENV: &str = "TZ_OFFSET";
/// Environment variable overriding the token verification secret.
const AUTH_SECRET_ENV: &str = "APP_SECRET";
const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    utc_offset: UtcOffset,
    max_code_attempts: u32,
    auth_secret: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults, then
    /// apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let from_file = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        let raw = from_file.with_env_overrides(
            env::var(UTC_OFFSET_ENV).ok(),
            env::var(AUTH_SECRET_ENV).ok(),
        );
        let config = Self::from(raw);
        if config.auth_secret.is_none() {
            warn!("no token secret configured; authenticated routes will reject every request");
        }
        config
    }

    /// Replace the token verification secret.
    pub fn with_auth_secret(mut self, secret: impl Into<String>) -> Self {
        self.auth_secret = Some(secret.into());
        self
    }

    /// Replace the number of pool code generation attempts.
    pub fn with_max_code_attempts(mut self, attempts: u32) -> Self {
        self.max_code_attempts = attempts.max(1);
        self
    }

    /// Offset in which the service reports "now".
    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset
    }

    /// How many codes pool creation tries before giving up.
    pub fn max_code_attempts(&self) -> u32 {
        self.max_code_attempts
    }

    /// HS256 secret used to verify bearer tokens.
    pub fn auth_secret(&self) -> Option<&str> {
        self.auth_secret.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            utc_offset: UtcOffset::UTC,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
            auth_secret: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    utc_offset: Option<String>,
    #[serde(default)]
    max_code_attempts: Option<u32>,
    #[serde(default)]
    auth_secret: Option<String>,
}

impl RawConfig {
    fn with_env_overrides(
        mut self,
        utc_offset: Option<String>,
        auth_secret: Option<String>,
    ) -> Self {
        if let Some(offset) = utc_offset.filter(|value| !value.trim().is_empty()) {
            self.utc_offset = Some(offset);
        }
        if let Some(secret) = auth_secret.filter(|value| !value.is_empty()) {
            self.auth_secret = Some(secret);
        }
        self
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let utc_offset = match value.utc_offset.as_deref() {
            Some(raw) => parse_offset(raw).unwrap_or_else(|| {
                warn!(value = raw, "invalid utc offset; using UTC");
                defaults.utc_offset
            }),
            None => defaults.utc_offset,
        };

        Self {
            utc_offset,
            max_code_attempts: value
                .max_code_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.max_code_attempts),
            auth_secret: value
                .auth_secret
                .filter(|secret| !secret.is_empty())
                .or(defaults.auth_secret),
        }
    }
}

/// Parse `+HH:MM` / `-HH:MM`; `Z` and `UTC` mean zero.
fn parse_offset(raw: &str) -> Option<UtcOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Some(UtcOffset::UTC);
    }
    UtcOffset::parse(
        raw,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .ok()
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use time::macros::offset;

    use super::*;

    #[test]
    fn parses_signed_offsets() {
        assert_eq!(parse_offset("-03:00"), Some(offset!(-3)));
        assert_eq!(parse_offset("+05:30"), Some(offset!(+5:30)));
        assert_eq!(parse_offset("Z"), Some(UtcOffset::UTC));
        assert_eq!(parse_offset("03:00"), None);
        assert_eq!(parse_offset("tomorrow"), None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"utc_offset": "-03:00"}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.utc_offset(), offset!(-3));
        assert_eq!(config.max_code_attempts(), DEFAULT_MAX_CODE_ATTEMPTS);
        assert_eq!(config.auth_secret(), None);
    }

    #[test]
    fn environment_overrides_file_values() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"auth_secret": "from-file", "max_code_attempts": 9}"#)
                .unwrap();
        let config = AppConfig::from(
            raw.with_env_overrides(Some("+01:00".into()), Some("from-env".into())),
        );
        assert_eq!(config.auth_secret(), Some("from-env"));
        assert_eq!(config.utc_offset(), offset!(+1));
        assert_eq!(config.max_code_attempts(), 9);
    }

    #[test]
    fn invalid_values_fall_back() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"utc_offset": "nope", "max_code_attempts": 0}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.utc_offset(), UtcOffset::UTC);
        assert_eq!(config.max_code_attempts(), DEFAULT_MAX_CODE_ATTEMPTS);
    }
}
