//! Sync engine and remote endpoint configuration.
//!
//! Both structs load from environment variables through an injectable lookup
//! so parsing can be tested without touching the process environment.

use std::env;

use crate::hash::{HashStrategy, DEFAULT_SAMPLE_THRESHOLD};
use crate::{Error, Result};

const ENV_API_BASE_URL: &str = "CORKBOARD_API_BASE_URL";
const ENV_ACCESS_TOKEN: &str = "CORKBOARD_ACCESS_TOKEN";
const ENV_SYNC_CONCURRENCY: &str = "CORKBOARD_SYNC_CONCURRENCY";
const ENV_HASH_SAMPLE_THRESHOLD: &str = "CORKBOARD_HASH_SAMPLE_THRESHOLD";

/// Default number of simultaneous image transfers per cycle.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Tuning for the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker count for image uploads and fetches
    pub concurrency: usize,
    /// How image bytes are digested for dedup
    pub hash_strategy: HashStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            hash_strategy: HashStrategy::Full,
        }
    }
}

impl EngineConfig {
    /// Load engine tuning from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        parse_engine_config(|key| env::var(key).ok())
    }

    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Remote sync API endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL without trailing slash, e.g. `https://api.example.com`
    pub api_base_url: String,
    /// Bearer token issued by the auth service
    pub access_token: Option<String>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RemoteConfig {
    /// Build a config from an explicit base URL.
    pub fn new(api_base_url: impl Into<String>, access_token: Option<String>) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url.into())?,
            access_token: non_blank(access_token),
        })
    }

    /// Load remote configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no remote variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_remote_config(|key| env::var(key).ok())
    }
}

fn parse_engine_config(lookup: impl Fn(&str) -> Option<String>) -> Result<EngineConfig> {
    let mut config = EngineConfig::default();

    if let Some(raw) = non_blank(lookup(ENV_SYNC_CONCURRENCY)) {
        let concurrency = raw.parse::<usize>().map_err(|_| {
            Error::InvalidInput(format!("{ENV_SYNC_CONCURRENCY} must be a positive integer"))
        })?;
        if concurrency == 0 {
            return Err(Error::InvalidInput(format!(
                "{ENV_SYNC_CONCURRENCY} must be a positive integer"
            )));
        }
        config.concurrency = concurrency;
    }

    if let Some(raw) = non_blank(lookup(ENV_HASH_SAMPLE_THRESHOLD)) {
        config.hash_strategy = match raw.as_str() {
            "default" => HashStrategy::Sampled {
                threshold: DEFAULT_SAMPLE_THRESHOLD,
            },
            "off" | "full" => HashStrategy::Full,
            value => HashStrategy::Sampled {
                threshold: value.parse::<usize>().map_err(|_| {
                    Error::InvalidInput(format!(
                        "{ENV_HASH_SAMPLE_THRESHOLD} must be a byte count, `default`, or `off`"
                    ))
                })?,
            },
        };
    }

    Ok(config)
}

fn parse_remote_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<RemoteConfig>> {
    let api_base_url = non_blank(lookup(ENV_API_BASE_URL));
    let access_token = non_blank(lookup(ENV_ACCESS_TOKEN));

    match (api_base_url, access_token) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(Error::InvalidInput(format!(
            "Remote configuration is incomplete. Missing: {ENV_API_BASE_URL}"
        ))),
        (Some(api_base_url), access_token) => {
            RemoteConfig::new(api_base_url, access_token).map(Some)
        }
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let value = non_blank(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
    if !has_http_scheme(&value) {
        return Err(Error::InvalidInput(format!(
            "{ENV_API_BASE_URL} must start with http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Trimmed value, or `None` when missing or blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn has_http_scheme(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn engine_from_map(map: &HashMap<&str, &str>) -> Result<EngineConfig> {
        parse_engine_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    fn remote_from_map(map: &HashMap<&str, &str>) -> Result<Option<RemoteConfig>> {
        parse_remote_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn blank_values_count_as_unset() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" \t ".to_string())), None);
        assert_eq!(non_blank(Some(" 4 ".to_string())), Some("4".to_string()));
        assert!(has_http_scheme("http://localhost:8080"));
        assert!(!has_http_scheme("ftp://example.com"));
    }

    #[test]
    fn engine_config_defaults() {
        let config = engine_from_map(&HashMap::new()).unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.hash_strategy, HashStrategy::Full);
    }

    #[test]
    fn engine_config_parses_overrides() {
        let mut map = HashMap::new();
        map.insert(ENV_SYNC_CONCURRENCY, " 6 ");
        map.insert(ENV_HASH_SAMPLE_THRESHOLD, "1048576");
        let config = engine_from_map(&map).unwrap();
        assert_eq!(config.concurrency, 6);
        assert_eq!(
            config.hash_strategy,
            HashStrategy::Sampled {
                threshold: 1_048_576
            }
        );

        map.insert(ENV_HASH_SAMPLE_THRESHOLD, "default");
        assert_eq!(
            engine_from_map(&map).unwrap().hash_strategy,
            HashStrategy::Sampled {
                threshold: DEFAULT_SAMPLE_THRESHOLD
            }
        );
    }

    #[test]
    fn engine_config_rejects_zero_concurrency() {
        let mut map = HashMap::new();
        map.insert(ENV_SYNC_CONCURRENCY, "0");
        let err = engine_from_map(&map).unwrap_err();
        assert!(err.to_string().contains(ENV_SYNC_CONCURRENCY));
    }

    #[test]
    fn remote_config_none_returns_none() {
        assert!(remote_from_map(&HashMap::new()).unwrap().is_none());
    }

    #[test]
    fn remote_config_requires_base_url() {
        let mut map = HashMap::new();
        map.insert(ENV_ACCESS_TOKEN, "token");
        let err = remote_from_map(&map).unwrap_err();
        match err {
            Error::InvalidInput(message) => assert!(message.contains(ENV_API_BASE_URL)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn remote_config_normalizes_base_url() {
        let mut map = HashMap::new();
        map.insert(ENV_API_BASE_URL, " https://api.example.com/ ");
        let config = remote_from_map(&map).unwrap().unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.access_token, None);
    }

    #[test]
    fn remote_config_rejects_missing_scheme() {
        let mut map = HashMap::new();
        map.insert(ENV_API_BASE_URL, "api.example.com");
        assert!(remote_from_map(&map).is_err());
    }

    #[test]
    fn remote_config_debug_redacts_token() {
        let config =
            RemoteConfig::new("https://api.example.com", Some("secret".to_string())).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
