//! Environment-driven configuration.

use serde::{Deserialize, Serialize};

/// Environment variable overriding the URL every call site requests.
pub const TARGET_URL_ENV: &str = "SEAMS_TARGET_URL";

pub const DEFAULT_TARGET_URL: &str = "https://example.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_target_url")]
    pub target_url: String,
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
        }
    }
}

impl Config {
    /// Read `SEAMS_TARGET_URL`, falling back to the default for unset or
    /// empty values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let target_url = lookup(TARGET_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(default_target_url);
        Self { target_url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.target_url, "https://example.com");
    }

    #[test]
    fn empty_value_is_ignored() {
        let config = Config::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
    }

    #[test]
    fn reads_override() {
        let config = Config::from_lookup(|key| {
            assert_eq!(key, TARGET_URL_ENV);
            Some("http://127.0.0.1:3000".to_string())
        });
        assert_eq!(config.target_url, "http://127.0.0.1:3000");
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
    }
}
