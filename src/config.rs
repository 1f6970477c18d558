use std::env;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://autofounder.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Process-wide settings, read once at startup.
pub struct Config {
    pub jwt_secret: String,
    pub database_url: String,
    pub bind_addr: String,
    pub openai: OpenAiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            jwt_secret: required("JWT_SECRET")?,
            database_url: optional("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind_addr: optional("BIND_ADDR", DEFAULT_BIND_ADDR),
            openai: OpenAiConfig {
                api_key: required("OPENAI_API_KEY")?,
                base_url: optional("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
                model: optional("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn missing_secret_is_fatal() {
        let result = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(result.err(), Some(ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        let result = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "   "),
            ("OPENAI_API_KEY", "sk-test"),
        ]));
        assert_eq!(result.err(), Some(ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let result = Config::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")]));
        assert_eq!(result.err(), Some(ConfigError::Missing("OPENAI_API_KEY")));
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.openai.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.openai.model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn overrides_are_respected() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "sqlite://other.db"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite://other.db");
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }
}
