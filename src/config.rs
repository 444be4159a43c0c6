//! Process configuration loaded from the environment

use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

/// Default Gemini model, matching what the mobile app was built against
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Errors raised while reading configuration at start-up
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set (or is empty)
    #[error("{0} not found in environment variables")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Model-service API key
    pub gemini_api_key: String,
    /// Model identifier passed to the model service
    pub gemini_model: String,
    /// Hosted relational store URL (REST endpoint root)
    pub store_url: String,
    /// Public (anon) key for the hosted store
    pub store_key: String,
    /// Optional direct Postgres connection string; overrides the REST backend
    pub database_url: Option<String>,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Maximum number of turns replayed to the model per call
    pub chat_history_limit: usize,
}

impl AppConfig {
    /// Load configuration from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let store_url = get("SUPABASE_URL")
            .or_else(|| get("EXPO_PUBLIC_SUPABASE_URL"))
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let store_key = get("SUPABASE_ANON_KEY")
            .or_else(|| get("EXPO_PUBLIC_SUPABASE_ANON_KEY"))
            .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let gemini_model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let database_url = get("DATABASE_URL");

        let host: IpAddr = match get("HOST") {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "HOST",
                reason: e.to_string(),
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port: u16 = match get("PORT") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var: "PORT",
                reason: e.to_string(),
            })?,
            None => 5000,
        };

        let chat_history_limit = match get("CHAT_HISTORY_LIMIT") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        var: "CHAT_HISTORY_LIMIT",
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "CHAT_HISTORY_LIMIT",
                        reason: e.to_string(),
                    })
                }
            },
            None => 100,
        };

        Ok(Self {
            gemini_api_key,
            gemini_model,
            store_url,
            store_key,
            database_url,
            bind_addr: SocketAddr::new(host, port),
            chat_history_limit,
        })
    }
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

    const REQUIRED: &[(&str, &str)] = &[
        ("GEMINI_API_KEY", "gem-key"),
        ("SUPABASE_URL", "https://example.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon-key"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.gemini_api_key, "gem-key");
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.chat_history_limit, 100);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_missing_api_key() {
        let err = AppConfig::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GEMINI_API_KEY")));
    }

    #[test]
    fn test_missing_store_credentials() {
        let err = AppConfig::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SUPABASE_ANON_KEY")));
        assert!(err.to_string().contains("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn test_expo_aliases() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("EXPO_PUBLIC_SUPABASE_URL", "https://alias.supabase.co"),
            ("EXPO_PUBLIC_SUPABASE_ANON_KEY", "alias-key"),
        ]))
        .unwrap();
        assert_eq!(config.store_url, "https://alias.supabase.co");
        assert_eq!(config.store_key, "alias-key");
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "  "),
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon-key"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GEMINI_API_KEY")));
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "not-a-port"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn test_zero_history_limit_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("CHAT_HISTORY_LIMIT", "0"));
        assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("GEMINI_MODEL", "gemini-2.5-flash"),
            ("DATABASE_URL", "postgresql://u:p@localhost:5432/app"),
            ("CHAT_HISTORY_LIMIT", "20"),
        ]);
        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.chat_history_limit, 20);
        assert!(config.database_url.is_some());
    }
}
