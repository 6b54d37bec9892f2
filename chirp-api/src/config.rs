//! API Configuration Module
//!
//! Configuration for the listener, CORS, rate limiting, the cache layer and
//! the presence hub. Everything is loaded from environment variables with
//! defaults suitable for development.

use std::net::SocketAddr;
use std::time::Duration;

use chirp_core::{ChirpError, ConfigError};
use chirp_storage::CacheConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for the listener, CORS, rate limiting, cache and hub.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listener address.
    pub bind_addr: SocketAddr,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    pub rate_limit_enabled: bool,

    /// General API budget per client IP, per `rate_limit_api_window`.
    pub rate_limit_api_per_window: u32,

    pub rate_limit_api_window: Duration,

    /// Messages a single user may send per minute.
    pub rate_limit_messages_per_minute: u32,

    /// Tweets a single user may post per minute.
    pub rate_limit_tweets_per_minute: u32,

    // ========================================================================
    // Cache Configuration
    // ========================================================================
    pub cache_enabled: bool,

    pub feed_cache_ttl: Duration,

    pub profile_cache_ttl: Duration,

    // ========================================================================
    // Presence Hub
    // ========================================================================
    /// Capacity of the presence broadcast channel.
    pub ws_presence_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),

            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,

            rate_limit_enabled: true,
            rate_limit_api_per_window: 100,
            rate_limit_api_window: Duration::from_secs(15 * 60),
            rate_limit_messages_per_minute: 20,
            rate_limit_tweets_per_minute: 10,

            cache_enabled: true,
            feed_cache_ttl: Duration::from_secs(300),
            profile_cache_ttl: Duration::from_secs(600),

            ws_presence_capacity: 1000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        })
        .unwrap_or(default)
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CHIRP_API_BIND`: Full listener address (default: 0.0.0.0:5000)
    /// - `CHIRP_API_PORT` / `PORT`: Port only, used when no bind address is set
    /// - `CHIRP_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CHIRP_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `CHIRP_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `CHIRP_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `CHIRP_RATE_LIMIT_API_PER_WINDOW`: Requests per IP per 15 minutes (default: 100)
    /// - `CHIRP_RATE_LIMIT_MESSAGES_PER_MINUTE`: (default: 20)
    /// - `CHIRP_RATE_LIMIT_TWEETS_PER_MINUTE`: (default: 10)
    /// - `CHIRP_CACHE_ENABLED`: "true" or "false" (default: true)
    /// - `CHIRP_FEED_CACHE_TTL_SECS`: (default: 300)
    /// - `CHIRP_PROFILE_CACHE_TTL_SECS`: (default: 600)
    /// - `CHIRP_WS_PRESENCE_CAPACITY`: (default: 1000)
    pub fn from_env() -> Result<Self, ChirpError> {
        let defaults = Self::default();

        let bind_addr = match std::env::var("CHIRP_API_BIND") {
            Ok(raw) => raw.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidValue {
                    field: "CHIRP_API_BIND".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            Err(_) => {
                let port = env_parse::<u16>("CHIRP_API_PORT")
                    .or_else(|| env_parse::<u16>("PORT"))
                    .unwrap_or(defaults.bind_addr.port());
                SocketAddr::new(defaults.bind_addr.ip(), port)
            }
        };

        let cors_origins = std::env::var("CHIRP_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            bind_addr,
            cors_origins,
            cors_allow_credentials: env_flag("CHIRP_CORS_ALLOW_CREDENTIALS", false),
            cors_max_age_secs: env_parse("CHIRP_CORS_MAX_AGE_SECS")
                .unwrap_or(defaults.cors_max_age_secs),
            rate_limit_enabled: env_flag("CHIRP_RATE_LIMIT_ENABLED", true),
            rate_limit_api_per_window: env_parse("CHIRP_RATE_LIMIT_API_PER_WINDOW")
                .unwrap_or(defaults.rate_limit_api_per_window),
            rate_limit_api_window: defaults.rate_limit_api_window,
            rate_limit_messages_per_minute: env_parse("CHIRP_RATE_LIMIT_MESSAGES_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_messages_per_minute),
            rate_limit_tweets_per_minute: env_parse("CHIRP_RATE_LIMIT_TWEETS_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_tweets_per_minute),
            cache_enabled: env_flag("CHIRP_CACHE_ENABLED", true),
            feed_cache_ttl: env_parse("CHIRP_FEED_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.feed_cache_ttl),
            profile_cache_ttl: env_parse("CHIRP_PROFILE_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.profile_cache_ttl),
            ws_presence_capacity: env_parse("CHIRP_WS_PRESENCE_CAPACITY")
                .unwrap_or(defaults.ws_presence_capacity),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a component unusable.
    pub fn validate(&self) -> Result<(), ChirpError> {
        let positive = [
            ("CHIRP_RATE_LIMIT_API_PER_WINDOW", self.rate_limit_api_per_window),
            ("CHIRP_RATE_LIMIT_MESSAGES_PER_MINUTE", self.rate_limit_messages_per_minute),
            ("CHIRP_RATE_LIMIT_TWEETS_PER_MINUTE", self.rate_limit_tweets_per_minute),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0".to_string(),
                    reason: "must be greater than zero".to_string(),
                }
                .into());
            }
        }
        if self.ws_presence_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CHIRP_WS_PRESENCE_CAPACITY".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Cache settings for the coherency layer.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_enabled(self.cache_enabled)
            .with_feed_ttl(self.feed_cache_ttl)
            .with_profile_ttl(self.profile_cache_ttl)
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // *.example.com
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const KEYS: &[&str] = &[
        "CHIRP_API_BIND",
        "CHIRP_API_PORT",
        "PORT",
        "CHIRP_RATE_LIMIT_MESSAGES_PER_MINUTE",
        "CHIRP_FEED_CACHE_TTL_SECS",
        "CHIRP_CACHE_ENABLED",
        "CHIRP_WS_PRESENCE_CAPACITY",
    ];

    struct EnvVarGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvVarGuard {
        fn clear() -> Self {
            let saved = KEYS
                .iter()
                .map(|k| {
                    let prev = std::env::var(k).ok();
                    std::env::remove_var(k);
                    (*k, prev)
                })
                .collect();
            Self { saved }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(config.cors_origins.is_empty());
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_api_per_window, 100);
        assert_eq!(config.rate_limit_api_window, Duration::from_secs(900));
        assert_eq!(config.rate_limit_messages_per_minute, 20);
        assert_eq!(config.rate_limit_tweets_per_minute, 10);
        assert_eq!(config.feed_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.profile_cache_ttl, Duration::from_secs(600));
        assert_eq!(config.ws_presence_capacity, 1000);
    }

    #[test]
    fn test_from_env_overrides() -> Result<(), ChirpError> {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = EnvVarGuard::clear();
        std::env::set_var("PORT", "8081");
        std::env::set_var("CHIRP_RATE_LIMIT_MESSAGES_PER_MINUTE", "5");
        std::env::set_var("CHIRP_FEED_CACHE_TTL_SECS", "30");
        std::env::set_var("CHIRP_CACHE_ENABLED", "false");

        let config = ApiConfig::from_env()?;
        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.rate_limit_messages_per_minute, 5);
        assert_eq!(config.feed_cache_ttl, Duration::from_secs(30));
        assert!(!config.cache_enabled);
        assert!(!config.cache_config().enabled);
        Ok(())
    }

    #[test]
    fn test_bind_takes_precedence_over_port() -> Result<(), ChirpError> {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = EnvVarGuard::clear();
        std::env::set_var("CHIRP_API_BIND", "127.0.0.1:9000");
        std::env::set_var("PORT", "8081");

        let config = ApiConfig::from_env()?;
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = EnvVarGuard::clear();
        std::env::set_var("CHIRP_API_BIND", "not-an-address");
        assert!(ApiConfig::from_env().is_err());

        std::env::remove_var("CHIRP_API_BIND");
        std::env::set_var("CHIRP_WS_PRESENCE_CAPACITY", "0");
        assert!(ApiConfig::from_env().is_err());
    }

    #[test]
    fn test_origin_allowed_production() {
        let config = ApiConfig {
            cors_origins: vec![
                "https://chirp.social".to_string(),
                "*.chirp.social".to_string(),
            ],
            ..ApiConfig::default()
        };

        assert!(config.is_production());
        assert!(config.is_origin_allowed("https://chirp.social"));
        assert!(config.is_origin_allowed("https://app.chirp.social"));
        assert!(!config.is_origin_allowed("https://evil.com"));
        assert!(!config.is_origin_allowed("https://notchirp.social"));
    }

    #[test]
    fn test_origin_allowed_dev_mode() {
        let config = ApiConfig::default();
        assert!(config.is_origin_allowed("http://localhost:3000"));
    }
}
