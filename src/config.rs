//! Environment-driven process configuration.
//!
//! Every knob has a default matching the original deployment so the
//! binary starts with nothing but a reachable Redis (and degrades
//! gracefully even without one). Invalid values fall back to the default
//! with a warning rather than aborting startup.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Connection settings for the volatile store.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
    /// Budget for establishing a connection.
    pub connect_timeout: Duration,
    /// Budget for a single GET/SET/PING round trip.
    pub command_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Connection URL in the form `redis://[:password@]host:port/db`.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address for the HTTP server.
    pub bind: String,
    /// Port for the HTTP server.
    pub port: u16,
    pub redis: RedisConfig,
    /// TTL of the short (burst-absorbing) tier.
    pub short_cache_ttl: Duration,
    /// TTL of the long (outage-surviving) tier.
    pub fallback_cache_ttl: Duration,
    /// Directory holding the static fallback CSV files.
    pub csv_dir: PathBuf,
    /// Capacity of the parsed-CSV result cache.
    pub csv_cache_max: usize,
    /// TTL of parsed-CSV cache entries.
    pub csv_cache_ttl: Duration,
    /// Upper bound on a live fetch round trip.
    pub fetch_timeout: Duration,
    /// Basic-auth credentials accepted on protected endpoints.
    pub username: String,
    pub password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            redis: RedisConfig::default(),
            short_cache_ttl: Duration::from_secs(300),
            fallback_cache_ttl: Duration::from_secs(2_592_000),
            csv_dir: PathBuf::from("data/fallback"),
            csv_cache_max: 100,
            csv_cache_ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(30),
            username: "user1".to_string(),
            password: "password1".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env_string("HOST", defaults.bind),
            port: env_parsed("PORT", defaults.port),
            redis: RedisConfig {
                host: env_string("REDIS_HOST", defaults.redis.host),
                port: env_parsed("REDIS_PORT", defaults.redis.port),
                db: env_parsed("REDIS_DB", defaults.redis.db),
                password: std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
                connect_timeout: defaults.redis.connect_timeout,
                command_timeout: defaults.redis.command_timeout,
            },
            short_cache_ttl: env_secs("SHORT_CACHE_TTL", defaults.short_cache_ttl),
            fallback_cache_ttl: env_secs("FALLBACK_CACHE_TTL", defaults.fallback_cache_ttl),
            csv_dir: std::env::var("CSV_FALLBACK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.csv_dir),
            csv_cache_max: env_parsed("CSV_CACHE_MAX_SIZE", defaults.csv_cache_max),
            csv_cache_ttl: env_secs("CSV_CACHE_TTL", defaults.csv_cache_ttl),
            fetch_timeout: env_secs("SCRAPE_TIMEOUT", defaults.fetch_timeout),
            username: env_string("API_USERNAME", defaults.username),
            password: env_string("API_PASSWORD", defaults.password),
        }
    }
}

fn env_string(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "Ignoring unparsable environment value");
            default
        }),
        Err(_) => default,
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(var = name, value = %raw, "Ignoring unparsable TTL, using default");
                default
            }
        },
        Err(_) => default,
    }
}
