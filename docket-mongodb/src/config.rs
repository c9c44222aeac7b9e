//! MongoDB connection configuration.

use std::collections::HashMap;
use std::time::Duration;

use mongodb::options::ClientOptions;

use crate::error::{MongoError, MongoResult};

/// Default connection URI.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Retry policy for connection establishment.
///
/// Attempt `0` runs immediately; attempt `n > 0` waits
/// `min(base_backoff * 2^(n-1), max_backoff)` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub base_backoff: Duration,
    /// Upper bound for any single backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_retries: u32, base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
            max_backoff,
        }
    }

    /// Total attempts the policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before the given attempt (zero for attempt 0).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// MongoDB connection configuration.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,
    /// Maximum idle time for connections.
    pub max_idle_time: Option<Duration>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Bound on each round trip the client makes on its own behalf: the
    /// connection ping and health checks. The 2.x driver has no per-socket
    /// timeout, so this is enforced around those calls.
    pub socket_timeout: Option<Duration>,
    /// Read preference.
    pub read_preference: Option<ReadPreference>,
    /// Write concern.
    pub write_concern: Option<WriteConcern>,
    /// Retry writes.
    pub retry_writes: Option<bool>,
    /// Retry reads.
    pub retry_reads: Option<bool>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
    /// Retry policy for establishing the connection.
    pub retry: RetryPolicy,
}

/// MongoDB read preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPreference {
    /// Read from primary only.
    #[default]
    Primary,
    /// Read from primary preferred, fallback to secondary.
    PrimaryPreferred,
    /// Read from secondary only.
    Secondary,
    /// Read from secondary preferred, fallback to primary.
    SecondaryPreferred,
    /// Read from nearest member.
    Nearest,
}

/// MongoDB write concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteConcern {
    /// Acknowledge writes from the specified number of nodes.
    W(u32),
    /// Acknowledge writes from majority of nodes.
    Majority,
    /// Custom tag set.
    Custom(String),
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: String::new(),
            app_name: Some("docket".to_string()),
            min_pool_size: Some(5),
            max_pool_size: Some(100),
            max_idle_time: Some(Duration::from_secs(300)),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            socket_timeout: Some(Duration::from_secs(30)),
            read_preference: Some(ReadPreference::Primary),
            write_concern: None,
            retry_writes: Some(true),
            retry_reads: Some(true),
            direct_connection: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl MongoConfig {
    /// Create a new configuration from a MongoDB URI.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Load configuration from `DOCKET_MONGODB_*` environment variables.
    pub fn from_env() -> MongoResult<Self> {
        Self::from_env_source(&StdEnvSource)
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_env_source(source: &dyn EnvSource) -> MongoResult<Self> {
        let mut builder = Self::builder();

        if let Some(uri) = source.get("DOCKET_MONGODB_URI") {
            builder = builder.uri(uri);
        }
        if let Some(database) = source.get("DOCKET_MONGODB_DATABASE") {
            builder = builder.database(database);
        }
        if let Some(min) = parse_var::<u32>(source, "DOCKET_MONGODB_MIN_POOL")? {
            builder = builder.min_pool_size(min);
        }
        if let Some(max) = parse_var::<u32>(source, "DOCKET_MONGODB_MAX_POOL")? {
            builder = builder.max_pool_size(max);
        }
        if let Some(ms) = parse_var::<u64>(source, "DOCKET_MONGODB_CONNECT_TIMEOUT_MS")? {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }

        let mut retry = RetryPolicy::default();
        if let Some(n) = parse_var::<u32>(source, "DOCKET_MONGODB_MAX_RETRIES")? {
            retry.max_retries = n;
        }
        if let Some(ms) = parse_var::<u64>(source, "DOCKET_MONGODB_BASE_BACKOFF_MS")? {
            retry.base_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(source, "DOCKET_MONGODB_MAX_BACKOFF_MS")? {
            retry.max_backoff = Duration::from_millis(ms);
        }

        builder.retry_policy(retry).build()
    }

    /// Convert to MongoDB ClientOptions.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }

        if let Some(min_pool) = self.min_pool_size {
            options.min_pool_size = Some(min_pool);
        }

        if let Some(max_pool) = self.max_pool_size {
            options.max_pool_size = Some(max_pool);
        }

        if let Some(max_idle) = self.max_idle_time {
            options.max_idle_time = Some(max_idle);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            options.connect_timeout = Some(connect_timeout);
        }

        if let Some(selection_timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(selection_timeout);
        }

        if let Some(ref read_pref) = self.read_preference {
            options.selection_criteria = Some(mongodb::options::SelectionCriteria::ReadPreference(
                read_pref.to_driver(),
            ));
        }

        if let Some(ref wc) = self.write_concern {
            options.write_concern = Some(match wc {
                WriteConcern::W(n) => mongodb::options::WriteConcern::builder()
                    .w(mongodb::options::Acknowledgment::Nodes(*n))
                    .build(),
                WriteConcern::Majority => mongodb::options::WriteConcern::builder()
                    .w(mongodb::options::Acknowledgment::Majority)
                    .build(),
                WriteConcern::Custom(tag) => mongodb::options::WriteConcern::builder()
                    .w(mongodb::options::Acknowledgment::Custom(tag.clone()))
                    .build(),
            });
        }

        if let Some(retry_writes) = self.retry_writes {
            options.retry_writes = Some(retry_writes);
        }

        if let Some(retry_reads) = self.retry_reads {
            options.retry_reads = Some(retry_reads);
        }

        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }
}

impl ReadPreference {
    fn to_driver(self) -> mongodb::options::ReadPreference {
        use mongodb::options::ReadPreference as Driver;

        match self {
            Self::Primary => Driver::Primary,
            Self::PrimaryPreferred => Driver::PrimaryPreferred {
                options: Default::default(),
            },
            Self::Secondary => Driver::Secondary {
                options: Default::default(),
            },
            Self::SecondaryPreferred => Driver::SecondaryPreferred {
                options: Default::default(),
            },
            Self::Nearest => Driver::Nearest {
                options: Default::default(),
            },
        }
    }
}

/// Source for environment variables.
pub trait EnvSource: Send + Sync {
    /// Get an environment variable value.
    fn get(&self, name: &str) -> Option<String>;
}

/// Default environment source using std::env.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Environment source backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapEnvSource {
    vars: HashMap<String, String>,
}

impl MapEnvSource {
    /// Create a new map-based environment source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

fn parse_var<T: std::str::FromStr>(source: &dyn EnvSource, name: &str) -> MongoResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match source.get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| MongoError::config(format!("{}: {}", name, e))),
        None => Ok(None),
    }
}

/// Builder for MongoDB configuration.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    max_idle_time: Option<Duration>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    socket_timeout: Option<Duration>,
    read_preference: Option<ReadPreference>,
    write_concern: Option<WriteConcern>,
    retry_writes: Option<bool>,
    retry_reads: Option<bool>,
    direct_connection: Option<bool>,
    retry: Option<RetryPolicy>,
}

impl MongoConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the maximum idle time for connections.
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.max_idle_time = Some(duration);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Set the socket timeout.
    pub fn socket_timeout(mut self, duration: Duration) -> Self {
        self.socket_timeout = Some(duration);
        self
    }

    /// Set the read preference.
    pub fn read_preference(mut self, pref: ReadPreference) -> Self {
        self.read_preference = Some(pref);
        self
    }

    /// Set the write concern.
    pub fn write_concern(mut self, wc: WriteConcern) -> Self {
        self.write_concern = Some(wc);
        self
    }

    /// Enable or disable retry writes.
    pub fn retry_writes(mut self, enabled: bool) -> Self {
        self.retry_writes = Some(enabled);
        self
    }

    /// Enable or disable retry reads.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = Some(enabled);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Set the connection retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Set the number of connection retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.retry.get_or_insert_with(RetryPolicy::default).max_retries = retries;
        self
    }

    /// Set the backoff bounds for connection retries.
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        let retry = self.retry.get_or_insert_with(RetryPolicy::default);
        retry.base_backoff = base;
        retry.max_backoff = max;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoResult<MongoConfig> {
        let database = self
            .database
            .filter(|d| !d.is_empty())
            .ok_or_else(|| MongoError::config("database name is required"))?;

        let defaults = MongoConfig::default();
        let min_pool_size = self.min_pool_size.or(defaults.min_pool_size);
        let max_pool_size = self.max_pool_size.or(defaults.max_pool_size);

        if let (Some(min), Some(max)) = (min_pool_size, max_pool_size) {
            if min > max {
                return Err(MongoError::config(format!(
                    "min_pool_size ({}) exceeds max_pool_size ({})",
                    min, max
                )));
            }
        }

        let retry = self.retry.unwrap_or_default();
        if retry.base_backoff > retry.max_backoff {
            return Err(MongoError::config(
                "base backoff must not exceed max backoff",
            ));
        }

        Ok(MongoConfig {
            uri: self.uri.unwrap_or(defaults.uri),
            database,
            app_name: self.app_name.or(defaults.app_name),
            min_pool_size,
            max_pool_size,
            max_idle_time: self.max_idle_time.or(defaults.max_idle_time),
            connect_timeout: self.connect_timeout.or(defaults.connect_timeout),
            server_selection_timeout: self
                .server_selection_timeout
                .or(defaults.server_selection_timeout),
            socket_timeout: self.socket_timeout.or(defaults.socket_timeout),
            read_preference: self.read_preference.or(defaults.read_preference),
            write_concern: self.write_concern,
            retry_writes: self.retry_writes.or(defaults.retry_writes),
            retry_reads: self.retry_reads.or(defaults.retry_reads),
            direct_connection: self.direct_connection,
            retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_uri() {
        let config = MongoConfig::from_uri("mongodb://db.internal:27017", "inventory");
        assert_eq!(config.uri, "mongodb://db.internal:27017");
        assert_eq!(config.database, "inventory");
        assert_eq!(config.min_pool_size, Some(5));
        assert_eq!(config.max_pool_size, Some(100));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_config_builder() {
        let config = MongoConfig::builder()
            .database("inventory")
            .app_name("orders-api")
            .max_pool_size(20)
            .max_retries(5)
            .build()
            .unwrap();

        assert_eq!(config.uri, DEFAULT_URI);
        assert_eq!(config.app_name, Some("orders-api".to_string()));
        assert_eq!(config.max_pool_size, Some(20));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_config_builder_missing_database() {
        assert!(MongoConfig::builder().uri(DEFAULT_URI).build().is_err());
        assert!(MongoConfig::builder().database("").build().is_err());
    }

    #[test]
    fn test_config_builder_rejects_inverted_bounds() {
        let result = MongoConfig::builder()
            .database("db")
            .min_pool_size(50)
            .max_pool_size(10)
            .build();
        assert!(matches!(result, Err(MongoError::Config(_))));

        let result = MongoConfig::builder()
            .database("db")
            .backoff(Duration::from_secs(10), Duration::from_secs(1))
            .build();
        assert!(matches!(result, Err(MongoError::Config(_))));
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_secs(5));
        assert_eq!(policy.backoff_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for_attempt(7), Duration::from_secs(5));
        assert_eq!(policy.backoff_for_attempt(64), Duration::from_secs(5));
        assert_eq!(policy.max_attempts(), 11);
    }

    #[test]
    fn test_from_env_source() {
        let source = MapEnvSource::new()
            .set("DOCKET_MONGODB_URI", "mongodb://replica:27017")
            .set("DOCKET_MONGODB_DATABASE", "catalog")
            .set("DOCKET_MONGODB_MAX_POOL", "40")
            .set("DOCKET_MONGODB_MAX_RETRIES", "7")
            .set("DOCKET_MONGODB_BASE_BACKOFF_MS", "50");

        let config = MongoConfig::from_env_source(&source).unwrap();
        assert_eq!(config.uri, "mongodb://replica:27017");
        assert_eq!(config.database, "catalog");
        assert_eq!(config.max_pool_size, Some(40));
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.retry.base_backoff, Duration::from_millis(50));
        assert_eq!(config.retry.max_backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_from_env_source_rejects_bad_numbers() {
        let source = MapEnvSource::new()
            .set("DOCKET_MONGODB_DATABASE", "catalog")
            .set("DOCKET_MONGODB_MAX_POOL", "lots");
        let err = MongoConfig::from_env_source(&source).unwrap_err();
        assert!(err.to_string().contains("DOCKET_MONGODB_MAX_POOL"));
    }

    #[test]
    fn test_read_preference_default() {
        let pref: ReadPreference = Default::default();
        assert_eq!(pref, ReadPreference::Primary);
    }
}
