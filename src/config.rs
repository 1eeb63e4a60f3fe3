use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::codec::{JsonCodec, TokenCodec};
use crate::errors::{StoreError, StoreResult};

pub const DEFAULT_TABLE_NAME: &str = "oauth2_token";
pub const DEFAULT_GC_INTERVAL_SECS: u64 = 600;

/// Connection parameters for the backing database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `postgres://…`, `mysql://…` or `sqlite:…`
    pub dsn: String,
    pub max_lifetime: Duration,
    pub max_open_connections: u32,
    /// sqlx pools have no idle-count cap; kept for validation and logging,
    /// idle connections are reaped by `idle_timeout`.
    pub max_idle_connections: u32,
    pub idle_timeout: Option<Duration>,
}

impl StoreConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            max_lifetime: Duration::from_secs(2 * 60 * 60),
            max_open_connections: 50,
            max_idle_connections: 25,
            idle_timeout: Some(Duration::from_secs(10 * 60)),
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.dsn.trim().is_empty() {
            return Err(StoreError::Config("connection string is empty".into()));
        }
        if self.max_open_connections == 0 {
            return Err(StoreError::Config(
                "max_open_connections must be positive".into(),
            ));
        }
        if self.max_idle_connections > self.max_open_connections {
            return Err(StoreError::Config(format!(
                "max_idle_connections ({}) exceeds max_open_connections ({})",
                self.max_idle_connections, self.max_open_connections
            )));
        }
        Ok(())
    }
}

/// Per-store settings beyond the connection itself.
#[derive(Clone)]
pub struct StoreOptions {
    pub table_name: Option<String>,
    /// Seconds between sweeps. Zero or negative selects the default.
    pub gc_interval_secs: i64,
    pub codec: Arc<dyn TokenCodec>,
    pub clock: Arc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            table_name: None,
            gc_interval_secs: 0,
            codec: Arc::new(JsonCodec),
            clock: Arc::new(SystemClock),
        }
    }
}

impl StoreOptions {
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn gc_interval_secs(mut self, secs: i64) -> Self {
        self.gc_interval_secs = secs;
        self
    }

    pub fn codec(mut self, codec: Arc<dyn TokenCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolved_table_name(&self) -> &str {
        match self.table_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_TABLE_NAME,
        }
    }

    pub fn resolved_gc_interval(&self) -> Duration {
        if self.gc_interval_secs > 0 {
            Duration::from_secs(self.gc_interval_secs as u64)
        } else {
            Duration::from_secs(DEFAULT_GC_INTERVAL_SECS)
        }
    }
}

/// Read `.env` and the environment into a config plus store options.
pub fn load() -> StoreResult<(StoreConfig, StoreOptions)> {
    dotenvy::dotenv().ok();

    let dsn = std::env::var("TOKENSTORE_DSN")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| StoreError::Config("set TOKENSTORE_DSN or DATABASE_URL".into()))?;

    let mut config = StoreConfig::new(dsn);
    if let Some(n) = env_parse("TOKENSTORE_MAX_OPEN_CONNS") {
        config.max_open_connections = n;
    }
    if let Some(n) = env_parse("TOKENSTORE_MAX_IDLE_CONNS") {
        config.max_idle_connections = n;
    }
    if let Some(secs) = env_parse("TOKENSTORE_MAX_LIFETIME_SECS") {
        config.max_lifetime = Duration::from_secs(secs);
    }

    let options = StoreOptions {
        table_name: std::env::var("TOKENSTORE_TABLE").ok(),
        gc_interval_secs: env_parse("TOKENSTORE_GC_INTERVAL_SECS").unwrap_or(0),
        ..StoreOptions::default()
    };

    Ok((config, options))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = StoreConfig::new("mysql://root@localhost/oauth");
        assert_eq!(cfg.max_lifetime, Duration::from_secs(7200));
        assert_eq!(cfg.max_open_connections, 50);
        assert_eq!(cfg.max_idle_connections, 25);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_idle_above_open() {
        let mut cfg = StoreConfig::new("sqlite::memory:");
        cfg.max_open_connections = 4;
        cfg.max_idle_connections = 5;
        assert!(matches!(cfg.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_config_rejects_empty_dsn() {
        assert!(StoreConfig::new("  ").validate().is_err());
    }

    #[test]
    fn test_options_fall_back_to_defaults() {
        let opts = StoreOptions::default().table_name("").gc_interval_secs(-5);
        assert_eq!(opts.resolved_table_name(), DEFAULT_TABLE_NAME);
        assert_eq!(opts.resolved_gc_interval(), Duration::from_secs(600));

        let opts = StoreOptions::default().table_name("grants").gc_interval_secs(30);
        assert_eq!(opts.resolved_table_name(), "grants");
        assert_eq!(opts.resolved_gc_interval(), Duration::from_secs(30));
    }
}
