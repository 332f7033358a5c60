//! Connection settings for the PostgreSQL order store.

use serde::{Deserialize, Serialize};

/// Settings the order store needs to open its pool.
///
/// The server derives this from `[storage.postgres]`; the CLI builds it from
/// `--database-url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub url: String,
    /// Upper bound on open connections.
    pub pool_size: u32,
    /// How long an acquire may wait for a free connection.
    pub connect_timeout_ms: u64,
    /// Idle connections are closed after this long. `None` keeps them open.
    pub idle_timeout_ms: Option<u64>,
    /// Apply the embedded schema before the store is handed out.
    pub run_migrations: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/orderflow".into(),
            pool_size: 10,
            connect_timeout_ms: 5000,
            idle_timeout_ms: Some(300_000),
            run_migrations: true,
        }
    }
}

impl PostgresConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    #[must_use]
    pub fn with_connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.connect_timeout_ms = timeout;
        self
    }

    #[must_use]
    pub fn with_idle_timeout_ms(mut self, timeout: Option<u64>) -> Self {
        self.idle_timeout_ms = timeout;
        self
    }

    #[must_use]
    pub fn with_run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_style_config_keeps_remaining_defaults() {
        let config = PostgresConfig::new("postgres://app:app@db:5432/orders")
            .with_pool_size(1)
            .with_run_migrations(false);

        assert_eq!(config.url, "postgres://app:app@db:5432/orders");
        assert_eq!(config.pool_size, 1);
        assert_eq!(config.connect_timeout_ms, 5000);
        assert_eq!(config.idle_timeout_ms, Some(300_000));
        assert!(!config.run_migrations);
    }
}
