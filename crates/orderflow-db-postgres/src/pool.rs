//! Pool construction for the order store.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{info, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

/// Connections older than this are recycled.
const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Opens a pool sized and timed by `config`.
///
/// One connection is kept warm so the first ingest write after an idle
/// period does not pay for a handshake.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    if config.pool_size == 0 {
        return Err(PostgresError::config("pool_size must be greater than 0"));
    }

    let pool = PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size)
        .min_connections(1)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis))
        .max_lifetime(MAX_CONNECTION_LIFETIME)
        .connect(&config.url)
        .await?;

    info!(pool_size = config.pool_size, "order store pool ready");
    Ok(pool)
}

/// Hides the password part of a connection URL for log output.
pub fn mask_password(url: &str) -> String {
    let Some((credentials, host)) = url.split_once('@') else {
        return url.to_string();
    };
    let (scheme, userinfo) = credentials.split_once("://").unwrap_or(("", credentials));
    match userinfo.split_once(':') {
        Some((user, _)) if scheme.is_empty() => format!("{user}:****@{host}"),
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        for (url, masked) in [
            (
                "postgres://orders:secret@db:5432/orders",
                "postgres://orders:****@db:5432/orders",
            ),
            ("postgres://orders@db/orders", "postgres://orders@db/orders"),
            ("postgres://db/orders", "postgres://db/orders"),
        ] {
            assert_eq!(mask_password(url), masked, "{url}");
        }
    }

    #[tokio::test]
    async fn test_zero_pool_size_rejected() {
        let config = PostgresConfig::default().with_pool_size(0);
        let err = create_pool(&config).await.unwrap_err();
        assert!(matches!(err, PostgresError::Config { .. }));
    }
}
