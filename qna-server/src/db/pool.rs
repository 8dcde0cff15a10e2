//! Database connection pool management
//!
//! Wraps the sqlx Postgres pool behind an explicitly passed `Db` handle.
//! Sizing and deadlines come from `PoolConfig`: the pool holds at most
//! `max_connections` live connections, `acquire()` waits up to
//! `acquire_timeout` before failing with a typed error, and every pooled
//! session gets a server-side `statement_timeout` at connect time.
//! Connections are health-checked before being lent out; broken ones are
//! discarded and replaced lazily.

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};

use qna_core::config::{DatabaseConfig, PoolConfig};

use super::error::DbError;

/// Handle to the connection pool.
///
/// Cheap to clone; clones share the same underlying pool.
#[derive(Clone, Debug)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect using structured configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(&config.password);

        Self::connect_with(options, &config.pool).await
    }

    /// Connect using a raw connection URL (operator override, tests).
    pub async fn connect_url(url: &str, pool: &PoolConfig) -> Result<Self, DbError> {
        let options: PgConnectOptions = url.parse().map_err(DbError::from)?;
        Self::connect_with(options, pool).await
    }

    async fn connect_with(
        options: PgConnectOptions,
        config: &PoolConfig,
    ) -> Result<Self, DbError> {
        // SET does not accept bind parameters; the value is a config-owned
        // integer, never request input.
        let set_timeout = format!(
            "SET statement_timeout = {}",
            config.statement_timeout.as_millis()
        );

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                let set_timeout = set_timeout.clone();
                Box::pin(async move {
                    sqlx::query(&set_timeout).execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Borrow a connection from the pool.
    ///
    /// Suspends the caller until a connection is free or the acquire
    /// timeout elapses, in which case `DbError::PoolTimeout` is returned.
    /// The connection goes back to the pool when the guard drops.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, DbError> {
        self.pool.acquire().await.map_err(DbError::from)
    }

    /// Begin a transaction on a pooled connection.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, DbError> {
        self.pool.begin().await.map_err(DbError::from)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // Integration tests require a real database.
    // Run with: DATABASE_URL=postgres://... cargo test -p qna-server -- --ignored

    fn test_pool_config(max: u32, acquire_ms: u64) -> PoolConfig {
        PoolConfig {
            min_connections: 0,
            max_connections: max,
            acquire_timeout: Duration::from_millis(acquire_ms),
            statement_timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn acquire_times_out_when_exhausted() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let db = Db::connect_url(&url, &test_pool_config(1, 200))
            .await
            .expect("pool creation failed");

        let held = db.acquire().await.expect("first acquire failed");

        let err = db
            .acquire()
            .await
            .expect_err("second acquire should time out");
        assert!(matches!(err, DbError::PoolTimeout));

        drop(held);
        let _conn = db.acquire().await.expect("acquire after release failed");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn acquire_unblocks_on_release() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let db = Db::connect_url(&url, &test_pool_config(1, 5_000))
            .await
            .expect("pool creation failed");

        let held = db.acquire().await.expect("first acquire failed");

        let waiter = {
            let db = db.clone();
            tokio::spawn(async move {
                let started = tokio::time::Instant::now();
                let _conn = db.acquire().await.expect("waiter acquire failed");
                started.elapsed()
            })
        };

        tokio::time::sleep(Duration::from_millis(300)).await;
        drop(held);

        let waited = waiter.await.expect("waiter panicked");
        assert!(waited >= Duration::from_millis(250));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_holders_get_distinct_sessions() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let db = Db::connect_url(&url, &test_pool_config(2, 5_000))
            .await
            .expect("pool creation failed");

        let mut first = db.acquire().await.expect("first acquire failed");
        let mut second = db.acquire().await.expect("second acquire failed");

        let (pid_a,): (i32,) = sqlx::query_as("SELECT pg_backend_pid()")
            .fetch_one(first.as_mut())
            .await
            .expect("pid query failed");
        let (pid_b,): (i32,) = sqlx::query_as("SELECT pg_backend_pid()")
            .fetch_one(second.as_mut())
            .await
            .expect("pid query failed");

        assert_ne!(pid_a, pid_b);
    }
}
