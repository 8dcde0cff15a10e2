//! Schema migration engine
//!
//! Ordered, versioned schema changes applied at startup, before the HTTP
//! listener binds. Applied state lives in the `_qna_migrations` table
//! (append-only `version`/`applied_at` records) so every process observes
//! the same view. Concurrent runs are serialized by a session-level
//! advisory lock; a process that cannot obtain it within the lock timeout
//! fails instead of racing.
//!
//! Each migration runs in its own transaction and is recorded before the
//! next one starts. The first failure aborts the run, leaving the schema
//! at the last committed version.

use std::time::Duration;

use sqlx::postgres::PgConnection;
use sqlx::{Connection, Row};
use thiserror::Error;

use super::error::DbError;
use super::pool::Db;

/// Advisory lock key shared by every process migrating this database.
const MIGRATION_LOCK_KEY: i64 = 7_421_000_113;

/// How often a blocked process re-checks the advisory lock.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Default patience for the advisory lock.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// A single versioned schema change.
///
/// `version` is derived from the migration's creation timestamp
/// (`YYYYMMDDHHMMSS`), which makes the set totally ordered. `up` and
/// `down` are opaque statement batches executed over the simple query
/// protocol.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static str,
    pub down: Option<&'static str>,
}

/// Migration error
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("migration {version} ({name}) failed: {source}")]
    Failed {
        version: i64,
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration set invalid: {reason}")]
    InvalidSet { reason: String },

    #[error("pending migration {pending} is older than applied version {applied}")]
    OutOfOrder { pending: i64, applied: i64 },

    #[error("applied version {version} is not in the migration set")]
    UnknownVersion { version: i64 },

    #[error("migration {version} ({name}) has no down migration")]
    NoDown { version: i64, name: String },

    #[error("could not obtain the migration lock within {0:?}")]
    LockTimeout(Duration),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for MigrateError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(DbError::from(err))
    }
}

/// The migration engine: an ordered set of migrations plus lock patience.
#[derive(Debug)]
pub struct Migrator {
    migrations: Vec<Migration>,
    lock_timeout: Duration,
}

impl Migrator {
    /// Create an engine over the given set.
    ///
    /// # Errors
    ///
    /// The set must be strictly ascending by version; duplicates and
    /// out-of-order definitions are rejected up front.
    pub fn new(migrations: Vec<Migration>) -> Result<Self, MigrateError> {
        for pair in migrations.windows(2) {
            if pair[1].version <= pair[0].version {
                return Err(MigrateError::InvalidSet {
                    reason: format!(
                        "versions must be strictly ascending, got {} after {}",
                        pair[1].version, pair[0].version
                    ),
                });
            }
        }

        Ok(Self {
            migrations,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Engine over the schema this service ships with.
    pub fn baseline() -> Self {
        Self::new(baseline_migrations()).expect("baseline migration set is ordered")
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Apply all pending migrations in ascending version order.
    ///
    /// Returns the number of migrations applied; zero means the schema
    /// was already up to date (running twice in a row is a no-op).
    pub async fn run(&self, db: &Db) -> Result<usize, MigrateError> {
        let mut conn = db.acquire().await?;
        self.lock(conn.as_mut()).await?;

        let result = self.run_locked(conn.as_mut()).await;

        if let Err(err) = unlock(conn.as_mut()).await {
            tracing::warn!("failed to release migration lock: {}", err);
        }

        result
    }

    /// Undo exactly one version, the newest applied.
    ///
    /// Returns the reverted version, or `None` if nothing was applied.
    /// An operational tool, not part of normal startup.
    pub async fn revert_last(&self, db: &Db) -> Result<Option<i64>, MigrateError> {
        let mut conn = db.acquire().await?;
        self.lock(conn.as_mut()).await?;

        let result = self.revert_locked(conn.as_mut()).await;

        if let Err(err) = unlock(conn.as_mut()).await {
            tracing::warn!("failed to release migration lock: {}", err);
        }

        result
    }

    async fn run_locked(&self, conn: &mut PgConnection) -> Result<usize, MigrateError> {
        ensure_table(conn).await?;

        let applied = applied_versions(conn).await?;
        let pending = self.pending(&applied)?;

        if pending.is_empty() {
            tracing::info!("schema up to date, nothing to migrate");
            return Ok(0);
        }

        let mut count = 0;
        for migration in pending {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "applying migration"
            );
            apply(conn, migration).await?;
            count += 1;
        }

        tracing::info!(applied = count, "migrations complete");
        Ok(count)
    }

    async fn revert_locked(&self, conn: &mut PgConnection) -> Result<Option<i64>, MigrateError> {
        ensure_table(conn).await?;

        let applied = applied_versions(conn).await?;
        let Some(newest) = applied.last().copied() else {
            return Ok(None);
        };

        let migration = self
            .migrations
            .iter()
            .find(|m| m.version == newest)
            .ok_or(MigrateError::UnknownVersion { version: newest })?;

        let down = migration.down.ok_or_else(|| MigrateError::NoDown {
            version: migration.version,
            name: migration.name.to_owned(),
        })?;

        let mut tx = conn.begin().await?;
        sqlx::raw_sql(down)
            .execute(&mut *tx)
            .await
            .map_err(|source| MigrateError::Failed {
                version: migration.version,
                name: migration.name.to_owned(),
                source,
            })?;
        sqlx::query("DELETE FROM _qna_migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(version = newest, "reverted migration");
        Ok(Some(newest))
    }

    /// Select the migrations still to apply, preserving set order.
    ///
    /// A not-yet-applied version older than the newest applied one means
    /// the set and the store disagree about history; that is an error,
    /// never a silent out-of-order apply.
    fn pending(&self, applied: &[i64]) -> Result<Vec<&Migration>, MigrateError> {
        let newest_applied = applied.iter().copied().max();

        let mut pending = Vec::new();
        for migration in &self.migrations {
            if applied.contains(&migration.version) {
                continue;
            }

            if let Some(newest) = newest_applied {
                if migration.version < newest {
                    return Err(MigrateError::OutOfOrder {
                        pending: migration.version,
                        applied: newest,
                    });
                }
            }

            pending.push(migration);
        }

        Ok(pending)
    }

    async fn lock(&self, conn: &mut PgConnection) -> Result<(), MigrateError> {
        let deadline = std::time::Instant::now() + self.lock_timeout;

        loop {
            let (locked,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
                .bind(MIGRATION_LOCK_KEY)
                .fetch_one(&mut *conn)
                .await?;

            if locked {
                return Ok(());
            }

            if std::time::Instant::now() >= deadline {
                return Err(MigrateError::LockTimeout(self.lock_timeout));
            }

            tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
        }
    }
}

async fn unlock(conn: &mut PgConnection) -> Result<(), MigrateError> {
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Create the migration bookkeeping table, in its own bootstrap
/// transaction, before anything else runs.
async fn ensure_table(conn: &mut PgConnection) -> Result<(), MigrateError> {
    let mut tx = conn.begin().await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _qna_migrations (
            version BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}

async fn applied_versions(conn: &mut PgConnection) -> Result<Vec<i64>, MigrateError> {
    let rows = sqlx::query("SELECT version FROM _qna_migrations ORDER BY version")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.iter().map(|row| row.get("version")).collect())
}

/// Apply one migration inside its own transaction, recording success
/// before the transaction commits.
async fn apply(conn: &mut PgConnection, migration: &Migration) -> Result<(), MigrateError> {
    let failed = |source| MigrateError::Failed {
        version: migration.version,
        name: migration.name.to_owned(),
        source,
    };

    let mut tx = conn.begin().await.map_err(failed)?;

    sqlx::raw_sql(migration.up)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;

    sqlx::query("INSERT INTO _qna_migrations (version, name) VALUES ($1, $2)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;

    tx.commit().await.map_err(failed)?;
    Ok(())
}

/// The schema this service ships with, as versioned migrations.
pub fn baseline_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 20240311094512,
            name: "create_questions_table",
            up: r#"
                CREATE TABLE questions (
                    id SERIAL PRIMARY KEY,
                    title VARCHAR(255) NOT NULL,
                    content TEXT NOT NULL,
                    tags TEXT[],
                    created_on TIMESTAMP NOT NULL DEFAULT now()
                );
            "#,
            down: Some("DROP TABLE questions;"),
        },
        Migration {
            version: 20240311094557,
            name: "create_answers_table",
            up: r#"
                CREATE TABLE answers (
                    id SERIAL PRIMARY KEY,
                    content TEXT NOT NULL,
                    created_on TIMESTAMP NOT NULL DEFAULT now(),
                    corresponding_question INTEGER NOT NULL REFERENCES questions(id)
                );
            "#,
            down: Some("DROP TABLE answers;"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(version: i64, name: &'static str) -> Migration {
        Migration {
            version,
            name,
            up: "SELECT 1;",
            down: None,
        }
    }

    #[test]
    fn baseline_set_is_ordered_and_reversible() {
        let set = baseline_migrations();
        assert!(set.windows(2).all(|pair| pair[0].version < pair[1].version));
        assert!(set.iter().all(|m| m.down.is_some()));
    }

    #[test]
    fn rejects_duplicate_versions() {
        let err = Migrator::new(vec![migration(1, "a"), migration(1, "b")]).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSet { .. }));
    }

    #[test]
    fn rejects_descending_versions() {
        let err = Migrator::new(vec![migration(2, "a"), migration(1, "b")]).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSet { .. }));
    }

    #[test]
    fn pending_with_no_history_is_everything() {
        let migrator =
            Migrator::new(vec![migration(1, "a"), migration(2, "b"), migration(3, "c")]).unwrap();
        let pending = migrator.pending(&[]).unwrap();
        assert_eq!(
            pending.iter().map(|m| m.version).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn pending_skips_applied_prefix() {
        let migrator =
            Migrator::new(vec![migration(1, "a"), migration(2, "b"), migration(3, "c")]).unwrap();
        let pending = migrator.pending(&[1, 2]).unwrap();
        assert_eq!(
            pending.iter().map(|m| m.version).collect::<Vec<_>>(),
            vec![3]
        );
    }

    #[test]
    fn fully_applied_set_has_nothing_pending() {
        let migrator = Migrator::new(vec![migration(1, "a"), migration(2, "b")]).unwrap();
        assert!(migrator.pending(&[1, 2]).unwrap().is_empty());
    }

    #[test]
    fn gap_behind_applied_history_is_an_error() {
        // Version 1 was never recorded but 2 already is: applying 1 now
        // would be out of order.
        let migrator = Migrator::new(vec![migration(1, "a"), migration(2, "b")]).unwrap();
        let err = migrator.pending(&[2]).unwrap_err();
        assert!(matches!(
            err,
            MigrateError::OutOfOrder {
                pending: 1,
                applied: 2
            }
        ));
    }

    // Integration tests require a real database.
    // Run with: DATABASE_URL=postgres://... cargo test -p qna-server -- --ignored

    #[cfg(test)]
    mod db_tests {
        use super::*;
        use crate::db::pool::Db;
        use qna_core::config::PoolConfig;

        async fn test_db() -> Db {
            let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
            Db::connect_url(&url, &PoolConfig::default())
                .await
                .expect("pool creation failed")
        }

        async fn cleanup(db: &Db, versions: &[i64], tables: &[&str]) {
            for table in tables {
                sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                    .execute(db.pool())
                    .await
                    .expect("cleanup drop failed");
            }
            for version in versions {
                sqlx::query("DELETE FROM _qna_migrations WHERE version = $1")
                    .bind(version)
                    .execute(db.pool())
                    .await
                    .expect("cleanup delete failed");
            }
        }

        async fn table_exists(db: &Db, table: &str) -> bool {
            let (regclass,): (Option<String>,) =
                sqlx::query_as("SELECT to_regclass($1)::text")
                    .bind(table)
                    .fetch_one(db.pool())
                    .await
                    .expect("to_regclass query failed");
            regclass.is_some()
        }

        #[tokio::test]
        #[ignore = "requires database"]
        async fn running_twice_is_a_noop() {
            let db = test_db().await;
            let migrator = Migrator::new(vec![Migration {
                version: 99_999_999_980_001,
                name: "noop_probe",
                up: "CREATE TABLE mig_noop_probe (id INT);",
                down: Some("DROP TABLE mig_noop_probe;"),
            }])
            .unwrap();

            let first = migrator.run(&db).await.expect("first run failed");
            assert_eq!(first, 1);

            let second = migrator.run(&db).await.expect("second run failed");
            assert_eq!(second, 0);

            cleanup(&db, &[99_999_999_980_001], &["mig_noop_probe"]).await;
        }

        #[tokio::test]
        #[ignore = "requires database"]
        async fn failure_stops_the_run_at_the_failing_version() {
            let db = test_db().await;
            let migrator = Migrator::new(vec![
                Migration {
                    version: 99_999_999_990_001,
                    name: "ordering_one",
                    up: "CREATE TABLE mig_ordering_one (id INT);",
                    down: Some("DROP TABLE mig_ordering_one;"),
                },
                Migration {
                    version: 99_999_999_990_002,
                    name: "ordering_two_broken",
                    up: "CREATE TABLE mig_ordering_two (id INT REFERENCES no_such_table(id));",
                    down: None,
                },
                Migration {
                    version: 99_999_999_990_003,
                    name: "ordering_three",
                    up: "CREATE TABLE mig_ordering_three (id INT);",
                    down: Some("DROP TABLE mig_ordering_three;"),
                },
            ])
            .unwrap();

            let err = migrator.run(&db).await.expect_err("run should fail");
            match err {
                MigrateError::Failed { version, .. } => assert_eq!(version, 99_999_999_990_002),
                other => panic!("expected Failed, got {:?}", other),
            }

            // Exactly the first migration landed; the failing one and
            // everything after it did not.
            assert!(table_exists(&db, "mig_ordering_one").await);
            assert!(!table_exists(&db, "mig_ordering_two").await);
            assert!(!table_exists(&db, "mig_ordering_three").await);

            cleanup(
                &db,
                &[99_999_999_990_001, 99_999_999_990_002, 99_999_999_990_003],
                &["mig_ordering_one", "mig_ordering_two", "mig_ordering_three"],
            )
            .await;
        }

        #[tokio::test]
        #[ignore = "requires database"]
        async fn revert_undoes_one_version() {
            let db = test_db().await;
            let migrator = Migrator::new(vec![Migration {
                version: 99_999_999_970_001,
                name: "revert_probe",
                up: "CREATE TABLE mig_revert_probe (id INT);",
                down: Some("DROP TABLE mig_revert_probe;"),
            }])
            .unwrap();

            migrator.run(&db).await.expect("run failed");
            assert!(table_exists(&db, "mig_revert_probe").await);

            let reverted = migrator.revert_last(&db).await.expect("revert failed");
            assert_eq!(reverted, Some(99_999_999_970_001));
            assert!(!table_exists(&db, "mig_revert_probe").await);

            cleanup(&db, &[99_999_999_970_001], &[]).await;
        }
    }
}
