//! Store error translation
//!
//! Everything the repositories return crosses this boundary: raw sqlx
//! errors are classified into the closed taxonomy below before they
//! leave the db layer, so no store-native error type reaches the HTTP
//! facade. Constraint violations are mapped by the constraint name the
//! store reports, not by matching message text.

use thiserror::Error;

/// Typed database error
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i32 },

    #[error("foreign key violation on {constraint}")]
    ForeignKey { constraint: String },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("timed out waiting for a database connection")]
    PoolTimeout,

    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Sqlx(#[source] sqlx::Error),
}

/// Constraint names this schema can report, with the taxonomy entry each
/// one translates to.
const FOREIGN_KEY_CONSTRAINTS: &[&str] = &["answers_corresponding_question_fkey"];

/// Translate a store-reported constraint name into a typed error.
///
/// Returns `None` for constraints outside the mapping table; the caller
/// falls back to the store's violation class.
fn classify_constraint(name: &str) -> Option<DbError> {
    FOREIGN_KEY_CONSTRAINTS
        .iter()
        .find(|candidate| **candidate == name)
        .map(|candidate| DbError::ForeignKey {
            constraint: (*candidate).to_owned(),
        })
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::PoolTimedOut) {
            return Self::PoolTimeout;
        }

        if matches!(
            err,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_)
        ) {
            return Self::Unavailable(err);
        }

        if let sqlx::Error::Database(db) = &err {
            if let Some(mapped) = db.constraint().and_then(classify_constraint) {
                return mapped;
            }

            if db.is_foreign_key_violation() {
                return Self::ForeignKey {
                    constraint: db.constraint().unwrap_or("unknown").to_owned(),
                };
            }

            if db.is_unique_violation() {
                return Self::Conflict {
                    reason: format!(
                        "unique constraint {} violated",
                        db.constraint().unwrap_or("unknown")
                    ),
                };
            }
        }

        Self::Sqlx(err)
    }
}
