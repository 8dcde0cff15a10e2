//! Database layer: pool, migrations, and repositories

pub mod error;
pub mod migrate;
pub mod pool;
pub mod repos;

pub use error::DbError;
pub use migrate::{Migration, MigrateError, Migrator};
pub use pool::Db;
