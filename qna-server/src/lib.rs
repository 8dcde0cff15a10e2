//! qna-server: HTTP facade over the questions-and-answers store
//!
//! Layers, leaf to root: connection pool (`db::pool`), schema migration
//! engine (`db::migrate`), entity repositories (`db::repos`), and the
//! axum facade (`http`). The binary in `main.rs` wires them together:
//! migrations run to completion before the listener binds.

pub mod db;
pub mod http;
pub mod state;

pub use db::pool::Db;
pub use state::AppState;
