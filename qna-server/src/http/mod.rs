//! HTTP facade: routes, error translation, server setup

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{run_server, ServerConfig};
