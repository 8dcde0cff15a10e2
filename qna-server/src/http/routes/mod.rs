//! Route handlers, one module per resource

pub mod answers;
pub mod health;
pub mod questions;
