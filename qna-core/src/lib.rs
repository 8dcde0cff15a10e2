//! qna-core: domain types for the questions-and-answers service
//!
//! Entities, validated input newtypes, pagination, and configuration.
//! Nothing in this crate touches the database or the network; the
//! server crate consumes these types at its boundaries.

pub mod answer;
pub mod config;
pub mod pagination;
pub mod question;
pub mod validation;

pub use answer::{Answer, AnswerContent, AnswerId, NewAnswer};
pub use config::{ConfigError, DatabaseConfig, PoolConfig};
pub use pagination::{Pagination, PaginationParams};
pub use question::{NewQuestion, Question, QuestionContent, QuestionId, QuestionTitle};
pub use validation::ValidationError;
