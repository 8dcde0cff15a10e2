//! Answer entity and validated input newtypes

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::question::QuestionId;
use crate::validation::ValidationError;

/// Store-assigned identifier of an answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AnswerId(pub i32);

impl std::fmt::Display for AnswerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An answer as stored. Always references an existing question; the
/// store's foreign key is the enforcer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub content: String,
    pub created_on: NaiveDateTime,
    pub corresponding_question: QuestionId,
}

/// Validated answer body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerContent(String);

impl AnswerContent {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "content" });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AnswerContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Input for creating an answer.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub content: AnswerContent,
    pub question: QuestionId,
}

impl NewAnswer {
    pub fn new(content: &str, question: QuestionId) -> Result<Self, ValidationError> {
        Ok(Self {
            content: AnswerContent::new(content)?,
            question,
        })
    }
}
