//! Question entity and validated input newtypes

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Maximum length for question titles, matching the VARCHAR(255) column.
const MAX_TITLE_LEN: usize = 255;

/// Store-assigned identifier of a question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct QuestionId(pub i32);

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A question as stored, including store-assigned fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    /// Set by the store at insert time, immutable thereafter.
    pub created_on: NaiveDateTime,
}

/// Validated question title.
///
/// # Rules
/// - Non-empty
/// - At most 255 characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionTitle(String);

impl QuestionTitle {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }

        if s.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LEN,
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for QuestionTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated question body. Unbounded, but must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionContent(String);

impl QuestionContent {
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

impl AsRef<str> for QuestionContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Input for creating or updating a question.
///
/// Construction goes through the validated newtypes, so a value of this
/// type is known to satisfy the field rules before it reaches the store.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: QuestionTitle,
    pub content: QuestionContent,
    pub tags: Option<Vec<String>>,
}

impl NewQuestion {
    pub fn new(
        title: &str,
        content: &str,
        tags: Option<Vec<String>>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            title: QuestionTitle::new(title)?,
            content: QuestionContent::new(content)?,
            tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_title() {
        assert!(QuestionTitle::new("How do I borrow twice?").is_ok());
    }

    #[test]
    fn rejects_empty_title() {
        let err = QuestionTitle::new("").unwrap_err();
        assert!(matches!(err, ValidationError::Empty { field: "title" }));
    }

    #[test]
    fn title_max_length() {
        // 255 chars should work
        let title_255 = "a".repeat(255);
        assert!(QuestionTitle::new(&title_255).is_ok());

        // 256 chars should fail
        let title_256 = "a".repeat(256);
        let err = QuestionTitle::new(&title_256).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 255, .. }));
    }

    #[test]
    fn title_length_counts_chars_not_bytes() {
        // 255 multibyte characters are within the limit even though the
        // byte length is larger
        let title = "é".repeat(255);
        assert!(QuestionTitle::new(&title).is_ok());
    }

    #[test]
    fn rejects_empty_content() {
        let err = QuestionContent::new("").unwrap_err();
        assert!(matches!(err, ValidationError::Empty { field: "content" }));
    }

    #[test]
    fn new_question_carries_tags() {
        let q = NewQuestion::new("title", "content", Some(vec!["rust".into()])).unwrap();
        assert_eq!(q.tags.as_deref(), Some(&["rust".to_owned()][..]));
    }
}
