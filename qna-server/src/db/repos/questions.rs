//! Question repository

use sqlx::postgres::PgRow;
use sqlx::Row;

use qna_core::pagination::Pagination;
use qna_core::question::{NewQuestion, Question, QuestionId};

use crate::db::error::DbError;
use crate::db::pool::Db;

/// Question repository
pub struct QuestionRepo<'a> {
    db: &'a Db,
}

fn map_question(row: &PgRow) -> Question {
    Question {
        id: QuestionId(row.get("id")),
        title: row.get("title"),
        content: row.get("content"),
        tags: row.get("tags"),
        created_on: row.get("created_on"),
    }
}

impl<'a> QuestionRepo<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Insert a question, returning it with the store-assigned id and
    /// creation timestamp.
    pub async fn create(&self, question: NewQuestion) -> Result<Question, DbError> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            r#"
            INSERT INTO questions (title, content, tags)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, tags, created_on
            "#,
        )
        .bind(question.title.as_str())
        .bind(question.content.as_str())
        .bind(&question.tags)
        .fetch_one(conn.as_mut())
        .await?;

        Ok(map_question(&row))
    }

    pub async fn get(&self, id: QuestionId) -> Result<Question, DbError> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            "SELECT id, title, content, tags, created_on FROM questions WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(conn.as_mut())
        .await?
        .ok_or(DbError::NotFound {
            resource: "question",
            id: id.0,
        })?;

        Ok(map_question(&row))
    }

    /// List questions in insertion order (`id` ascending), so a fixed
    /// offset/limit window always names the same rows.
    pub async fn list(&self, page: Pagination) -> Result<Vec<Question>, DbError> {
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, title, content, tags, created_on
            FROM questions
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(conn.as_mut())
        .await?;

        Ok(rows.iter().map(map_question).collect())
    }

    /// Replace a question's mutable fields. `id` and `created_on` never
    /// change.
    pub async fn update(
        &self,
        id: QuestionId,
        question: NewQuestion,
    ) -> Result<Question, DbError> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            r#"
            UPDATE questions
            SET title = $1, content = $2, tags = $3
            WHERE id = $4
            RETURNING id, title, content, tags, created_on
            "#,
        )
        .bind(question.title.as_str())
        .bind(question.content.as_str())
        .bind(&question.tags)
        .bind(id.0)
        .fetch_optional(conn.as_mut())
        .await?
        .ok_or(DbError::NotFound {
            resource: "question",
            id: id.0,
        })?;

        Ok(map_question(&row))
    }

    /// Delete a question.
    ///
    /// With `cascade` unset, the delete is rejected while dependent
    /// answers exist. With `cascade` set, the answers go first, in the
    /// same transaction.
    pub async fn delete(&self, id: QuestionId, cascade: bool) -> Result<(), DbError> {
        let mut tx = self.db.begin().await?;

        if cascade {
            sqlx::query("DELETE FROM answers WHERE corresponding_question = $1")
                .bind(id.0)
                .execute(&mut *tx)
                .await?;
        } else {
            let (has_answers,): (bool,) = sqlx::query_as(
                "SELECT EXISTS(SELECT 1 FROM answers WHERE corresponding_question = $1)",
            )
            .bind(id.0)
            .fetch_one(&mut *tx)
            .await?;

            if has_answers {
                return Err(DbError::Conflict {
                    reason: format!("question {} still has answers", id),
                });
            }
        }

        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|err| match DbError::from(err) {
                // An answer landed between the check and the delete; the
                // store's foreign key is the authority either way.
                DbError::ForeignKey { .. } => DbError::Conflict {
                    reason: format!("question {} still has answers", id),
                },
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                resource: "question",
                id: id.0,
            });
        }

        tx.commit().await?;
        Ok(())
    }
}
