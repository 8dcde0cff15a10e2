//! Answer repository

use sqlx::postgres::PgRow;
use sqlx::Row;

use qna_core::answer::{Answer, AnswerId, NewAnswer};
use qna_core::pagination::Pagination;
use qna_core::question::QuestionId;

use crate::db::error::DbError;
use crate::db::pool::Db;

/// Answer repository
pub struct AnswerRepo<'a> {
    db: &'a Db,
}

fn map_answer(row: &PgRow) -> Answer {
    Answer {
        id: AnswerId(row.get("id")),
        content: row.get("content"),
        created_on: row.get("created_on"),
        corresponding_question: QuestionId(row.get("corresponding_question")),
    }
}

impl<'a> AnswerRepo<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Insert an answer.
    ///
    /// A dangling question reference comes back as a typed foreign-key
    /// error; the store's constraint is the enforcer, no pre-check here.
    pub async fn create(&self, answer: NewAnswer) -> Result<Answer, DbError> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            r#"
            INSERT INTO answers (content, corresponding_question)
            VALUES ($1, $2)
            RETURNING id, content, created_on, corresponding_question
            "#,
        )
        .bind(answer.content.as_str())
        .bind(answer.question.0)
        .fetch_one(conn.as_mut())
        .await?;

        Ok(map_answer(&row))
    }

    pub async fn get(&self, id: AnswerId) -> Result<Answer, DbError> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            "SELECT id, content, created_on, corresponding_question FROM answers WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(conn.as_mut())
        .await?
        .ok_or(DbError::NotFound {
            resource: "answer",
            id: id.0,
        })?;

        Ok(map_answer(&row))
    }

    /// List a question's answers in insertion order.
    ///
    /// A missing question is a not-found error, distinct from a question
    /// that simply has no answers yet.
    pub async fn list_for_question(
        &self,
        question: QuestionId,
        page: Pagination,
    ) -> Result<Vec<Answer>, DbError> {
        let mut conn = self.db.acquire().await?;

        let (question_exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM questions WHERE id = $1)")
                .bind(question.0)
                .fetch_one(conn.as_mut())
                .await?;

        if !question_exists {
            return Err(DbError::NotFound {
                resource: "question",
                id: question.0,
            });
        }

        let rows = sqlx::query(
            r#"
            SELECT id, content, created_on, corresponding_question
            FROM answers
            WHERE corresponding_question = $1
            ORDER BY id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(question.0)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(conn.as_mut())
        .await?;

        Ok(rows.iter().map(map_answer).collect())
    }

    pub async fn delete(&self, id: AnswerId) -> Result<(), DbError> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(id.0)
            .execute(conn.as_mut())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                resource: "answer",
                id: id.0,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate::Migrator;
    use crate::db::repos::QuestionRepo;
    use qna_core::config::PoolConfig;
    use qna_core::question::NewQuestion;

    // Integration tests require a scratch database; they clear the
    // questions/answers tables.
    // Run with: DATABASE_URL=postgres://... cargo test -p qna-server -- --ignored

    async fn test_db() -> Db {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let db = Db::connect_url(&url, &PoolConfig::default())
            .await
            .expect("pool creation failed");
        Migrator::baseline().run(&db).await.expect("migrations failed");
        sqlx::query("DELETE FROM answers")
            .execute(db.pool())
            .await
            .expect("clearing answers failed");
        sqlx::query("DELETE FROM questions")
            .execute(db.pool())
            .await
            .expect("clearing questions failed");
        db
    }

    async fn seed_question(db: &Db) -> QuestionId {
        QuestionRepo::new(db)
            .create(NewQuestion::new("seed question", "seed content", None).unwrap())
            .await
            .expect("seed create failed")
            .id
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_then_get_round_trips() {
        let db = test_db().await;
        let question = seed_question(&db).await;
        let repo = AnswerRepo::new(&db);

        let created = repo
            .create(NewAnswer::new("use a scope", question).unwrap())
            .await
            .expect("create failed");

        let fetched = repo.get(created.id).await.expect("get failed");
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.content, "use a scope");
        assert_eq!(fetched.corresponding_question, question);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn dangling_question_is_a_typed_foreign_key_error() {
        let db = test_db().await;
        let repo = AnswerRepo::new(&db);

        let err = repo
            .create(NewAnswer::new("orphan", QuestionId(404_404)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKey { .. }));

        // The failed insert left no row behind.
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM answers")
            .fetch_one(db.pool())
            .await
            .expect("count failed");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn listing_preserves_insertion_order() {
        let db = test_db().await;
        let question = seed_question(&db).await;
        let repo = AnswerRepo::new(&db);

        let mut ids = Vec::new();
        for i in 1..=3 {
            let a = repo
                .create(NewAnswer::new(&format!("answer {}", i), question).unwrap())
                .await
                .expect("create failed");
            ids.push(a.id);
        }

        let listed = repo
            .list_for_question(question, Pagination::default())
            .await
            .expect("list failed");
        assert_eq!(listed.iter().map(|a| a.id).collect::<Vec<_>>(), ids);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn listing_for_missing_question_is_not_found() {
        let db = test_db().await;
        let repo = AnswerRepo::new(&db);

        let err = repo
            .list_for_question(QuestionId(404_404), Pagination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { resource: "question", .. }));
    }
}
