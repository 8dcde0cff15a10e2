//! Answer endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use qna_core::answer::{Answer, AnswerId, NewAnswer};
use qna_core::pagination::{Pagination, PaginationParams};
use qna_core::question::QuestionId;

use crate::db::repos::AnswerRepo;
use crate::http::error::ApiError;
use crate::state::AppState;

/// Create answer request
#[derive(Deserialize)]
pub struct AnswerRequest {
    pub content: String,
}

/// Answer response
#[derive(Serialize)]
pub struct AnswerResponse {
    pub id: i32,
    pub content: String,
    pub question_id: i32,
    pub created_on: String,
}

impl From<Answer> for AnswerResponse {
    fn from(a: Answer) -> Self {
        Self {
            id: a.id.0,
            content: a.content,
            question_id: a.corresponding_question.0,
            created_on: a.created_on.and_utc().to_rfc3339(),
        }
    }
}

/// POST /questions/{id}/answers - answer a question
///
/// A missing question surfaces as 422; the store's foreign key is the
/// authority, not a pre-check.
async fn create_answer(
    State(state): State<AppState>,
    Path(question_id): Path<i32>,
    Json(req): Json<AnswerRequest>,
) -> Result<(StatusCode, Json<AnswerResponse>), ApiError> {
    let answer = NewAnswer::new(&req.content, QuestionId(question_id))?;
    let created = AnswerRepo::new(state.db()).create(answer).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /questions/{id}/answers - list a question's answers
async fn list_answers(
    State(state): State<AppState>,
    Path(question_id): Path<i32>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<AnswerResponse>>, ApiError> {
    let page = Pagination::try_from(params)?;
    let answers = AnswerRepo::new(state.db())
        .list_for_question(QuestionId(question_id), page)
        .await?;

    Ok(Json(answers.into_iter().map(AnswerResponse::from).collect()))
}

/// GET /answers/{id} - get a single answer
async fn get_answer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let answer = AnswerRepo::new(state.db()).get(AnswerId(id)).await?;
    Ok(Json(answer.into()))
}

/// Answer routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/questions/{id}/answers",
            get(list_answers).post(create_answer),
        )
        .route("/answers/{id}", get(get_answer))
}
