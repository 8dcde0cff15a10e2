//! Question endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use qna_core::pagination::{Pagination, PaginationParams};
use qna_core::question::{NewQuestion, Question, QuestionId};

use crate::db::repos::QuestionRepo;
use crate::http::error::ApiError;
use crate::state::AppState;

/// Create/update question request
#[derive(Deserialize)]
pub struct QuestionRequest {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
}

/// Question response
#[derive(Serialize)]
pub struct QuestionResponse {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub created_on: String,
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        Self {
            id: q.id.0,
            title: q.title,
            content: q.content,
            tags: q.tags,
            created_on: q.created_on.and_utc().to_rfc3339(),
        }
    }
}

/// Query parameters for DELETE
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    pub cascade: Option<bool>,
}

/// GET /questions - list questions in insertion order
async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let page = Pagination::try_from(params)?;
    let questions = QuestionRepo::new(state.db()).list(page).await?;

    Ok(Json(
        questions.into_iter().map(QuestionResponse::from).collect(),
    ))
}

/// POST /questions - create a question
async fn create_question(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    let question = NewQuestion::new(&req.title, &req.content, req.tags)?;
    let created = QuestionRepo::new(state.db()).create(question).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /questions/{id} - get a single question
async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = QuestionRepo::new(state.db()).get(QuestionId(id)).await?;
    Ok(Json(question.into()))
}

/// PUT /questions/{id} - replace a question's mutable fields
async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = NewQuestion::new(&req.title, &req.content, req.tags)?;
    let updated = QuestionRepo::new(state.db())
        .update(QuestionId(id), question)
        .await?;

    Ok(Json(updated.into()))
}

/// DELETE /questions/{id}?cascade=bool - delete a question
///
/// Rejected with 409 while dependent answers exist, unless cascade is
/// requested explicitly.
async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    QuestionRepo::new(state.db())
        .delete(QuestionId(id), params.cascade.unwrap_or(false))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Question routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/questions", get(list_questions).post(create_question))
        .route(
            "/questions/{id}",
            get(get_question)
                .put(update_question)
                .delete(delete_question),
        )
}
