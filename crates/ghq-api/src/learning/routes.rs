use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use sqlx::types::Uuid;

use ghq_db::{
    models::{AchievementWithUnlock, Level, ModuleWithProgress},
    repositories::{content, progression},
};

use super::service::{self, AnswerResult, CompletionResult, ProgressSnapshot};
use crate::{ApiState, auth::middleware::AuthUser, error::ApiError};

/// Create the learning routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/learning/lessons/{lesson_id}/complete",
            post(complete_lesson),
        )
        .route(
            "/learning/questions/{question_id}/answer",
            post(submit_answer),
        )
        .route("/learning/progress", get(get_progress))
        .route("/learning/modules", get(list_modules))
        .route("/learning/achievements", get(list_achievements))
        .route("/learning/levels", get(list_levels))
}

#[derive(Debug, Deserialize)]
struct AnswerSubmission {
    answer: String,
    time_spent_seconds: Option<i32>,
}

/// Mark a lesson completed for the authenticated member and collect the XP.
async fn complete_lesson(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<CompletionResult>, ApiError> {
    let result = service::complete_lesson(&state.pool, auth_user.user_id, lesson_id).await?;
    Ok(Json(result))
}

/// Submit an answer for grading.
async fn submit_answer(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<AnswerSubmission>,
) -> Result<Json<AnswerResult>, ApiError> {
    let result = service::submit_answer(
        &state.pool,
        auth_user.user_id,
        question_id,
        payload.answer,
        payload.time_spent_seconds,
    )
    .await?;
    Ok(Json(result))
}

/// The authenticated member's progression snapshot.
async fn get_progress(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    let snapshot = service::progress_snapshot(&state.pool, auth_user.user_id).await?;
    Ok(Json(snapshot))
}

/// Published modules with the caller's completion rollups.
async fn list_modules(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<ModuleWithProgress>>, ApiError> {
    let modules = content::list_modules_with_progress(&state.pool, auth_user.user_id).await?;
    Ok(Json(modules))
}

/// The achievement catalog with the caller's unlock state. Secret
/// achievements stay hidden until unlocked.
async fn list_achievements(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<AchievementWithUnlock>>, ApiError> {
    let achievements =
        progression::get_achievements_for_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(achievements))
}

/// The public level table.
async fn list_levels(State(state): State<ApiState>) -> Result<Json<Vec<Level>>, ApiError> {
    let levels = progression::get_levels(&state.pool).await?;
    Ok(Json(levels))
}


