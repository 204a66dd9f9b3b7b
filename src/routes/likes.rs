use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, JsonError},
    models::{
        Course,
        like::{self, LikeState},
    },
    state::AcademyState,
};

pub fn router() -> Router<AcademyState> {
    Router::new().route("/like/{course_id}", get(current).post(toggle))
}

async fn ensure_course(state: &AcademyState, course_id: Uuid) -> Result<(), JsonError> {
    Course::find(&state.db_pool, course_id)
        .await?
        .ok_or(AppError::NotFound("course"))?;
    Ok(())
}

async fn current(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<LikeState>, JsonError> {
    ensure_course(&state, course_id).await?;
    Ok(Json(like::state(&state.db_pool, course_id, auth.id).await?))
}

async fn toggle(
    auth: AuthUser,
    State(state): State<AcademyState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<LikeState>, JsonError> {
    ensure_course(&state, course_id).await?;

    let state = like::toggle(&state.db_pool, course_id, auth.id).await?;
    tracing::debug!(%course_id, user = %auth.username, liked = state.liked, "toggled like");

    Ok(Json(state))
}
