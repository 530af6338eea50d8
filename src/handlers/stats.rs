// src/handlers/stats.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, services::stats::stats, state::AppState, utils::jwt::Claims};

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let stats = stats(state.store.as_ref(), state.clock.as_ref(), claims.user_id()).await?;
    Ok(Json(stats))
}
