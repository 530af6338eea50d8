// src/handlers/leaderboard.rs

use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::stats::LeaderboardParams, services::leaderboard::leaderboard,
    state::AppState, utils::jwt::Claims,
};

/// Top 10 of a finished day. `?date=YYYY-MM-DD`, yesterday by default.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<LeaderboardParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let board = leaderboard(
        state.store.as_ref(),
        state.identity.as_ref(),
        state.clock.as_ref(),
        claims.user_id(),
        params.date,
    )
    .await?;
    Ok(Json(board))
}
