// src/handlers/diagnostic.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError, services::diagnostic::build_report, state::AppState, utils::jwt::Claims,
};

/// Performance analysis over the caller's last 30 days.
/// 404 with `no_history` until the first test is completed.
pub async fn get_diagnostic(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let report = build_report(state.store.as_ref(), state.clock.as_ref(), claims.user_id()).await?;
    Ok(Json(report))
}
