use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{EvaluateRequest, EvaluateResponse, EvaluationContext, FlagState};
use crate::routes::flag_error;
use crate::state::AppState;

/// Evaluate every exposed flag for the caller's context
pub async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let evaluations = state
        .evaluator
        .exposed_evaluations(&request.context)
        .map_err(flag_error)?;

    let flags = evaluations
        .into_iter()
        .map(|(key, evaluation)| {
            (
                key,
                FlagState {
                    enabled: evaluation.enabled,
                    reason: evaluation.reason.to_string(),
                },
            )
        })
        .collect();

    Ok(Json(EvaluateResponse { flags }))
}

/// Evaluate a single flag; hidden flags look the same as missing ones
pub async fn evaluate_one(
    State(state): State<AppState>,
    Path(flag_key): Path<String>,
    Json(request): Json<EvaluateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let evaluation = state
        .evaluator
        .evaluate_exposed(&flag_key, &request.context)
        .map_err(flag_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("Flag '{}' not found", flag_key),
            )
        })?;

    Ok(Json(FlagState {
        enabled: evaluation.enabled,
        reason: evaluation.reason.to_string(),
    }))
}

/// Plain key -> bool map for the front-end
pub async fn client_flags(
    State(state): State<AppState>,
    Json(context): Json<EvaluationContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let flags = state
        .evaluator
        .client_flags(&context)
        .map_err(flag_error)?;
    Ok(Json(flags))
}
