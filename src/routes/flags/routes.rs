use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{
    parse_rollout_percentage, ContextQuery, InvalidateQuery, OverrideRequest, OverrideResponse,
    RolloutRequest, RolloutResponse,
};
use crate::evaluation::EvaluationContext;
use crate::routes::{flag_error, middleware_auth::JwtUser};
use crate::state::AppState;

/// Every flag with its computed state
pub async fn list(
    State(state): State<AppState>,
    JwtUser(_admin): JwtUser,
    Query(query): Query<ContextQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let context = EvaluationContext::from(query);
    let snapshot = state.evaluator.all_flags(&context).map_err(flag_error)?;
    Ok(Json(snapshot))
}

/// Enabled / disabled / beta counts
pub async fn analytics(
    State(state): State<AppState>,
    JwtUser(_admin): JwtUser,
    Query(query): Query<ContextQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let context = EvaluationContext::from(query);
    let analytics = state.evaluator.analytics(&context).map_err(flag_error)?;
    Ok(Json(analytics))
}

/// Current administrative overrides
pub async fn list_overrides(
    State(state): State<AppState>,
    JwtUser(_admin): JwtUser,
) -> impl IntoResponse {
    Json(state.evaluator.overrides())
}

/// Force a flag on or off
pub async fn set_override(
    State(state): State<AppState>,
    JwtUser(admin): JwtUser,
    Path(flag_key): Path<String>,
    Json(payload): Json<OverrideRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let previous = state
        .evaluator
        .set_override(&flag_key, payload.enabled)
        .map_err(flag_error)?;

    tracing::info!(%admin, flag = %flag_key, enabled = payload.enabled, "admin set override");

    Ok(Json(OverrideResponse {
        flag: flag_key,
        enabled: Some(payload.enabled),
        previous,
    }))
}

/// Drop one override
pub async fn remove_override(
    State(state): State<AppState>,
    JwtUser(admin): JwtUser,
    Path(flag_key): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let previous = state
        .evaluator
        .remove_override(&flag_key)
        .map_err(flag_error)?;

    if previous.is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            format!("No override set for '{}'", flag_key),
        ));
    }

    tracing::info!(%admin, flag = %flag_key, "admin removed override");

    Ok(Json(OverrideResponse {
        flag: flag_key,
        enabled: None,
        previous,
    }))
}

/// Drop every override
pub async fn clear_overrides(
    State(state): State<AppState>,
    JwtUser(admin): JwtUser,
) -> impl IntoResponse {
    state.evaluator.clear_overrides();
    tracing::info!(%admin, "admin cleared overrides");
    StatusCode::NO_CONTENT
}

/// Move a flag's rollout percentage for one tier
pub async fn set_rollout(
    State(state): State<AppState>,
    JwtUser(admin): JwtUser,
    Path(flag_key): Path<String>,
    Json(payload): Json<RolloutRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let percentage =
        parse_rollout_percentage(payload.percentage).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let environment = payload
        .environment
        .unwrap_or_else(|| state.evaluator.environment());

    state
        .evaluator
        .set_rollout_percentage(&flag_key, environment, percentage)
        .map_err(flag_error)?;

    tracing::info!(%admin, flag = %flag_key, %environment, percentage, "admin adjusted rollout");

    Ok(Json(RolloutResponse {
        flag: flag_key,
        environment,
        percentage,
    }))
}

/// Drop cached results for one flag or all of them
pub async fn invalidate_cache(
    State(state): State<AppState>,
    JwtUser(admin): JwtUser,
    Query(query): Query<InvalidateQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .evaluator
        .invalidate_cache(query.flag.as_deref())
        .map_err(flag_error)?;

    tracing::info!(%admin, flag = ?query.flag, "admin invalidated cache");

    Ok(StatusCode::NO_CONTENT)
}
