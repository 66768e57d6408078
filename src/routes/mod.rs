use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

mod flags;
mod health;
mod middleware_auth;
mod sdk;

pub use health::health;

use crate::error::FlagError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    let sdk_router = Router::new()
        .route("/evaluate", post(sdk::routes::evaluate))
        .route("/flags/{flag_key}", post(sdk::routes::evaluate_one))
        .route("/client-flags", post(sdk::routes::client_flags))
        .layer(CorsLayer::permissive());

    let admin_router = Router::new()
        .route("/flags", get(flags::routes::list))
        .route("/flags/{flag_key}/rollout", put(flags::routes::set_rollout))
        .route("/analytics", get(flags::routes::analytics))
        .route(
            "/overrides",
            get(flags::routes::list_overrides).delete(flags::routes::clear_overrides),
        )
        .route(
            "/overrides/{flag_key}",
            put(flags::routes::set_override).delete(flags::routes::remove_override),
        )
        .route("/cache/invalidate", post(flags::routes::invalidate_cache))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_auth::require_auth,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/sdk", sdk_router)
        .nest("/api/admin", admin_router)
        .with_state(state)
}

async fn root() -> &'static str {
    "Feature flag tier service"
}

/// Map evaluator errors onto HTTP status codes.
pub(crate) fn flag_error(err: FlagError) -> (StatusCode, String) {
    let status = match &err {
        FlagError::UnknownFlag(_) => StatusCode::NOT_FOUND,
        err if !err.is_configuration_error() => StatusCode::BAD_REQUEST,
        _ => {
            tracing::error!(error = %err, "catalog error while serving request");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}
