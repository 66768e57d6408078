pub mod routes;

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::evaluation::EvaluationContext;

// MODELS

/// Identity to evaluate admin views for; anonymous when both are absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextQuery {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl From<ContextQuery> for EvaluationContext {
    fn from(query: ContextQuery) -> Self {
        EvaluationContext {
            user_id: query.user_id,
            session_id: query.session_id,
            ..EvaluationContext::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct OverrideResponse {
    pub flag: String,
    pub enabled: Option<bool>,
    pub previous: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RolloutRequest {
    pub percentage: i32,
    /// Defaults to the running tier.
    pub environment: Option<Environment>,
}

#[derive(Debug, Serialize)]
pub struct RolloutResponse {
    pub flag: String,
    pub environment: Environment,
    pub percentage: u8,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvalidateQuery {
    pub flag: Option<String>,
}

// HELPER FUNCTIONS

// Narrows the request integer; the 0..=100 bound is enforced by the catalog
pub fn parse_rollout_percentage(percentage: i32) -> Result<u8, String> {
    u8::try_from(percentage).map_err(|_| {
        format!(
            "Rollout percentage must be between 0 and 100, got {}",
            percentage
        )
    })
}
