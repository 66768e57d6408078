pub mod routes;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use crate::evaluation::EvaluationContext;

#[derive(Debug, Default, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub context: EvaluationContext,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub flags: BTreeMap<String, FlagState>,
}

#[derive(Debug, Serialize)]
pub struct FlagState {
    pub enabled: bool,
    pub reason: String,
}
