use std::sync::Arc;

use crate::evaluation::Evaluator;

#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<Evaluator>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(evaluator: Arc<Evaluator>, jwt_secret: &str) -> Self {
        Self {
            evaluator,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
