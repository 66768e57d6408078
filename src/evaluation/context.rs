use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key used for bucketing and caching when the caller has no identity.
pub const ANONYMOUS_KEY: &str = "anonymous";

// Caller identity for a single evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl EvaluationContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// User id, else session id, else [`ANONYMOUS_KEY`].
    pub fn evaluation_key(&self) -> &str {
        self.user_id
            .as_deref()
            .or(self.session_id.as_deref())
            .unwrap_or(ANONYMOUS_KEY)
    }
}
