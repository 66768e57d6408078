//! Filtering of flag maps that leave the process.

use crate::evaluation::EvaluationReason;

/// Substrings that keep a flag out of any client-facing map.
pub const DEFAULT_HIDDEN_PATTERNS: [&str; 2] = ["SECRET", "PRIVATE"];

/// Case-insensitive substring deny-list over flag keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposurePolicy {
    hidden_patterns: Vec<String>,
}

impl ExposurePolicy {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hidden_patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_ascii_uppercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { hidden_patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.hidden_patterns
    }

    pub fn is_exposed(&self, flag_key: &str) -> bool {
        let key = flag_key.to_ascii_uppercase();
        !self
            .hidden_patterns
            .iter()
            .any(|pattern| key.contains(pattern.as_str()))
    }

    /// Strip hidden flag keys out of a reason before it is sent to a client.
    pub fn redact(&self, reason: EvaluationReason) -> EvaluationReason {
        match reason {
            EvaluationReason::DependencyDisabled { dependency } if !self.is_exposed(&dependency) => {
                EvaluationReason::HiddenDependencyDisabled
            }
            other => other,
        }
    }
}

impl Default for ExposurePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_HIDDEN_PATTERNS)
    }
}
