//! Error types for catalog loading and flag evaluation.

use thiserror::Error;

/// Errors raised while building a catalog or evaluating flags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    /// The dependency graph contains a cycle. `cycle` starts and ends with the
    /// same key.
    #[error("cyclic dependency between flags: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("unknown flag '{0}'")]
    UnknownFlag(String),

    #[error("flag '{flag}' depends on unknown flag '{dependency}'")]
    UnknownDependency { flag: String, dependency: String },

    #[error("flag key '{0}' is defined more than once")]
    DuplicateFlag(String),

    #[error("invalid flag '{key}': {reason}")]
    InvalidDefinition { key: String, reason: String },

    #[error("rollout percentage {percentage} for flag '{key}' is outside 0..=100")]
    InvalidRollout { key: String, percentage: u8 },

    /// Catalog document could not be parsed.
    #[error("malformed catalog: {0}")]
    Malformed(String),
}

impl FlagError {
    /// True for errors that indicate a broken catalog rather than a bad call.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::UnknownFlag(_) | Self::InvalidRollout { .. })
    }
}

pub type FlagResult<T> = Result<T, FlagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = FlagError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency between flags: a -> b -> a");
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_unknown_flag_is_caller_error() {
        let err = FlagError::UnknownFlag("nope".into());
        assert_eq!(err.to_string(), "unknown flag 'nope'");
        assert!(!err.is_configuration_error());
    }
}
