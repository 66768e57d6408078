//! Environment tier resolution.
//!
//! A snapshot is computed once from the tier name and the process
//! environment. Everything downstream reads only from the snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::Catalog;

/// Prefix of the per-flag override variables, e.g. `FEATURE_BETA_TESTING`.
pub const FEATURE_VAR_PREFIX: &str = "FEATURE_";

/// Tier used when the configured name is not recognised.
pub const DEFAULT_ENVIRONMENT: Environment = Environment::Development;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Self::Development,
        Self::Test,
        Self::Staging,
        Self::Production,
    ];

    /// Case-insensitive parse with the usual short aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "test" => Some(Self::Test),
            "staging" | "stage" => Some(Self::Staging),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved tier plus env-var overrides. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    environment: Environment,
    raw_name: String,
    overrides: BTreeMap<String, bool>,
}

impl EnvironmentSnapshot {
    /// Snapshot with no env-var overrides.
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            raw_name: environment.as_str().to_string(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn override_for(&self, flag_key: &str) -> Option<bool> {
        self.overrides.get(flag_key).copied()
    }

    pub fn overrides(&self) -> &BTreeMap<String, bool> {
        &self.overrides
    }
}

/// Build a snapshot for `raw_name`, reading `FEATURE_*` variables through
/// `read_var` for every flag in the catalog.
pub fn resolve<F>(raw_name: &str, catalog: &Catalog, read_var: F) -> EnvironmentSnapshot
where
    F: Fn(&str) -> Option<String>,
{
    let environment = Environment::parse(raw_name).unwrap_or_else(|| {
        tracing::debug!(
            requested = raw_name,
            fallback = %DEFAULT_ENVIRONMENT,
            "unrecognised environment, using default tier"
        );
        DEFAULT_ENVIRONMENT
    });

    let mut overrides = BTreeMap::new();
    for key in catalog.keys() {
        let var = env_var_name(key);
        let Some(raw) = read_var(&var) else {
            continue;
        };
        match parse_bool(&raw) {
            Some(value) => {
                tracing::info!(flag = key, variable = %var, value, "environment override applied");
                overrides.insert(key.to_string(), value);
            }
            None => {
                tracing::warn!(
                    flag = key,
                    variable = %var,
                    value = %raw,
                    "ignoring unparseable environment override"
                );
            }
        }
    }

    EnvironmentSnapshot {
        environment,
        raw_name: raw_name.to_string(),
        overrides,
    }
}

/// `FEATURE_` followed by the key in upper snake case:
/// `betaTesting` becomes `FEATURE_BETA_TESTING`, `dark-mode` becomes
/// `FEATURE_DARK_MODE`.
pub fn env_var_name(flag_key: &str) -> String {
    let mut name = String::with_capacity(FEATURE_VAR_PREFIX.len() + flag_key.len() + 4);
    name.push_str(FEATURE_VAR_PREFIX);

    let mut previous: Option<char> = None;
    for c in flag_key.chars() {
        if c == '-' || c == '_' {
            name.push('_');
        } else {
            if c.is_ascii_uppercase()
                && previous.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
            {
                name.push('_');
            }
            name.push(c.to_ascii_uppercase());
        }
        previous = Some(c);
    }
    name
}

/// Only "true" and "false" (any case) are accepted.
pub fn parse_bool(value: &str) -> Option<bool> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("true") {
        Some(true)
    } else if v.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
