pub mod defaults;
mod graph;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::environment::Environment;
use crate::error::{FlagError, FlagResult};

// MODELS

/// Rollout percentage used for a tier that has no explicit entry.
pub const FULL_ROLLOUT: u8 = 100;

/// Static definition of a single flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDefinition {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub environment_defaults: BTreeMap<Environment, bool>,
    #[serde(default)]
    pub rollout_percentage: BTreeMap<Environment, u8>,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl FlagDefinition {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
            environment_defaults: BTreeMap::new(),
            rollout_percentage: BTreeMap::new(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn enabled_in(mut self, environment: Environment, enabled: bool) -> Self {
        self.environment_defaults.insert(environment, enabled);
        self
    }

    pub fn rollout(mut self, environment: Environment, percentage: u8) -> Self {
        self.rollout_percentage.insert(environment, percentage);
        self
    }

    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        self.dependencies.insert(key.into());
        self
    }

    /// Environment default; tiers without an entry are disabled.
    pub fn default_for(&self, environment: Environment) -> bool {
        self.environment_defaults
            .get(&environment)
            .copied()
            .unwrap_or(false)
    }

    /// Catalog rollout percentage; tiers without an entry are fully rolled out.
    pub fn rollout_for(&self, environment: Environment) -> u8 {
        self.rollout_percentage
            .get(&environment)
            .copied()
            .unwrap_or(FULL_ROLLOUT)
    }
}

/// Validated, acyclic set of flag definitions. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Catalog {
    flags: BTreeMap<String, FlagDefinition>,
    order: Vec<String>,
    dependents: HashMap<String, Vec<String>>,
}

impl Catalog {
    /// Validate every definition and reject cycles. This is the only place
    /// the dependency graph is checked.
    pub fn load(definitions: Vec<FlagDefinition>) -> FlagResult<Self> {
        let mut flags = BTreeMap::new();
        for definition in definitions {
            validate_definition(&definition)?;
            if flags.contains_key(&definition.key) {
                return Err(FlagError::DuplicateFlag(definition.key));
            }
            flags.insert(definition.key.clone(), definition);
        }

        for flag in flags.values() {
            if let Some(missing) = flag.dependencies.iter().find(|d| !flags.contains_key(*d)) {
                return Err(FlagError::UnknownDependency {
                    flag: flag.key.clone(),
                    dependency: missing.clone(),
                });
            }
        }

        let order = graph::topological_order(&flags)?;

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for flag in flags.values() {
            for dependency in &flag.dependencies {
                dependents
                    .entry(dependency.clone())
                    .or_default()
                    .push(flag.key.clone());
            }
        }

        tracing::info!(flags = flags.len(), "flag catalog loaded");

        Ok(Self {
            flags,
            order,
            dependents,
        })
    }

    /// Parse a JSON array of definitions and load it.
    pub fn from_json(document: &str) -> FlagResult<Self> {
        let definitions: Vec<FlagDefinition> =
            serde_json::from_str(document).map_err(|e| FlagError::Malformed(e.to_string()))?;
        Self::load(definitions)
    }

    pub fn get(&self, key: &str) -> FlagResult<&FlagDefinition> {
        self.flags
            .get(key)
            .ok_or_else(|| FlagError::UnknownFlag(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    /// Definitions in key order.
    pub fn iter(&self) -> impl Iterator<Item = &FlagDefinition> {
        self.flags.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Keys ordered so every flag comes after all of its dependencies.
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Every flag that depends on `key`, directly or transitively.
    pub fn dependents_of(&self, key: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut pending = vec![key];
        while let Some(current) = pending.pop() {
            if let Some(direct) = self.dependents.get(current) {
                for dependent in direct {
                    if found.insert(dependent.clone()) {
                        pending.push(dependent);
                    }
                }
            }
        }
        found
    }
}

// HELPER FUNCTIONS

fn validate_definition(definition: &FlagDefinition) -> FlagResult<()> {
    validate_flag_key(&definition.key).map_err(|reason| FlagError::InvalidDefinition {
        key: definition.key.clone(),
        reason,
    })?;

    if definition.name.trim().is_empty() {
        return Err(FlagError::InvalidDefinition {
            key: definition.key.clone(),
            reason: "Flag name cannot be empty".to_string(),
        });
    }

    for percentage in definition.rollout_percentage.values() {
        validate_rollout_percentage(&definition.key, *percentage)?;
    }

    Ok(())
}

// Validating the flag key
pub fn validate_flag_key(key: &str) -> Result<(), String> {
    let Some(first) = key.chars().next() else {
        return Err("Flag key cannot be empty".to_string());
    };

    if key.len() > 64 {
        return Err("Flag key is too long (Max: 64 characters)".to_string());
    }

    if !first.is_ascii_alphabetic() {
        return Err("Flag key must start with a letter".to_string());
    }

    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(
            "Flag key can only contain letters, numbers, underscores, and hyphens".to_string(),
        );
    }

    Ok(())
}

// Checks the percentage is between 0 and 100 inclusive
pub fn validate_rollout_percentage(key: &str, percentage: u8) -> FlagResult<()> {
    if percentage > 100 {
        return Err(FlagError::InvalidRollout {
            key: key.to_string(),
            percentage,
        });
    }
    Ok(())
}
