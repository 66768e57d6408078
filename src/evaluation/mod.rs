pub mod bucket;
pub mod cache;
pub mod clock;
mod context;
pub mod dependencies;
pub mod overrides;
mod report;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::catalog::{validate_rollout_percentage, Catalog, FlagDefinition};
use crate::environment::{self, Environment, EnvironmentSnapshot};
use crate::error::{FlagError, FlagResult};
use crate::export::ExposurePolicy;

use self::bucket::in_rollout;
use self::cache::{EvaluationCache, DEFAULT_TTL_MILLIS};
use self::clock::{Clock, SystemClock};
use self::dependencies::first_unsatisfied_dependency;
use self::overrides::OverrideSet;

pub use self::context::{EvaluationContext, ANONYMOUS_KEY};
pub use self::dependencies::{all_dependencies_satisfied, Evaluate};
pub use self::report::{CatalogSnapshot, FlagAnalytics, FlagStatus};

/// Why a flag evaluated the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EvaluationReason {
    Cached,
    Override,
    EnvironmentOverride,
    EnvironmentDisabled { environment: Environment },
    DependencyDisabled { dependency: String },
    /// A prerequisite is off but its key must not leave the process.
    HiddenDependencyDisabled,
    InRollout { percentage: u8 },
    OutOfRollout { percentage: u8 },
    UnknownFlag,
}

impl fmt::Display for EvaluationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cached => write!(f, "Cached result"),
            Self::Override => write!(f, "Administrative override"),
            Self::EnvironmentOverride => write!(f, "Environment variable override"),
            Self::EnvironmentDisabled { environment } => {
                write!(f, "Flag is disabled in {}", environment)
            }
            Self::DependencyDisabled { dependency } => {
                write!(f, "Dependency '{}' is disabled", dependency)
            }
            Self::HiddenDependencyDisabled => write!(f, "A dependency is disabled"),
            Self::InRollout { percentage } => write!(f, "User in {}% rollout", percentage),
            Self::OutOfRollout { percentage } => write!(f, "User not in {}% rollout", percentage),
            Self::UnknownFlag => write!(f, "Unknown flag"),
        }
    }
}

// Flag evaluation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagEvaluation {
    pub enabled: bool,
    pub reason: EvaluationReason,
}

impl FlagEvaluation {
    fn new(enabled: bool, reason: EvaluationReason) -> Self {
        Self { enabled, reason }
    }
}

/// What to do when asked about a key that is not in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFlagPolicy {
    /// Return `FlagError::UnknownFlag`.
    Strict,
    /// Log a warning and report the flag as disabled.
    Lenient,
}

impl UnknownFlagPolicy {
    /// Production is lenient, every other tier fails loudly.
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::Lenient,
            _ => Self::Strict,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lenient" => Some(Self::Lenient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvaluatorSettings {
    pub cache_ttl_millis: i64,
    /// `None` derives the policy from the environment tier.
    pub unknown_flag_policy: Option<UnknownFlagPolicy>,
    pub exposure: ExposurePolicy,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            cache_ttl_millis: DEFAULT_TTL_MILLIS,
            unknown_flag_policy: None,
            exposure: ExposurePolicy::default(),
        }
    }
}

/// Decides whether a flag is on for an evaluation context.
///
/// Order of checks: unknown flag, cache, override (administrative, then
/// environment variable), environment default, dependencies, rollout bucket.
/// Every computed result is written to the cache.
///
/// The catalog is shared read-only. Overrides, rollout adjustments and the
/// cache are the only mutable state; all of it is safe to touch from many
/// request handlers at once.
pub struct Evaluator {
    catalog: Arc<Catalog>,
    snapshot: RwLock<Arc<EnvironmentSnapshot>>,
    overrides: OverrideSet,
    rollout_adjustments: RwLock<HashMap<String, BTreeMap<Environment, u8>>>,
    cache: EvaluationCache,
    /// Bumped by every override change, refresh and explicit invalidation.
    generation: AtomicU64,
    clock: Arc<dyn Clock>,
    unknown_flag_policy: Option<UnknownFlagPolicy>,
    exposure: ExposurePolicy,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("flags", &self.catalog.len())
            .field("environment", &self.environment())
            .field("overrides", &self.overrides.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Evaluator {
    pub fn new(
        catalog: Arc<Catalog>,
        snapshot: EnvironmentSnapshot,
        settings: EvaluatorSettings,
    ) -> Self {
        Self {
            catalog,
            snapshot: RwLock::new(Arc::new(snapshot)),
            overrides: OverrideSet::new(),
            rollout_adjustments: RwLock::new(HashMap::new()),
            cache: EvaluationCache::new(settings.cache_ttl_millis),
            generation: AtomicU64::new(0),
            clock: Arc::new(SystemClock),
            unknown_flag_policy: settings.unknown_flag_policy,
            exposure: settings.exposure,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn snapshot(&self) -> Arc<EnvironmentSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn environment(&self) -> Environment {
        self.snapshot.read().environment()
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    pub fn unknown_flag_policy(&self) -> UnknownFlagPolicy {
        self.unknown_flag_policy
            .unwrap_or_else(|| UnknownFlagPolicy::for_environment(self.environment()))
    }

    pub fn is_enabled(&self, flag_key: &str, context: &EvaluationContext) -> FlagResult<bool> {
        self.evaluate(flag_key, context).map(|e| e.enabled)
    }

    pub fn evaluate(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> FlagResult<FlagEvaluation> {
        let snapshot = self.snapshot();
        self.evaluate_in(&snapshot, flag_key, context)
    }

    fn evaluate_in(
        &self,
        snapshot: &EnvironmentSnapshot,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> FlagResult<FlagEvaluation> {
        let flag = match self.catalog.get(flag_key) {
            Ok(flag) => flag,
            Err(err) => return self.unknown_flag(snapshot.environment(), err),
        };

        let evaluation_key = context.evaluation_key();
        let now = self.clock.now_millis();
        if let Some(enabled) = self.cache.get(flag_key, evaluation_key, now) {
            return Ok(FlagEvaluation::new(enabled, EvaluationReason::Cached));
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let evaluation = self.compute(snapshot, flag, context)?;
        self.cache
            .put(flag_key, evaluation_key, evaluation.enabled, self.clock.now_millis());
        // A mutation landed mid-compute; its invalidation may have run before
        // this put, so the entry could predate it.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.cache.remove(flag_key, evaluation_key);
        }

        tracing::debug!(
            flag = flag_key,
            evaluation_key,
            enabled = evaluation.enabled,
            reason = %evaluation.reason,
            "flag evaluated"
        );
        Ok(evaluation)
    }

    fn compute(
        &self,
        snapshot: &EnvironmentSnapshot,
        flag: &FlagDefinition,
        context: &EvaluationContext,
    ) -> FlagResult<FlagEvaluation> {
        // Step 1: explicit overrides always win
        if let Some(enabled) = self.overrides.get(&flag.key) {
            return Ok(FlagEvaluation::new(enabled, EvaluationReason::Override));
        }
        if let Some(enabled) = snapshot.override_for(&flag.key) {
            return Ok(FlagEvaluation::new(
                enabled,
                EvaluationReason::EnvironmentOverride,
            ));
        }

        // Step 2: tier default is a kill switch that rollout cannot reopen
        let environment = snapshot.environment();
        if !flag.default_for(environment) {
            return Ok(FlagEvaluation::new(
                false,
                EvaluationReason::EnvironmentDisabled { environment },
            ));
        }

        // Step 3: prerequisites, evaluated against the same snapshot
        let pinned = Pinned {
            evaluator: self,
            snapshot,
        };
        if let Some(dependency) = first_unsatisfied_dependency(flag, context, &pinned)? {
            return Ok(FlagEvaluation::new(
                false,
                EvaluationReason::DependencyDisabled {
                    dependency: dependency.to_string(),
                },
            ));
        }

        // Step 4: percentage rollout on the evaluation key
        let percentage = self.rollout_percentage(flag, environment);
        let reason = if in_rollout(context.evaluation_key(), percentage) {
            EvaluationReason::InRollout { percentage }
        } else {
            EvaluationReason::OutOfRollout { percentage }
        };
        Ok(FlagEvaluation::new(
            matches!(reason, EvaluationReason::InRollout { .. }),
            reason,
        ))
    }

    fn unknown_flag(&self, environment: Environment, err: FlagError) -> FlagResult<FlagEvaluation> {
        let policy = self
            .unknown_flag_policy
            .unwrap_or_else(|| UnknownFlagPolicy::for_environment(environment));
        match policy {
            UnknownFlagPolicy::Strict => Err(err),
            UnknownFlagPolicy::Lenient => {
                tracing::warn!(error = %err, "unknown flag evaluated as disabled");
                Ok(FlagEvaluation::new(false, EvaluationReason::UnknownFlag))
            }
        }
    }

    /// Adjusted percentage for the tier if one was set, else the catalog's.
    fn rollout_percentage(&self, flag: &FlagDefinition, environment: Environment) -> u8 {
        self.rollout_adjustments
            .read()
            .get(&flag.key)
            .and_then(|by_env| by_env.get(&environment).copied())
            .unwrap_or_else(|| flag.rollout_for(environment))
    }

    pub fn effective_rollout(&self, flag_key: &str, environment: Environment) -> FlagResult<u8> {
        let flag = self.catalog.get(flag_key)?;
        Ok(self.rollout_percentage(flag, environment))
    }

    // ADMINISTRATION

    /// Force a flag on or off. Cached results for the flag and everything
    /// depending on it are dropped so the override is visible immediately.
    pub fn set_override(&self, flag_key: &str, enabled: bool) -> FlagResult<Option<bool>> {
        self.catalog.get(flag_key)?;
        let previous = self.overrides.set(flag_key, enabled);
        self.invalidate_with_dependents(flag_key);
        tracing::info!(flag = flag_key, enabled, ?previous, "override set");
        Ok(previous)
    }

    pub fn remove_override(&self, flag_key: &str) -> FlagResult<Option<bool>> {
        self.catalog.get(flag_key)?;
        let previous = self.overrides.remove(flag_key);
        if previous.is_some() {
            self.invalidate_with_dependents(flag_key);
            tracing::info!(flag = flag_key, ?previous, "override removed");
        }
        Ok(previous)
    }

    pub fn clear_overrides(&self) {
        let cleared = self.overrides.len();
        self.overrides.clear();
        self.invalidate_all();
        tracing::info!(cleared, "overrides cleared");
    }

    pub fn overrides(&self) -> BTreeMap<String, bool> {
        self.overrides.snapshot()
    }

    /// Change a tier's rollout percentage without reloading the catalog.
    ///
    /// Cached results are left alone: callers keep their current answer until
    /// the entry expires, then pick up the new percentage.
    pub fn set_rollout_percentage(
        &self,
        flag_key: &str,
        environment: Environment,
        percentage: u8,
    ) -> FlagResult<()> {
        self.catalog.get(flag_key)?;
        validate_rollout_percentage(flag_key, percentage)?;
        self.rollout_adjustments
            .write()
            .entry(flag_key.to_string())
            .or_default()
            .insert(environment, percentage);
        tracing::info!(flag = flag_key, %environment, percentage, "rollout adjusted");
        Ok(())
    }

    /// Drop cached results for one flag (and its dependents) or for all flags.
    pub fn invalidate_cache(&self, flag_key: Option<&str>) -> FlagResult<()> {
        match flag_key {
            Some(key) => {
                self.catalog.get(key)?;
                self.invalidate_with_dependents(key);
            }
            None => self.invalidate_all(),
        }
        Ok(())
    }

    /// Re-resolve the environment snapshot and start from an empty cache.
    pub fn refresh_environment<F>(&self, raw_name: &str, read_var: F) -> Arc<EnvironmentSnapshot>
    where
        F: Fn(&str) -> Option<String>,
    {
        let snapshot = Arc::new(environment::resolve(raw_name, &self.catalog, read_var));
        *self.snapshot.write() = Arc::clone(&snapshot);
        self.invalidate_all();
        tracing::info!(environment = %snapshot.environment(), "environment snapshot refreshed");
        snapshot
    }

    // The generation bump must follow the state change and precede the
    // removal, see `evaluate_in`.
    fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(None);
    }

    fn invalidate_with_dependents(&self, flag_key: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(Some(flag_key));
        for dependent in self.catalog.dependents_of(flag_key) {
            self.cache.invalidate(Some(dependent.as_str()));
        }
    }
}

impl Evaluate for Evaluator {
    fn is_enabled(&self, flag_key: &str, context: &EvaluationContext) -> FlagResult<bool> {
        Evaluator::is_enabled(self, flag_key, context)
    }
}

/// Evaluator bound to one snapshot, so a flag and its dependencies are all
/// decided against the same tier even if a refresh lands mid-evaluation.
struct Pinned<'a> {
    evaluator: &'a Evaluator,
    snapshot: &'a EnvironmentSnapshot,
}

impl Evaluate for Pinned<'_> {
    fn is_enabled(&self, flag_key: &str, context: &EvaluationContext) -> FlagResult<bool> {
        self.evaluator
            .evaluate_in(self.snapshot, flag_key, context)
            .map(|e| e.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::clock::ManualClock;
    use super::*;
    use crate::catalog::FlagDefinition;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};
    use std::thread;

    fn scenario_catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::load(vec![
                FlagDefinition::new("betaTesting", "Beta testing")
                    .enabled_in(Environment::Production, false)
                    .enabled_in(Environment::Staging, true)
                    .rollout(Environment::Staging, 100),
                FlagDefinition::new("experimentalUI", "Experimental UI")
                    .enabled_in(Environment::Staging, true)
                    .rollout(Environment::Staging, 50)
                    .depends_on("betaTesting"),
            ])
            .unwrap(),
        )
    }

    fn evaluator(environment: Environment) -> Evaluator {
        Evaluator::new(
            scenario_catalog(),
            EnvironmentSnapshot::new(environment),
            EvaluatorSettings::default(),
        )
    }

    fn user(id: &str) -> EvaluationContext {
        EvaluationContext::for_user(id)
    }

    #[test]
    fn test_beta_testing_by_environment() {
        let staging = evaluator(Environment::Staging);
        assert!(staging.is_enabled("betaTesting", &user("u1")).unwrap());

        let production = evaluator(Environment::Production);
        let result = production.evaluate("betaTesting", &user("u1")).unwrap();
        assert!(!result.enabled);
        assert_eq!(
            result.reason,
            EvaluationReason::EnvironmentDisabled {
                environment: Environment::Production
            }
        );
    }

    #[test]
    fn test_out_of_rollout_despite_enabled_dependency() {
        // user-23 hashes to bucket 70
        let staging = evaluator(Environment::Staging);
        let ctx = user("user-23");

        assert!(staging.is_enabled("betaTesting", &ctx).unwrap());
        let result = staging.evaluate("experimentalUI", &ctx).unwrap();
        assert!(!result.enabled);
        assert_eq!(result.reason, EvaluationReason::OutOfRollout { percentage: 50 });
    }

    #[test]
    fn test_override_flips_out_of_rollout_user() {
        let staging = evaluator(Environment::Staging);
        let ctx = user("user-23");
        assert!(!staging.is_enabled("experimentalUI", &ctx).unwrap());

        staging.set_override("experimentalUI", true).unwrap();
        let result = staging.evaluate("experimentalUI", &ctx).unwrap();
        assert!(result.enabled);
        assert_eq!(result.reason, EvaluationReason::Override);
    }

    #[test]
    fn test_in_rollout_user() {
        // u1 hashes to bucket 35
        let staging = evaluator(Environment::Staging);
        let result = staging.evaluate("experimentalUI", &user("u1")).unwrap();
        assert!(result.enabled);
        assert_eq!(result.reason, EvaluationReason::InRollout { percentage: 50 });
    }

    #[test]
    fn test_override_beats_every_other_check_until_cleared() {
        let production = evaluator(Environment::Production);
        let ctx = user("user-23");

        production.set_override("experimentalUI", true).unwrap();
        assert!(production.is_enabled("experimentalUI", &ctx).unwrap());

        production.set_override("experimentalUI", false).unwrap();
        assert!(!production.is_enabled("experimentalUI", &ctx).unwrap());

        production.set_override("experimentalUI", true).unwrap();
        production.clear_overrides();
        assert!(production.overrides().is_empty());
        assert!(!production.is_enabled("experimentalUI", &ctx).unwrap());
    }

    #[test]
    fn test_override_invalidates_cached_dependents() {
        let staging = evaluator(Environment::Staging);
        let ctx = user("u1");
        assert!(staging.is_enabled("experimentalUI", &ctx).unwrap());

        staging.set_override("betaTesting", false).unwrap();
        let result = staging.evaluate("experimentalUI", &ctx).unwrap();
        assert!(!result.enabled);
        assert_eq!(
            result.reason,
            EvaluationReason::DependencyDisabled {
                dependency: "betaTesting".into()
            }
        );

        assert_eq!(staging.remove_override("betaTesting").unwrap(), Some(false));
        assert!(staging.is_enabled("experimentalUI", &ctx).unwrap());
    }

    #[test]
    fn test_dependency_gates_full_rollout() {
        let catalog = Catalog::load(vec![
            FlagDefinition::new("a", "A").enabled_in(Environment::Staging, false),
            FlagDefinition::new("b", "B")
                .enabled_in(Environment::Staging, true)
                .rollout(Environment::Staging, 100)
                .depends_on("a"),
        ])
        .unwrap();
        let staging = Evaluator::new(
            Arc::new(catalog),
            EnvironmentSnapshot::new(Environment::Staging),
            EvaluatorSettings::default(),
        );

        for id in ["u1", "u2", "user-23", ""] {
            assert!(!staging.is_enabled("b", &user(id)).unwrap());
        }
    }

    #[test]
    fn test_dependency_short_circuit_skips_later_cache_writes() {
        let catalog = Catalog::load(vec![
            FlagDefinition::new("a", "A"),
            FlagDefinition::new("b", "B").enabled_in(Environment::Staging, true),
            FlagDefinition::new("child", "Child")
                .enabled_in(Environment::Staging, true)
                .depends_on("a")
                .depends_on("b"),
        ])
        .unwrap();
        let clock = Arc::new(ManualClock::new(1_000));
        let staging = Evaluator::new(
            Arc::new(catalog),
            EnvironmentSnapshot::new(Environment::Staging),
            EvaluatorSettings::default(),
        )
        .with_clock(clock);

        assert!(!staging.is_enabled("child", &user("u1")).unwrap());
        assert_eq!(staging.cache().get("a", "u1", 1_000), Some(false));
        assert_eq!(staging.cache().get("child", "u1", 1_000), Some(false));
        assert_eq!(staging.cache().get("b", "u1", 1_000), None);
    }

    #[test]
    fn test_environment_variable_override_bypasses_checks() {
        let catalog = scenario_catalog();
        let snapshot = environment::resolve("production", &catalog, |name| {
            (name == "FEATURE_EXPERIMENTAL_UI").then(|| "true".to_string())
        });
        let production = Evaluator::new(catalog, snapshot, EvaluatorSettings::default());

        let result = production.evaluate("experimentalUI", &user("user-23")).unwrap();
        assert!(result.enabled);
        assert_eq!(result.reason, EvaluationReason::EnvironmentOverride);
        assert!(!production.is_enabled("betaTesting", &user("user-23")).unwrap());

        production.set_override("experimentalUI", false).unwrap();
        assert!(!production.is_enabled("experimentalUI", &user("user-23")).unwrap());
    }

    #[test]
    fn test_cache_authoritative_until_ttl() {
        let clock = Arc::new(ManualClock::new(0));
        let staging = Evaluator::new(
            scenario_catalog(),
            EnvironmentSnapshot::new(Environment::Staging),
            EvaluatorSettings {
                cache_ttl_millis: 1_000,
                ..EvaluatorSettings::default()
            },
        )
        .with_clock(clock.clone());
        let ctx = user("user-23");

        assert!(!staging.is_enabled("experimentalUI", &ctx).unwrap());

        staging
            .set_rollout_percentage("experimentalUI", Environment::Staging, 100)
            .unwrap();
        clock.advance(999);
        let cached = staging.evaluate("experimentalUI", &ctx).unwrap();
        assert!(!cached.enabled);
        assert_eq!(cached.reason, EvaluationReason::Cached);

        clock.advance(1);
        let fresh = staging.evaluate("experimentalUI", &ctx).unwrap();
        assert!(fresh.enabled);
        assert_eq!(fresh.reason, EvaluationReason::InRollout { percentage: 100 });
    }

    #[test]
    fn test_rollout_adjustment_validation() {
        let staging = evaluator(Environment::Staging);
        assert!(matches!(
            staging.set_rollout_percentage("experimentalUI", Environment::Staging, 101),
            Err(FlagError::InvalidRollout { .. })
        ));
        assert!(staging
            .set_rollout_percentage("missing", Environment::Staging, 10)
            .is_err());
        assert_eq!(
            staging.effective_rollout("experimentalUI", Environment::Staging).unwrap(),
            50
        );
    }

    #[test]
    fn test_unknown_flag_policy_by_tier() {
        let staging = evaluator(Environment::Staging);
        assert_eq!(staging.unknown_flag_policy(), UnknownFlagPolicy::Strict);
        assert_eq!(
            staging.is_enabled("nope", &user("u1")),
            Err(FlagError::UnknownFlag("nope".into()))
        );

        let production = evaluator(Environment::Production);
        let result = production.evaluate("nope", &user("u1")).unwrap();
        assert!(!result.enabled);
        assert_eq!(result.reason, EvaluationReason::UnknownFlag);
        assert!(production.cache().is_empty());
    }

    #[test]
    fn test_configured_policy_wins_over_tier() {
        let production = Evaluator::new(
            scenario_catalog(),
            EnvironmentSnapshot::new(Environment::Production),
            EvaluatorSettings {
                unknown_flag_policy: Some(UnknownFlagPolicy::Strict),
                ..EvaluatorSettings::default()
            },
        );
        assert!(production.is_enabled("nope", &user("u1")).is_err());
        assert!(production.set_override("nope", true).is_err());
    }

    #[test]
    fn test_refresh_environment_switches_tier() {
        let ev = evaluator(Environment::Production);
        assert!(!ev.is_enabled("betaTesting", &user("u1")).unwrap());

        let snapshot = ev.refresh_environment("staging", |_| None);
        assert_eq!(snapshot.environment(), Environment::Staging);
        assert!(ev.is_enabled("betaTesting", &user("u1")).unwrap());
    }

    #[test]
    fn test_generic_resolver_accepts_evaluator() {
        let staging = evaluator(Environment::Staging);
        let flag = staging.catalog().get("experimentalUI").unwrap().clone();
        assert!(all_dependencies_satisfied(&flag, &user("user-23"), &staging).unwrap());
    }

    #[test]
    fn test_concurrent_evaluation_agrees() {
        let staging = Arc::new(evaluator(Environment::Staging));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ev = Arc::clone(&staging);
                thread::spawn(move || {
                    (0..200)
                        .map(|i| {
                            if worker == 0 && i % 50 == 0 {
                                ev.invalidate_cache(None).unwrap();
                            }
                            ev.is_enabled("experimentalUI", &user(&format!("user-{i}")))
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<bool>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert!(!results[0][23]);
    }

    #[test]
    fn test_set_override_returns_previous() {
        let staging = evaluator(Environment::Staging);
        assert_eq!(staging.set_override("betaTesting", false).unwrap(), None);
        assert_eq!(staging.set_override("betaTesting", true).unwrap(), Some(false));
        assert_eq!(staging.remove_override("betaTesting").unwrap(), Some(true));
    }

    /// Runs `on_put` inside the first cache write, where an admin call on
    /// another thread could land between compute and put.
    struct InterleavingClock {
        calls: AtomicUsize,
        evaluator: OnceLock<Weak<Evaluator>>,
        on_put: Box<dyn Fn(&Evaluator) + Send + Sync>,
    }

    impl Clock for InterleavingClock {
        fn now_millis(&self) -> i64 {
            // call 0 is the cache lookup, call 1 the put timestamp
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                if let Some(shared) = self.evaluator.get().and_then(Weak::upgrade) {
                    (self.on_put)(&shared);
                }
            }
            0
        }
    }

    fn interleaved<F>(environment: Environment, on_put: F) -> Arc<Evaluator>
    where
        F: Fn(&Evaluator) + Send + Sync + 'static,
    {
        let clock = Arc::new(InterleavingClock {
            calls: AtomicUsize::new(0),
            evaluator: OnceLock::new(),
            on_put: Box::new(on_put),
        });
        let shared = Arc::new(evaluator(environment).with_clock(clock.clone()));
        let _ = clock.evaluator.set(Arc::downgrade(&shared));
        shared
    }

    #[test]
    fn test_override_set_mid_evaluation_is_not_masked_by_cache() {
        let staging = interleaved(Environment::Staging, |ev| {
            ev.set_override("betaTesting", false).unwrap();
        });
        let ctx = user("u1");

        assert!(staging.is_enabled("betaTesting", &ctx).unwrap());
        assert_eq!(staging.overrides().get("betaTesting"), Some(&false));

        let after = staging.evaluate("betaTesting", &ctx).unwrap();
        assert_eq!(after, FlagEvaluation::new(false, EvaluationReason::Override));
    }

    #[test]
    fn test_overrides_cleared_mid_evaluation_are_not_masked_by_cache() {
        let production = interleaved(Environment::Production, |ev| ev.clear_overrides());
        production.set_override("betaTesting", true).unwrap();
        let ctx = user("u1");

        assert!(production.is_enabled("betaTesting", &ctx).unwrap());
        assert!(production.overrides().is_empty());
        assert!(!production.is_enabled("betaTesting", &ctx).unwrap());
    }

    #[test]
    fn test_refresh_mid_evaluation_is_not_masked_by_cache() {
        let staging = interleaved(Environment::Staging, |ev| {
            ev.refresh_environment("production", |_| None);
        });
        let ctx = user("u1");

        assert!(staging.is_enabled("betaTesting", &ctx).unwrap());
        assert_eq!(staging.environment(), Environment::Production);

        let after = staging.evaluate("betaTesting", &ctx).unwrap();
        assert!(!after.enabled);
        assert_eq!(
            after.reason,
            EvaluationReason::EnvironmentDisabled {
                environment: Environment::Production
            }
        );
    }

    #[test]
    fn test_concurrent_override_wins_once_set() {
        let staging = Arc::new(evaluator(Environment::Staging));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let ev = Arc::clone(&staging);
                thread::spawn(move || {
                    for i in 0..500 {
                        ev.is_enabled("betaTesting", &user(&format!("user-{}", i % 50)))
                            .unwrap();
                    }
                })
            })
            .collect();

        staging.set_override("betaTesting", false).unwrap();
        for worker in workers {
            worker.join().unwrap();
        }

        for i in 0..50 {
            assert!(!staging
                .is_enabled("betaTesting", &user(&format!("user-{i}")))
                .unwrap());
        }
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            EvaluationReason::OutOfRollout { percentage: 50 }.to_string(),
            "User not in 50% rollout"
        );
        assert_eq!(
            EvaluationReason::EnvironmentDisabled {
                environment: Environment::Production
            }
            .to_string(),
            "Flag is disabled in production"
        );
        assert_eq!(
            EvaluationReason::HiddenDependencyDisabled.to_string(),
            "A dependency is disabled"
        );
    }
}
