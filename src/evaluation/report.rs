//! Whole-catalog views used by the admin API and the client export.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{EvaluationContext, EvaluationReason, Evaluator, FlagEvaluation};
use crate::environment::Environment;
use crate::error::FlagResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagStatus {
    pub key: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub reason: EvaluationReason,
    pub environment_default: bool,
    pub rollout_percentage: u8,
    pub dependencies: Vec<String>,
    pub overridden: bool,
    pub beta: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub environment: Environment,
    pub generated_at: DateTime<Utc>,
    pub flags: Vec<FlagStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagAnalytics {
    pub environment: Environment,
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    pub beta: usize,
    pub overridden: usize,
}

impl Evaluator {
    /// Every catalog flag with its computed state for `context`.
    pub fn all_flags(&self, context: &EvaluationContext) -> FlagResult<CatalogSnapshot> {
        let snapshot = self.snapshot();
        let environment = snapshot.environment();

        let mut flags = Vec::with_capacity(self.catalog.len());
        for flag in self.catalog.iter() {
            let evaluation = self.evaluate_in(&snapshot, &flag.key, context)?;
            let environment_default = flag.default_for(environment);
            let rollout_percentage = self.rollout_percentage(flag, environment);

            flags.push(FlagStatus {
                key: flag.key.clone(),
                name: flag.name.clone(),
                description: flag.description.clone(),
                enabled: evaluation.enabled,
                reason: evaluation.reason,
                environment_default,
                rollout_percentage,
                dependencies: flag.dependencies.iter().cloned().collect(),
                overridden: self.overrides.contains(&flag.key)
                    || snapshot.override_for(&flag.key).is_some(),
                beta: environment_default && (1..100).contains(&rollout_percentage),
            });
        }

        let generated_at =
            DateTime::from_timestamp_millis(self.clock.now_millis()).unwrap_or_else(Utc::now);

        Ok(CatalogSnapshot {
            environment,
            generated_at,
            flags,
        })
    }

    /// Enabled/disabled/beta/overridden counts for `context`.
    pub fn analytics(&self, context: &EvaluationContext) -> FlagResult<FlagAnalytics> {
        let snapshot = self.all_flags(context)?;
        let enabled = snapshot.flags.iter().filter(|f| f.enabled).count();

        Ok(FlagAnalytics {
            environment: snapshot.environment,
            total: snapshot.flags.len(),
            enabled,
            disabled: snapshot.flags.len() - enabled,
            beta: snapshot.flags.iter().filter(|f| f.beta).count(),
            overridden: snapshot.flags.iter().filter(|f| f.overridden).count(),
        })
    }

    /// Evaluations for every flag the exposure policy lets out of the process.
    /// Reasons are redacted so hidden prerequisites are not named either.
    pub fn exposed_evaluations(
        &self,
        context: &EvaluationContext,
    ) -> FlagResult<BTreeMap<String, FlagEvaluation>> {
        let snapshot = self.snapshot();
        let mut evaluations = BTreeMap::new();
        for key in self.catalog.keys().filter(|k| self.exposure.is_exposed(k)) {
            let evaluation = self.evaluate_in(&snapshot, key, context)?;
            evaluations.insert(key.to_string(), self.for_client(evaluation));
        }
        Ok(evaluations)
    }

    /// Single-flag counterpart of [`Evaluator::exposed_evaluations`]. Hidden
    /// flags come back as `None`, same as keys the catalog does not have.
    pub fn evaluate_exposed(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> FlagResult<Option<FlagEvaluation>> {
        if !self.exposure.is_exposed(flag_key) {
            return Ok(None);
        }
        let evaluation = self.evaluate(flag_key, context)?;
        Ok(Some(self.for_client(evaluation)))
    }

    fn for_client(&self, evaluation: FlagEvaluation) -> FlagEvaluation {
        FlagEvaluation {
            enabled: evaluation.enabled,
            reason: self.exposure.redact(evaluation.reason),
        }
    }

    /// Flag key to on/off, filtered for front-end consumption.
    pub fn client_flags(&self, context: &EvaluationContext) -> FlagResult<BTreeMap<String, bool>> {
        Ok(self
            .exposed_evaluations(context)?
            .into_iter()
            .map(|(key, evaluation)| (key, evaluation.enabled))
            .collect())
    }
}
