//! Prerequisite evaluation.
//!
//! Recursion goes back through the evaluator, so every dependency passes the
//! full pipeline (override, tier default, its own dependencies, rollout,
//! cache). It always terminates because catalogs are acyclic by construction.

use super::EvaluationContext;
use crate::catalog::FlagDefinition;
use crate::error::FlagResult;

/// Anything that can answer "is this flag on for this context".
pub trait Evaluate {
    fn is_enabled(&self, flag_key: &str, context: &EvaluationContext) -> FlagResult<bool>;
}

/// First dependency (in key order) that evaluates to false. Dependencies
/// after it are not evaluated.
pub fn first_unsatisfied_dependency<'f, E>(
    flag: &'f FlagDefinition,
    context: &EvaluationContext,
    evaluator: &E,
) -> FlagResult<Option<&'f str>>
where
    E: Evaluate + ?Sized,
{
    for dependency in &flag.dependencies {
        if !evaluator.is_enabled(dependency, context)? {
            return Ok(Some(dependency.as_str()));
        }
    }
    Ok(None)
}

/// AND over all dependencies, stopping at the first disabled one.
pub fn all_dependencies_satisfied<E>(
    flag: &FlagDefinition,
    context: &EvaluationContext,
    evaluator: &E,
) -> FlagResult<bool>
where
    E: Evaluate + ?Sized,
{
    Ok(first_unsatisfied_dependency(flag, context, evaluator)?.is_none())
}
