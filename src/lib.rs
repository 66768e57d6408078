//! Feature flag resolution per environment tier.
//!
//! A static [`Catalog`] of flags, each with per-tier defaults, rollout
//! percentages and prerequisite flags, is checked for cycles once at startup.
//! An [`Evaluator`] then answers "is this flag on for this caller" from an
//! [`EnvironmentSnapshot`], administrative overrides, deterministic rollout
//! buckets and a short-lived result cache. The [`routes`] module puts the
//! evaluator behind an axum router.

pub mod catalog;
pub mod config;
pub mod environment;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod routes;
pub mod state;

pub use catalog::{Catalog, FlagDefinition};
pub use environment::{Environment, EnvironmentSnapshot};
pub use error::{FlagError, FlagResult};
pub use evaluation::{
    EvaluationContext, EvaluationReason, Evaluator, EvaluatorSettings, FlagEvaluation,
};
pub use export::ExposurePolicy;
