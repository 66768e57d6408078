use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tier_flags::catalog::{defaults, Catalog};
use tier_flags::config::Config;
use tier_flags::environment;
use tier_flags::evaluation::{Evaluator, EvaluatorSettings};
use tier_flags::export::ExposurePolicy;
use tier_flags::routes;
use tier_flags::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    // A broken catalog must stop startup, not surface at evaluation time.
    let catalog = match &config.catalog_path {
        Some(path) => {
            let document = std::fs::read_to_string(path)
                .with_context(|| format!("reading flag catalog {}", path.display()))?;
            Catalog::from_json(&document)
                .with_context(|| format!("loading flag catalog {}", path.display()))?
        }
        None => defaults::catalog().context("loading built-in flag catalog")?,
    };

    let snapshot = environment::resolve(&config.environment, &catalog, |name| {
        std::env::var(name).ok()
    });
    tracing::info!(
        environment = %snapshot.environment(),
        env_overrides = snapshot.overrides().len(),
        "environment resolved"
    );

    let settings = EvaluatorSettings {
        cache_ttl_millis: config.cache_ttl_millis,
        unknown_flag_policy: config.unknown_flag_policy,
        exposure: ExposurePolicy::new(&config.hidden_patterns),
    };
    let evaluator = Arc::new(Evaluator::new(Arc::new(catalog), snapshot, settings));

    let state = AppState::new(evaluator, &config.jwt_secret);
    let app = routes::routes(state);

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("binding {}", config.addr()))?;

    tracing::info!(addr = %config.addr(), "flag service listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
