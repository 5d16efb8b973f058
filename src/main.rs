//! Kisan Advisor binary entrypoint.
//! Boots the Axum HTTP server: config, catalog, shared state, metrics, routes.

use kisan_advisor::{api, metrics::Metrics, AppState};
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON lines with ADVISOR_LOG_JSON=1.
/// Filter from RUST_LOG, else `kisan_advisor=info,warn`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kisan_advisor=info,warn"));

    let json = std::env::var("ADVISOR_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    // The runtime may already have installed a subscriber; keep that one.
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        info!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let state = AppState::from_env()?;

    let metrics = match Metrics::install(state.catalog.crops.len()) {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = %e, "metrics disabled");
            None
        }
    };

    info!(
        crops = state.catalog.crops.len(),
        policy = ?state.config.engine.input_policy,
        disease_remote = state.disease.has_remote(),
        "kisan advisor starting"
    );

    let router = api::create_router(state, metrics.as_ref());
    Ok(router.into())
}
