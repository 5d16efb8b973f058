// src/debug.rs
//! Dev-only diagnostics: anonymized ids, the gated scoring-breakdown logger,
//! and (with the `debug` feature) routes that expose the full breakdown.

use tracing::info;

use crate::engine::CropScore;
use crate::input::SoilWeatherInput;

pub const ENV_DEV_LOG: &str = "ADVISOR_DEV_LOG";

// Dev logging gate: ADVISOR_DEV_LOG=1 AND dev env (debug build or SHUTTLE_ENV in {local,development,dev})
pub fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// First 6 bytes of SHA-256, hex. Stable id for logs without the payload.
pub fn anon_hash(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Id for a set of readings; rounding keeps slider noise from changing it.
pub fn input_id(input: &SoilWeatherInput) -> String {
    let key = format!(
        "{:.1}|{:.1}|{:.1}|{:.1}|{:.1}|{:.2}|{:.1}",
        input.nitrogen,
        input.phosphorus,
        input.potassium,
        input.temperature,
        input.humidity,
        input.ph,
        input.rainfall
    );
    anon_hash(key.as_bytes())
}

/// Per-crop scoring breakdown, only when dev logging is on.
pub fn dev_log_breakdown(input: &SoilWeatherInput, scores: &[CropScore<'_>]) {
    if !dev_logging_enabled() {
        return;
    }
    let id = input_id(input);
    for s in scores {
        let rules: Vec<&str> = s.matched.iter().map(|r| r.id.as_str()).collect();
        info!(
            target: "engine",
            %id,
            crop = %s.crop.name,
            rule_delta = s.rule_delta,
            jitter = s.jitter,
            score = s.score,
            rules = ?rules
        );
    }
}

#[cfg(feature = "debug")]
pub mod routes {
    //! Mount with `app.merge(debug::routes::router(state))` in dev builds only.

    use serde::Serialize;
    use shuttle_axum::axum::{extract::State, routing::{get, post}, Json, Router};

    use crate::api::AppState;
    use crate::engine::score_all;
    use crate::error::AdvisorResult;
    use crate::extract::ApiJson;
    use crate::input::SoilWeatherInput;
    use crate::jitter::NoJitter;

    #[derive(Debug, Serialize)]
    pub struct BreakdownRow {
        pub crop: String,
        pub rule_delta: f32,
        pub score: f32,
        pub rules: Vec<String>,
    }

    #[derive(Debug, Serialize)]
    pub struct RulesOut {
        pub crop: String,
        pub rules: Vec<String>,
    }

    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/debug/breakdown", post(breakdown))
            .route("/debug/rules", get(rules))
            .with_state(state)
    }

    /// Jitter-free scores for every crop, catalog order. Readings go through
    /// the same input policy as `/recommend`.
    async fn breakdown(
        State(state): State<AppState>,
        ApiJson(input): ApiJson<SoilWeatherInput>,
    ) -> AdvisorResult<Json<Vec<BreakdownRow>>> {
        let prepared = input.prepare(state.config.engine.input_policy)?;
        let params = state.config.engine.params();
        let rows = score_all(&prepared, &state.catalog, &params, &mut NoJitter)
            .into_iter()
            .map(|s| BreakdownRow {
                crop: s.crop.name.clone(),
                rule_delta: s.rule_delta,
                score: s.score,
                rules: s.matched.iter().map(|r| r.id.clone()).collect(),
            })
            .collect();
        Ok(Json(rows))
    }

    async fn rules(State(state): State<AppState>) -> Json<Vec<RulesOut>> {
        Json(
            state
                .catalog
                .crops
                .iter()
                .map(|c| RulesOut {
                    crop: c.name.clone(),
                    rules: c.rules.iter().map(|r| r.id.clone()).collect(),
                })
                .collect(),
        )
    }
}
