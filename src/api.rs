use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::catalog::{Catalog, Season};
use crate::chat::{classify_intent, Classification};
use crate::config::AdvisorConfig;
use crate::debug::{anon_hash, dev_log_breakdown, input_id};
use crate::disease::{
    DiseaseClassifier, DiseaseDetector, DiseaseReport, FallbackClassifier, RemoteClassifier,
};
use crate::engine::{rank_scores, score_all, Recommendation};
use crate::error::AdvisorResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::input::SoilWeatherInput;
use crate::jitter::make_rng;
use crate::lang::Language;
use crate::market::{MarketBook, MarketQuote, MatchKind, Period, PriceHistory};
use crate::metrics::{ensure_metrics_described, Metrics};
use crate::weather::{advise, AgroAdvisory, StaticWeatherProvider, WeatherProvider, WeatherSnapshot};

/// Shared, read-mostly state. The RNG is the only mutable piece and is held
/// just for the jitter draws of one request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AdvisorConfig>,
    pub catalog: Arc<Catalog>,
    pub market: Arc<MarketBook>,
    pub rng: Arc<Mutex<StdRng>>,
    pub disease: Arc<DiseaseDetector>,
    pub weather: Arc<dyn WeatherProvider>,
}

impl AppState {
    pub fn new(config: AdvisorConfig, catalog: Arc<Catalog>) -> anyhow::Result<Self> {
        catalog.ensure_min_crops(config.engine.top_n)?;

        let seed = config.engine.jitter_seed;
        // Separate streams so disease fallbacks don't shift recommendation jitter.
        let fallback_rng = make_rng(seed.map(|s| s.wrapping_add(1)));
        let fallback = FallbackClassifier::new(catalog.diseases.clone(), fallback_rng);

        let remote = match config.disease.backend_url.as_deref() {
            Some(url) => {
                let timeout = Duration::from_millis(config.disease.timeout_ms);
                let client = RemoteClassifier::new(url, timeout)?;
                Some(Box::new(client) as Box<dyn DiseaseClassifier>)
            }
            None => None,
        };
        let disease = DiseaseDetector::new(remote, fallback, config.disease.max_image_bytes);

        Ok(Self {
            market: Arc::new(MarketBook::from_catalog(&catalog)),
            rng: Arc::new(Mutex::new(make_rng(seed))),
            disease: Arc::new(disease),
            weather: Arc::new(StaticWeatherProvider::default()),
            catalog,
            config: Arc::new(config),
        })
    }

    /// Config from `ADVISOR_CONFIG_PATH` / env, catalog from `[catalog] path` or the embedded one.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AdvisorConfig::from_env()?;
        let catalog = Catalog::load(config.catalog.path.as_deref())?;
        Self::new(config, catalog)
    }

    pub fn with_weather(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.weather = provider;
        self
    }

    pub fn with_disease(mut self, detector: DiseaseDetector) -> Self {
        self.disease = Arc::new(detector);
        self
    }
}

/// Public routes only.
pub fn router(state: AppState) -> Router {
    ensure_metrics_described();
    // Headroom over the image limit: near-miss uploads get the JSON 400, huge ones a 413.
    let upload_limit = state.config.disease.max_image_bytes.saturating_add(64 * 1024);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/crops", get(list_crops))
        .route("/recommend", post(recommend))
        .route("/market/{crop}", get(market_quote))
        .route("/market/{crop}/history", get(market_history))
        .route("/weather/{city}", get(weather))
        .route("/chat/intent", post(chat_intent))
        .route(
            "/disease/detect",
            post(detect_disease).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Full app as the binary serves it: public routes, `/metrics` when a recorder
/// is installed, debug routes with the `debug` feature.
pub fn create_router(state: AppState, metrics: Option<&Metrics>) -> Router {
    #[cfg(feature = "debug")]
    let debug_routes = crate::debug::routes::router(state.clone());

    let mut app = router(state);
    if let Some(m) = metrics {
        app = app.merge(m.router());
    }
    #[cfg(feature = "debug")]
    {
        app = app.merge(debug_routes);
    }
    app
}

#[derive(Debug, Default, Deserialize)]
struct LangQuery {
    #[serde(default)]
    lang: Option<String>,
}

impl LangQuery {
    fn language(&self) -> Language {
        self.lang.as_deref().map(Language::from_code).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct CropInfo {
    name: String,
    display_name: String,
    season: Season,
    season_label: &'static str,
    rules: usize,
}

async fn list_crops(State(state): State<AppState>, ApiQuery(q): ApiQuery<LangQuery>) -> Json<Vec<CropInfo>> {
    let lang = q.language();
    let out = state
        .catalog
        .crops
        .iter()
        .map(|c| CropInfo {
            name: c.name.clone(),
            display_name: c.display_names.get(lang).to_string(),
            season: c.season,
            season_label: c.season.label(lang),
            rules: c.rules.len(),
        })
        .collect();
    Json(out)
}

/// Readings plus an optional `lang`; a body `lang` wins over `?lang=`.
#[derive(Debug, Deserialize)]
struct RecommendRequest {
    #[serde(flatten)]
    input: SoilWeatherInput,
    #[serde(default)]
    lang: Option<String>,
}

async fn recommend(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<LangQuery>,
    ApiJson(req): ApiJson<RecommendRequest>,
) -> AdvisorResult<Json<Recommendation>> {
    let started = Instant::now();
    let lang = match req.lang.as_deref() {
        Some(code) => Language::from_code(code),
        None => q.language(),
    };
    let input = req.input;
    let policy = state.config.engine.input_policy;
    let params = state.config.engine.params();

    let prepared = input.prepare(policy).map_err(|e| {
        counter!("advisor_input_rejected_total").increment(1);
        warn!(target: "recommend", field = %e.field(), ?policy, "input rejected");
        e
    })?;

    let scored = {
        let mut rng = state.rng.lock().unwrap_or_else(|e| e.into_inner());
        score_all(&prepared, &state.catalog, &params, &mut *rng)
    };
    dev_log_breakdown(&prepared, &scored);
    let rec = rank_scores(&prepared, scored, &params, lang);

    counter!("advisor_recommendations_total").increment(1);
    histogram!("advisor_recommend_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);

    let top: Vec<&str> = rec.crops.iter().map(|c| c.name.as_str()).collect();
    info!(
        target: "recommend",
        id = %input_id(&prepared),
        top = ?top,
        soil = ?rec.summary.soil_health,
        climate = ?rec.summary.climate,
        season = ?rec.summary.season,
        "recommendation served"
    );
    Ok(Json(rec))
}

async fn market_quote(
    State(state): State<AppState>,
    ApiPath(crop): ApiPath<String>,
    ApiQuery(q): ApiQuery<LangQuery>,
) -> AdvisorResult<Json<MarketQuote>> {
    let res = state.market.quote(&crop, q.language());
    let outcome = match &res {
        Ok(quote) if quote.matched_by == MatchKind::Exact => "exact",
        Ok(_) => "fuzzy",
        Err(_) => "unknown",
    };
    counter!("advisor_market_lookups_total", "outcome" => outcome).increment(1);
    Ok(Json(res?))
}

#[derive(Debug, Default, Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    period: Option<String>,
}

async fn market_history(
    State(state): State<AppState>,
    ApiPath(crop): ApiPath<String>,
    ApiQuery(q): ApiQuery<HistoryQuery>,
) -> AdvisorResult<Json<PriceHistory>> {
    let period = match q.period.as_deref() {
        Some(raw) => raw.parse::<Period>()?,
        None => Period::default(),
    };
    let today = chrono::Local::now().date_naive();
    Ok(Json(state.market.history(&crop, period, today)?))
}

#[derive(Debug, Serialize)]
struct WeatherResp {
    weather: WeatherSnapshot,
    advisory: AgroAdvisory,
    /// Recommendation form defaults with the live temperature and humidity.
    prefill: SoilWeatherInput,
}

async fn weather(
    State(state): State<AppState>,
    ApiPath(city): ApiPath<String>,
) -> AdvisorResult<Json<WeatherResp>> {
    let snapshot = state.weather.current(&city).await?;
    let advisory = advise(&snapshot);
    let prefill = snapshot.prefill(SoilWeatherInput::default());
    Ok(Json(WeatherResp {
        weather: snapshot,
        advisory,
        prefill,
    }))
}

async fn detect_disease(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AdvisorResult<Json<DiseaseReport>> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let report = state.disease.detect(&body, content_type).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

/// Intent and entities only; reply generation lives with the front-end.
async fn chat_intent(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> AdvisorResult<Json<Classification>> {
    let c = classify_intent(&req.message, &state.catalog)?;
    counter!("advisor_chat_intents_total", "intent" => c.intent.as_str()).increment(1);
    info!(
        target: "chat",
        id = %anon_hash(req.message.as_bytes()),
        intent = c.intent.as_str(),
        language = ?c.language,
        confidence = c.confidence,
        "intent classified"
    );
    Ok(Json(c))
}
