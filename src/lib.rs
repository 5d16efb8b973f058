// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod debug;
pub mod disease;
pub mod engine;
pub mod error;
pub mod extract;
pub mod input;
pub mod jitter;
pub mod lang;
pub mod market;
pub mod metrics;
pub mod rules;
pub mod summary;
pub mod weather;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, router, AppState};
pub use crate::catalog::Catalog;
pub use crate::chat::{classify_intent, Classification, Intent};
pub use crate::engine::{recommend_top_crops, EngineParams, Recommendation, ScoredCrop};
pub use crate::input::{InputPolicy, SoilWeatherInput};
pub use crate::jitter::{JitterSource, NoJitter};
pub use crate::lang::Language;
pub use crate::summary::{summarize, InputSummary};
