//! # Crop Scoring Engine
//! Pure, testable logic that maps `(input, catalog, jitter)` → ranked crops.
//! No I/O; the only side effect is advancing the injected jitter source.
//!
//! Policy: every crop starts at the base score, gains the deltas of its
//! matching rules plus a small random jitter, is clamped to the ceiling, and
//! the best `top_n` are returned in descending order (ties keep catalog order).

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CropProfile, MandiPrice, Season};
use crate::input::SoilWeatherInput;
use crate::jitter::JitterSource;
use crate::lang::Language;
use crate::rules::{apply_rules, Rule};
use crate::summary::{summarize, InputSummary, SummaryLabels};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub base_score: f32,
    pub jitter_max: f32,
    pub score_ceiling: f32,
    pub top_n: usize,
    pub max_reasons: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            base_score: 50.0,
            jitter_max: 10.0,
            score_ceiling: 98.0,
            top_n: 3,
            max_reasons: 3,
        }
    }
}

/// Pre-ranking breakdown for one crop.
#[derive(Debug, Clone)]
pub struct CropScore<'a> {
    pub crop: &'a CropProfile,
    pub rule_delta: f32,
    pub jitter: f32,
    pub score: f32,
    pub matched: Vec<&'a Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedReason {
    pub rule_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCrop {
    pub name: String,
    pub display_name: String,
    pub season: Season,
    pub season_label: &'static str,
    pub score: f32,
    /// `score` rounded for the "Match: NN%" badge.
    pub match_percent: u32,
    pub rank: usize,
    pub reasons: Vec<MatchedReason>,
    pub highlights: Vec<String>,
    pub yield_estimate: String,
    pub profit_estimate: String,
    pub duration_estimate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandi_price: Option<MandiPrice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub crops: Vec<ScoredCrop>,
    pub summary: InputSummary,
    pub labels: SummaryLabels,
}

/// Scores every crop in catalog order. Draws exactly one jitter value per crop.
pub fn score_all<'a, J>(
    input: &SoilWeatherInput,
    catalog: &'a Catalog,
    params: &EngineParams,
    jitter: &mut J,
) -> Vec<CropScore<'a>>
where
    J: JitterSource + ?Sized,
{
    catalog
        .crops
        .iter()
        .map(|crop| {
            let (rule_delta, matched) = apply_rules(input, &crop.rules);
            let j = jitter.jitter(params.jitter_max);
            let score = clamp_score(params.base_score + rule_delta + j, params.score_ceiling);
            CropScore {
                crop,
                rule_delta,
                jitter: j,
                score,
                matched,
            }
        })
        .collect()
}

// `max`/`min` instead of `clamp`: never panics on a misconfigured ceiling.
fn clamp_score(raw: f32, ceiling: f32) -> f32 {
    raw.max(0.0).min(ceiling)
}

/// Top `params.top_n` crops for `input`, with reasons and the input summary.
pub fn recommend_top_crops<J>(
    input: &SoilWeatherInput,
    catalog: &Catalog,
    params: &EngineParams,
    jitter: &mut J,
    lang: Language,
) -> Recommendation
where
    J: JitterSource + ?Sized,
{
    let scored = score_all(input, catalog, params, jitter);
    rank_scores(input, scored, params, lang)
}

/// Ranks a finished `score_all` pass; scores are served as they are, jitter included.
pub fn rank_scores(
    input: &SoilWeatherInput,
    mut scored: Vec<CropScore<'_>>,
    params: &EngineParams,
    lang: Language,
) -> Recommendation {
    // Stable: equal scores keep catalog order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let crops = scored
        .into_iter()
        .take(params.top_n)
        .enumerate()
        .map(|(i, s)| to_scored_crop(s, i + 1, params.max_reasons, lang))
        .collect();

    let summary = summarize(input);
    Recommendation {
        crops,
        labels: summary.labels(lang),
        summary,
    }
}

fn to_scored_crop(s: CropScore<'_>, rank: usize, max_reasons: usize, lang: Language) -> ScoredCrop {
    let crop = s.crop;
    ScoredCrop {
        name: crop.name.clone(),
        display_name: crop.display_names.get(lang).to_string(),
        season: crop.season,
        season_label: crop.season.label(lang),
        score: s.score,
        match_percent: s.score.round() as u32,
        rank,
        reasons: s
            .matched
            .iter()
            .take(max_reasons)
            .map(|r| MatchedReason {
                rule_id: r.id.clone(),
                text: r.reason.get(lang).to_string(),
            })
            .collect(),
        highlights: crop
            .highlights
            .iter()
            .map(|h| h.get(lang).to_string())
            .collect(),
        yield_estimate: crop.yield_estimate.get(lang).to_string(),
        profit_estimate: crop.profit_estimate.get(lang).to_string(),
        duration_estimate: crop.duration_estimate.get(lang).to_string(),
        mandi_price: crop.mandi_price.clone(),
    }
}
