// src/catalog.rs
//! Crop catalog: profiles, scoring rules, mandi reference prices and disease
//! templates in one immutable document.
//!
//! The built-in catalog is embedded from `config/catalog.json` and parsed once.
//! A replacement file can be supplied via `[catalog] path` in the advisor config;
//! it goes through the same validation.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::lang::{Language, Localized};
use crate::rules::Rule;

static BUILTIN: Lazy<Arc<Catalog>> = Lazy::new(|| {
    let raw = include_str!("../config/catalog.json");
    Arc::new(Catalog::from_json_str(raw).expect("valid built-in crop catalog"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Kharif,
    Rabi,
    Zaid,
    /// Grown year round.
    All,
}

impl Season {
    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (Season::Kharif, Language::En) => "Kharif (Jun-Oct)",
            (Season::Kharif, Language::Hi) => "खरीफ (जून-अक्टूबर)",
            (Season::Kharif, Language::Mr) => "खरीप (जून-ऑक्टोबर)",
            (Season::Rabi, Language::En) => "Rabi (Nov-Mar)",
            (Season::Rabi, Language::Hi) => "रबी (नवंबर-मार्च)",
            (Season::Rabi, Language::Mr) => "रब्बी (नोव्हेंबर-मार्च)",
            (Season::Zaid, Language::En) => "Zaid (Mar-Jun)",
            (Season::Zaid, Language::Hi) => "जायद (मार्च-जून)",
            (Season::Zaid, Language::Mr) => "उन्हाळी (मार्च-जून)",
            (Season::All, Language::En) => "Year Round",
            (Season::All, Language::Hi) => "साल भर",
            (Season::All, Language::Mr) => "वर्षभर",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    /// Month-over-month relative change used for the price series.
    pub fn monthly_drift(self) -> f64 {
        match self {
            Trend::Up => 0.015,
            Trend::Down => -0.015,
            Trend::Stable => 0.0,
        }
    }
}

/// Reference price in ₹ per quintal at a named mandi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandiPrice {
    pub price: u32,
    pub market: String,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub name: String,
    pub display_names: Localized,
    pub season: Season,
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub highlights: Vec<Localized>,
    pub yield_estimate: Localized,
    pub profit_estimate: Localized,
    pub duration_estimate: Localized,
    #[serde(default)]
    pub mandi_price: Option<MandiPrice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Moderate,
    Severe,
    Unknown,
}

/// Canned diagnosis used when the remote classifier is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseTemplate {
    pub disease: String,
    pub confidence: f32,
    pub severity: Severity,
    pub treatment: String,
    pub prevention: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub crops: Vec<CropProfile>,
    #[serde(default)]
    pub diseases: Vec<DiseaseTemplate>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog has no crops")]
    Empty,

    #[error("catalog has {have} crops, at least {need} required")]
    TooFewCrops { have: usize, need: usize },

    #[error("duplicate crop name `{0}`")]
    DuplicateCrop(String),

    #[error("duplicate rule id `{0}`")]
    DuplicateRule(String),

    #[error("rule `{0}` has no conditions")]
    EmptyRule(String),

    #[error("rule `{rule}` has a malformed bound on `{field}`")]
    BadBound { rule: String, field: String },

    #[error("rule `{0}` has a non-finite delta")]
    BadDelta(String),

    #[error("disease template `{0}` has confidence outside 0..=100")]
    BadDisease(String),
}

impl Catalog {
    /// Shared handle to the embedded catalog.
    pub fn builtin() -> Arc<Catalog> {
        BUILTIN.clone()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let cat: Catalog = serde_json::from_str(raw)?;
        cat.validate()?;
        Ok(cat)
    }

    /// Embedded catalog, or the file at `path` when given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Arc<Catalog>> {
        let Some(path) = path else {
            return Ok(Self::builtin());
        };
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read catalog at {}: {}", path.display(), e))?;
        let cat = Self::from_json_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid catalog at {}: {}", path.display(), e))?;
        info!(target: "catalog", path = %path.display(), crops = cat.crops.len(), "catalog loaded");
        Ok(Arc::new(cat))
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.crops.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut names = HashSet::new();
        let mut rule_ids = HashSet::new();
        for crop in &self.crops {
            if !names.insert(normalize_name(&crop.name)) {
                return Err(CatalogError::DuplicateCrop(crop.name.clone()));
            }
            for rule in &crop.rules {
                if !rule_ids.insert(rule.id.as_str()) {
                    return Err(CatalogError::DuplicateRule(rule.id.clone()));
                }
                if rule.when.is_empty() || rule.when.values().all(|b| b.is_empty()) {
                    return Err(CatalogError::EmptyRule(rule.id.clone()));
                }
                if !rule.delta.is_finite() {
                    return Err(CatalogError::BadDelta(rule.id.clone()));
                }
                if let Some((field, _)) = rule.when.iter().find(|(_, b)| !b.is_well_formed()) {
                    return Err(CatalogError::BadBound {
                        rule: rule.id.clone(),
                        field: field.to_string(),
                    });
                }
            }
        }

        if let Some(d) = self
            .diseases
            .iter()
            .find(|d| !(0.0..=100.0).contains(&d.confidence))
        {
            return Err(CatalogError::BadDisease(d.disease.clone()));
        }
        Ok(())
    }

    /// The engine needs at least `top_n` crops to return a full list.
    pub fn ensure_min_crops(&self, need: usize) -> Result<(), CatalogError> {
        if self.crops.len() < need {
            return Err(CatalogError::TooFewCrops {
                have: self.crops.len(),
                need,
            });
        }
        Ok(())
    }

    pub fn crop(&self, name: &str) -> Option<&CropProfile> {
        let key = normalize_name(name);
        self.crops.iter().find(|c| normalize_name(&c.name) == key)
    }
}

/// Lowercase, alphanumerics only: "Sugar-cane " and "sugarcane" collide.
pub fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
