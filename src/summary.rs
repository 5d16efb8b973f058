// src/summary.rs
//! Coarse labels describing the submitted conditions, shown above the crop cards.

use serde::{Deserialize, Serialize};

use crate::catalog::Season;
use crate::input::SoilWeatherInput;
use crate::lang::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoilHealth {
    Good,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Climate {
    Hot,
    Moderate,
    Cool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonLabel {
    Kharif,
    Rabi,
    Zaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSummary {
    pub soil_health: SoilHealth,
    pub climate: Climate,
    pub season: SeasonLabel,
}

/// Display strings for an `InputSummary` in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLabels {
    pub soil_health: &'static str,
    pub climate: &'static str,
    pub season: &'static str,
}

pub fn summarize(input: &SoilWeatherInput) -> InputSummary {
    let soil_health = if input.nitrogen > 60.0 && input.phosphorus > 40.0 && input.potassium > 40.0 {
        SoilHealth::Good
    } else if input.nitrogen > 40.0 {
        SoilHealth::Moderate
    } else {
        SoilHealth::Low
    };

    let climate = if input.temperature > 30.0 {
        Climate::Hot
    } else if input.temperature > 20.0 {
        Climate::Moderate
    } else {
        Climate::Cool
    };

    // Rainfall decides first; temperature only separates Rabi from Zaid.
    let season = if input.rainfall > 100.0 {
        SeasonLabel::Kharif
    } else if input.temperature < 20.0 {
        SeasonLabel::Rabi
    } else {
        SeasonLabel::Zaid
    };

    InputSummary {
        soil_health,
        climate,
        season,
    }
}

impl SoilHealth {
    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (SoilHealth::Good, Language::En) => "Good",
            (SoilHealth::Good, Language::Hi) => "अच्छी",
            (SoilHealth::Good, Language::Mr) => "चांगली",
            (SoilHealth::Moderate, Language::En) => "Moderate",
            (SoilHealth::Moderate, _) => "मध्यम",
            (SoilHealth::Low, Language::En) => "Low",
            (SoilHealth::Low, Language::Hi) => "कम",
            (SoilHealth::Low, Language::Mr) => "कमी",
        }
    }
}

impl Climate {
    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (Climate::Hot, Language::En) => "Hot",
            (Climate::Hot, Language::Hi) => "गर्म",
            (Climate::Hot, Language::Mr) => "गरम",
            (Climate::Moderate, Language::En) => "Moderate",
            (Climate::Moderate, _) => "सामान्य",
            (Climate::Cool, Language::En) => "Cool",
            (Climate::Cool, Language::Hi) => "ठंडा",
            (Climate::Cool, Language::Mr) => "थंड",
        }
    }
}

impl SeasonLabel {
    pub fn season(self) -> Season {
        match self {
            SeasonLabel::Kharif => Season::Kharif,
            SeasonLabel::Rabi => Season::Rabi,
            SeasonLabel::Zaid => Season::Zaid,
        }
    }
}

impl InputSummary {
    pub fn labels(&self, lang: Language) -> SummaryLabels {
        SummaryLabels {
            soil_health: self.soil_health.label(lang),
            climate: self.climate.label(lang),
            season: self.season.season().label(lang),
        }
    }
}
