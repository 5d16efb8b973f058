// src/chat.rs
//! Intent classification for the farmer chat box.
//!
//! Keyword tables (English, Hindi, Marathi and their romanized forms) live in
//! `config/intents.json`. Each intent scores one point per matching pattern;
//! the best score wins, earlier table rows win ties. The same message also
//! yields its language, the crops, seasons and states it mentions, and whether
//! it asks about chemical dosages.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::catalog::{normalize_name, Catalog, Season};
use crate::lang::Language;

/// Matched patterns needed for full confidence.
pub const FULL_CONFIDENCE_MATCHES: f32 = 5.0;
pub const MAX_MESSAGE_CHARS: usize = 2_000;

static BUILTIN: Lazy<IntentTable> = Lazy::new(|| {
    let raw = include_str!("../config/intents.json");
    IntentTable::from_json_str(raw).expect("valid built-in intent table")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Help,
    Thanks,
    DiseaseHelp,
    FertilizerHelp,
    MarketSellAdvice,
    WeatherAdvice,
    GovernmentScheme,
    CropInfo,
    PestManagement,
    IrrigationHelp,
    SoilHelp,
    OrganicFarming,
    SeedInfo,
    HarvestHelp,
    StorageAdvice,
    CropRotation,
    SeasonAdvice,
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Help => "help",
            Intent::Thanks => "thanks",
            Intent::DiseaseHelp => "disease_help",
            Intent::FertilizerHelp => "fertilizer_help",
            Intent::MarketSellAdvice => "market_sell_advice",
            Intent::WeatherAdvice => "weather_advice",
            Intent::GovernmentScheme => "government_scheme",
            Intent::CropInfo => "crop_info",
            Intent::PestManagement => "pest_management",
            Intent::IrrigationHelp => "irrigation_help",
            Intent::SoilHelp => "soil_help",
            Intent::OrganicFarming => "organic_farming",
            Intent::SeedInfo => "seed_info",
            Intent::HarvestHelp => "harvest_help",
            Intent::StorageAdvice => "storage_advice",
            Intent::CropRotation => "crop_rotation",
            Intent::SeasonAdvice => "season_advice",
            Intent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentPatterns {
    pub intent: Intent,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropAliases {
    pub crop: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonKeywords {
    pub season: Season,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateNames {
    pub state: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentTable {
    pub intents: Vec<IntentPatterns>,
    #[serde(default)]
    pub crop_aliases: Vec<CropAliases>,
    #[serde(default)]
    pub chemical_keywords: Vec<String>,
    /// Devanagari words that only Marathi uses.
    #[serde(default)]
    pub marathi_words: Vec<String>,
    #[serde(default)]
    pub hinglish_indicators: Vec<String>,
    #[serde(default)]
    pub marathi_roman_indicators: Vec<String>,
    #[serde(default)]
    pub seasons: Vec<SeasonKeywords>,
    #[serde(default)]
    pub states: Vec<StateNames>,
}

#[derive(Debug, Error)]
pub enum IntentTableError {
    #[error("intent table json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("intent `{0}` listed more than once")]
    DuplicateIntent(&'static str),

    #[error("intent `{0}` has no patterns")]
    NoPatterns(&'static str),

    #[error("`unknown` is the fallback and cannot have patterns")]
    UnknownHasPatterns,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("message longer than {max} characters")]
    TooLong { max: usize },
}

/// A crop named in a message. `catalog` is set when the recommendation
/// catalog knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CropMention {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    /// 0..=1; one fifth per matched pattern.
    pub confidence: f32,
    pub language: Language,
    pub crops: Vec<CropMention>,
    pub seasons: Vec<Season>,
    pub states: Vec<String>,
    /// Dosage/spray questions; answers need the farm size first.
    pub chemical_query: bool,
}

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

/// Latin terms match whole words only ("hi" is not found in "this").
/// Devanagari terms must start a word but may carry a suffix, since Marathi
/// attaches case endings ("भातासाठी").
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let whole_word = term.is_ascii();
    haystack.match_indices(term).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric)
            && (!whole_word || !after.is_some_and(char::is_alphanumeric))
    })
}

fn count_terms(haystack: &str, terms: &[String]) -> usize {
    terms.iter().filter(|t| contains_term(haystack, t)).count()
}

impl IntentTable {
    pub fn builtin() -> &'static IntentTable {
        &BUILTIN
    }

    pub fn from_json_str(raw: &str) -> Result<Self, IntentTableError> {
        let mut table: IntentTable = serde_json::from_str(raw)?;
        table.normalize();
        table.validate()?;
        Ok(table)
    }

    /// Lowercase every term so matching only lowercases the message.
    fn normalize(&mut self) {
        let lower = |v: &mut Vec<String>| {
            for s in v.iter_mut() {
                *s = s.trim().to_lowercase();
            }
            v.retain(|s| !s.is_empty());
        };
        for i in &mut self.intents {
            lower(&mut i.patterns);
        }
        for c in &mut self.crop_aliases {
            c.crop = c.crop.trim().to_lowercase();
            lower(&mut c.aliases);
        }
        lower(&mut self.chemical_keywords);
        lower(&mut self.hinglish_indicators);
        lower(&mut self.marathi_roman_indicators);
        for s in &mut self.seasons {
            lower(&mut s.keywords);
        }
        for s in &mut self.states {
            lower(&mut s.names);
        }
    }

    pub fn validate(&self) -> Result<(), IntentTableError> {
        let mut seen = HashSet::new();
        for row in &self.intents {
            if row.intent == Intent::Unknown {
                return Err(IntentTableError::UnknownHasPatterns);
            }
            if !seen.insert(row.intent) {
                return Err(IntentTableError::DuplicateIntent(row.intent.as_str()));
            }
            if row.patterns.is_empty() {
                return Err(IntentTableError::NoPatterns(row.intent.as_str()));
            }
        }
        Ok(())
    }

    pub fn detect_language(&self, message: &str) -> Language {
        if message.chars().any(is_devanagari) {
            return if self.marathi_words.iter().any(|w| message.contains(w.as_str())) {
                Language::Mr
            } else {
                Language::Hi
            };
        }

        let lower = message.to_lowercase();
        let hinglish = count_terms(&lower, &self.hinglish_indicators);
        let marathi = count_terms(&lower, &self.marathi_roman_indicators);
        if marathi >= 1 && marathi > hinglish {
            Language::Mr
        } else if hinglish >= 1 {
            Language::Hi
        } else {
            Language::En
        }
    }

    /// Alias table first, then the catalog's Hindi/Marathi display names.
    pub fn extract_crops(&self, message: &str, catalog: &Catalog) -> Vec<CropMention> {
        let lower = message.to_lowercase();
        let mut ids: Vec<String> = Vec::new();

        for row in &self.crop_aliases {
            let spoken = row.crop.replace('_', " ");
            if contains_term(&lower, &spoken) || row.aliases.iter().any(|a| contains_term(&lower, a)) {
                ids.push(row.crop.clone());
            }
        }
        for crop in &catalog.crops {
            let names = [crop.display_names.hi.as_deref(), crop.display_names.mr.as_deref()];
            let hit = names
                .into_iter()
                .flatten()
                .flat_map(|n| n.split('/'))
                .map(str::trim)
                .any(|n| contains_term(&lower, n));
            if hit {
                ids.push(normalize_name(&crop.name));
            }
        }

        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| seen.insert(id.clone()))
            .map(|id| CropMention {
                catalog: catalog.crop(&id).map(|c| c.name.clone()),
                id,
            })
            .collect()
    }

    pub fn extract_seasons(&self, message: &str) -> Vec<Season> {
        let lower = message.to_lowercase();
        self.seasons
            .iter()
            .filter(|s| s.keywords.iter().any(|k| contains_term(&lower, k)))
            .map(|s| s.season)
            .collect()
    }

    pub fn extract_states(&self, message: &str) -> Vec<String> {
        let lower = message.to_lowercase();
        self.states
            .iter()
            .filter(|s| s.names.iter().any(|n| contains_term(&lower, n)))
            .map(|s| s.state.clone())
            .collect()
    }

    pub fn is_chemical_query(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.chemical_keywords.iter().any(|k| contains_term(&lower, k))
    }

    pub fn classify(&self, message: &str, catalog: &Catalog) -> Classification {
        let lower = message.to_lowercase();

        let mut best = (Intent::Unknown, 0usize);
        for row in &self.intents {
            let score = count_terms(&lower, &row.patterns);
            // Strictly greater: ties keep the earlier row.
            if score > best.1 {
                best = (row.intent, score);
            }
        }

        let crops = self.extract_crops(message, catalog);
        if best.0 == Intent::Unknown && !crops.is_empty() {
            best = (Intent::CropInfo, 1);
        }

        Classification {
            intent: best.0,
            confidence: (best.1 as f32 / FULL_CONFIDENCE_MATCHES).min(1.0),
            language: self.detect_language(message),
            crops,
            seasons: self.extract_seasons(message),
            states: self.extract_states(message),
            chemical_query: self.is_chemical_query(message),
        }
    }
}

/// Classifies with the built-in tables after length checks.
pub fn classify_intent(message: &str, catalog: &Catalog) -> Result<Classification, ChatError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::TooLong {
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(IntentTable::builtin().classify(trimmed, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(msg: &str) -> Classification {
        classify_intent(msg, &Catalog::builtin()).unwrap()
    }

    #[test]
    fn builtin_table_loads() {
        let t = IntentTable::builtin();
        assert_eq!(t.intents.len(), 18);
        assert_eq!(t.intents[0].intent, Intent::Greeting);
    }

    #[test]
    fn whole_words_for_latin_terms() {
        assert!(contains_term("hi there", "hi"));
        assert!(!contains_term("this field", "hi"));
        assert!(contains_term("how much per acre?", "per acre"));
        assert!(contains_term("गेहूं में रोग", "रोग"));
        assert!(contains_term("भातासाठी पाणी", "भात"));
        // rain, not sugarcane
        assert!(!contains_term("पाऊस", "ऊस"));
        assert!(!contains_term("anything", ""));
    }

    #[test]
    fn english_disease_question() {
        let c = classify("My tomato leaves have yellow spot and blight");
        assert_eq!(c.intent, Intent::DiseaseHelp);
        assert!((c.confidence - 0.6).abs() < 1e-6);
        assert_eq!(c.language, Language::En);
        assert_eq!(c.crops, vec![CropMention { id: "tomato".into(), catalog: None }]);
    }

    #[test]
    fn hindi_price_question_finds_catalog_crop() {
        let c = classify("गेहूं का मंडी भाव क्या है");
        assert_eq!(c.intent, Intent::MarketSellAdvice);
        assert_eq!(c.language, Language::Hi);
        assert_eq!(
            c.crops,
            vec![CropMention { id: "wheat".into(), catalog: Some("Wheat".into()) }]
        );
    }

    #[test]
    fn marathi_script_and_roman_detection() {
        let t = IntentTable::builtin();
        assert_eq!(t.detect_language("कापूस पिकासाठी पाऊस किती आहे"), Language::Mr);
        assert_eq!(t.detect_language("mazha pik kashi vadhel"), Language::Mr);
        assert_eq!(t.detect_language("gehu ke liye kitna khad chahiye"), Language::Hi);
        assert_eq!(t.detect_language("when should I sow wheat"), Language::En);
    }

    #[test]
    fn crops_alone_default_to_crop_info() {
        let c = classify("kapas");
        assert_eq!(c.intent, Intent::CropInfo);
        assert!((c.confidence - 0.2).abs() < 1e-6);
        assert_eq!(c.crops[0].catalog.as_deref(), Some("Cotton"));
    }

    #[test]
    fn nothing_matched_is_unknown() {
        let c = classify("qwerty zxcv");
        assert_eq!(c.intent, Intent::Unknown);
        assert_eq!(c.confidence, 0.0);
        assert!(c.crops.is_empty());
    }

    #[test]
    fn ties_keep_table_order() {
        // one weather pattern, one season pattern
        let c = classify("kharif forecast");
        assert_eq!(c.intent, Intent::WeatherAdvice);
        // "monsoon" is in both rows, weather comes first
        assert_eq!(classify("monsoon").intent, Intent::WeatherAdvice);
    }

    #[test]
    fn entities_and_chemical_flag() {
        let c = classify("How much pesticide per acre for cotton in Maharashtra this kharif?");
        assert!(c.chemical_query);
        assert_eq!(c.seasons, vec![Season::Kharif]);
        assert_eq!(c.states, vec!["Maharashtra".to_string()]);
        assert_eq!(c.intent, Intent::PestManagement);
    }

    #[test]
    fn confidence_saturates() {
        let c = classify("pest insect caterpillar borer aphid whitefly spray");
        assert_eq!(c.intent, Intent::PestManagement);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn empty_and_oversized_messages_are_errors() {
        let cat = Catalog::builtin();
        assert_eq!(classify_intent("   ", &cat), Err(ChatError::EmptyMessage));
        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            classify_intent(&long, &cat),
            Err(ChatError::TooLong { max: MAX_MESSAGE_CHARS })
        );
    }

    #[test]
    fn table_validation() {
        let dup = r#"{"intents":[{"intent":"help","patterns":["a"]},{"intent":"help","patterns":["b"]}]}"#;
        assert!(matches!(IntentTable::from_json_str(dup), Err(IntentTableError::DuplicateIntent("help"))));

        let empty = r#"{"intents":[{"intent":"help","patterns":["  "]}]}"#;
        assert!(matches!(IntentTable::from_json_str(empty), Err(IntentTableError::NoPatterns("help"))));

        let unknown = r#"{"intents":[{"intent":"unknown","patterns":["x"]}]}"#;
        assert!(matches!(IntentTable::from_json_str(unknown), Err(IntentTableError::UnknownHasPatterns)));
    }
}
