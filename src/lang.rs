// src/lang.rs
//! Display languages and catalog text that carries one string per language.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Mr,
}

impl Language {
    /// Lenient parse for query strings: unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "hi" | "hindi" => Language::Hi,
            "mr" | "marathi" => Language::Mr,
            _ => Language::En,
        }
    }
}

/// English is mandatory; the others fall back to it when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized {
    pub en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mr: Option<String>,
}

impl Localized {
    pub fn en(text: impl Into<String>) -> Self {
        Self {
            en: text.into(),
            hi: None,
            mr: None,
        }
    }

    pub fn new(en: &str, hi: &str, mr: &str) -> Self {
        Self {
            en: en.to_string(),
            hi: Some(hi.to_string()),
            mr: Some(mr.to_string()),
        }
    }

    pub fn get(&self, lang: Language) -> &str {
        let picked = match lang {
            Language::En => None,
            Language::Hi => self.hi.as_deref(),
            Language::Mr => self.mr.as_deref(),
        };
        picked.filter(|s| !s.trim().is_empty()).unwrap_or(&self.en)
    }
}
