// src/market.rs
//! Mandi reference prices: per-crop quote and a monthly price series.
//!
//! Crop names coming from users are messy ("soyabean", "Sugar cane"), so a
//! lookup that misses exactly falls back to the closest catalog name by
//! Jaro-Winkler similarity.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::catalog::{normalize_name, Catalog, Trend};
use crate::lang::{Language, Localized};

/// Minimum similarity for a fuzzy crop match.
pub const FUZZY_MIN_SIMILARITY: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    #[error("no mandi price for crop `{0}`")]
    UnknownCrop(String),

    #[error("unsupported period `{0}` (expected 1month, 3months, 6months or 1year)")]
    BadPeriod(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketQuote {
    pub crop: String,
    pub display_name: String,
    /// ₹ per quintal.
    pub price: u32,
    pub market: String,
    pub trend: Trend,
    pub matched_by: MatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1month")]
    OneMonth,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[default]
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "1year")]
    OneYear,
}

impl Period {
    pub fn months(self) -> u32 {
        match self {
            Period::OneMonth => 1,
            Period::ThreeMonths => 3,
            Period::SixMonths => 6,
            Period::OneYear => 12,
        }
    }
}

impl FromStr for Period {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1month" => Ok(Period::OneMonth),
            "3months" => Ok(Period::ThreeMonths),
            "6months" => Ok(Period::SixMonths),
            "1year" | "12months" => Ok(Period::OneYear),
            other => Err(MarketError::BadPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::OneMonth => "1month",
            Period::ThreeMonths => "3months",
            Period::SixMonths => "6months",
            Period::OneYear => "1year",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    /// `YYYY-MM`
    pub month: String,
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistory {
    pub crop: String,
    pub market: String,
    pub trend: Trend,
    pub period: Period,
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    crop: String,
    display_names: Localized,
    price: u32,
    market: String,
    trend: Trend,
}

/// Index over the catalog's mandi prices.
#[derive(Debug, Clone)]
pub struct MarketBook {
    entries: Vec<Entry>,
}

impl MarketBook {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let entries = catalog
            .crops
            .iter()
            .filter_map(|c| {
                c.mandi_price.as_ref().map(|m| Entry {
                    key: normalize_name(&c.name),
                    crop: c.name.clone(),
                    display_names: c.display_names.clone(),
                    price: m.price,
                    market: m.market.clone(),
                    trend: m.trend,
                })
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn resolve(&self, name: &str) -> Result<(&Entry, MatchKind), MarketError> {
        let key = normalize_name(name);
        let trimmed = name.trim();

        if let Some(e) = self.entries.iter().find(|e| {
            e.key == key
                || e.display_names.hi.as_deref() == Some(trimmed)
                || e.display_names.mr.as_deref() == Some(trimmed)
        }) {
            return Ok((e, MatchKind::Exact));
        }

        if key.is_empty() {
            return Err(MarketError::UnknownCrop(name.to_string()));
        }

        self.entries
            .iter()
            .map(|e| (e, strsim::jaro_winkler(&e.key, &key)))
            .filter(|(_, sim)| *sim >= FUZZY_MIN_SIMILARITY)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(e, _)| (e, MatchKind::Fuzzy))
            .ok_or_else(|| MarketError::UnknownCrop(name.to_string()))
    }

    pub fn quote(&self, name: &str, lang: Language) -> Result<MarketQuote, MarketError> {
        let (e, matched_by) = self.resolve(name)?;
        Ok(MarketQuote {
            crop: e.crop.clone(),
            display_name: e.display_names.get(lang).to_string(),
            price: e.price,
            market: e.market.clone(),
            trend: e.trend,
            matched_by,
        })
    }

    /// One point per month, oldest first, ending at the reference price in the
    /// month of `as_of`. Earlier months back out the trend's monthly drift.
    pub fn history(
        &self,
        name: &str,
        period: Period,
        as_of: NaiveDate,
    ) -> Result<PriceHistory, MarketError> {
        let (e, _) = self.resolve(name)?;
        let n = period.months();
        let drift = 1.0 + e.trend.monthly_drift();

        let points = (0..n)
            .rev()
            .map(|back| {
                let month = as_of
                    .checked_sub_months(Months::new(back))
                    .unwrap_or(as_of)
                    .format("%Y-%m")
                    .to_string();
                let price = (f64::from(e.price) / drift.powi(back as i32)).round() as u32;
                PricePoint { month, price }
            })
            .collect();

        Ok(PriceHistory {
            crop: e.crop.clone(),
            market: e.market.clone(),
            trend: e.trend,
            period,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> MarketBook {
        MarketBook::from_catalog(&Catalog::builtin())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn exact_quote() {
        let q = book().quote("Cotton", Language::En).unwrap();
        assert_eq!(q.price, 6800);
        assert_eq!(q.market, "Nagpur");
        assert_eq!(q.trend, Trend::Up);
        assert_eq!(q.matched_by, MatchKind::Exact);
    }

    #[test]
    fn fuzzy_quote_resolves_common_misspelling() {
        let q = book().quote("soyabean", Language::En).unwrap();
        assert_eq!(q.crop, "Soybean");
        assert_eq!(q.matched_by, MatchKind::Fuzzy);

        let q = book().quote("Sugar cane", Language::Mr).unwrap();
        assert_eq!(q.crop, "Sugarcane");
        assert_eq!(q.display_name, "ऊस");
    }

    #[test]
    fn native_script_name_is_exact() {
        let q = book().quote("हळद", Language::En).unwrap();
        assert_eq!(q.crop, "Turmeric");
        assert_eq!(q.matched_by, MatchKind::Exact);
    }

    #[test]
    fn unrelated_name_is_unknown() {
        assert_eq!(
            book().quote("banana", Language::En),
            Err(MarketError::UnknownCrop("banana".into()))
        );
        assert!(book().quote("  ", Language::En).is_err());
    }

    #[test]
    fn history_ends_at_reference_price() {
        let h = book().history("Wheat", Period::SixMonths, date(2026, 10, 18)).unwrap();
        assert_eq!(h.points.len(), 6);
        assert_eq!(h.points.last().map(|p| p.price), Some(2400));
        assert_eq!(h.points.first().map(|p| p.month.as_str()), Some("2026-05"));
        assert_eq!(h.points.last().map(|p| p.month.as_str()), Some("2026-10"));
        // Upward trend: strictly rising series.
        assert!(h.points.windows(2).all(|w| w[0].price < w[1].price));
    }

    #[test]
    fn stable_and_falling_series() {
        let b = book();
        let stable = b.history("Rice", Period::ThreeMonths, date(2026, 1, 31)).unwrap();
        assert!(stable.points.iter().all(|p| p.price == 2200));
        assert_eq!(stable.points[0].month, "2025-11");

        let down = b.history("Mustard", Period::OneYear, date(2026, 10, 1)).unwrap();
        assert_eq!(down.points.len(), 12);
        assert!(down.points.windows(2).all(|w| w[0].price > w[1].price));
    }

    #[test]
    fn period_parsing() {
        assert_eq!("3months".parse::<Period>(), Ok(Period::ThreeMonths));
        assert_eq!("1YEAR".parse::<Period>(), Ok(Period::OneYear));
        assert!(matches!(
            "2weeks".parse::<Period>(),
            Err(MarketError::BadPeriod(_))
        ));
        assert_eq!(Period::default().to_string(), "6months");
    }
}
