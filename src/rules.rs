// src/rules.rs
//! Declarative scoring rules, stored in the catalog JSON.
//!
//! A rule is a conjunction of per-field bounds plus a score delta:
//!
//! ```json
//! { "id": "wheat.rich_np",
//!   "when": { "nitrogen": { "gt": 60 }, "phosphorus": { "gt": 40 } },
//!   "delta": 25,
//!   "reason": { "en": "Good nitrogen and phosphorus levels" } }
//! ```
//!
//! Bounds: `gt` / `lt` are strict, `gte` / `lte` inclusive. Every listed
//! field must satisfy every listed bound for the rule to fire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::input::{Field, SoilWeatherInput};
use crate::lang::Localized;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f32>,
}

impl Bound {
    pub fn contains(&self, v: f32) -> bool {
        self.gt.map_or(true, |b| v > b)
            && self.gte.map_or(true, |b| v >= b)
            && self.lt.map_or(true, |b| v < b)
            && self.lte.map_or(true, |b| v <= b)
    }

    pub fn is_empty(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    /// Finite thresholds and a lower side that does not exceed the upper side.
    pub(crate) fn is_well_formed(&self) -> bool {
        let all = [self.gt, self.gte, self.lt, self.lte];
        if all.iter().flatten().any(|b| !b.is_finite()) {
            return false;
        }
        let lower = self.gt.into_iter().chain(self.gte).reduce(f32::max);
        let upper = self.lt.into_iter().chain(self.lte).reduce(f32::min);
        match (lower, upper) {
            (Some(lo), Some(hi)) => lo <= hi,
            _ => true,
        }
    }
}

pub type When = BTreeMap<Field, Bound>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub when: When,
    pub delta: f32,
    pub reason: Localized,
}

pub fn matches_when(input: &SoilWeatherInput, when: &When) -> bool {
    when.iter()
        .all(|(field, bound)| bound.contains(input.get(*field)))
}

impl Rule {
    pub fn matches(&self, input: &SoilWeatherInput) -> bool {
        matches_when(input, &self.when)
    }
}

/// Sum of deltas over all matching rules, with the matching rules in
/// declaration order.
pub fn apply_rules<'a>(input: &SoilWeatherInput, rules: &'a [Rule]) -> (f32, Vec<&'a Rule>) {
    rules
        .iter()
        .filter(|r| r.matches(input))
        .fold((0.0, Vec::new()), |(sum, mut hit), r| {
            hit.push(r);
            (sum + r.delta, hit)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(json: &str) -> Rule {
        serde_json::from_str(json).expect("valid rule json")
    }

    #[test]
    fn strict_and_inclusive_bounds() {
        let strict = Bound {
            gt: Some(25.0),
            lt: Some(35.0),
            ..Default::default()
        };
        assert!(!strict.contains(25.0));
        assert!(strict.contains(25.1));
        assert!(!strict.contains(35.0));

        let inclusive = Bound {
            gte: Some(6.0),
            lte: Some(7.5),
            ..Default::default()
        };
        assert!(inclusive.contains(6.0));
        assert!(inclusive.contains(7.5));
        assert!(!inclusive.contains(7.51));
    }

    #[test]
    fn nan_never_matches() {
        let b = Bound {
            lt: Some(100.0),
            ..Default::default()
        };
        assert!(!b.contains(f32::NAN));
    }

    #[test]
    fn conjunction_requires_every_field() {
        let r = rule(
            r#"{"id":"t","when":{"nitrogen":{"gt":60},"phosphorus":{"gt":40}},"delta":25,"reason":{"en":"np"}}"#,
        );
        let mut input = SoilWeatherInput::default();
        input.nitrogen = 70.0;
        input.phosphorus = 40.0;
        assert!(!r.matches(&input));
        input.phosphorus = 41.0;
        assert!(r.matches(&input));
    }

    #[test]
    fn apply_sums_matching_deltas_in_order() {
        let rules = vec![
            rule(r#"{"id":"a","when":{"rainfall":{"gt":150}},"delta":30,"reason":{"en":"a"}}"#),
            rule(r#"{"id":"b","when":{"humidity":{"gt":95}},"delta":15,"reason":{"en":"b"}}"#),
            rule(r#"{"id":"c","when":{"temperature":{"gt":25,"lt":35}},"delta":10,"reason":{"en":"c"}}"#),
        ];
        let mut input = SoilWeatherInput::default();
        input.rainfall = 200.0;
        input.temperature = 28.0;
        let (delta, hit) = apply_rules(&input, &rules);
        assert!((delta - 40.0).abs() < 1e-6);
        let ids: Vec<&str> = hit.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn unknown_bound_keys_are_rejected() {
        let res: Result<Rule, _> = serde_json::from_str(
            r#"{"id":"x","when":{"ph":{"above":7}},"delta":1,"reason":{"en":"x"}}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn inverted_bounds_are_not_well_formed() {
        let b = Bound {
            gt: Some(30.0),
            lt: Some(20.0),
            ..Default::default()
        };
        assert!(!b.is_well_formed());
        assert!(Bound::default().is_well_formed());
    }
}
