// src/input.rs
//! Soil and weather parameters submitted by the farmer, plus the policy that
//! decides what happens to readings outside the nominal sensor/slider ranges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Nitrogen,
    Phosphorus,
    Potassium,
    Temperature,
    Humidity,
    Ph,
    Rainfall,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Nitrogen,
        Field::Phosphorus,
        Field::Potassium,
        Field::Temperature,
        Field::Humidity,
        Field::Ph,
        Field::Rainfall,
    ];

    /// Nominal inclusive range `(min, max)`.
    pub fn range(self) -> (f32, f32) {
        match self {
            Field::Nitrogen | Field::Phosphorus | Field::Potassium => (0.0, 150.0),
            Field::Temperature => (0.0, 50.0),
            Field::Humidity => (0.0, 100.0),
            Field::Ph => (3.0, 10.0),
            Field::Rainfall => (0.0, 300.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Nitrogen => "nitrogen",
            Field::Phosphorus => "phosphorus",
            Field::Potassium => "potassium",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Ph => "ph",
            Field::Rainfall => "rainfall",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request's worth of readings. Rainfall is mm/month, temperature °C,
/// humidity %, NPK are soil-test indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilWeatherInput {
    pub nitrogen: f32,
    pub phosphorus: f32,
    pub potassium: f32,
    pub temperature: f32,
    pub humidity: f32,
    pub ph: f32,
    pub rainfall: f32,
}

impl Default for SoilWeatherInput {
    /// Starting values of the recommendation form.
    fn default() -> Self {
        Self {
            nitrogen: 50.0,
            phosphorus: 40.0,
            potassium: 40.0,
            temperature: 25.0,
            humidity: 80.0,
            ph: 6.5,
            rainfall: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: Field, value: f32 },

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: Field,
        value: f32,
        min: f32,
        max: f32,
    },
}

impl InputError {
    pub fn field(&self) -> Field {
        match self {
            InputError::NotFinite { field, .. } | InputError::OutOfRange { field, .. } => *field,
        }
    }
}

impl SoilWeatherInput {
    pub fn get(&self, field: Field) -> f32 {
        match field {
            Field::Nitrogen => self.nitrogen,
            Field::Phosphorus => self.phosphorus,
            Field::Potassium => self.potassium,
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Ph => self.ph,
            Field::Rainfall => self.rainfall,
        }
    }

    fn slot(&mut self, field: Field) -> &mut f32 {
        match field {
            Field::Nitrogen => &mut self.nitrogen,
            Field::Phosphorus => &mut self.phosphorus,
            Field::Potassium => &mut self.potassium,
            Field::Temperature => &mut self.temperature,
            Field::Humidity => &mut self.humidity,
            Field::Ph => &mut self.ph,
            Field::Rainfall => &mut self.rainfall,
        }
    }

    /// Reports the first non-finite value, without looking at ranges.
    pub fn check_finite(&self) -> Result<(), InputError> {
        for field in Field::ALL {
            let value = self.get(field);
            if !value.is_finite() {
                return Err(InputError::NotFinite { field, value });
            }
        }
        Ok(())
    }

    /// Reports the first field that is non-finite or outside its nominal range.
    pub fn validate(&self) -> Result<(), InputError> {
        self.check_finite()?;
        for field in Field::ALL {
            let value = self.get(field);
            let (min, max) = field.range();
            if value < min || value > max {
                return Err(InputError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Copy with every field pulled into its nominal range. Non-finite values
    /// are left untouched; run `check_finite` first.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for field in Field::ALL {
            let (min, max) = field.range();
            let v = out.slot(field);
            if v.is_finite() {
                *v = v.clamp(min, max);
            }
        }
        out
    }

    /// Applies the configured policy and returns the input that should be scored.
    pub fn prepare(&self, policy: InputPolicy) -> Result<Self, InputError> {
        match policy {
            InputPolicy::Reject => self.validate().map(|_| *self),
            InputPolicy::Clamp => self.check_finite().map(|_| self.clamped()),
            InputPolicy::PassThrough => self.check_finite().map(|_| *self),
        }
    }
}

/// What to do with readings outside the nominal ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputPolicy {
    #[default]
    Reject,
    Clamp,
    PassThrough,
}

impl FromStr for InputPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reject" => Ok(InputPolicy::Reject),
            "clamp" => Ok(InputPolicy::Clamp),
            "pass_through" | "passthrough" => Ok(InputPolicy::PassThrough),
            other => Err(format!("unknown input policy `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_range() {
        assert!(SoilWeatherInput::default().validate().is_ok());
    }

    #[test]
    fn range_edges_are_inclusive() {
        let mut i = SoilWeatherInput::default();
        i.ph = 3.0;
        i.rainfall = 300.0;
        i.nitrogen = 0.0;
        assert!(i.validate().is_ok());
    }

    #[test]
    fn out_of_range_reports_field_and_bounds() {
        let mut i = SoilWeatherInput::default();
        i.humidity = 120.0;
        match i.validate() {
            Err(InputError::OutOfRange {
                field, min, max, ..
            }) => {
                assert_eq!(field, Field::Humidity);
                assert_eq!((min, max), (0.0, 100.0));
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn nan_is_rejected_under_every_policy() {
        let mut i = SoilWeatherInput::default();
        i.temperature = f32::NAN;
        for p in [InputPolicy::Reject, InputPolicy::Clamp, InputPolicy::PassThrough] {
            let err = i.prepare(p).unwrap_err();
            assert_eq!(err.field(), Field::Temperature);
        }
    }

    #[test]
    fn clamp_policy_pulls_values_into_range() {
        let mut i = SoilWeatherInput::default();
        i.rainfall = 450.0;
        i.ph = 1.0;
        let out = i.prepare(InputPolicy::Clamp).unwrap();
        assert_eq!(out.rainfall, 300.0);
        assert_eq!(out.ph, 3.0);
        assert_eq!(out.nitrogen, i.nitrogen);
    }

    #[test]
    fn pass_through_keeps_raw_values() {
        let mut i = SoilWeatherInput::default();
        i.potassium = 400.0;
        let out = i.prepare(InputPolicy::PassThrough).unwrap();
        assert_eq!(out.potassium, 400.0);
    }

    #[test]
    fn policy_parses_from_env_style_strings() {
        assert_eq!("clamp".parse::<InputPolicy>(), Ok(InputPolicy::Clamp));
        assert_eq!("Pass-Through".parse::<InputPolicy>(), Ok(InputPolicy::PassThrough));
        assert!("ignore".parse::<InputPolicy>().is_err());
    }
}
