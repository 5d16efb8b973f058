// src/weather.rs
//! Current weather per city and the farming advisory derived from it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::SoilWeatherInput;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("no weather data for city `{0}`")]
    UnknownCity(String),

    #[error("weather provider failed: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    /// °C
    pub temperature: f32,
    /// %
    pub humidity: f32,
    pub description: String,
    /// km/h
    pub wind_speed: f32,
    /// hPa
    pub pressure: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<f32>,
}

impl WeatherSnapshot {
    /// Copy the live temperature and humidity into a recommendation form.
    pub fn prefill(&self, base: SoilWeatherInput) -> SoilWeatherInput {
        SoilWeatherInput {
            temperature: self.temperature,
            humidity: self.humidity,
            ..base
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;
    fn name(&self) -> &'static str;
}

/// Fixed readings for the cities the app ships with.
#[derive(Debug, Clone)]
pub struct StaticWeatherProvider {
    table: Vec<WeatherSnapshot>,
}

impl Default for StaticWeatherProvider {
    fn default() -> Self {
        let row = |city: &str, t: f32, h: f32, desc: &str, wind: f32, p: f32| WeatherSnapshot {
            city: city.to_string(),
            temperature: t,
            humidity: h,
            description: desc.to_string(),
            wind_speed: wind,
            pressure: p,
            uv_index: None,
        };
        Self {
            table: vec![
                row("Nagpur", 28.0, 65.0, "Sunny", 12.0, 1015.0),
                row("Mumbai", 32.0, 75.0, "Partly cloudy", 15.0, 1012.0),
                row("Pune", 25.0, 60.0, "Clear sky", 8.0, 1018.0),
                row("Delhi", 30.0, 55.0, "Overcast", 10.0, 1014.0),
                row("Bangalore", 24.0, 70.0, "Light rain", 6.0, 1020.0),
            ],
        }
    }
}

impl StaticWeatherProvider {
    pub fn with_table(table: Vec<WeatherSnapshot>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl WeatherProvider for StaticWeatherProvider {
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let wanted = city.trim();
        self.table
            .iter()
            .find(|w| w.city.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| WeatherError::UnknownCity(wanted.to_string()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilMoisture {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowingConditions {
    Poor,
    Fair,
    Good,
    Excellent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgroAdvisory {
    pub soil_moisture: SoilMoisture,
    pub growing_conditions: GrowingConditions,
    pub recommendations: Vec<&'static str>,
    pub alerts: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_level: Option<&'static str>,
    pub insights: FieldInsights,
}

/// One line of guidance per field activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldInsights {
    pub irrigation: &'static str,
    pub planting: &'static str,
    pub harvesting: &'static str,
    pub disease: &'static str,
}

/// Checks run humidity, heat, cold, wind; a later match overwrites the
/// activities it covers.
pub fn insights(w: &WeatherSnapshot) -> FieldInsights {
    let mut out = FieldInsights {
        irrigation: "Normal irrigation schedule",
        planting: "Good conditions for planting",
        harvesting: "Suitable for harvesting activities",
        disease: "Low disease risk",
    };

    if w.humidity > 80.0 {
        out.irrigation = "Reduce irrigation frequency due to high humidity";
        out.disease = "High humidity increases fungal disease risk - monitor crops closely";
    }
    if w.temperature > 35.0 {
        out.irrigation = "Increase irrigation frequency due to high temperature";
        out.planting = "Consider delaying planting until cooler conditions";
        out.harvesting = "Schedule harvesting during cooler hours";
    }
    if w.temperature < 15.0 {
        out.planting = "Cold conditions - consider frost protection measures";
        out.harvesting = "Monitor for frost damage before harvesting";
    }
    if w.wind_speed > 15.0 {
        out.planting = "High winds - postpone planting activities";
        out.harvesting = "Strong winds may affect harvesting - exercise caution";
    }
    out
}

pub fn advise(w: &WeatherSnapshot) -> AgroAdvisory {
    let (t, h) = (w.temperature, w.humidity);

    let soil_moisture = if h > 70.0 {
        SoilMoisture::High
    } else if h > 50.0 {
        SoilMoisture::Medium
    } else {
        SoilMoisture::Low
    };

    let growing_conditions = if (20.0..=30.0).contains(&t) && (50.0..=70.0).contains(&h) {
        GrowingConditions::Excellent
    } else if (15.0..=35.0).contains(&t) && (40.0..=80.0).contains(&h) {
        GrowingConditions::Good
    } else if (10.0..=40.0).contains(&t) {
        GrowingConditions::Fair
    } else {
        GrowingConditions::Poor
    };

    let mut recommendations = Vec::new();
    if t > 30.0 {
        recommendations.push("Apply mulching to retain soil moisture");
        recommendations.push("Schedule watering during early morning or evening");
    }
    if h > 75.0 {
        recommendations.push("Ensure good air circulation around plants");
        recommendations.push("Monitor for fungal diseases");
    }
    if w.wind_speed > 20.0 {
        recommendations.push("Provide windbreaks for sensitive crops");
        recommendations.push("Secure loose agricultural materials");
    }
    if w.uv_index.is_some_and(|uv| uv > 7.0) {
        recommendations.push("Consider shade nets for sensitive crops");
    }
    if recommendations.is_empty() {
        recommendations.push("Continue normal farming activities");
    }

    let mut alerts = Vec::new();
    if t > 35.0 {
        alerts.push("High temperature alert - protect crops from heat stress");
    }
    if h > 85.0 {
        alerts.push("High humidity - increased disease risk");
    }
    if w.wind_speed > 25.0 {
        alerts.push("Strong wind warning - secure farm equipment");
    }

    AgroAdvisory {
        soil_moisture,
        growing_conditions,
        recommendations,
        alerts,
        uv_level: w.uv_index.map(uv_level),
        insights: insights(w),
    }
}

pub fn uv_level(uv: f32) -> &'static str {
    match uv {
        x if x <= 2.0 => "Low",
        x if x <= 5.0 => "Moderate",
        x if x <= 7.0 => "High",
        x if x <= 10.0 => "Very High",
        _ => "Extreme",
    }
}
