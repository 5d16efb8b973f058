// src/disease.rs
//! Leaf-image disease identification.
//!
//! An external image classifier does the real work (`GET /health`,
//! `POST /predict` with a multipart `image` part). When it is not configured,
//! not healthy, or fails, a canned diagnosis from the catalog is picked with
//! the injected RNG so the feature keeps working offline.

use async_trait::async_trait;
use metrics::counter;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{DiseaseTemplate, Severity};
use crate::debug::anon_hash;

#[derive(Debug, Error)]
pub enum DiseaseError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("classifier backend: {0}")]
    Backend(String),

    #[error("no fallback diagnoses configured")]
    NoTemplates,
}

impl From<reqwest::Error> for DiseaseError {
    fn from(e: reqwest::Error) -> Self {
        DiseaseError::Backend(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisSource {
    Remote,
    Fallback,
}

impl DiagnosisSource {
    fn as_str(self) -> &'static str {
        match self {
            DiagnosisSource::Remote => "remote",
            DiagnosisSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseReport {
    pub disease: String,
    /// Percent, two decimals.
    pub confidence: f32,
    pub severity: Severity,
    pub treatment: String,
    pub prevention: String,
    pub source: DiagnosisSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_class: Option<String>,
}

fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

/// Rejects non-image content types, empty bodies and oversized uploads.
pub fn check_upload(bytes: &[u8], content_type: &str, max_bytes: usize) -> Result<(), DiseaseError> {
    let ct = content_type.trim().to_ascii_lowercase();
    if !ct.starts_with("image/") {
        return Err(DiseaseError::InvalidImage(format!(
            "content type `{content_type}` is not an image"
        )));
    }
    if bytes.is_empty() {
        return Err(DiseaseError::InvalidImage("empty upload".into()));
    }
    if bytes.len() > max_bytes {
        return Err(DiseaseError::InvalidImage(format!(
            "{} bytes exceeds the {} byte limit",
            bytes.len(),
            max_bytes
        )));
    }
    Ok(())
}

#[async_trait]
pub trait DiseaseClassifier: Send + Sync {
    async fn classify(&self, image: &[u8], content_type: &str) -> Result<DiseaseReport, DiseaseError>;

    /// Readiness check before sending an image.
    async fn available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/* ----------------------------
Remote classifier (HTTP)
---------------------------- */

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    model_loaded: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PredictBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<PredictResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResult {
    disease: String,
    confidence: f32,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    treatment: String,
    #[serde(default)]
    prevention: String,
    #[serde(default)]
    raw_class: Option<String>,
}

fn parse_severity(raw: Option<&str>) -> Severity {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("none") => Severity::None,
        Some("moderate") => Severity::Moderate,
        Some("severe") => Severity::Severe,
        _ => Severity::Unknown,
    }
}

pub struct RemoteClassifier {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DiseaseError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DiseaseClassifier for RemoteClassifier {
    async fn available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let resp = match self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(target: "disease", status = %r.status(), "classifier health check failed");
                return false;
            }
            Err(e) => {
                info!(target: "disease", error = %e, "classifier not reachable");
                return false;
            }
        };
        // Older backends answer with a bare 200; only an explicit `false` counts.
        match resp.json::<HealthBody>().await {
            Ok(body) => body.model_loaded != Some(false),
            Err(_) => true,
        }
    }

    async fn classify(&self, image: &[u8], content_type: &str) -> Result<DiseaseReport, DiseaseError> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("leaf")
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let resp = self
            .client
            .post(format!("{}/predict", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body: PredictBody = resp
            .json()
            .await
            .map_err(|e| DiseaseError::Backend(format!("status {status}: {e}")))?;

        if !status.is_success() || !body.success {
            let msg = body.error.unwrap_or_else(|| "prediction failed".to_string());
            return Err(DiseaseError::Backend(format!("status {status}: {msg}")));
        }
        let r = body
            .result
            .ok_or_else(|| DiseaseError::Backend("response without result".into()))?;

        Ok(DiseaseReport {
            disease: r.disease,
            confidence: round2(r.confidence.clamp(0.0, 100.0)),
            severity: parse_severity(r.severity.as_deref()),
            treatment: r.treatment,
            prevention: r.prevention,
            source: DiagnosisSource::Remote,
            raw_class: r.raw_class,
        })
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

/* ----------------------------
Fallback picker
---------------------------- */

pub struct FallbackClassifier {
    templates: Vec<DiseaseTemplate>,
    rng: Mutex<StdRng>,
}

impl FallbackClassifier {
    pub fn new(templates: Vec<DiseaseTemplate>, rng: StdRng) -> Self {
        Self {
            templates,
            rng: Mutex::new(rng),
        }
    }

    pub fn pick(&self) -> Result<DiseaseReport, DiseaseError> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let t = self.templates.choose(&mut *rng).ok_or(DiseaseError::NoTemplates)?;
        Ok(DiseaseReport {
            disease: t.disease.clone(),
            confidence: round2(t.confidence),
            severity: t.severity,
            treatment: t.treatment.clone(),
            prevention: t.prevention.clone(),
            source: DiagnosisSource::Fallback,
            raw_class: None,
        })
    }
}

#[async_trait]
impl DiseaseClassifier for FallbackClassifier {
    async fn classify(&self, _image: &[u8], _content_type: &str) -> Result<DiseaseReport, DiseaseError> {
        self.pick()
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

/* ----------------------------
Detector: remote first, fallback always
---------------------------- */

pub struct DiseaseDetector {
    remote: Option<Box<dyn DiseaseClassifier>>,
    fallback: FallbackClassifier,
    max_image_bytes: usize,
}

impl DiseaseDetector {
    pub fn new(
        remote: Option<Box<dyn DiseaseClassifier>>,
        fallback: FallbackClassifier,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            remote,
            fallback,
            max_image_bytes,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn detect(&self, image: &[u8], content_type: &str) -> Result<DiseaseReport, DiseaseError> {
        check_upload(image, content_type, self.max_image_bytes)?;
        // Never log image bytes, only a short digest.
        let id = anon_hash(image);

        if let Some(remote) = &self.remote {
            if remote.available().await {
                match remote.classify(image, content_type).await {
                    Ok(report) => return Ok(self.finish(&id, report)),
                    Err(e) => {
                        warn!(target: "disease", %id, classifier = remote.name(), error = %e, "classifier failed, using fallback");
                    }
                }
            } else {
                info!(target: "disease", %id, classifier = remote.name(), "classifier unavailable, using fallback");
            }
        }

        let report = self.fallback.pick()?;
        Ok(self.finish(&id, report))
    }

    fn finish(&self, id: &str, report: DiseaseReport) -> DiseaseReport {
        let source = report.source.as_str();
        counter!("advisor_disease_requests_total", "source" => source).increment(1);
        info!(
            target: "disease",
            %id,
            source,
            disease = %report.disease,
            confidence = report.confidence,
            "diagnosis ready"
        );
        report
    }
}
