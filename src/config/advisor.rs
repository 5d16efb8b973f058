// src/config/advisor.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use thiserror::Error;
use tracing::info;

use crate::engine::EngineParams;
use crate::input::InputPolicy;

// --- env defaults & names ---
pub const DEFAULT_ADVISOR_CONFIG_PATH: &str = "config/advisor.toml";

pub const ENV_ADVISOR_CONFIG_PATH: &str = "ADVISOR_CONFIG_PATH";
pub const ENV_INPUT_POLICY: &str = "ADVISOR_INPUT_POLICY";
pub const ENV_JITTER_SEED: &str = "ADVISOR_JITTER_SEED";
pub const ENV_DISEASE_BACKEND_URL: &str = "ADVISOR_DISEASE_BACKEND_URL";

fn default_base_score() -> f32 {
    50.0
}
fn default_jitter_max() -> f32 {
    10.0
}
fn default_score_ceiling() -> f32 {
    98.0
}
fn default_top_n() -> usize {
    3
}
fn default_max_reasons() -> usize {
    3
}
fn default_timeout_ms() -> u64 {
    4_000
}
fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("env {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_base_score")]
    pub base_score: f32,
    #[serde(default = "default_jitter_max")]
    pub jitter_max: f32,
    #[serde(default = "default_score_ceiling")]
    pub score_ceiling: f32,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_max_reasons")]
    pub max_reasons: usize,
    /// Fixed seed for reproducible jitter; OS entropy when absent.
    #[serde(default)]
    pub jitter_seed: Option<u64>,
    #[serde(default)]
    pub input_policy: InputPolicy,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            jitter_max: default_jitter_max(),
            score_ceiling: default_score_ceiling(),
            top_n: default_top_n(),
            max_reasons: default_max_reasons(),
            jitter_seed: None,
            input_policy: InputPolicy::default(),
        }
    }
}

impl EngineSection {
    pub fn params(&self) -> EngineParams {
        EngineParams {
            base_score: self.base_score,
            jitter_max: self.jitter_max,
            score_ceiling: self.score_ceiling,
            top_n: self.top_n,
            max_reasons: self.max_reasons,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseSection {
    /// Base URL of the image classifier; fallback-only when absent.
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for DiseaseSection {
    fn default() -> Self {
        Self {
            backend_url: None,
            timeout_ms: default_timeout_ms(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSection {
    /// Replacement catalog JSON; the embedded one is used when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub disease: DiseaseSection,
    #[serde(default)]
    pub catalog: CatalogSection,
}

impl AdvisorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: AdvisorConfig = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Resolve the path from `ADVISOR_CONFIG_PATH` (default `config/advisor.toml`),
    /// fall back to defaults when that file does not exist, then apply env overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = env::var(ENV_ADVISOR_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ADVISOR_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            info!(target: "config", path = %path.display(), "no advisor config file, using defaults");
            Self::default()
        };

        cfg.apply_env_overrides()?;
        cfg.validate()?;

        info!(
            target: "config",
            path = %path.display(),
            policy = ?cfg.engine.input_policy,
            seeded = cfg.engine.jitter_seed.is_some(),
            disease_backend = cfg.disease.backend_url.is_some(),
            "advisor config ready"
        );
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = env::var(ENV_INPUT_POLICY) {
            self.engine.input_policy = raw.parse().map_err(|message| ConfigError::Env {
                var: ENV_INPUT_POLICY,
                message,
            })?;
        }
        if let Ok(raw) = env::var(ENV_JITTER_SEED) {
            let seed = raw.trim().parse::<u64>().map_err(|e| ConfigError::Env {
                var: ENV_JITTER_SEED,
                message: e.to_string(),
            })?;
            self.engine.jitter_seed = Some(seed);
        }
        if let Ok(raw) = env::var(ENV_DISEASE_BACKEND_URL) {
            // Empty value switches the remote classifier off.
            let url = raw.trim();
            self.disease.backend_url = (!url.is_empty()).then(|| url.to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.engine;
        if !e.base_score.is_finite() {
            return Err(ConfigError::Invalid("engine.base_score must be finite".into()));
        }
        if !(e.jitter_max.is_finite() && e.jitter_max >= 0.0) {
            return Err(ConfigError::Invalid("engine.jitter_max must be >= 0".into()));
        }
        if !(e.score_ceiling > 0.0 && e.score_ceiling <= 100.0) {
            return Err(ConfigError::Invalid(
                "engine.score_ceiling must be in (0, 100]".into(),
            ));
        }
        if e.top_n == 0 {
            return Err(ConfigError::Invalid("engine.top_n must be >= 1".into()));
        }
        if e.max_reasons == 0 {
            return Err(ConfigError::Invalid("engine.max_reasons must be >= 1".into()));
        }
        if self.disease.timeout_ms == 0 {
            return Err(ConfigError::Invalid("disease.timeout_ms must be > 0".into()));
        }
        if self.disease.max_image_bytes == 0 {
            return Err(ConfigError::Invalid(
                "disease.max_image_bytes must be > 0".into(),
            ));
        }
        Ok(())
    }
}
