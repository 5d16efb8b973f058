// src/config/mod.rs
//! Runtime configuration (`config/advisor.toml` + environment overrides).

pub mod advisor;

pub use advisor::{
    AdvisorConfig, CatalogSection, ConfigError, DiseaseSection, EngineSection,
    DEFAULT_ADVISOR_CONFIG_PATH, ENV_ADVISOR_CONFIG_PATH, ENV_DISEASE_BACKEND_URL,
    ENV_INPUT_POLICY, ENV_JITTER_SEED,
};
