//! Shared domain types and configuration for the knitlog import pipeline.

pub mod app_config;
pub mod config;
pub mod record;

pub use app_config::{AppConfig, Environment};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use record::{
    non_empty, CandidateSource, ExtractionCandidate, ImportKind, ImportRecord, ImportStep,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
