//! Shared types, error model, and configuration for ReviewLens.
//!
//! This crate is the foundation depended on by all other ReviewLens crates.
//! It provides:
//! - [`ReviewLensError`] — the unified error type
//! - Domain types ([`ReviewRecord`], [`ReviewDataset`])
//! - Configuration ([`AppConfig`], [`ModelConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnalysisConfig, AppConfig, DefaultsConfig, ModelConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{Result, ReviewLensError};
pub use types::{ReviewDataset, ReviewRecord, UNKNOWN_VERSION};
