//! Application configuration for ReviewLens.
//!
//! User config lives at `~/.reviewlens/reviewlens.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewLensError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "reviewlens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".reviewlens";

// ---------------------------------------------------------------------------
// Config structs (matching reviewlens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Text-generation endpoint settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Review analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory that run exports are written under.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "reviewlens-runs".into()
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// OpenAI-compatible API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used when `--model` is not given.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Models the analyst may pick from. Empty means any.
    #[serde(default = "default_supported_models")]
    pub supported_models: Vec<String>,

    /// Completion token limit per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Whole-request timeout, including the streamed body.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            supported_models: default_supported_models(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelConfig {
    /// Pick the model to run with, checking it against `supported_models`.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<String> {
        let model = requested.unwrap_or(&self.default_model);
        if !self.supported_models.is_empty() && !self.supported_models.iter().any(|m| m == model)
        {
            return Err(ReviewLensError::config(format!(
                "model '{model}' is not in supported_models ({})",
                self.supported_models.join(", ")
            )));
        }
        Ok(model.to_string())
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "anthropic/claude-3.5-sonnet".into()
}
fn default_supported_models() -> Vec<String> {
    vec![
        "anthropic/claude-3.5-sonnet".into(),
        "anthropic/claude-3-haiku".into(),
        "anthropic/claude-3-opus".into(),
    ]
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_top_p() -> f32 {
    0.9
}
fn default_timeout_secs() -> u64 {
    600
}

/// `[analysis]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Upper bound on characters per batch sent to the model.
    #[serde(default = "default_batch_max_chars")]
    pub batch_max_chars: usize,

    /// Star ratings analyzed when `--ratings` is not given.
    #[serde(default = "default_ratings")]
    pub ratings: Vec<u8>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_max_chars: default_batch_max_chars(),
            ratings: default_ratings(),
        }
    }
}

fn default_batch_max_chars() -> usize {
    300_000
}
fn default_ratings() -> Vec<u8> {
    vec![1, 2]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.reviewlens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReviewLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.reviewlens/reviewlens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReviewLensError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ReviewLensError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReviewLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReviewLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReviewLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the API key env var is set and non-empty, returning its value.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.model.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ReviewLensError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("batch_max_chars"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.analysis.batch_max_chars, 300_000);
        assert_eq!(parsed.analysis.ratings, vec![1, 2]);
        assert_eq!(parsed.model.max_tokens, 4096);
        assert_eq!(parsed.model.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[model]
default_model = "anthropic/claude-3-haiku"
temperature = 0.3

[analysis]
ratings = [1, 2, 3]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.model.default_model, "anthropic/claude-3-haiku");
        assert!((config.model.temperature - 0.3).abs() < f32::EPSILON);
        assert!((config.model.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.analysis.ratings, vec![1, 2, 3]);
        assert_eq!(config.analysis.batch_max_chars, 300_000);
        assert_eq!(config.defaults.output_dir, "reviewlens-runs");
    }

    #[test]
    fn resolve_model_checks_supported_list() {
        let model = ModelConfig::default();
        assert_eq!(
            model.resolve_model(None).unwrap(),
            "anthropic/claude-3.5-sonnet"
        );
        assert_eq!(
            model.resolve_model(Some("anthropic/claude-3-haiku")).unwrap(),
            "anthropic/claude-3-haiku"
        );
        let err = model.resolve_model(Some("someone/else")).unwrap_err();
        assert!(err.to_string().contains("supported_models"));
    }

    #[test]
    fn resolve_model_accepts_anything_when_list_empty() {
        let model = ModelConfig {
            supported_models: vec![],
            ..Default::default()
        };
        assert_eq!(model.resolve_model(Some("x/y")).unwrap(), "x/y");
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.model.api_key_env = "RL_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
