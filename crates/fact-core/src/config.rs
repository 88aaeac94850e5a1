//! Fact Configuration Management
//!
//! Handles configuration from environment variables and TOML files.
//! The extraction language deliberately has no default: it must be chosen
//! by the caller and is validated when a session is constructed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::EquivalenceGroup;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Triple extraction settings
    pub extraction: ExtractionConfig,

    /// Static equivalence table settings
    pub equivalence: EquivalenceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(language) = std::env::var("FACT_LANGUAGE") {
            config.extraction.language = Some(language);
        }
        if let Ok(value) = std::env::var("FACT_PARALLEL") {
            config.extraction.parallel = parse_bool("FACT_PARALLEL", &value)?;
        }
        if let Ok(value) = std::env::var("FACT_DEDUPLICATE") {
            config.extraction.deduplicate = parse_bool("FACT_DEDUPLICATE", &value)?;
        }
        if let Ok(value) = std::env::var("FACT_COORDINATED_PREDICATES") {
            config.extraction.follow_coordinated_predicates =
                parse_bool("FACT_COORDINATED_PREDICATES", &value)?;
        }
        if let Ok(value) = std::env::var("FACT_MIN_CONFIDENCE") {
            config.extraction.min_confidence = parse_confidence("FACT_MIN_CONFIDENCE", &value)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(value) = std::env::var("LOG_JSON") {
            config.logging.json_format = parse_bool("LOG_JSON", &value)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = ExtractionConfig::default();

        if env_config.extraction.language.is_some() {
            self.extraction.language = env_config.extraction.language;
        }
        if env_config.extraction.parallel != defaults.parallel {
            self.extraction.parallel = env_config.extraction.parallel;
        }
        if env_config.extraction.deduplicate != defaults.deduplicate {
            self.extraction.deduplicate = env_config.extraction.deduplicate;
        }
        if env_config.extraction.follow_coordinated_predicates
            != defaults.follow_coordinated_predicates
        {
            self.extraction.follow_coordinated_predicates =
                env_config.extraction.follow_coordinated_predicates;
        }
        if (env_config.extraction.min_confidence - defaults.min_confidence).abs() > f32::EPSILON {
            self.extraction.min_confidence = env_config.extraction.min_confidence;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format {
            self.logging.json_format = true;
        }

        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_confidence(key: &str, value: &str) -> Result<f32, ConfigError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|threshold| (0.0..=1.0).contains(threshold))
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Triple extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Language tag selecting the label table (en, english, de, german)
    pub language: Option<String>,

    /// Extract sentences on a worker pool
    pub parallel: bool,

    /// Drop repeated (subject, predicate, object) triples within a document
    pub deduplicate: bool,

    /// Emit triples for verbs coordinated with the root
    pub follow_coordinated_predicates: bool,

    /// Clear discovered aliases before each new document
    pub reset_dynamic_per_document: bool,

    /// Triples scored below this are dropped from a document's results
    pub min_confidence: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            language: None,
            parallel: false,
            deduplicate: true,
            follow_coordinated_predicates: true,
            reset_dynamic_per_document: true,
            min_confidence: 0.4,
        }
    }
}

impl ExtractionConfig {
    /// Configuration for a given language with default settings
    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Default::default()
        }
    }
}

/// Static equivalence table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EquivalenceConfig {
    /// Seed the static layer with the curated nutrient groups
    pub include_builtin: bool,

    /// Additional curated groups
    pub groups: Vec<EquivalenceGroup>,
}

impl Default for EquivalenceConfig {
    fn default() -> Self {
        Self {
            include_builtin: true,
            groups: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
