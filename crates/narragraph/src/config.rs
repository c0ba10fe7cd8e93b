//! Configuration types for the Narragraph pipeline.
//!
//! All types implement [`serde::Deserialize`] and fill missing fields with
//! their defaults, so a configuration file only needs the values it changes.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration grouping every section.
//! - [`ExtractorConfig`] - External model access, retries and language fallback.
//! - [`ValidatorConfig`] - Confidence penalties applied by the validator.
//! - [`CacheConfig`] - Semantic cache capacity and fuzzy-match threshold.
//! - [`LayoutConfig`] - Spacing, margins and node sizing.
//! - [`PipelineConfig`] - Document-level parallelism.
//!
//! # Example
//!
//! ```
//! # use narragraph::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.cache.capacity, 100);
//! ```

use serde::Deserialize;

use narragraph_text::{Language, ModelTier, language::DEFAULT_FLOOR};

use crate::error::ConfigError;

/// Application configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Check every section for out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extractor.validate()?;
        self.validator.validate()?;
        self.cache.validate()?;
        self.layout.validate()?;
        self.pipeline.validate()
    }
}

/// External model access for the model-backed extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Use the external model when a capability is available
    pub enabled: bool,

    /// Chat-completion endpoint URL
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    pub light_model: String,
    pub heavy_model: String,

    /// Upper bound for one model call, in milliseconds
    pub timeout_ms: u64,

    /// Retries after the first attempt, for transient failures only
    pub max_retries: u32,

    /// Backoff unit; attempt `n` waits `n × retry_backoff_ms`
    pub retry_backoff_ms: u64,

    /// Language assumed when detection confidence is below `language_floor`
    pub fallback_language: Language,

    pub language_floor: f64,

    /// Model tier used for medium-complexity texts
    pub medium_tier: ModelTier,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key_env: "NARRAGRAPH_API_KEY".to_string(),
            light_model: "gpt-4o-mini".to_string(),
            heavy_model: "gpt-4o".to_string(),
            timeout_ms: 30_000,
            max_retries: 2,
            retry_backoff_ms: 500,
            fallback_language: Language::En,
            language_floor: DEFAULT_FLOOR,
            medium_tier: ModelTier::Light,
        }
    }
}

impl ExtractorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "extractor.timeout_ms",
                "must be greater than zero",
            ));
        }
        check_unit_interval("extractor.language_floor", self.language_floor)
    }
}

/// Confidence recalibration applied by the relationship validator
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Edge ratio below which the analysis counts as sparse
    pub low_ratio_threshold: f64,
    pub low_ratio_penalty: f64,

    /// Share of disconnected nodes above which the analysis is penalized
    pub disconnected_threshold: f64,
    pub disconnected_penalty: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            low_ratio_threshold: 0.5,
            low_ratio_penalty: 0.1,
            disconnected_threshold: 0.3,
            disconnected_penalty: 0.1,
        }
    }
}

impl ValidatorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("validator.low_ratio_penalty", self.low_ratio_penalty)?;
        check_unit_interval("validator.disconnected_threshold", self.disconnected_threshold)?;
        check_unit_interval("validator.disconnected_penalty", self.disconnected_penalty)?;
        if !self.low_ratio_threshold.is_finite() || self.low_ratio_threshold < 0.0 {
            return Err(ConfigError::invalid(
                "validator.low_ratio_threshold",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Semantic cache sizing and matching
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry count above which eviction runs
    pub capacity: usize,

    /// Minimum similarity for a fuzzy hit
    pub similarity_threshold: f64,

    /// Number of key terms kept per fingerprint
    pub key_terms: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            similarity_threshold: 0.7,
            key_terms: 10,
        }
    }
}

impl CacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::invalid(
                "cache.capacity",
                "must be at least one entry",
            ));
        }
        check_unit_interval("cache.similarity_threshold", self.similarity_threshold)
    }
}

/// Spacing and node sizing for every layout strategy
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical gap between ranks (or rows)
    pub rank_separation: f32,

    /// Horizontal gap between nodes of one rank (or columns)
    pub node_separation: f32,

    pub margin_x: f32,
    pub margin_y: f32,

    pub min_node_width: f32,
    pub max_node_width: f32,

    /// Estimated width of one label character
    pub char_width: f32,

    /// Height of one line of label text, padding included
    pub node_height: f32,

    /// Horizontal padding on each side of the label
    pub node_padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rank_separation: 80.0,
            node_separation: 40.0,
            margin_x: 40.0,
            margin_y: 40.0,
            min_node_width: 80.0,
            max_node_width: 220.0,
            char_width: 8.0,
            node_height: 40.0,
            node_padding: 12.0,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("layout.rank_separation", self.rank_separation),
            ("layout.node_separation", self.node_separation),
            ("layout.margin_x", self.margin_x),
            ("layout.margin_y", self.margin_y),
            ("layout.node_padding", self.node_padding),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(field, "must be a non-negative number"));
            }
        }

        let positive = [
            ("layout.min_node_width", self.min_node_width),
            ("layout.max_node_width", self.max_node_width),
            ("layout.char_width", self.char_width),
            ("layout.node_height", self.node_height),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(field, "must be a positive number"));
            }
        }

        if self.min_node_width > self.max_node_width {
            return Err(ConfigError::invalid(
                "layout.min_node_width",
                "must not exceed layout.max_node_width",
            ));
        }
        Ok(())
    }
}

/// Document-level processing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of segments processed at the same time
    pub max_parallel: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_parallel: 4 }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel == 0 {
            return Err(ConfigError::invalid(
                "pipeline.max_parallel",
                "must be at least one",
            ));
        }
        Ok(())
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be between 0 and 1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extractor.timeout_ms, 30_000);
        assert_eq!(config.cache.similarity_threshold, 0.7);
        assert_eq!(config.validator.low_ratio_penalty, 0.1);
        assert!(!config.extractor.enabled);
    }

    #[test]
    fn test_invalid_values_are_named() {
        let mut config = AppConfig::default();
        config.cache.similarity_threshold = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::invalid(
                "cache.similarity_threshold",
                "must be between 0 and 1"
            ))
        );

        let mut config = AppConfig::default();
        config.layout.min_node_width = 500.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "layout.min_node_width",
                ..
            })
        ));

        let mut config = AppConfig::default();
        config.pipeline.max_parallel = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_is_rejected() {
        let mut config = AppConfig::default();
        config.validator.low_ratio_penalty = f64::NAN;
        assert!(config.validate().is_err());
    }
}
