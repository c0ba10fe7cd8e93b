//! Error types for Narragraph operations.
//!
//! Most failures inside the pipeline never reach the caller: they are
//! recovered locally and reported as a [`DegradeReason`](crate::DegradeReason)
//! instead. The errors here are the ones a caller can actually observe, plus
//! the per-layer errors that degradations carry as their cause.

use std::io;

use thiserror::Error;

use narragraph_core::analysis::DiagramType;

use crate::model::ModelError;

/// The main error type for Narragraph operations.
#[derive(Debug, Error)]
pub enum NarragraphError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalid configuration, detected when components are constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no layout strategy supports diagram type `{0}`")]
    NoStrategy(DiagramType),

    #[error("diagram type `{diagram_type}` is supported by more than one strategy: {strategies:?}")]
    AmbiguousStrategy {
        diagram_type: DiagramType,
        strategies: Vec<String>,
    },

    #[error("layout strategy `{0}` is registered twice")]
    DuplicateStrategy(String),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure of the layout stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("cannot lay out a graph without nodes")]
    EmptyGraph,

    #[error("layout strategy `{strategy}` failed: {reason}")]
    Strategy { strategy: String, reason: String },
}

impl LayoutError {
    pub(crate) fn strategy(strategy: &str, reason: impl Into<String>) -> Self {
        Self::Strategy {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why the model-backed extractor could not produce an analysis
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no model capability is configured")]
    NotConfigured,

    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("model response does not match the expected schema: {0}")]
    InvalidResponse(String),

    #[error("extraction was cancelled")]
    Cancelled,
}
