//! Stage results that carry the reason for a fallback.
//!
//! Every pipeline stage returns a value. When the stage had to fall back to a
//! more conservative path it still returns a value, wrapped in
//! [`Stage::Degraded`] together with the [`DegradeReason`].

use thiserror::Error;

use crate::error::ExtractionError;

/// Why a stage produced a fallback value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DegradeReason {
    #[error("rule-based extraction used: {0}")]
    Extraction(ExtractionError),

    #[error(
        "graph input cleaned: {} duplicate id(s), {dangling_edges} dangling edge(s)",
        .duplicate_ids.len()
    )]
    InvalidGraphInput {
        duplicate_ids: Vec<String>,
        dangling_edges: usize,
    },

    #[error("grid fallback layout used: {0}")]
    LayoutAlgorithm(String),

    #[error("corrupt cache entry discarded")]
    CacheCorruption,
}

/// Output of one stage: a value, possibly produced by a fallback path
#[derive(Debug, Clone, PartialEq)]
pub enum Stage<T> {
    Ok(T),
    Degraded(T, DegradeReason),
}

impl<T> Stage<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Ok(value) | Self::Degraded(value, _) => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Ok(value) | Self::Degraded(value, _) => value,
        }
    }

    pub fn reason(&self) -> Option<&DegradeReason> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded(_, reason) => Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(..))
    }

    /// Transform the value, keeping the degradation reason
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Stage<U> {
        match self {
            Self::Ok(value) => Stage::Ok(f(value)),
            Self::Degraded(value, reason) => Stage::Degraded(f(value), reason),
        }
    }

    pub fn into_parts(self) -> (T, Option<DegradeReason>) {
        match self {
            Self::Ok(value) => (value, None),
            Self::Degraded(value, reason) => (value, Some(reason)),
        }
    }

    /// Build a stage from a value and an optional reason
    pub fn from_parts(value: T, reason: Option<DegradeReason>) -> Self {
        match reason {
            Some(reason) => Self::Degraded(value, reason),
            None => Self::Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let ok: Stage<u32> = Stage::Ok(3);
        assert_eq!(*ok.value(), 3);
        assert!(!ok.is_degraded());
        assert!(ok.reason().is_none());

        let degraded = Stage::Degraded(4, DegradeReason::CacheCorruption);
        assert!(degraded.is_degraded());
        assert_eq!(degraded.reason(), Some(&DegradeReason::CacheCorruption));
        assert_eq!(degraded.into_value(), 4);
    }

    #[test]
    fn test_map_keeps_reason() {
        let stage = Stage::Degraded(2, DegradeReason::LayoutAlgorithm("boom".to_string()));
        let mapped = stage.map(|v| v * 10);
        assert_eq!(*mapped.value(), 20);
        assert_eq!(
            mapped.reason(),
            Some(&DegradeReason::LayoutAlgorithm("boom".to_string()))
        );
    }

    #[test]
    fn test_parts_round_trip() {
        let (value, reason) = Stage::Degraded("x", DegradeReason::CacheCorruption).into_parts();
        let rebuilt = Stage::from_parts(value, reason);
        assert!(rebuilt.is_degraded());

        let (value, reason) = Stage::Ok("y").into_parts();
        assert_eq!(Stage::from_parts(value, reason), Stage::Ok("y"));
    }

    #[test]
    fn test_reason_messages() {
        let reason = DegradeReason::InvalidGraphInput {
            duplicate_ids: vec!["a".to_string()],
            dangling_edges: 2,
        };
        assert_eq!(
            reason.to_string(),
            "graph input cleaned: 1 duplicate id(s), 2 dangling edge(s)"
        );
    }
}
