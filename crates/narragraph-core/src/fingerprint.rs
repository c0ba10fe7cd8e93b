//! Content fingerprints used as cache keys and similarity basis.
//!
//! Fingerprints are derived deterministically from raw text by the
//! `narragraph-text` crate. This module only defines the value type; two
//! fingerprints with the same [`semantic_hash`](ContentFingerprint::semantic_hash)
//! are considered identical inputs.

use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Dominant rhetorical structure detected in the text
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructurePattern {
    Sequential,
    Conditional,
    Comparison,
    Process,
    Hierarchical,
    #[default]
    General,
}

/// Coarse hint about which diagram family suits the text
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramHint {
    Flow,
    Tree,
    Matrix,
    Timeline,
    #[default]
    General,
}

/// Compact summary of a text segment.
///
/// `key_terms` keeps insertion order: the most frequent term comes first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFingerprint {
    semantic_hash: String,
    structure_pattern: StructurePattern,
    key_terms: IndexSet<String>,
    complexity: f64,
    diagram_hint: DiagramHint,
}

impl ContentFingerprint {
    pub fn new(
        semantic_hash: impl Into<String>,
        structure_pattern: StructurePattern,
        key_terms: IndexSet<String>,
        complexity: f64,
        diagram_hint: DiagramHint,
    ) -> Self {
        Self {
            semantic_hash: semantic_hash.into(),
            structure_pattern,
            key_terms,
            complexity: complexity.clamp(0.0, 1.0),
            diagram_hint,
        }
    }

    pub fn semantic_hash(&self) -> &str {
        &self.semantic_hash
    }

    pub fn structure_pattern(&self) -> StructurePattern {
        self.structure_pattern
    }

    pub fn key_terms(&self) -> &IndexSet<String> {
        &self.key_terms
    }

    pub fn complexity(&self) -> f64 {
        self.complexity
    }

    pub fn diagram_hint(&self) -> DiagramHint {
        self.diagram_hint
    }

    /// Jaccard overlap of the two key-term sets, in `[0, 1]`.
    ///
    /// Two empty sets are treated as fully overlapping.
    pub fn key_term_overlap(&self, other: &Self) -> f64 {
        if self.key_terms.is_empty() && other.key_terms.is_empty() {
            return 1.0;
        }
        let shared = self.key_terms.intersection(&other.key_terms).count();
        let union = self.key_terms.union(&other.key_terms).count();
        shared as f64 / union as f64
    }
}

impl PartialEq for ContentFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.semantic_hash == other.semantic_hash
    }
}

impl Eq for ContentFingerprint {}

impl Hash for ContentFingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.semantic_hash.hash(state);
    }
}
