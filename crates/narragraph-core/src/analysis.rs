//! The typed graph extracted from a text segment.
//!
//! A [`DiagramAnalysis`] is a value object: stages that need to correct it
//! (for example the relationship validator) build a new copy through the
//! `with_*` methods instead of mutating the original.

use std::{
    collections::HashSet,
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest confidence any analysis may carry
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Highest confidence any analysis may carry
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Kinds of diagrams the pipeline knows how to lay out.
///
/// The names match external configuration strings (snake_case).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramType {
    /// Directed process or decision flow (default)
    #[default]
    Flow,
    /// Parent/child hierarchy
    Tree,
    /// Ordered events along a time axis
    Timeline,
    /// Side-by-side comparison grid
    Matrix,
    /// Closed loop of stages
    Cycle,
}

impl DiagramType {
    /// Every diagram type, in declaration order
    pub const ALL: [DiagramType; 5] = [
        DiagramType::Flow,
        DiagramType::Tree,
        DiagramType::Timeline,
        DiagramType::Matrix,
        DiagramType::Cycle,
    ];

    /// Maps the loose vocabulary used by external extractors onto a diagram type.
    ///
    /// Unrecognized names map to [`DiagramType::Flow`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use narragraph_core::analysis::DiagramType;
    /// assert_eq!(DiagramType::from_vocabulary("Mind-Map"), DiagramType::Tree);
    /// assert_eq!(DiagramType::from_vocabulary("swimlane"), DiagramType::Flow);
    /// ```
    pub fn from_vocabulary(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        match normalized.as_str() {
            "tree" | "hierarchy" | "hierarchical" | "mindmap" | "orgchart" | "taxonomy" => {
                Self::Tree
            }
            "timeline" | "chronology" | "chronological" | "history" | "roadmap" => Self::Timeline,
            "matrix" | "comparison" | "compare" | "table" | "grid" | "quadrant" | "venn" => {
                Self::Matrix
            }
            "cycle" | "cyclic" | "loop" | "circular" | "lifecycle" => Self::Cycle,
            _ => Self::Flow,
        }
    }
}

/// Error returned when a diagram type name is not one of the canonical names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported diagram type: {0}")]
pub struct UnknownDiagramType(String);

impl FromStr for DiagramType {
    type Err = UnknownDiagramType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flow" => Ok(Self::Flow),
            "tree" => Ok(Self::Tree),
            "timeline" => Ok(Self::Timeline),
            "matrix" => Ok(Self::Matrix),
            "cycle" => Ok(Self::Cycle),
            other => Err(UnknownDiagramType(other.to_string())),
        }
    }
}

impl From<DiagramType> for &'static str {
    fn from(val: DiagramType) -> Self {
        match val {
            DiagramType::Flow => "flow",
            DiagramType::Tree => "tree",
            DiagramType::Timeline => "timeline",
            DiagramType::Matrix => "matrix",
            DiagramType::Cycle => "cycle",
        }
    }
}

impl Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// A labeled node of an analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisNode {
    pub id: String,
    pub label: String,
}

impl AnalysisNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AnalysisEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Structured diagram extracted from one text segment.
///
/// Confidence is always kept within [`MIN_CONFIDENCE`]..=[`MAX_CONFIDENCE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AnalysisFields")]
pub struct DiagramAnalysis {
    #[serde(rename = "type")]
    diagram_type: DiagramType,
    confidence: f64,
    nodes: Vec<AnalysisNode>,
    edges: Vec<AnalysisEdge>,
    reasoning: String,
}

impl DiagramAnalysis {
    /// Creates a new analysis, clamping `confidence` into the valid range.
    pub fn new(
        diagram_type: DiagramType,
        confidence: f64,
        nodes: Vec<AnalysisNode>,
        edges: Vec<AnalysisEdge>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            diagram_type,
            confidence: clamp_confidence(confidence),
            nodes,
            edges,
            reasoning: reasoning.into(),
        }
    }

    pub fn diagram_type(&self) -> DiagramType {
        self.diagram_type
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn nodes(&self) -> &[AnalysisNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[AnalysisEdge] {
        &self.edges
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Set of all node ids in this analysis
    pub fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|node| node.id.as_str()).collect()
    }

    /// Returns a copy with a different confidence (clamped)
    pub fn with_confidence(&self, confidence: f64) -> Self {
        Self {
            confidence: clamp_confidence(confidence),
            ..self.clone()
        }
    }

    /// Returns a copy with the given nodes and edges
    pub fn with_graph(&self, nodes: Vec<AnalysisNode>, edges: Vec<AnalysisEdge>) -> Self {
        Self {
            nodes,
            edges,
            ..self.clone()
        }
    }

    /// Returns a copy with the given reasoning text
    pub fn with_reasoning(&self, reasoning: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            ..self.clone()
        }
    }
}

/// Wire form of [`DiagramAnalysis`], deserialized through [`DiagramAnalysis::new`]
#[derive(Deserialize)]
struct AnalysisFields {
    #[serde(rename = "type")]
    diagram_type: DiagramType,
    confidence: f64,
    nodes: Vec<AnalysisNode>,
    edges: Vec<AnalysisEdge>,
    reasoning: String,
}

impl From<AnalysisFields> for DiagramAnalysis {
    fn from(fields: AnalysisFields) -> Self {
        Self::new(
            fields.diagram_type,
            fields.confidence,
            fields.nodes,
            fields.edges,
            fields.reasoning,
        )
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return MIN_CONFIDENCE;
    }
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
