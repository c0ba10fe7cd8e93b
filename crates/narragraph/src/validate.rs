//! Relationship validation and confidence recalibration.
//!
//! The validator is a pure function over a [`DiagramAnalysis`]. It never
//! mutates its input; it returns a corrected copy together with a
//! [`QualityReport`]. Cycles and disconnected nodes are reported, not
//! rejected: both are valid input to the layout engine.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::Serialize;

use narragraph_core::analysis::{AnalysisEdge, AnalysisNode, DiagramAnalysis};

use crate::config::ValidatorConfig;

/// Structural quality metadata of a validated analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    /// Edges removed because an endpoint did not resolve
    pub dropped_edges: usize,
    /// Ids that appeared more than once; only the first node was kept
    pub duplicate_nodes: Vec<String>,
    /// Valid edges per spanning-tree edge, `valid / max(n - 1, 1)`
    pub edge_ratio: f64,
    pub has_cycles: bool,
    /// Nodes touched by no edge, in node order
    pub disconnected_nodes: Vec<String>,
}

/// A corrected analysis and what was found while correcting it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedAnalysis {
    pub analysis: DiagramAnalysis,
    pub report: QualityReport,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipValidator {
    config: ValidatorConfig,
}

impl RelationshipValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate `analysis` and recalibrate its confidence
    pub fn validate(&self, analysis: &DiagramAnalysis) -> ValidatedAnalysis {
        let (nodes, duplicate_nodes) = dedup_nodes(analysis.nodes());
        if !duplicate_nodes.is_empty() {
            warn!(duplicates:? = duplicate_nodes; "Collapsed duplicate node ids");
        }

        let ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
        let edges: Vec<AnalysisEdge> = analysis
            .edges()
            .iter()
            .filter(|edge| ids.contains(edge.from.as_str()) && ids.contains(edge.to.as_str()))
            .cloned()
            .collect();
        let dropped_edges = analysis.edges().len() - edges.len();

        let node_count = nodes.len();
        let edge_ratio = edges.len() as f64 / node_count.saturating_sub(1).max(1) as f64;
        let has_cycles = has_cycle(&nodes, &edges);
        let disconnected_nodes = disconnected(&nodes, &edges);

        let mut confidence = analysis.confidence();
        if edge_ratio < self.config.low_ratio_threshold && node_count > 2 {
            confidence -= self.config.low_ratio_penalty;
        }
        if disconnected_nodes.len() as f64 > self.config.disconnected_threshold * node_count as f64
        {
            confidence -= self.config.disconnected_penalty;
        }

        debug!(
            nodes = node_count,
            edges = edges.len(),
            dropped_edges,
            edge_ratio,
            has_cycles,
            disconnected = disconnected_nodes.len(),
            confidence;
            "Validated analysis",
        );

        let mut corrected = analysis.with_graph(nodes, edges).with_confidence(confidence);
        if dropped_edges > 0 {
            warn!(dropped_edges; "Dropped edges with unresolved endpoints");
            corrected = corrected.with_reasoning(format!(
                "{} [dropped {dropped_edges} dangling edge(s)]",
                analysis.reasoning()
            ));
        }

        ValidatedAnalysis {
            analysis: corrected,
            report: QualityReport {
                dropped_edges,
                duplicate_nodes,
                edge_ratio,
                has_cycles,
                disconnected_nodes,
            },
        }
    }
}

fn dedup_nodes(nodes: &[AnalysisNode]) -> (Vec<AnalysisNode>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(nodes.len());
    let mut duplicates = Vec::new();
    for node in nodes {
        if seen.insert(node.id.as_str()) {
            kept.push(node.clone());
        } else if !duplicates.contains(&node.id) {
            duplicates.push(node.id.clone());
        }
    }
    (kept, duplicates)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Depth-first search with white/gray/black coloring; a gray target is a back edge
fn has_cycle(nodes: &[AnalysisNode], edges: &[AnalysisEdge]) -> bool {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut adjacency = vec![Vec::new(); nodes.len()];
    for edge in edges {
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        {
            adjacency[from].push(to);
        }
    }

    let mut color = vec![Color::White; nodes.len()];
    for root in 0..nodes.len() {
        if color[root] != Color::White {
            continue;
        }
        // Explicit stack of (node, next child position).
        let mut stack = vec![(root, 0usize)];
        color[root] = Color::Gray;
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if let Some(&child) = adjacency[node].get(frame.1) {
                frame.1 += 1;
                match color[child] {
                    Color::Gray => return true,
                    Color::White => {
                        color[child] = Color::Gray;
                        stack.push((child, 0));
                    }
                    Color::Black => {}
                }
            } else {
                color[node] = Color::Black;
                stack.pop();
            }
        }
    }
    false
}

fn disconnected(nodes: &[AnalysisNode], edges: &[AnalysisEdge]) -> Vec<String> {
    let touched: HashSet<&str> = edges
        .iter()
        .flat_map(|edge| [edge.from.as_str(), edge.to.as_str()])
        .collect();
    nodes
        .iter()
        .filter(|node| !touched.contains(node.id.as_str()))
        .map(|node| node.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use narragraph_core::analysis::{DiagramType, MAX_CONFIDENCE, MIN_CONFIDENCE};

    use super::*;

    fn analysis(nodes: &[&str], edges: &[(&str, &str)], confidence: f64) -> DiagramAnalysis {
        DiagramAnalysis::new(
            DiagramType::Flow,
            confidence,
            nodes
                .iter()
                .map(|id| AnalysisNode::new(*id, id.to_uppercase()))
                .collect(),
            edges
                .iter()
                .map(|(from, to)| AnalysisEdge::new(*from, *to))
                .collect(),
            "test",
        )
    }

    fn validate(analysis: &DiagramAnalysis) -> ValidatedAnalysis {
        RelationshipValidator::default().validate(analysis)
    }

    #[test]
    fn test_drops_dangling_edge() {
        let input = analysis(&["x", "z"], &[("x", "y"), ("x", "z")], 0.9);
        let validated = validate(&input);

        assert_eq!(validated.report.dropped_edges, 1);
        assert_eq!(validated.analysis.edges().len(), 1);
        assert_eq!(validated.analysis.edges()[0].to, "z");
        assert!(validated.analysis.reasoning().contains("dropped 1 dangling edge"));
        // the input is untouched
        assert_eq!(input.edges().len(), 2);
    }

    #[test]
    fn test_edge_ratio() {
        let validated = validate(&analysis(&["a", "b", "c"], &[("a", "b"), ("b", "c")], 0.8));
        assert!(approx_eq!(f64, validated.report.edge_ratio, 1.0));

        let single = validate(&analysis(&["a"], &[], 0.8));
        assert!(approx_eq!(f64, single.report.edge_ratio, 0.0));
    }

    #[test]
    fn test_cycle_detection() {
        let chain = validate(&analysis(&["a", "b", "c"], &[("a", "b"), ("b", "c")], 0.8));
        assert!(!chain.report.has_cycles);

        let diamond = validate(&analysis(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
            0.8,
        ));
        assert!(!diamond.report.has_cycles);

        let cycle = validate(&analysis(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("c", "a")],
            0.8,
        ));
        assert!(cycle.report.has_cycles);

        let self_loop = validate(&analysis(&["a"], &[("a", "a")], 0.8));
        assert!(self_loop.report.has_cycles);
    }

    #[test]
    fn test_penalties() {
        // ratio 1/3 and 2 of 4 nodes disconnected: both penalties apply
        let validated = validate(&analysis(&["a", "b", "c", "d"], &[("a", "b")], 0.8));

        assert_eq!(validated.report.disconnected_nodes, vec!["c", "d"]);
        assert!(approx_eq!(f64, validated.analysis.confidence(), 0.6, epsilon = 1e-9));
    }

    #[test]
    fn test_two_node_graph_skips_ratio_penalty() {
        let validated = validate(&analysis(&["a", "b"], &[], 0.9));
        // only the disconnection penalty applies
        assert!(approx_eq!(f64, validated.analysis.confidence(), 0.8, epsilon = 1e-9));
    }

    #[test]
    fn test_confidence_floor() {
        let validated = validate(&analysis(&["a", "b", "c", "d"], &[], 0.5));
        assert_eq!(validated.analysis.confidence(), MIN_CONFIDENCE);
    }

    #[test]
    fn test_duplicate_nodes_collapse() {
        let validated = validate(&analysis(&["a", "b", "a"], &[("a", "b")], 0.8));
        assert_eq!(validated.analysis.nodes().len(), 2);
        assert_eq!(validated.report.duplicate_nodes, vec!["a"]);
    }

    #[test]
    fn test_custom_penalties() {
        let validator = RelationshipValidator::new(ValidatorConfig {
            low_ratio_penalty: 0.3,
            disconnected_penalty: 0.0,
            ..Default::default()
        });
        let validated = validator.validate(&analysis(&["a", "b", "c", "d"], &[("a", "b")], 0.9));
        assert!(approx_eq!(f64, validated.analysis.confidence(), 0.6, epsilon = 1e-9));
    }

    fn arb_analysis() -> impl Strategy<Value = DiagramAnalysis> {
        (
            prop::collection::vec(0u8..12, 0..10),
            prop::collection::vec((0u8..14, 0u8..14), 0..20),
            0.0f64..1.5,
        )
            .prop_map(|(nodes, edges, confidence)| {
                DiagramAnalysis::new(
                    DiagramType::Flow,
                    confidence,
                    nodes
                        .iter()
                        .map(|id| AnalysisNode::new(format!("n{id}"), "label"))
                        .collect(),
                    edges
                        .iter()
                        .map(|(from, to)| AnalysisEdge::new(format!("n{from}"), format!("n{to}")))
                        .collect(),
                    "generated",
                )
            })
    }

    proptest! {
        #[test]
        fn validated_edges_resolve_and_confidence_is_bounded(input in arb_analysis()) {
            let validated = validate(&input);
            let ids = validated.analysis.node_ids();

            prop_assert_eq!(ids.len(), validated.analysis.nodes().len());
            for edge in validated.analysis.edges() {
                prop_assert!(ids.contains(edge.from.as_str()));
                prop_assert!(ids.contains(edge.to.as_str()));
            }
            let confidence = validated.analysis.confidence();
            prop_assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&confidence));
            prop_assert_eq!(
                validated.report.dropped_edges + validated.analysis.edges().len(),
                input.edges().len()
            );
        }
    }
}
