//! Index-based graph handed to layout strategies.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use log::warn;

use narragraph_core::{
    analysis::{DiagramAnalysis, DiagramType},
    geometry::Size,
};

use crate::{config::LayoutConfig, layout::sizing, stage::DegradeReason};

/// A node with its measured box
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub size: Size,
}

/// A directed edge between node indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: usize,
    pub target: usize,
}

impl GraphEdge {
    pub fn is_self_loop(self) -> bool {
        self.source == self.target
    }
}

/// What had to be removed to make an analysis layoutable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphCleanup {
    pub duplicate_ids: Vec<String>,
    pub dangling_edges: usize,
}

impl GraphCleanup {
    pub fn is_clean(&self) -> bool {
        self.duplicate_ids.is_empty() && self.dangling_edges == 0
    }

    pub fn into_reason(self) -> Option<DegradeReason> {
        (!self.is_clean()).then_some(DegradeReason::InvalidGraphInput {
            duplicate_ids: self.duplicate_ids,
            dangling_edges: self.dangling_edges,
        })
    }
}

/// Graph whose nodes and edges refer to each other by index
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutGraph {
    diagram_type: DiagramType,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl LayoutGraph {
    pub fn new(diagram_type: DiagramType, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self {
            diagram_type,
            nodes,
            edges,
        }
    }

    /// Build the graph from an analysis, keeping the first node of each id
    /// and dropping edges whose endpoints do not resolve.
    pub fn from_analysis(analysis: &DiagramAnalysis, config: &LayoutConfig) -> (Self, GraphCleanup) {
        let mut cleanup = GraphCleanup::default();
        let mut index = HashMap::with_capacity(analysis.nodes().len());
        let mut nodes = Vec::with_capacity(analysis.nodes().len());

        for node in analysis.nodes() {
            if index.contains_key(node.id.as_str()) {
                if !cleanup.duplicate_ids.contains(&node.id) {
                    cleanup.duplicate_ids.push(node.id.clone());
                }
                continue;
            }
            index.insert(node.id.as_str(), nodes.len());
            nodes.push(GraphNode {
                id: node.id.clone(),
                label: node.label.clone(),
                size: sizing::measure(&node.label, config),
            });
        }

        let mut edges = Vec::with_capacity(analysis.edges().len());
        for edge in analysis.edges() {
            match (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
                (Some(&source), Some(&target)) => edges.push(GraphEdge { source, target }),
                _ => cleanup.dangling_edges += 1,
            }
        }

        if !cleanup.is_clean() {
            warn!(
                duplicate_ids:? = cleanup.duplicate_ids,
                dangling_edges = cleanup.dangling_edges;
                "Cleaned invalid graph input before layout",
            );
        }

        (Self::new(analysis.diagram_type(), nodes, edges), cleanup)
    }

    pub fn diagram_type(&self) -> DiagramType {
        self.diagram_type
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(incoming, outgoing)` edge counts per node
    pub fn degrees(&self) -> Vec<(usize, usize)> {
        let mut degrees = vec![(0, 0); self.nodes.len()];
        for edge in &self.edges {
            degrees[edge.source].1 += 1;
            degrees[edge.target].0 += 1;
        }
        degrees
    }

    /// Kahn's algorithm, lowest index first among ready nodes.
    ///
    /// Cycles are broken by releasing the lowest-index node still waiting,
    /// so every node appears exactly once.
    pub fn topological_order(&self) -> Vec<usize> {
        let n = self.nodes.len();
        let mut incoming = vec![0usize; n];
        let mut successors = vec![Vec::new(); n];
        for edge in self.edges.iter().filter(|edge| !edge.is_self_loop()) {
            incoming[edge.target] += 1;
            successors[edge.source].push(edge.target);
        }

        let mut placed = vec![false; n];
        let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
            .filter(|&idx| incoming[idx] == 0)
            .map(Reverse)
            .collect();
        let mut order = Vec::with_capacity(n);

        while order.len() < n {
            let next = match ready.pop() {
                Some(Reverse(idx)) => idx,
                None => match (0..n).find(|&idx| !placed[idx]) {
                    Some(idx) => idx,
                    None => break,
                },
            };
            if placed[next] {
                continue;
            }
            placed[next] = true;
            order.push(next);
            for &succ in &successors[next] {
                incoming[succ] = incoming[succ].saturating_sub(1);
                if incoming[succ] == 0 && !placed[succ] {
                    ready.push(Reverse(succ));
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use narragraph_core::analysis::{AnalysisEdge, AnalysisNode};

    use super::*;

    fn graph(n: usize, edges: &[(usize, usize)]) -> LayoutGraph {
        let nodes = (0..n)
            .map(|idx| GraphNode {
                id: format!("n{idx}"),
                label: format!("Node {idx}"),
                size: Size::new(80.0, 40.0),
            })
            .collect();
        let edges = edges
            .iter()
            .map(|&(source, target)| GraphEdge { source, target })
            .collect();
        LayoutGraph::new(DiagramType::Flow, nodes, edges)
    }

    #[test]
    fn test_from_analysis_cleans_input() {
        let analysis = DiagramAnalysis::new(
            DiagramType::Flow,
            0.8,
            vec![
                AnalysisNode::new("a", "A"),
                AnalysisNode::new("b", "B"),
                AnalysisNode::new("a", "Again"),
            ],
            vec![AnalysisEdge::new("a", "b"), AnalysisEdge::new("b", "ghost")],
            "test",
        );
        let (graph, cleanup) = LayoutGraph::from_analysis(&analysis, &LayoutConfig::default());

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.nodes()[0].label, "A");
        assert_eq!(graph.edges(), &[GraphEdge { source: 0, target: 1 }]);
        assert_eq!(cleanup.duplicate_ids, vec!["a"]);
        assert_eq!(cleanup.dangling_edges, 1);
        assert!(matches!(
            cleanup.into_reason(),
            Some(DegradeReason::InvalidGraphInput { dangling_edges: 1, .. })
        ));
    }

    #[test]
    fn test_topological_order() {
        assert_eq!(graph(4, &[(2, 1), (1, 0), (3, 2)]).topological_order(), vec![3, 2, 1, 0]);
        assert_eq!(graph(3, &[]).topological_order(), vec![0, 1, 2]);
    }

    #[test]
    fn test_topological_order_breaks_cycles() {
        let order = graph(3, &[(0, 1), (1, 2), (2, 0)]).topological_order();
        assert_eq!(order, vec![0, 1, 2]);

        let order = graph(2, &[(0, 0), (1, 1)]).topological_order();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_degrees() {
        assert_eq!(graph(3, &[(0, 1), (0, 2)]).degrees(), vec![(0, 2), (1, 0), (1, 0)]);
    }
}
