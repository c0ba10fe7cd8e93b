//! Layout engine: analysis in, overlap-free [`LayoutData`] out.
//!
//! The engine converts a [`DiagramAnalysis`] into an index-based
//! [`LayoutGraph`], asks the strategy registered for the diagram type to place
//! it, and assembles the result. Whatever the strategy does (error, panic, or
//! overlapping boxes) the engine still returns a layout: it falls back to a
//! deterministic grid and reports the reason through [`Stage::Degraded`].
//!
//! The final layout is translated so its content starts at the configured
//! margins, and its bounds cover every node and route point plus the margins.

mod graph;
pub mod sizing;
pub mod strategies;

use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

use narragraph_core::{
    analysis::DiagramAnalysis,
    geometry::Point,
    layout::{EdgeKind, LayoutBounds, LayoutData, NodeKind, PositionedEdge, PositionedNode},
};

use crate::{
    config::LayoutConfig,
    error::{ConfigError, LayoutError},
    stage::{DegradeReason, Stage},
};

pub use graph::{GraphCleanup, GraphEdge, GraphNode, LayoutGraph};
pub use strategies::{LayoutStrategy, StrategyRegistry, StrategyRegistryBuilder};

/// Output of a strategy: top-left corner per node, optional route per edge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    /// Indexed like [`LayoutGraph::nodes`]
    pub positions: Vec<Point>,
    /// Indexed like [`LayoutGraph::edges`]; may be shorter when routes are absent
    pub routes: Vec<Option<Vec<Point>>>,
}

impl Placement {
    pub fn new(positions: Vec<Point>) -> Self {
        Self {
            positions,
            routes: Vec::new(),
        }
    }

    pub fn with_routes(mut self, routes: Vec<Option<Vec<Point>>>) -> Self {
        self.routes = routes;
        self
    }

    fn route(&self, edge: usize) -> Option<Vec<Point>> {
        self.routes.get(edge).cloned().flatten()
    }
}

/// Lays out analyses with the strategy registered for their diagram type
#[derive(Debug)]
pub struct LayoutEngine {
    registry: StrategyRegistry,
}

impl LayoutEngine {
    pub fn new(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    /// Engine with [`StrategyRegistry::standard`]
    ///
    /// # Errors
    /// Propagates registry validation errors.
    pub fn standard() -> Result<Self, ConfigError> {
        Ok(Self::new(StrategyRegistry::standard()?))
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Lay out `analysis`.
    ///
    /// Duplicate node ids and dangling edges are removed and reported as
    /// [`DegradeReason::InvalidGraphInput`]. A failing strategy is replaced by
    /// the grid fallback and reported as [`DegradeReason::LayoutAlgorithm`],
    /// which takes precedence when both apply.
    ///
    /// # Errors
    /// [`LayoutError::EmptyGraph`] when the analysis has no nodes, or a
    /// [`LayoutError::Strategy`] if even the grid fallback cannot produce a
    /// finite layout (only possible with a non-finite configuration).
    pub fn layout(
        &self,
        analysis: &DiagramAnalysis,
        config: &LayoutConfig,
    ) -> Result<Stage<LayoutData>, LayoutError> {
        if analysis.nodes().is_empty() {
            return Err(LayoutError::EmptyGraph);
        }

        let (graph, cleanup) = LayoutGraph::from_analysis(analysis, config);
        let mut reason = cleanup.into_reason();

        let attempt = match self.registry.strategy_for(graph.diagram_type()) {
            Some(strategy) => run_strategy(strategy, &graph, config)
                .and_then(|placement| assemble(&graph, &placement, strategy.name())),
            None => Err(LayoutError::strategy(
                "registry",
                format!("no strategy for `{}`", graph.diagram_type()),
            )),
        };

        let mut layout = match attempt {
            Ok(layout) => layout,
            Err(err) => {
                warn!(
                    diagram_type:% = graph.diagram_type(),
                    err:%;
                    "Layout strategy failed, using grid fallback",
                );
                reason = Some(DegradeReason::LayoutAlgorithm(err.to_string()));
                assemble(&graph, &strategies::grid::place(&graph, config), "grid")?
            }
        };

        normalize(&mut layout, config);
        debug!(
            nodes = layout.node_count(),
            edges = layout.edge_count(),
            width = layout.bounds.width,
            height = layout.bounds.height,
            degraded = reason.is_some();
            "Layout complete",
        );

        Ok(match reason {
            Some(reason) => Stage::Degraded(layout, reason),
            None => Stage::Ok(layout),
        })
    }
}

fn run_strategy(
    strategy: &dyn LayoutStrategy,
    graph: &LayoutGraph,
    config: &LayoutConfig,
) -> Result<Placement, LayoutError> {
    panic::catch_unwind(AssertUnwindSafe(|| strategy.generate(graph, config))).unwrap_or_else(
        |payload| {
            Err(LayoutError::strategy(
                strategy.name(),
                format!("panicked: {}", strategies::panic_message(payload)),
            ))
        },
    )
}

/// Build [`LayoutData`] from a placement, rejecting incomplete or overlapping ones
fn assemble(graph: &LayoutGraph, placement: &Placement, strategy: &str) -> Result<LayoutData, LayoutError> {
    if placement.positions.len() != graph.len() {
        return Err(LayoutError::strategy(
            strategy,
            format!(
                "placed {} of {} nodes",
                placement.positions.len(),
                graph.len()
            ),
        ));
    }

    let degrees = graph.degrees();
    let nodes: Vec<PositionedNode> = graph
        .nodes()
        .iter()
        .zip(&placement.positions)
        .zip(degrees)
        .map(|((node, position), (incoming, outgoing))| PositionedNode {
            id: node.id.clone(),
            x: position.x(),
            y: position.y(),
            width: node.size.width(),
            height: node.size.height(),
            label: node.label.clone(),
            kind: NodeKind::from_degree(incoming, outgoing),
        })
        .collect();

    let edges = graph
        .edges()
        .iter()
        .enumerate()
        .map(|(idx, edge)| PositionedEdge {
            id: format!("e{}", idx + 1),
            source: nodes[edge.source].id.clone(),
            target: nodes[edge.target].id.clone(),
            kind: edge_kind(&nodes[edge.source], &nodes[edge.target], edge.is_self_loop()),
            points: placement.route(idx),
        })
        .collect();

    let layout = LayoutData {
        nodes,
        edges,
        bounds: LayoutBounds::default(),
    };

    if let Some((a, b)) = layout.find_overlap() {
        return Err(LayoutError::strategy(
            strategy,
            format!("nodes `{a}` and `{b}` overlap"),
        ));
    }
    if !layout.is_well_formed() {
        return Err(LayoutError::strategy(strategy, "non-finite geometry"));
    }
    Ok(layout)
}

/// Back edges point against reading order: upward, or leftward within a row
fn edge_kind(source: &PositionedNode, target: &PositionedNode, self_loop: bool) -> EdgeKind {
    if self_loop {
        return EdgeKind::SelfLoop;
    }
    let source_center = source.bounds().center();
    let target_center = target.bounds().center();
    let same_row = (source_center.y() - target_center.y()).abs() < 0.5;
    if (!same_row && target_center.y() < source_center.y())
        || (same_row && target_center.x() < source_center.x())
    {
        EdgeKind::Back
    } else {
        EdgeKind::Forward
    }
}

/// Move content to the margins and size the canvas around it
fn normalize(layout: &mut LayoutData, config: &LayoutConfig) {
    let points = layout
        .edges
        .iter()
        .filter_map(|edge| edge.points.as_ref())
        .flatten()
        .map(|point| (point.x(), point.y(), point.x(), point.y()));
    let boxes = layout
        .nodes
        .iter()
        .map(|node| (node.x, node.y, node.x + node.width, node.y + node.height));
    let (min_x, min_y, max_x, max_y) = boxes.chain(points).fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(min_x, min_y, max_x, max_y), (x0, y0, x1, y1)| {
            (min_x.min(x0), min_y.min(y0), max_x.max(x1), max_y.max(y1))
        },
    );

    layout.translate(config.margin_x - min_x, config.margin_y - min_y);
    layout.bounds = LayoutBounds {
        width: max_x - min_x + 2.0 * config.margin_x,
        height: max_y - min_y + 2.0 * config.margin_y,
        margin_x: config.margin_x,
        margin_y: config.margin_y,
    };
}

#[cfg(test)]
mod tests {
    use narragraph_core::analysis::{AnalysisEdge, AnalysisNode, DiagramType};

    use super::*;

    fn analysis(diagram_type: DiagramType, nodes: &[&str], edges: &[(&str, &str)]) -> DiagramAnalysis {
        DiagramAnalysis::new(
            diagram_type,
            0.8,
            nodes.iter().map(|id| AnalysisNode::new(*id, format!("Step {id}"))).collect(),
            edges.iter().map(|(from, to)| AnalysisEdge::new(*from, *to)).collect(),
            "test",
        )
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::standard().expect("standard registry")
    }

    struct Panicking;

    impl LayoutStrategy for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn supports(&self, _: DiagramType) -> bool {
            true
        }

        fn generate(&self, _: &LayoutGraph, _: &LayoutConfig) -> Result<Placement, LayoutError> {
            panic!("strategy exploded")
        }
    }

    struct Stacked;

    impl LayoutStrategy for Stacked {
        fn name(&self) -> &str {
            "stacked"
        }

        fn supports(&self, _: DiagramType) -> bool {
            true
        }

        fn generate(&self, graph: &LayoutGraph, _: &LayoutConfig) -> Result<Placement, LayoutError> {
            Ok(Placement::new(vec![Point::default(); graph.len()]))
        }
    }

    #[test]
    fn test_empty_graph_is_an_error() {
        let result = engine().layout(&analysis(DiagramType::Flow, &[], &[]), &LayoutConfig::default());
        assert_eq!(result, Err(LayoutError::EmptyGraph));
    }

    #[test]
    fn test_flow_layout_is_normalized() {
        let config = LayoutConfig::default();
        let stage = engine()
            .layout(&analysis(DiagramType::Flow, &["a", "b", "c"], &[("a", "b"), ("b", "c")]), &config)
            .expect("layout");
        assert!(!stage.is_degraded());

        let layout = stage.into_value();
        assert!(layout.is_well_formed());
        let content = layout.content_bounds().expect("nodes");
        assert_eq!(content.min_x(), config.margin_x);
        assert_eq!(content.min_y(), config.margin_y);
        assert!(layout.bounds.width >= content.max_x() + config.margin_x);
        assert!(layout.bounds.height >= content.max_y() + config.margin_y);

        assert_eq!(layout.node("a").map(|n| n.kind), Some(NodeKind::Start));
        assert_eq!(layout.node("c").map(|n| n.kind), Some(NodeKind::End));
        assert!(layout.edges.iter().all(|edge| edge.kind == EdgeKind::Forward));
    }

    #[test]
    fn test_invalid_input_is_cleaned() {
        let input = analysis(DiagramType::Flow, &["a", "b", "a"], &[("a", "b"), ("b", "z")]);
        let stage = engine().layout(&input, &LayoutConfig::default()).expect("layout");

        assert_eq!(
            stage.reason(),
            Some(&DegradeReason::InvalidGraphInput {
                duplicate_ids: vec!["a".to_string()],
                dangling_edges: 1,
            })
        );
        assert_eq!(stage.value().node_count(), 2);
        assert_eq!(stage.value().edge_count(), 1);
    }

    #[test]
    fn test_panicking_strategy_falls_back_to_grid() {
        let registry = StrategyRegistry::builder()
            .register(Panicking)
            .build()
            .expect("covers every type");
        let stage = LayoutEngine::new(registry)
            .layout(&analysis(DiagramType::Cycle, &["a", "b", "c"], &[]), &LayoutConfig::default())
            .expect("layout");

        match stage.reason() {
            Some(DegradeReason::LayoutAlgorithm(message)) => {
                assert!(message.contains("strategy exploded"), "{message}");
            }
            other => panic!("unexpected reason {other:?}"),
        }
        assert!(stage.value().is_well_formed());
    }

    #[test]
    fn test_overlapping_placement_falls_back_to_grid() {
        let registry = StrategyRegistry::builder()
            .register(Stacked)
            .build()
            .expect("covers every type");
        let stage = LayoutEngine::new(registry)
            .layout(&analysis(DiagramType::Matrix, &["a", "b"], &[]), &LayoutConfig::default())
            .expect("layout");

        assert!(matches!(stage.reason(), Some(DegradeReason::LayoutAlgorithm(_))));
        assert!(stage.value().find_overlap().is_none());
    }

    #[test]
    fn test_single_node_for_every_type() {
        for diagram_type in DiagramType::ALL {
            let stage = engine()
                .layout(&analysis(diagram_type, &["only"], &[]), &LayoutConfig::default())
                .expect("layout");
            assert!(!stage.is_degraded(), "{diagram_type} degraded");
            let node = &stage.value().nodes[0];
            assert_eq!((node.x, node.y), (40.0, 40.0));
        }
    }

    #[test]
    fn test_edge_kinds() {
        let stage = engine()
            .layout(
                &analysis(DiagramType::Timeline, &["a", "b"], &[("a", "b"), ("b", "a"), ("a", "a")]),
                &LayoutConfig::default(),
            )
            .expect("layout");
        let kinds: Vec<EdgeKind> = stage.value().edges.iter().map(|edge| edge.kind).collect();
        assert_eq!(kinds, vec![EdgeKind::Forward, EdgeKind::Back, EdgeKind::SelfLoop]);
    }
}
