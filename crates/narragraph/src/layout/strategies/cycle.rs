//! Nodes evenly spaced on a circle, clockwise from the top.
//!
//! On a circle the closest pair of points are neighbours, so the radius is
//! chosen for the neighbour chord to exceed the largest box diagonal plus
//! `node_separation`. Boxes within that distance of each other's centers
//! cannot touch.

use std::f32::consts::{PI, TAU};

use narragraph_core::{analysis::DiagramType, geometry::Point};

use crate::{
    config::LayoutConfig,
    error::LayoutError,
    layout::{LayoutGraph, Placement, strategies::LayoutStrategy},
};

/// Slack added to the neighbour chord against rounding
const CHORD_SLACK: f32 = 1.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStrategy;

impl CycleStrategy {
    fn radius(count: usize, max_diagonal: f32, separation: f32) -> f32 {
        if count < 2 {
            return 0.0;
        }
        let chord = max_diagonal + separation + CHORD_SLACK;
        chord / (2.0 * (PI / count as f32).sin())
    }
}

impl LayoutStrategy for CycleStrategy {
    fn name(&self) -> &str {
        "cycle"
    }

    fn supports(&self, diagram_type: DiagramType) -> bool {
        diagram_type == DiagramType::Cycle
    }

    fn generate(
        &self,
        graph: &LayoutGraph,
        config: &LayoutConfig,
    ) -> Result<Placement, LayoutError> {
        let count = graph.len();
        let max_diagonal = graph
            .nodes()
            .iter()
            .map(|node| node.size.width().hypot(node.size.height()))
            .fold(0.0, f32::max);
        let radius = Self::radius(count, max_diagonal, config.node_separation);
        if !radius.is_finite() {
            return Err(LayoutError::strategy(self.name(), "radius is not finite"));
        }

        let step = TAU / count.max(1) as f32;
        let positions = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(idx, node)| {
                let angle = idx as f32 * step - PI / 2.0;
                let center_x = radius * angle.cos();
                let center_y = radius * angle.sin();
                Point::new(
                    center_x - node.size.width() / 2.0,
                    center_y - node.size.height() / 2.0,
                )
            })
            .collect();
        Ok(Placement::new(positions))
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use narragraph_core::geometry::Size;

    use super::*;
    use crate::layout::GraphNode;

    fn graph(count: usize) -> LayoutGraph {
        let nodes = (0..count)
            .map(|idx| GraphNode {
                id: format!("n{idx}"),
                label: String::new(),
                size: Size::new(120.0 + idx as f32 * 10.0, 40.0),
            })
            .collect();
        LayoutGraph::new(DiagramType::Cycle, nodes, Vec::new())
    }

    #[test]
    fn test_single_node_sits_at_origin() {
        let placement = CycleStrategy
            .generate(&graph(1), &LayoutConfig::default())
            .expect("cycle");
        assert_eq!(placement.positions, vec![Point::new(-60.0, -20.0)]);
    }

    #[test]
    fn test_two_nodes_are_one_chord_apart() {
        let radius = CycleStrategy::radius(2, 50.0, 10.0);
        assert!(approx_eq!(f32, 2.0 * radius, 61.0, epsilon = 1e-3));
    }

    #[test]
    fn test_no_overlap_for_many_nodes() {
        for count in 2..16 {
            let graph = graph(count);
            let placement = CycleStrategy
                .generate(&graph, &LayoutConfig::default())
                .expect("cycle");
            for i in 0..count {
                for j in i + 1..count {
                    let (a, b) = (placement.positions[i], placement.positions[j]);
                    let (sa, sb) = (graph.nodes()[i].size, graph.nodes()[j].size);
                    let apart = a.x() + sa.width() <= b.x()
                        || b.x() + sb.width() <= a.x()
                        || a.y() + sa.height() <= b.y()
                        || b.y() + sb.height() <= a.y();
                    assert!(apart, "nodes {i} and {j} overlap with {count} nodes");
                }
            }
        }
    }
}
