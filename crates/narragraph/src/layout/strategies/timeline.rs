//! Single left-to-right row in topological order.

use narragraph_core::{analysis::DiagramType, geometry::Point};

use crate::{
    config::LayoutConfig,
    error::LayoutError,
    layout::{LayoutGraph, Placement, strategies::LayoutStrategy},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct TimelineStrategy;

impl LayoutStrategy for TimelineStrategy {
    fn name(&self) -> &str {
        "timeline"
    }

    fn supports(&self, diagram_type: DiagramType) -> bool {
        diagram_type == DiagramType::Timeline
    }

    fn generate(
        &self,
        graph: &LayoutGraph,
        config: &LayoutConfig,
    ) -> Result<Placement, LayoutError> {
        let row_height = graph
            .nodes()
            .iter()
            .map(|node| node.size.height())
            .fold(0.0, f32::max);

        let mut positions = vec![Point::default(); graph.len()];
        let mut x = 0.0;
        for idx in graph.topological_order() {
            let size = graph.nodes()[idx].size;
            positions[idx] = Point::new(x, (row_height - size.height()) / 2.0);
            x += size.width() + config.node_separation;
        }
        Ok(Placement::new(positions))
    }
}
