//! Near-square comparison grid.
//!
//! Nodes fill rows in index order. Each column is as wide as its widest
//! member and each row as tall as its tallest; nodes are centered in their cell.

use narragraph_core::{analysis::DiagramType, geometry::Point};

use super::grid::columns;
use crate::{
    config::LayoutConfig,
    error::LayoutError,
    layout::{LayoutGraph, Placement, strategies::LayoutStrategy},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct MatrixStrategy;

impl LayoutStrategy for MatrixStrategy {
    fn name(&self) -> &str {
        "matrix"
    }

    fn supports(&self, diagram_type: DiagramType) -> bool {
        diagram_type == DiagramType::Matrix
    }

    fn generate(
        &self,
        graph: &LayoutGraph,
        config: &LayoutConfig,
    ) -> Result<Placement, LayoutError> {
        let cols = columns(graph.len());
        let rows = graph.len().div_ceil(cols);

        let mut col_widths = vec![0.0f32; cols];
        let mut row_heights = vec![0.0f32; rows];
        for (idx, node) in graph.nodes().iter().enumerate() {
            let (row, col) = (idx / cols, idx % cols);
            col_widths[col] = col_widths[col].max(node.size.width());
            row_heights[row] = row_heights[row].max(node.size.height());
        }

        let col_offsets = offsets(&col_widths, config.node_separation);
        let row_offsets = offsets(&row_heights, config.rank_separation);

        let positions = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(idx, node)| {
                let (row, col) = (idx / cols, idx % cols);
                Point::new(
                    col_offsets[col] + (col_widths[col] - node.size.width()) / 2.0,
                    row_offsets[row] + (row_heights[row] - node.size.height()) / 2.0,
                )
            })
            .collect();
        Ok(Placement::new(positions))
    }
}

/// Start of each track given track extents and the gap between tracks
fn offsets(extents: &[f32], gap: f32) -> Vec<f32> {
    let mut start = 0.0;
    extents
        .iter()
        .map(|extent| {
            let offset = start;
            start += extent + gap;
            offset
        })
        .collect()
}
