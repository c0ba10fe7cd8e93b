//! Uniform grid used when a strategy fails.
//!
//! Every cell is as large as the largest node, so the placement depends only
//! on node indices and sizes and can never overlap.

use narragraph_core::geometry::Point;

use crate::{
    config::LayoutConfig,
    layout::{LayoutGraph, Placement},
};

/// Columns of a near-square grid holding `count` items
pub(crate) fn columns(count: usize) -> usize {
    ((count as f64).sqrt().ceil() as usize).max(1)
}

pub(crate) fn place(graph: &LayoutGraph, config: &LayoutConfig) -> Placement {
    let cols = columns(graph.len());
    let cell_width = graph
        .nodes()
        .iter()
        .map(|node| node.size.width())
        .fold(0.0, f32::max)
        + config.node_separation;
    let cell_height = graph
        .nodes()
        .iter()
        .map(|node| node.size.height())
        .fold(0.0, f32::max)
        + config.rank_separation;

    let positions = (0..graph.len())
        .map(|idx| {
            let col = idx % cols;
            let row = idx / cols;
            Point::new(col as f32 * cell_width, row as f32 * cell_height)
        })
        .collect();
    Placement::new(positions)
}
