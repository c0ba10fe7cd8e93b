//! Layered layout for flows and trees.
//!
//! Rank assignment and crossing minimization come from `rust-sugiyama`. Its
//! coordinates are only used to read off each node's layer and its order
//! within the layer; the boxes are then packed here so real node sizes are
//! respected:
//!
//! - ranks are stacked top to bottom, `rank_separation` apart
//! - nodes of a rank are packed left to right, `node_separation` apart, and
//!   the rank is centered on the widest one
//! - nodes without edges join the first rank after the connected ones
//!
//! Edges are routed from the bottom of the source to the top of the target,
//! with a bend in every rank gap a long edge crosses. Edges pointing back up
//! are routed around the right side of the drawing.

use std::{
    collections::{BTreeSet, HashMap},
    panic,
};

use log::{debug, trace};
use rust_sugiyama::configure::Config;

use narragraph_core::{analysis::DiagramType, geometry::Point};

use super::panic_message;
use crate::{
    config::LayoutConfig,
    error::LayoutError,
    layout::{LayoutGraph, Placement, strategies::LayoutStrategy},
};

const NAME: &str = "hierarchical";

/// Layer coordinates are compared at this resolution
const LEVEL_RESOLUTION: f64 = 1000.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct HierarchicalStrategy;

/// Where the algorithm put a node
#[derive(Debug, Clone, Copy)]
struct Slot {
    component: usize,
    level: i64,
    x: f64,
}

/// Rank geometry after packing
struct Packed {
    positions: Vec<Point>,
    rank_of: Vec<usize>,
    rank_tops: Vec<f32>,
    rank_heights: Vec<f32>,
}

impl HierarchicalStrategy {
    /// Node indices per rank, each rank in drawing order
    fn ranks(&self, graph: &LayoutGraph) -> Result<Vec<Vec<usize>>, LayoutError> {
        let mut edges: Vec<(usize, usize)> = graph
            .edges()
            .iter()
            .filter(|edge| !edge.is_self_loop())
            .map(|edge| (edge.source, edge.target))
            .collect();
        edges.sort_unstable();
        edges.dedup();

        if edges.is_empty() {
            return Ok(vec![(0..graph.len()).collect()]);
        }

        // Only nodes with edges are handed to the algorithm, under dense ids.
        let mut vertex_of: Vec<Option<u32>> = vec![None; graph.len()];
        let mut node_of: Vec<usize> = Vec::new();
        let mut vertex = |idx: usize| {
            *vertex_of[idx].get_or_insert_with(|| {
                node_of.push(idx);
                (node_of.len() - 1) as u32
            })
        };
        let algorithm_edges: Vec<(u32, u32)> = edges
            .iter()
            .map(|&(source, target)| (vertex(source), vertex(target)))
            .collect();

        debug!(nodes = node_of.len(), edges = algorithm_edges.len(); "Running Sugiyama layering");

        let components = panic::catch_unwind(move || {
            let config = Config {
                minimum_length: 1,
                vertex_spacing: 2.0,
                ..Default::default()
            };
            rust_sugiyama::from_edges(&algorithm_edges, &config)
        })
        .map_err(|payload| {
            LayoutError::strategy(NAME, format!("rust-sugiyama panicked: {}", panic_message(payload)))
        })?;

        if components.is_empty() {
            return Err(LayoutError::strategy(NAME, "rust-sugiyama returned no components"));
        }

        let mut slots: Vec<Option<Slot>> = vec![None; graph.len()];
        for (component, (coords, _, _)) in components.iter().enumerate() {
            for &(vertex, (x, y)) in coords {
                match node_of.get(vertex) {
                    Some(&idx) => {
                        slots[idx] = Some(Slot {
                            component,
                            level: (y * LEVEL_RESOLUTION).round() as i64,
                            x,
                        })
                    }
                    None => trace!(vertex; "Ignoring unknown vertex from rust-sugiyama"),
                }
            }
        }

        let mut rank_of = level_ranks(&slots, components.len());

        // The algorithm does not promise which way is down.
        let (down, up) = edges.iter().fold((0, 0), |(down, up), &(s, t)| {
            match (rank_of[s], rank_of[t]) {
                (Some(rs), Some(rt)) if rs < rt => (down + 1, up),
                (Some(rs), Some(rt)) if rs > rt => (down, up + 1),
                _ => (down, up),
            }
        });
        if up > down {
            flip_ranks(&slots, &mut rank_of, components.len());
        }

        let rank_count = rank_of.iter().flatten().max().map_or(1, |max| max + 1);
        let mut ranks: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for (idx, rank) in rank_of.iter().enumerate() {
            if let Some(rank) = rank {
                ranks[*rank].push(idx);
            }
        }
        for rank in &mut ranks {
            rank.sort_by(|&a, &b| {
                let (sa, sb) = (slots[a], slots[b]);
                match (sa, sb) {
                    (Some(sa), Some(sb)) => sa
                        .component
                        .cmp(&sb.component)
                        .then(sa.x.total_cmp(&sb.x))
                        .then(a.cmp(&b)),
                    _ => a.cmp(&b),
                }
            });
        }
        // Isolated nodes (and nodes with only self-loops) go last in the first rank.
        ranks[0].extend((0..graph.len()).filter(|&idx| rank_of[idx].is_none()));

        Ok(ranks)
    }

    fn pack(graph: &LayoutGraph, ranks: &[Vec<usize>], config: &LayoutConfig) -> Packed {
        let mut positions = vec![Point::default(); graph.len()];
        let mut rank_of = vec![0; graph.len()];

        let row_widths: Vec<f32> = ranks
            .iter()
            .map(|members| {
                let widths: f32 = members.iter().map(|&idx| graph.nodes()[idx].size.width()).sum();
                widths + members.len().saturating_sub(1) as f32 * config.node_separation
            })
            .collect();
        let widest = row_widths.iter().copied().fold(0.0, f32::max);

        let rank_heights: Vec<f32> = ranks
            .iter()
            .map(|members| {
                members
                    .iter()
                    .map(|&idx| graph.nodes()[idx].size.height())
                    .fold(0.0, f32::max)
            })
            .collect();

        let mut rank_tops = Vec::with_capacity(ranks.len());
        let mut y = 0.0;
        for (rank, members) in ranks.iter().enumerate() {
            rank_tops.push(y);
            let mut x = (widest - row_widths[rank]) / 2.0;
            for &idx in members {
                let size = graph.nodes()[idx].size;
                positions[idx] = Point::new(x, y + (rank_heights[rank] - size.height()) / 2.0);
                rank_of[idx] = rank;
                x += size.width() + config.node_separation;
            }
            y += rank_heights[rank] + config.rank_separation;
        }

        Packed {
            positions,
            rank_of,
            rank_tops,
            rank_heights,
        }
    }

    fn routes(graph: &LayoutGraph, packed: &Packed, config: &LayoutConfig) -> Vec<Option<Vec<Point>>> {
        let nodes = graph.nodes();
        let right_lane = nodes
            .iter()
            .zip(&packed.positions)
            .map(|(node, pos)| pos.x() + node.size.width())
            .fold(0.0, f32::max)
            + config.node_separation / 2.0;

        let center_x = |idx: usize| packed.positions[idx].x() + nodes[idx].size.width() / 2.0;
        let center_y = |idx: usize| packed.positions[idx].y() + nodes[idx].size.height() / 2.0;
        let top = |idx: usize| packed.positions[idx].y();
        let bottom = |idx: usize| packed.positions[idx].y() + nodes[idx].size.height();
        let left = |idx: usize| packed.positions[idx].x();
        let right = |idx: usize| packed.positions[idx].x() + nodes[idx].size.width();

        graph
            .edges()
            .iter()
            .map(|edge| {
                let (s, t) = (edge.source, edge.target);
                if edge.is_self_loop() {
                    return None;
                }
                let (rs, rt) = (packed.rank_of[s], packed.rank_of[t]);

                let points = if rs < rt {
                    let (sx, tx) = (center_x(s), center_x(t));
                    let span = (rt - rs) as f32;
                    let mut points = vec![Point::new(sx, bottom(s))];
                    if rt - rs > 1 {
                        for rank in rs..rt {
                            let gap_mid = packed.rank_tops[rank]
                                + packed.rank_heights[rank]
                                + config.rank_separation / 2.0;
                            let progress = (rank - rs) as f32 + 0.5;
                            points.push(Point::new(sx + (tx - sx) * progress / span, gap_mid));
                        }
                    }
                    points.push(Point::new(tx, top(t)));
                    points
                } else if rs == rt {
                    if left(s) < left(t) {
                        vec![Point::new(right(s), center_y(s)), Point::new(left(t), center_y(t))]
                    } else {
                        vec![Point::new(left(s), center_y(s)), Point::new(right(t), center_y(t))]
                    }
                } else {
                    vec![
                        Point::new(right(s), center_y(s)),
                        Point::new(right_lane, center_y(s)),
                        Point::new(right_lane, center_y(t)),
                        Point::new(right(t), center_y(t)),
                    ]
                };
                Some(points)
            })
            .collect()
    }
}

/// Rank per node from its component's distinct layer coordinates, ascending
fn level_ranks(slots: &[Option<Slot>], components: usize) -> Vec<Option<usize>> {
    let mut levels: Vec<BTreeSet<i64>> = vec![BTreeSet::new(); components];
    for slot in slots.iter().flatten() {
        levels[slot.component].insert(slot.level);
    }
    let index: Vec<HashMap<i64, usize>> = levels
        .iter()
        .map(|set| set.iter().enumerate().map(|(rank, &level)| (level, rank)).collect())
        .collect();

    slots
        .iter()
        .map(|slot| slot.and_then(|slot| index[slot.component].get(&slot.level).copied()))
        .collect()
}

/// Mirror every component's ranks so its last rank becomes its first
fn flip_ranks(slots: &[Option<Slot>], rank_of: &mut [Option<usize>], components: usize) {
    let mut deepest = vec![0; components];
    for (slot, rank) in slots.iter().zip(rank_of.iter()) {
        if let (Some(slot), Some(rank)) = (slot, rank) {
            deepest[slot.component] = deepest[slot.component].max(*rank);
        }
    }
    for (slot, rank) in slots.iter().zip(rank_of.iter_mut()) {
        if let (Some(slot), Some(rank)) = (slot, rank.as_mut()) {
            *rank = deepest[slot.component] - *rank;
        }
    }
}

impl LayoutStrategy for HierarchicalStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn supports(&self, diagram_type: DiagramType) -> bool {
        matches!(diagram_type, DiagramType::Flow | DiagramType::Tree)
    }

    fn generate(
        &self,
        graph: &LayoutGraph,
        config: &LayoutConfig,
    ) -> Result<Placement, LayoutError> {
        let ranks = self.ranks(graph)?;
        let packed = Self::pack(graph, &ranks, config);
        let routes = Self::routes(graph, &packed, config);
        debug!(ranks = ranks.len(), nodes = graph.len(); "Packed hierarchical layout");
        Ok(Placement::new(packed.positions).with_routes(routes))
    }
}
