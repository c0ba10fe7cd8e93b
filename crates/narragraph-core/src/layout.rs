//! Positioned scene graphs.
//!
//! [`LayoutData`] is the only contract between the layout engine and the
//! external renderer. Every layout must satisfy the zero-overlap invariant:
//! no two node rectangles may intersect. [`LayoutData::find_overlap`] checks it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point, Size};

/// Role of a node within its graph, derived from its degree
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Has outgoing edges but no incoming edges
    Start,
    /// Default role
    #[default]
    Process,
    /// Branches into two or more targets
    Decision,
    /// Has incoming edges but no outgoing edges
    End,
}

impl NodeKind {
    /// Classify a node from its in- and out-degree
    pub fn from_degree(incoming: usize, outgoing: usize) -> Self {
        match (incoming, outgoing) {
            (_, out) if out >= 2 => Self::Decision,
            (0, out) if out > 0 => Self::Start,
            (inc, 0) if inc > 0 => Self::End,
            _ => Self::Process,
        }
    }
}

/// Direction of an edge relative to the layout's primary axis
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Forward,
    Back,
    SelfLoop,
}

/// A node with its box, top-left anchored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

impl PositionedNode {
    pub fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(Point::new(self.x, self.y), Size::new(self.width, self.height))
    }

    fn is_finite(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|value| value.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// An edge with optional routing control points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
}

/// Canvas extent including the margins around the content
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBounds {
    pub width: f32,
    pub height: f32,
    pub margin_x: f32,
    pub margin_y: f32,
}

/// A complete positioned scene graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutData {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<PositionedEdge>,
    pub bounds: LayoutBounds,
}

impl LayoutData {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Union of all node rectangles, or `None` for an empty layout
    pub fn content_bounds(&self) -> Option<Bounds> {
        self.nodes
            .iter()
            .map(PositionedNode::bounds)
            .reduce(|acc, bounds| acc.merge(&bounds))
    }

    /// Returns the ids of the first pair of nodes whose rectangles intersect.
    ///
    /// The scan is quadratic; layouts hold at most a few dozen nodes.
    pub fn find_overlap(&self) -> Option<(&str, &str)> {
        for (i, a) in self.nodes.iter().enumerate() {
            let a_bounds = a.bounds();
            for b in &self.nodes[i + 1..] {
                if a_bounds.intersects(&b.bounds()) {
                    return Some((a.id.as_str(), b.id.as_str()));
                }
            }
        }
        None
    }

    /// Moves every node and control point by the given offset
    pub fn translate(&mut self, dx: f32, dy: f32) {
        let offset = Point::new(dx, dy);
        for node in &mut self.nodes {
            node.x += dx;
            node.y += dy;
        }
        for edge in &mut self.edges {
            if let Some(points) = edge.points.as_mut() {
                for point in points.iter_mut() {
                    *point = point.add_point(offset);
                }
            }
        }
    }

    /// Checks every structural invariant a renderer relies on.
    ///
    /// A well-formed layout has finite geometry, unique node ids, edges that
    /// resolve to existing nodes, and no overlapping node rectangles.
    pub fn is_well_formed(&self) -> bool {
        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !node.is_finite() || !ids.insert(node.id.as_str()) {
                return false;
            }
        }

        let edges_resolve = self.edges.iter().all(|edge| {
            ids.contains(edge.source.as_str())
                && ids.contains(edge.target.as_str())
                && edge
                    .points
                    .as_ref()
                    .is_none_or(|points| points.iter().all(|p| p.is_finite()))
        });

        edges_resolve
            && self.bounds.width.is_finite()
            && self.bounds.height.is_finite()
            && self.find_overlap().is_none()
    }
}
