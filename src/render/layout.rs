//! Layered placement of table nodes and routing of row-to-row edges.
//!
//! Tables referenced by foreign keys sit on upper levels, tables that
//! reference them below. Nodes caught in reference cycles go to one extra
//! level at the bottom.

use super::measure::TextMetrics;
use crate::diagram::{Endpoint, Graph, Node};

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutNode {
    fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    /// Index into `Graph::edges`.
    pub edge_index: usize,
    /// Orthogonal path points (start, turns, end)
    pub waypoints: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub width: f64,
    pub height: f64,
}

pub struct LayoutEngine {
    pub(crate) metrics: TextMetrics,
    node_gap_x: f64,
    node_gap_y: f64,
    margin: f64,
    /// Horizontal offset of loops for edges between vertically stacked nodes.
    loop_offset: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
            node_gap_x: 100.0,
            node_gap_y: 80.0,
            margin: 40.0,
            loop_offset: 25.0,
        }
    }
}

impl LayoutEngine {
    pub fn layout(&self, graph: &Graph) -> Layout {
        let levels = assign_levels(graph);
        let nodes = self.place_nodes(graph, &levels);

        let edges: Vec<LayoutEdge> = graph
            .edges()
            .iter()
            .enumerate()
            .filter_map(|(edge_index, edge)| {
                let from = graph.nodes().iter().position(|n| n.id == edge.source.node)?;
                let to = graph.nodes().iter().position(|n| n.id == edge.target.node)?;
                let waypoints = self.route_edge(
                    (&graph.nodes()[from], &nodes[from], &edge.source),
                    (&graph.nodes()[to], &nodes[to], &edge.target),
                );
                Some(LayoutEdge {
                    edge_index,
                    waypoints,
                })
            })
            .collect();

        let max_x = nodes
            .iter()
            .map(|n| n.right() + self.loop_offset * 2.0)
            .fold(0.0, f64::max);
        let max_y = nodes.iter().map(|n| n.y + n.height).fold(0.0, f64::max);

        Layout {
            nodes,
            edges,
            width: max_x + self.margin,
            height: max_y + self.margin,
        }
    }

    /// One `LayoutNode` per graph node, in graph order.
    fn place_nodes(&self, graph: &Graph, levels: &[usize]) -> Vec<LayoutNode> {
        let mut placed: Vec<Option<LayoutNode>> = vec![None; graph.nodes().len()];
        let level_count = levels.iter().copied().max().map_or(0, |m| m + 1);
        let mut y = self.margin;

        for level in 0..level_count {
            let mut x = self.margin;
            let mut max_height: f64 = 0.0;

            for (idx, node) in graph.nodes().iter().enumerate() {
                if levels[idx] != level {
                    continue;
                }
                let (width, height) = self.node_size(node);
                placed[idx] = Some(LayoutNode {
                    id: node.id.clone(),
                    x,
                    y,
                    width,
                    height,
                });
                x += width + self.node_gap_x;
                max_height = max_height.max(height);
            }

            y += max_height + self.node_gap_y;
        }

        placed.into_iter().flatten().collect()
    }

    fn node_size(&self, node: &Node) -> (f64, f64) {
        let rows: Vec<(&str, &str)> = node
            .rows
            .iter()
            .map(|r| (r.name.as_str(), r.label.as_str()))
            .collect();
        self.metrics.node_size(node.title(), &rows)
    }

    /// Vertical anchor of an endpoint: its row, or the node's middle.
    fn anchor_y(&self, node: &Node, layout: &LayoutNode, endpoint: &Endpoint) -> f64 {
        endpoint
            .row
            .as_deref()
            .and_then(|row| node.row_index(row))
            .map_or(layout.y + layout.height / 2.0, |idx| {
                layout.y + self.metrics.row_center(idx)
            })
    }

    fn route_edge(
        &self,
        (from_node, from, from_end): (&Node, &LayoutNode, &Endpoint),
        (to_node, to, to_end): (&Node, &LayoutNode, &Endpoint),
    ) -> Vec<(f64, f64)> {
        let from_y = self.anchor_y(from_node, from, from_end);
        let to_y = self.anchor_y(to_node, to, to_end);

        if from.right() < to.x {
            // Target to the right: leave right side, enter left side
            let mid_x = (from.right() + to.x) / 2.0;
            vec![(from.right(), from_y), (mid_x, from_y), (mid_x, to_y), (to.x, to_y)]
        } else if to.right() < from.x {
            let mid_x = (to.right() + from.x) / 2.0;
            vec![(from.x, from_y), (mid_x, from_y), (mid_x, to_y), (to.right(), to_y)]
        } else {
            // Overlapping columns (stacked nodes or self reference): loop
            // around the right side
            let loop_x = from.right().max(to.right()) + self.loop_offset;
            vec![
                (from.right(), from_y),
                (loop_x, from_y),
                (loop_x, to_y),
                (to.right(), to_y),
            ]
        }
    }
}

/// Level per node index. Edge targets are parents of edge sources.
fn assign_levels(graph: &Graph) -> Vec<usize> {
    let nodes = graph.nodes();
    let index_of = |id: &str| nodes.iter().position(|n| n.id == id);

    let mut parents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in graph.edges() {
        let (Some(child), Some(parent)) = (index_of(&edge.source.node), index_of(&edge.target.node))
        else {
            continue;
        };
        if child != parent && !parents[child].contains(&parent) {
            parents[child].push(parent);
        }
    }

    let mut levels: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for idx in 0..nodes.len() {
            if levels[idx].is_some() {
                continue;
            }
            let parent_levels: Option<Vec<usize>> =
                parents[idx].iter().map(|p| levels[*p]).collect();
            if let Some(parent_levels) = parent_levels {
                levels[idx] = Some(parent_levels.iter().max().map_or(0, |m| m + 1));
                changed = true;
            }
        }
    }

    // Remaining nodes are part of, or depend on, a cycle
    let cycle_level = levels.iter().flatten().max().map_or(0, |m| m + 1);
    levels
        .into_iter()
        .map(|l| l.unwrap_or(cycle_level))
        .collect()
}
