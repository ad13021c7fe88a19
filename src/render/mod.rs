//! SVG rendering of a [`Graph`](crate::diagram::Graph).

mod layout;
mod measure;
mod svg;

pub use layout::{Layout, LayoutEdge, LayoutEngine, LayoutNode};
pub use measure::TextMetrics;
pub use svg::SvgRenderer;

use crate::diagram::Graph;

/// Lay out and render a graph with default metrics.
pub fn render_svg(graph: &Graph) -> String {
    let layout = LayoutEngine::default().layout(graph);
    SvgRenderer::default().render(graph, &layout)
}
