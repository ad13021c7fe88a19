use super::layout::{Layout, LayoutEdge, LayoutNode};
use super::measure::TextMetrics;
use crate::diagram::{Graph, Node, Shape};
use std::fmt::{self, Write};

#[derive(Default)]
pub struct SvgRenderer {
    metrics: TextMetrics,
}

impl SvgRenderer {
    pub fn render(&self, graph: &Graph, layout: &Layout) -> String {
        let mut svg = String::new();
        // Writing into a String never fails
        let _ = self.write_svg(&mut svg, graph, layout);
        svg
    }

    fn write_svg(&self, svg: &mut String, graph: &Graph, layout: &Layout) -> fmt::Result {
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            layout.width, layout.height, layout.width, layout.height
        )?;

        writeln!(
            svg,
            r##"<style>
  .table-bg {{ fill: #fff; }}
  .table-header {{ fill: #e0e0e0; }}
  .table-border {{ fill: none; stroke: #333; stroke-width: 1.5; }}
  .table-name {{ font-family: monospace; font-size: 14px; font-weight: bold; }}
  .row-name {{ font-family: monospace; font-size: 12px; }}
  .row-label {{ font-family: monospace; font-size: 12px; fill: #555; }}
  .edge {{ stroke: #666; stroke-width: 1.5; fill: none; }}
</style>
<defs>
  <marker id="arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse">
    <path d="M 0 0 L 10 5 L 0 10 z" fill="#666" />
  </marker>
</defs>"##
        )?;

        // Edges first, behind nodes
        for edge in &layout.edges {
            self.render_edge(svg, edge)?;
        }

        for (node, placed) in graph.nodes().iter().zip(&layout.nodes) {
            self.render_node(svg, placed, node)?;
        }

        writeln!(svg, "</svg>")
    }

    fn render_node(&self, svg: &mut String, layout: &LayoutNode, node: &Node) -> fmt::Result {
        let x = layout.x;
        let y = layout.y;
        let w = layout.width;
        let header_h = self.metrics.header_height();

        writeln!(
            svg,
            r#"<rect class="table-bg" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, layout.height
        )?;

        let header_fill_h = if node.rows.is_empty() {
            layout.height
        } else {
            header_h
        };
        writeln!(
            svg,
            r#"<rect class="table-header" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, header_fill_h
        )?;

        writeln!(
            svg,
            r#"<text class="table-name" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            x + w / 2.0,
            y + header_h / 2.0 + 5.0,
            escape_xml(node.title())
        )?;

        if node.rows.is_empty() {
            return self.render_border(svg, layout, node.shape);
        }

        // Square off the header's bottom corners
        writeln!(
            svg,
            r#"<rect class="table-header" x="{}" y="{}" width="{}" height="4" />"#,
            x,
            y + header_h - 4.0,
            w
        )?;
        writeln!(
            svg,
            r##"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="#333" stroke-width="1" />"##,
            x,
            y + header_h,
            x + w,
            y + header_h
        )?;

        for (idx, row) in node.rows.iter().enumerate() {
            let text_y = y + self.metrics.row_center(idx) + 4.0;
            writeln!(
                svg,
                r#"<text class="row-name" x="{}" y="{}">{}</text>"#,
                x + self.metrics.padding_x,
                text_y,
                escape_xml(&row.name)
            )?;
            if !row.label.is_empty() {
                writeln!(
                    svg,
                    r#"<text class="row-label" x="{}" y="{}" text-anchor="end">{}</text>"#,
                    x + w - self.metrics.padding_x,
                    text_y,
                    escape_xml(&row.label)
                )?;
            }
        }

        self.render_border(svg, layout, node.shape)
    }

    fn render_border(&self, svg: &mut String, layout: &LayoutNode, shape: Shape) -> fmt::Result {
        let rx = match shape {
            Shape::SqlTable => 4,
            Shape::Rectangle => 0,
        };
        writeln!(
            svg,
            r#"<rect class="table-border" x="{}" y="{}" width="{}" height="{}" rx="{}" />"#,
            layout.x, layout.y, layout.width, layout.height, rx
        )
    }

    fn render_edge(&self, svg: &mut String, edge: &LayoutEdge) -> fmt::Result {
        let points: Vec<String> = edge
            .waypoints
            .iter()
            .map(|(x, y)| format!("{x},{y}"))
            .collect();
        writeln!(
            svg,
            r#"<polyline class="edge" points="{}" marker-end="url(#arrow)" />"#,
            points.join(" ")
        )
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
