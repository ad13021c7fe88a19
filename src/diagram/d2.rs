//! Serializer for converting a [`Graph`] to D2 script text.

use super::{Endpoint, Graph, Node, Shape, key};

/// Serialize a graph to a D2 script.
pub fn format(graph: &Graph) -> String {
    let mut output = String::new();

    for (i, node) in graph.nodes().iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        format_node(&mut output, node);
    }

    if !graph.edges().is_empty() {
        output.push('\n');
        for edge in graph.edges() {
            output.push_str(&format!(
                "{} -> {}\n",
                endpoint(&edge.source),
                endpoint(&edge.target)
            ));
        }
    }

    output
}

fn format_node(output: &mut String, node: &Node) {
    let id = key(&node.id);
    if node.shape == Shape::Rectangle && node.label.is_none() && node.rows.is_empty() {
        output.push_str(&format!("{id}\n"));
        return;
    }

    output.push_str(&format!("{id}: {{\n"));
    if let Some(label) = &node.label {
        output.push_str(&format!("  label: {}\n", value(label)));
    }
    if node.shape != Shape::Rectangle {
        output.push_str(&format!("  shape: {}\n", node.shape.as_str()));
    }
    for row in &node.rows {
        output.push_str(&format!("  {}: {}\n", key(&row.name), value(&row.label)));
    }
    output.push_str("}\n");
}

fn endpoint(endpoint: &Endpoint) -> String {
    match &endpoint.row {
        Some(row) => format!("{}.{}", key(&endpoint.node), key(row)),
        None => key(&endpoint.node).into_owned(),
    }
}

/// Quote values D2 would otherwise read as syntax.
fn value(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text.trim() != text
        || text
            .chars()
            .any(|c| matches!(c, '{' | '}' | ';' | '#' | '"' | '\'' | '|' | '\n' | '$' | '[' | ']'));
    if needs_quotes {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        text.to_string()
    }
}
