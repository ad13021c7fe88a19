//! SQL DDL to entity-relationship diagrams.
//!
//! The pipeline is `sql::parse` → `schema::build_schema` →
//! `diagram::synthesize` into a [`Graph`](diagram::Graph), which is then
//! rendered as SVG or serialized as D2.

pub mod cancel;
pub mod diagram;
pub mod model;
pub mod render;
pub mod schema;
pub mod sql;

use cancel::CancelToken;
use diagram::{DiagramError, Graph};
use schema::SchemaError;
use sql::ParseError;
use thiserror::Error;
use tracing::info;
use wasm_bindgen::prelude::*;

#[derive(Debug, Error)]
pub enum Error {
    #[error("schema was not provided, input is empty")]
    EmptyInput,
    #[error("parse SQL statement: {0}")]
    Parse(#[from] ParseError),
    #[error("ast tree to schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("transform graph: {0}")]
    Diagram(#[from] DiagramError),
}

/// Run the pipeline up to the in-memory graph.
pub fn build_graph(source: &str, cancel: &CancelToken) -> Result<Graph, Error> {
    let source = source.trim();
    if source.is_empty() {
        return Err(Error::EmptyInput);
    }

    let tree = sql::parse(source)?;
    info!(statements = tree.stmts.len(), "parsed SQL");

    let schema = schema::build_schema_with(&tree, cancel)?;
    info!(tables = schema.tables.len(), "built schema");

    let mut graph = Graph::new();
    diagram::synthesize_with(&schema, &mut graph, cancel)?;
    info!(
        nodes = graph.nodes().len(),
        edges = graph.edges().len(),
        "synthesized diagram"
    );

    Ok(graph)
}

/// Convert DDL to an SVG document.
pub fn generate_svg(source: &str) -> Result<String, Error> {
    let graph = build_graph(source, &CancelToken::new())?;
    Ok(render::render_svg(&graph))
}

/// Convert DDL to D2 script text.
pub fn generate_d2(source: &str) -> Result<String, Error> {
    let graph = build_graph(source, &CancelToken::new())?;
    Ok(diagram::d2::format(&graph))
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Render SQL DDL to SVG
#[wasm_bindgen(js_name = "sqlToSvg")]
pub fn sql_to_svg(source: &str) -> Result<String, String> {
    generate_svg(source).map_err(|e| e.to_string())
}

/// Convert SQL DDL to D2 source
#[wasm_bindgen(js_name = "sqlToD2")]
pub fn sql_to_d2(source: &str) -> Result<String, String> {
    generate_d2(source).map_err(|e| e.to_string())
}
