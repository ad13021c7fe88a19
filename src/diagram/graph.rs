use super::{DiagramEngine, RESERVED_KEYS};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("node {0:?} does not exist")]
    UnknownNode(String),
    #[error("unsupported shape {0:?}")]
    UnsupportedShape(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Rectangle,
    SqlTable,
}

impl Shape {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rectangle" => Some(Self::Rectangle),
            "sql_table" => Some(Self::SqlTable),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::SqlTable => "sql_table",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: Option<String>,
    pub shape: Shape,
    pub rows: Vec<Row>,
}

impl Node {
    fn new(id: String) -> Self {
        Self {
            id,
            label: None,
            shape: Shape::default(),
            rows: Vec::new(),
        }
    }

    /// Header text: the explicit label, or the id.
    pub fn title(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn row(&self, name: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.name == name)
    }

    pub fn row_index(&self, name: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.name == name)
    }

    fn ensure_row(&mut self, name: &str) -> &mut Row {
        let idx = match self.row_index(name) {
            Some(idx) => idx,
            None => {
                self.rows.push(Row {
                    name: name.to_string(),
                    label: String::new(),
                });
                self.rows.len() - 1
            }
        };
        &mut self.rows[idx]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub node: String,
    pub row: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: Endpoint,
    pub target: Endpoint,
}

/// Render-ready diagram: nodes with rows, and directed edges between them.
///
/// Paths are `node` or `node.row`; a segment wrapped in double quotes is taken
/// literally and never treated as a keyword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn ensure_node(&mut self, id: &str) -> &mut Node {
        let idx = match self.nodes.iter().position(|n| n.id == id) {
            Some(idx) => idx,
            None => {
                self.nodes.push(Node::new(id.to_string()));
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[idx]
    }

    fn endpoint(&mut self, path: &str) -> Result<Endpoint, GraphError> {
        let mut segments = split_path(path)?.into_iter();
        let (Some(node), row, None) = (segments.next(), segments.next(), segments.next()) else {
            return Err(invalid(path, "edge endpoints must be node or node.row"));
        };
        if let Some(row) = &row {
            if row.is_keyword() {
                return Err(invalid(path, "edge endpoint cannot be an attribute"));
            }
        }

        let node_ref = self.ensure_node(&node.text);
        if let Some(row) = &row {
            node_ref.ensure_row(&row.text);
        }

        Ok(Endpoint {
            node: node.text,
            row: row.map(|r| r.text),
        })
    }
}

impl DiagramEngine for Graph {
    type Error = GraphError;

    /// Creating a node that already exists is a no-op.
    fn create_node(&mut self, id: &str) -> Result<(), GraphError> {
        let segments = split_path(id)?;
        let [segment] = segments.as_slice() else {
            return Err(invalid(id, "node id must be a single segment"));
        };
        self.ensure_node(&segment.text);
        Ok(())
    }

    fn set_attribute(&mut self, path: &str, value: &str) -> Result<(), GraphError> {
        let segments = split_path(path)?;
        match segments.as_slice() {
            [node] => {
                let node = self
                    .node_mut(&node.text)
                    .ok_or_else(|| GraphError::UnknownNode(node.text.clone()))?;
                node.label = Some(value.to_string());
            }
            [node, child] => {
                let node = self
                    .node_mut(&node.text)
                    .ok_or_else(|| GraphError::UnknownNode(node.text.clone()))?;
                match (child.quoted, child.text.as_str()) {
                    (false, "shape") => {
                        node.shape = Shape::from_str(value)
                            .ok_or_else(|| GraphError::UnsupportedShape(value.to_string()))?;
                    }
                    (false, "label") => node.label = Some(value.to_string()),
                    _ => node.ensure_row(&child.text).label = value.to_string(),
                }
            }
            _ => return Err(invalid(path, "nested paths are not supported")),
        }
        Ok(())
    }

    /// Missing endpoints are created implicitly.
    fn create_edge(&mut self, source: &str, target: &str) -> Result<(), GraphError> {
        let source = self.endpoint(source)?;
        let target = self.endpoint(target)?;
        self.edges.push(Edge { source, target });
        Ok(())
    }
}

struct Segment {
    text: String,
    quoted: bool,
}

impl Segment {
    fn is_keyword(&self) -> bool {
        !self.quoted && RESERVED_KEYS.contains(&self.text.as_str())
    }
}

fn invalid(path: &str, reason: &'static str) -> GraphError {
    GraphError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

fn split_path(path: &str) -> Result<Vec<Segment>, GraphError> {
    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();

    loop {
        let mut text = String::new();
        let quoted = chars.peek() == Some(&'"');

        if quoted {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(c) => text.push(c),
                        None => return Err(invalid(path, "unterminated quote")),
                    },
                    Some(c) => text.push(c),
                    None => return Err(invalid(path, "unterminated quote")),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                if c == '"' {
                    return Err(invalid(path, "quote inside unquoted segment"));
                }
                text.push(c);
                chars.next();
            }
        }

        if text.is_empty() {
            return Err(invalid(path, "empty segment"));
        }
        segments.push(Segment { text, quoted });

        match chars.next() {
            None => return Ok(segments),
            Some('.') => {}
            Some(_) => return Err(invalid(path, "expected '.' after quoted segment")),
        }
    }
}
