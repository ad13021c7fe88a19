//! Diagram engine interface and the schema-to-diagram synthesizer.
//!
//! The synthesizer only emits three kinds of [`Operation`]; any
//! [`DiagramEngine`] can consume them. [`Graph`] is the render-ready engine,
//! [`Recorder`] keeps the raw operation sequence.

pub mod d2;
mod graph;
mod synth;

pub use graph::{Edge, Endpoint, Graph, GraphError, Node, Row, Shape};
pub use synth::{
    TABLE_SHAPE, TargetColumn, format_label, resolve_target_column, synthesize, synthesize_with,
};

use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use thiserror::Error;

/// Keywords that address node attributes instead of rows.
pub(crate) const RESERVED_KEYS: &[&str] = &["shape", "label"];

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("{operation}: {source}")]
    Engine {
        operation: Operation,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("diagram synthesis cancelled")]
    Cancelled,
}

/// One graph mutation, as emitted by the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateNode { id: String },
    SetAttribute { path: String, value: String },
    CreateEdge { source: String, target: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateNode { id } => write!(f, "create node {id}"),
            Operation::SetAttribute { path, value } => write!(f, "set {path} = {value:?}"),
            Operation::CreateEdge { source, target } => {
                write!(f, "create edge {source} -> {target}")
            }
        }
    }
}

/// Mutable graph handle fed by the synthesizer.
pub trait DiagramEngine {
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_node(&mut self, id: &str) -> Result<(), Self::Error>;

    fn set_attribute(&mut self, path: &str, value: &str) -> Result<(), Self::Error>;

    fn create_edge(&mut self, source: &str, target: &str) -> Result<(), Self::Error>;

    fn apply(&mut self, op: &Operation) -> Result<(), Self::Error> {
        match op {
            Operation::CreateNode { id } => self.create_node(id),
            Operation::SetAttribute { path, value } => self.set_attribute(path, value),
            Operation::CreateEdge { source, target } => self.create_edge(source, target),
        }
    }
}

impl<E: DiagramEngine + ?Sized> DiagramEngine for &mut E {
    type Error = E::Error;

    fn create_node(&mut self, id: &str) -> Result<(), Self::Error> {
        (**self).create_node(id)
    }

    fn set_attribute(&mut self, path: &str, value: &str) -> Result<(), Self::Error> {
        (**self).set_attribute(path, value)
    }

    fn create_edge(&mut self, source: &str, target: &str) -> Result<(), Self::Error> {
        (**self).create_edge(source, target)
    }
}

/// Engine that only records the operations it receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recorder {
    pub operations: Vec<Operation>,
}

impl DiagramEngine for Recorder {
    type Error = Infallible;

    fn create_node(&mut self, id: &str) -> Result<(), Self::Error> {
        self.operations.push(Operation::CreateNode { id: id.to_string() });
        Ok(())
    }

    fn set_attribute(&mut self, path: &str, value: &str) -> Result<(), Self::Error> {
        self.operations.push(Operation::SetAttribute {
            path: path.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn create_edge(&mut self, source: &str, target: &str) -> Result<(), Self::Error> {
        self.operations.push(Operation::CreateEdge {
            source: source.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }
}

/// Quote a key segment unless it is a plain identifier.
///
/// Reserved keywords are quoted too, so a column named `shape` stays a row.
pub fn key(segment: &str) -> Cow<'_, str> {
    let plain = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        && !RESERVED_KEYS.contains(&segment);

    if plain {
        Cow::Borrowed(segment)
    } else {
        let escaped = segment.replace('\\', "\\\\").replace('"', "\\\"");
        Cow::Owned(format!("\"{escaped}\""))
    }
}

/// `node.child` path with both segments quoted as needed.
pub fn child_path(node: &str, child: &str) -> String {
    format!("{}.{}", key(node), key(child))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_keys_unquoted() {
        assert_eq!(key("users"), "users");
        assert_eq!(key("user_id"), "user_id");
        assert_eq!(key("ユーザー"), "ユーザー");
    }

    #[test]
    fn test_special_keys_quoted() {
        assert_eq!(key("my.table"), "\"my.table\"");
        assert_eq!(key("User Table"), "\"User Table\"");
        assert_eq!(key("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(key("shape"), "\"shape\"");
        assert_eq!(key(""), "\"\"");
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("posts", "user_id"), "posts.user_id");
        assert_eq!(child_path("a.b", "c"), "\"a.b\".c");
    }

    fn drive<E: DiagramEngine>(mut engine: E) -> Result<(), E::Error> {
        engine.create_node("users")?;
        engine.apply(&Operation::CreateEdge {
            source: "a.b".into(),
            target: "c.d".into(),
        })
    }

    #[test]
    fn test_recorder_through_mut_ref() {
        let mut recorder = Recorder::default();
        drive(&mut recorder).unwrap();

        assert_eq!(
            recorder.operations,
            vec![
                Operation::CreateNode { id: "users".into() },
                Operation::CreateEdge {
                    source: "a.b".into(),
                    target: "c.d".into()
                },
            ]
        );
    }

    #[test]
    fn test_operation_display() {
        let op = Operation::SetAttribute {
            path: "users.shape".into(),
            value: "sql_table".into(),
        };
        assert_eq!(op.to_string(), "set users.shape = \"sql_table\"");
    }
}
