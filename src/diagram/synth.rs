//! Schema model to diagram operations.

use super::{DiagramEngine, DiagramError, Operation, child_path, key};
use crate::cancel::CancelToken;
use crate::model::{Column, ForeignReference, Schema};
use tracing::debug;

/// Shape tag that renders a node as a table with one row per column.
pub const TABLE_SHAPE: &str = "sql_table";

/// Display target of a foreign key edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetColumn<'a> {
    /// The referenced column exists.
    Found(&'a str),
    /// No column named; the target table's primary key column.
    PrimaryKey(&'a str),
    /// Unresolved; the raw name from the reference.
    Raw(&'a str),
    /// No column named and no primary key; the edge points at the table.
    Table,
}

/// Emit one table node per table, one row per column and one edge per
/// foreign key reference, in schema order.
pub fn synthesize<E: DiagramEngine>(schema: &Schema, engine: E) -> Result<(), DiagramError> {
    synthesize_with(schema, engine, &CancelToken::new())
}

/// Like [`synthesize`], checking `cancel` before each table.
///
/// Operations already applied are left in place when a later one fails.
pub fn synthesize_with<E: DiagramEngine>(
    schema: &Schema,
    mut engine: E,
    cancel: &CancelToken,
) -> Result<(), DiagramError> {
    let mut apply = |op: Operation| -> Result<(), DiagramError> {
        engine.apply(&op).map_err(|e| DiagramError::Engine {
            operation: op,
            source: Box::new(e),
        })
    };

    for table in &schema.tables {
        if cancel.is_cancelled() {
            return Err(DiagramError::Cancelled);
        }

        apply(Operation::CreateNode {
            id: key(&table.name).into_owned(),
        })?;
        apply(Operation::SetAttribute {
            path: format!("{}.shape", key(&table.name)),
            value: TABLE_SHAPE.to_string(),
        })?;

        for column in &table.columns {
            let source = child_path(&table.name, &column.name);
            apply(Operation::SetAttribute {
                path: source.clone(),
                value: format_label(column),
            })?;

            for reference in &column.foreign_keys {
                let target = match resolve_target_column(schema, reference) {
                    TargetColumn::Found(name) | TargetColumn::PrimaryKey(name) => {
                        child_path(&reference.table, name)
                    }
                    TargetColumn::Raw(name) => {
                        debug!(
                            table = %reference.table,
                            column = %name,
                            "foreign key target not found, using raw name"
                        );
                        child_path(&reference.table, name)
                    }
                    TargetColumn::Table => key(&reference.table).into_owned(),
                };
                apply(Operation::CreateEdge {
                    source: source.clone(),
                    target,
                })?;
            }
        }
    }

    Ok(())
}

/// Row label: type, `(length)`, ` NULL` unless NOT NULL, ` (PK)`, ` (FK)`.
pub fn format_label(column: &Column) -> String {
    let mut label = column.typ.clone();
    if let Some(length) = column.length {
        label.push_str(&format!("({length})"));
    }
    if !column.is_not_null() {
        label.push_str(" NULL");
    }
    if column.is_primary() {
        label.push_str(" (PK)");
    }
    if column.is_foreign_key() {
        label.push_str(" (FK)");
    }
    label
}

/// Resolve the column a reference points at. Never fails: unknown tables and
/// columns fall back to the raw name.
pub fn resolve_target_column<'a>(
    schema: &'a Schema,
    reference: &'a ForeignReference,
) -> TargetColumn<'a> {
    let table = schema.table(&reference.table);

    if reference.column.is_empty() {
        return match table.and_then(|t| t.primary_key()) {
            Some(pk) => TargetColumn::PrimaryKey(&pk.name),
            None => TargetColumn::Table,
        };
    }

    match table.and_then(|t| t.column(&reference.column)) {
        Some(column) => TargetColumn::Found(&column.name),
        None => TargetColumn::Raw(&reference.column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{Graph, GraphError, Recorder};
    use crate::model::{ConstraintTag, Table};
    use crate::schema::build_schema;
    use crate::sql::parse;

    fn column(typ: &str, length: Option<i64>, tags: &[ConstraintTag], fks: usize) -> Column {
        let mut col = Column::new("c", typ);
        col.length = length;
        for tag in tags {
            col.add_constraint(*tag);
        }
        for i in 0..fks {
            col.add_foreign_key(ForeignReference::new("t", format!("c{i}")));
        }
        col
    }

    fn schema(sql: &str) -> Schema {
        build_schema(&parse(sql).unwrap()).unwrap()
    }

    #[test]
    fn test_label_primary_not_null_with_length() {
        let col = column(
            "VARCHAR",
            Some(255),
            &[ConstraintTag::Primary, ConstraintTag::NotNull],
            0,
        );
        assert_eq!(format_label(&col), "VARCHAR(255) (PK)");
    }

    #[test]
    fn test_label_nullable_foreign_key() {
        let col = column("INTEGER", None, &[], 1);
        assert_eq!(format_label(&col), "INTEGER NULL (FK)");
    }

    #[test]
    fn test_label_all_markers_in_order() {
        let col = column("INT", Some(11), &[ConstraintTag::Primary], 2);
        assert_eq!(format_label(&col), "INT(11) NULL (PK) (FK)");
    }

    #[test]
    fn test_label_not_null_plain() {
        let col = column("TEXT", None, &[ConstraintTag::NotNull], 0);
        assert_eq!(format_label(&col), "TEXT");
    }

    #[test]
    fn test_resolve_target_column() {
        let schema = schema(
            r#"
            CREATE TABLE users (uuid TEXT, id INT PRIMARY KEY);
            CREATE TABLE logs (n INT);
            "#,
        );

        let found = ForeignReference::new("users", "id");
        assert_eq!(resolve_target_column(&schema, &found), TargetColumn::Found("id"));

        let missing_column = ForeignReference::new("users", "nope");
        assert_eq!(resolve_target_column(&schema, &missing_column), TargetColumn::Raw("nope"));

        let missing_table = ForeignReference::new("accounts", "id");
        assert_eq!(resolve_target_column(&schema, &missing_table), TargetColumn::Raw("id"));

        let implicit = ForeignReference::new("users", "");
        assert_eq!(resolve_target_column(&schema, &implicit), TargetColumn::PrimaryKey("id"));

        let no_pk = ForeignReference::new("logs", "");
        assert_eq!(resolve_target_column(&schema, &no_pk), TargetColumn::Table);
    }

    #[test]
    fn test_end_to_end_operations() {
        let schema = schema(
            "CREATE TABLE users (id INT PRIMARY KEY); \
             CREATE TABLE posts (id INT PRIMARY KEY, user_id INT, FOREIGN KEY(user_id) REFERENCES users(id));",
        );

        let mut recorder = Recorder::default();
        synthesize(&schema, &mut recorder).unwrap();

        let set = |path: &str, value: &str| Operation::SetAttribute {
            path: path.into(),
            value: value.into(),
        };
        assert_eq!(
            recorder.operations,
            vec![
                Operation::CreateNode { id: "users".into() },
                set("users.shape", "sql_table"),
                set("users.id", "INT NULL (PK)"),
                Operation::CreateNode { id: "posts".into() },
                set("posts.shape", "sql_table"),
                set("posts.id", "INT NULL (PK)"),
                set("posts.user_id", "INT NULL (FK)"),
                Operation::CreateEdge {
                    source: "posts.user_id".into(),
                    target: "users.id".into(),
                },
            ]
        );

        let mut graph = Graph::new();
        synthesize(&schema, &mut graph).unwrap();
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_synthesis_is_repeatable() {
        let schema = schema(
            r#"
            CREATE TABLE a (id INT PRIMARY KEY, b_id INT REFERENCES b(id));
            CREATE TABLE b (id INT PRIMARY KEY, a_id INT REFERENCES a(id), x INT REFERENCES missing(y));
            "#,
        );

        let mut first = Recorder::default();
        let mut second = Recorder::default();
        synthesize(&schema, &mut first).unwrap();
        synthesize(&schema, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unresolved_target_uses_raw_name() {
        let schema = schema("CREATE TABLE posts (author INT REFERENCES people(pid));");

        let mut graph = Graph::new();
        synthesize(&schema, &mut graph).unwrap();

        let edge = &graph.edges()[0];
        assert_eq!(edge.target.node, "people");
        assert_eq!(edge.target.row.as_deref(), Some("pid"));
    }

    #[test]
    fn test_quoted_names_round_trip() {
        let schema = schema(
            r#"
            CREATE TABLE "my.users" ("the id" INT PRIMARY KEY);
            CREATE TABLE posts (shape TEXT, owner INT REFERENCES "my.users");
            "#,
        );

        let mut graph = Graph::new();
        synthesize(&schema, &mut graph).unwrap();

        assert!(graph.node("my.users").unwrap().row("the id").is_some());
        let posts = graph.node("posts").unwrap();
        assert_eq!(posts.row("shape").unwrap().label, "TEXT NULL");
        assert_eq!(graph.edges()[0].target.row.as_deref(), Some("the id"));
    }

    #[test]
    fn test_engine_failure_aborts() {
        let mut schema = Schema::default();
        schema.tables.push(Table::new("ok"));
        schema.tables.push(Table::new(""));
        schema.tables.push(Table::new("never"));

        let mut graph = Graph::new();
        let err = synthesize(&schema, &mut graph).unwrap_err();

        match err {
            DiagramError::Engine { operation, source } => {
                assert_eq!(operation, Operation::CreateNode { id: "\"\"".into() });
                assert!(source.downcast_ref::<GraphError>().is_some());
            }
            other => panic!("unexpected error {other:?}"),
        }
        // Partial state is kept
        assert!(graph.node("ok").is_some());
        assert!(graph.node("never").is_none());
    }

    #[test]
    fn test_cancelled_synthesis() {
        let schema = schema("CREATE TABLE users (id INT);");
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut recorder = Recorder::default();
        let err = synthesize_with(&schema, &mut recorder, &cancel).unwrap_err();
        assert!(matches!(err, DiagramError::Cancelled));
        assert!(recorder.operations.is_empty());
    }
}
