//! Parse tree to schema model.
//!
//! Statements are applied in source order. An `ALTER TABLE` must come after
//! the `CREATE TABLE` it targets; forward references are an error, not a
//! deferred fixup.

mod column;

pub use column::extract_column;

use crate::cancel::CancelToken;
use crate::model::{ConstraintTag, ForeignReference, Schema, Table};
use crate::sql::tree::{
    AlterDef, AlterTableStmt, AlterTableType, ConstrType, Constraint, CreateStmt, Node, ParseTree,
    Statement, TableElement,
};
use column::{last_name, tag_column};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table {name:?} could not be found in schema")]
    UnknownTable { name: String },
    #[error("schema extraction cancelled")]
    Cancelled,
}

/// Build a [`Schema`] from a parse tree.
pub fn build_schema(tree: &ParseTree) -> Result<Schema, SchemaError> {
    build_schema_with(tree, &CancelToken::new())
}

/// Like [`build_schema`], checking `cancel` before each statement.
pub fn build_schema_with(tree: &ParseTree, cancel: &CancelToken) -> Result<Schema, SchemaError> {
    let mut schema = Schema::default();

    for stmt in &tree.stmts {
        if cancel.is_cancelled() {
            return Err(SchemaError::Cancelled);
        }

        match stmt {
            Statement::CreateTable(create) => schema.tables.push(build_table(create)),
            Statement::AlterTable(alter) => alter_table(&mut schema, alter)?,
            Statement::Other(tag) => debug!(statement = %tag, "skipping statement"),
        }
    }

    Ok(schema)
}

fn build_table(stmt: &CreateStmt) -> Table {
    let mut table = Table::new(stmt.relation.relname.clone());

    for elt in &stmt.table_elts {
        if let TableElement::Column(def) = elt {
            table.columns.push(extract_column(def));
        }
    }

    // Table-level constraints may name any column, so they run once every
    // column exists.
    for elt in &stmt.table_elts {
        match elt {
            TableElement::Constraint(constraint) => apply_constraint(&mut table, constraint),
            TableElement::Other(tag) => {
                debug!(table = %table.name, element = %tag, "skipping table element");
            }
            TableElement::Column(_) => {}
        }
    }

    debug!(table = %table.name, columns = table.columns.len(), "built table");
    table
}

fn alter_table(schema: &mut Schema, stmt: &AlterTableStmt) -> Result<(), SchemaError> {
    let name = &stmt.relation.relname;
    let table = schema
        .table_mut(name)
        .ok_or_else(|| SchemaError::UnknownTable { name: name.clone() })?;

    for cmd in &stmt.cmds {
        if cmd.subtype != AlterTableType::AddConstraint {
            debug!(table = %table.name, subtype = ?cmd.subtype, "skipping alter command");
            continue;
        }
        let Some(AlterDef::Constraint(constraint)) = &cmd.def else {
            continue;
        };
        apply_constraint(table, constraint);
    }

    Ok(())
}

/// Apply a table-level PRIMARY KEY or FOREIGN KEY constraint to its columns.
/// Columns that do not exist are skipped.
fn apply_constraint(table: &mut Table, constraint: &Constraint) {
    match constraint.contype {
        ConstrType::Primary => {
            for key in constraint.keys.iter().filter_map(Node::as_str) {
                match table.column_mut(key) {
                    Some(column) => tag_column(column, ConstraintTag::Primary),
                    None => debug!(table = %table.name, column = %key, "primary key column not found"),
                }
            }
        }
        ConstrType::Foreign => {
            let Some(pk_table) = &constraint.pk_table else {
                return;
            };
            // Composite keys point every local column at the last referenced
            // column.
            let target_column = last_name(&constraint.pk_attrs).unwrap_or_default();

            for attr in constraint.fk_attrs.iter().filter_map(Node::as_str) {
                let Some(column) = table.column_mut(attr) else {
                    debug!(table = %table.name, column = %attr, "foreign key column not found");
                    continue;
                };
                let reference = ForeignReference::new(pk_table.relname.clone(), target_column.clone());
                if column.add_foreign_key(reference) {
                    debug!(
                        table = %table.name,
                        column = %attr,
                        target = %pk_table.relname,
                        "added foreign key"
                    );
                }
            }
        }
        ConstrType::Null
        | ConstrType::NotNull
        | ConstrType::Default
        | ConstrType::Check
        | ConstrType::Unique
        | ConstrType::Exclude => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parse;

    fn schema(sql: &str) -> Schema {
        build_schema(&parse(sql).unwrap()).unwrap()
    }

    #[test]
    fn test_tables_and_columns_in_order() {
        let schema = schema(
            r#"
            CREATE TABLE b (z INT, y INT, x INT);
            CREATE TABLE a (id INT);
            CREATE TABLE c (id INT, name TEXT);
            "#,
        );

        let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);

        let columns: Vec<&str> = schema.tables[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_end_to_end_table_level_foreign_key() {
        let schema = schema(
            "CREATE TABLE users (id INT PRIMARY KEY); \
             CREATE TABLE posts (id INT PRIMARY KEY, user_id INT, FOREIGN KEY(user_id) REFERENCES users(id));",
        );

        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.tables[0].name, "users");
        assert_eq!(schema.tables[1].name, "posts");

        let user_id = schema.tables[1].column("user_id").unwrap();
        assert_eq!(user_id.foreign_keys, vec![ForeignReference::new("users", "id")]);
    }

    #[test]
    fn test_alter_unknown_table() {
        let tree = parse(
            "CREATE TABLE users (id INT); \
             ALTER TABLE posts ADD CONSTRAINT fk FOREIGN KEY (user_id) REFERENCES users(id);",
        )
        .unwrap();

        let err = build_schema(&tree).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTable { ref name } if name == "posts"));
    }

    #[test]
    fn test_alter_before_create_is_error() {
        let tree = parse(
            "ALTER TABLE users ADD PRIMARY KEY (id); \
             CREATE TABLE users (id INT);",
        )
        .unwrap();

        assert!(matches!(
            build_schema(&tree),
            Err(SchemaError::UnknownTable { .. })
        ));
    }

    #[test]
    fn test_alter_adds_primary_key() {
        let schema = schema(
            r#"
            CREATE TABLE memberships (user_id INT NOT NULL, group_id INT NOT NULL, note TEXT);
            ALTER TABLE ONLY public.memberships ADD CONSTRAINT memberships_pkey PRIMARY KEY (user_id, group_id, missing);
            ALTER TABLE memberships ADD PRIMARY KEY (user_id);
            "#,
        );

        let table = &schema.tables[0];
        assert!(table.column("user_id").unwrap().is_primary());
        assert!(table.column("group_id").unwrap().is_primary());
        assert!(!table.column("note").unwrap().is_primary());
        assert_eq!(table.column("user_id").unwrap().constraints.len(), 2);
    }

    #[test]
    fn test_alter_adds_foreign_key() {
        let schema = schema(
            r#"
            CREATE TABLE users (id INT PRIMARY KEY);
            CREATE TABLE posts (id INT PRIMARY KEY, user_id INT);
            ALTER TABLE ONLY posts
                ADD CONSTRAINT posts_user_id_fkey FOREIGN KEY (user_id) REFERENCES users(id);
            "#,
        );

        let user_id = schema.tables[1].column("user_id").unwrap();
        assert_eq!(user_id.foreign_keys, vec![ForeignReference::new("users", "id")]);
    }

    #[test]
    fn test_alter_foreign_key_missing_column_is_skipped() {
        let schema = schema(
            r#"
            CREATE TABLE users (id INT);
            CREATE TABLE posts (id INT);
            ALTER TABLE posts ADD CONSTRAINT fk FOREIGN KEY (author_id) REFERENCES users(id);
            "#,
        );

        assert!(schema.tables[1].columns.iter().all(|c| c.foreign_keys.is_empty()));
    }

    #[test]
    fn test_composite_foreign_key_uses_last_target_column() {
        let schema = schema(
            r#"
            CREATE TABLE memberships (user_id INT, group_id INT, PRIMARY KEY (user_id, group_id));
            CREATE TABLE grants (m_user INT, m_group INT);
            ALTER TABLE grants ADD CONSTRAINT fk
                FOREIGN KEY (m_user, m_group) REFERENCES memberships (user_id, group_id);
            "#,
        );

        let grants = &schema.tables[1];
        let expected = vec![ForeignReference::new("memberships", "group_id")];
        assert_eq!(grants.column("m_user").unwrap().foreign_keys, expected);
        assert_eq!(grants.column("m_group").unwrap().foreign_keys, expected);
    }

    #[test]
    fn test_inline_and_alter_foreign_key_dedup() {
        let schema = schema(
            r#"
            CREATE TABLE users (id INT);
            CREATE TABLE posts (user_id INT REFERENCES users(id) REFERENCES users(id));
            ALTER TABLE posts ADD FOREIGN KEY (user_id) REFERENCES users (id);
            "#,
        );

        let user_id = schema.tables[1].column("user_id").unwrap();
        assert_eq!(user_id.foreign_keys.len(), 1);
    }

    #[test]
    fn test_other_statements_and_commands_ignored() {
        let schema = schema(
            r#"
            SET search_path = public;
            CREATE TABLE users (id INT, email TEXT);
            CREATE INDEX users_email ON users (email);
            ALTER TABLE users ADD COLUMN name TEXT, DROP COLUMN email, ADD CONSTRAINT u UNIQUE (email);
            ALTER TABLE users OWNER TO postgres;
            "#,
        );

        assert_eq!(schema.tables.len(), 1);
        let columns: Vec<&str> = schema.tables[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["id", "email"]);
    }

    #[test]
    fn test_duplicate_create_table_kept_twice() {
        let schema = schema(
            r#"
            CREATE TABLE users (id INT);
            CREATE TABLE users (id INT, name TEXT);
            ALTER TABLE users ADD PRIMARY KEY (id);
            "#,
        );

        assert_eq!(schema.tables.len(), 2);
        assert!(schema.tables[0].column("id").unwrap().is_primary());
        assert!(!schema.tables[1].column("id").unwrap().is_primary());
    }

    #[test]
    fn test_mixed_case_names_resolve() {
        let schema = schema(
            r#"
            CREATE TABLE Users (ID INT);
            ALTER TABLE users ADD PRIMARY KEY (id);
            CREATE TABLE Posts (User_ID INT REFERENCES USERS(Id), "Author" INT);
            ALTER TABLE POSTS ADD FOREIGN KEY ("Author") REFERENCES Users;
            "#,
        );

        let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "posts"]);
        assert!(schema.tables[0].column("id").unwrap().is_primary());

        let posts = &schema.tables[1];
        assert_eq!(
            posts.column("user_id").unwrap().foreign_keys,
            vec![ForeignReference::new("users", "id")]
        );
        assert_eq!(
            posts.column("Author").unwrap().foreign_keys,
            vec![ForeignReference::new("users", "")]
        );
    }

    #[test]
    fn test_exclude_constraints_are_ignored() {
        let schema = schema(
            r#"
            CREATE TABLE rooms (id INT, during TSRANGE,
                CONSTRAINT no_overlap EXCLUDE USING gist (id WITH =, during WITH &&));
            ALTER TABLE rooms ADD CONSTRAINT no_overlap2 EXCLUDE USING gist (during WITH &&);
            "#,
        );

        let rooms = &schema.tables[0];
        assert_eq!(rooms.columns.len(), 2);
        assert!(rooms.columns.iter().all(|c| c.constraints.is_empty()));
    }

    #[test]
    fn test_cancelled_before_first_statement() {
        let tree = parse("CREATE TABLE users (id INT);").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(matches!(
            build_schema_with(&tree, &cancel),
            Err(SchemaError::Cancelled)
        ));
    }
}
