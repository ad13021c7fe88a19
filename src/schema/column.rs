//! Column extraction from column definition nodes.

use crate::model::{Column, ConstraintTag, ForeignReference};
use crate::sql::tree::{ColumnDef, ConstrType, Constraint, Node};
use tracing::debug;

/// Build a [`Column`] from one column definition. Never fails: unknown node
/// shapes are skipped.
pub fn extract_column(def: &ColumnDef) -> Column {
    let mut column = Column::new(def.colname.clone(), type_name(def));
    column.length = type_length(def);

    for constraint in &def.constraints {
        match constraint.contype {
            ConstrType::Primary => tag_column(&mut column, ConstraintTag::Primary),
            ConstrType::NotNull => tag_column(&mut column, ConstraintTag::NotNull),
            ConstrType::Foreign => match inline_reference(constraint) {
                Some(reference) => {
                    if !column.add_foreign_key(reference) {
                        debug!(column = %column.name, "dropping duplicate inline foreign key");
                    }
                }
                None => debug!(column = %column.name, "foreign key without target table"),
            },
            ConstrType::Null
            | ConstrType::Default
            | ConstrType::Check
            | ConstrType::Unique
            | ConstrType::Exclude => {}
        }
    }

    column
}

/// Add `tag`, logging when the column already carries it.
pub(crate) fn tag_column(column: &mut Column, tag: ConstraintTag) {
    if !column.add_constraint(tag) {
        debug!(column = %column.name, constraint = tag.as_str(), "constraint already set");
    }
}

/// First name token of the type path, or empty.
fn type_name(def: &ColumnDef) -> String {
    match def.type_name.names.iter().find_map(Node::as_str) {
        Some(name) => name.to_string(),
        None => {
            debug!(column = %def.colname, "column has no type name");
            String::new()
        }
    }
}

/// Last integer type modifier. `NUMERIC(10,2)` yields 2.
fn type_length(def: &ColumnDef) -> Option<i64> {
    def.type_name.typmods.iter().fold(None, |length, m| match m {
        Node::Integer(n) => Some(*n),
        _ => length,
    })
}

/// Reference to the referenced table and the last referenced column seen.
pub(crate) fn inline_reference(constraint: &Constraint) -> Option<ForeignReference> {
    let table = constraint.pk_table.as_ref()?;
    let column = last_name(&constraint.pk_attrs).unwrap_or_default();
    Some(ForeignReference::new(table.relname.clone(), column))
}

pub(crate) fn last_name(nodes: &[Node]) -> Option<String> {
    nodes.iter().rev().find_map(Node::as_str).map(str::to_string)
}
