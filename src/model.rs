use std::collections::BTreeSet;

/// The whole input schema: tables in statement order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    /// First table with the given name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// First column tagged as primary key.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub typ: String,
    pub length: Option<i64>,
    pub constraints: BTreeSet<ConstraintTag>,
    pub foreign_keys: Vec<ForeignReference>,
}

impl Column {
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            length: None,
            constraints: BTreeSet::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Add a constraint tag. Returns `false` if it was already present.
    pub fn add_constraint(&mut self, tag: ConstraintTag) -> bool {
        if self.constraints.contains(&tag) {
            return false;
        }
        self.constraints.insert(tag)
    }

    /// Append a reference unless the same `(table, column)` pair is already
    /// present. Returns `false` when the reference was dropped as a duplicate.
    pub fn add_foreign_key(&mut self, reference: ForeignReference) -> bool {
        if self.foreign_keys.contains(&reference) {
            return false;
        }
        self.foreign_keys.push(reference);
        true
    }

    pub fn is_primary(&self) -> bool {
        self.constraints.contains(&ConstraintTag::Primary)
    }

    pub fn is_not_null(&self) -> bool {
        self.constraints.contains(&ConstraintTag::NotNull)
    }

    pub fn is_foreign_key(&self) -> bool {
        !self.foreign_keys.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintTag {
    Primary,
    NotNull,
}

impl ConstraintTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::NotNull => "not_null",
        }
    }
}

/// Names the target of a foreign key. The target may not exist in the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignReference {
    pub table: String,
    pub column: String,
}

impl ForeignReference {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_tags_are_idempotent() {
        let mut col = Column::new("email", "TEXT");
        assert!(col.add_constraint(ConstraintTag::NotNull));
        assert!(!col.add_constraint(ConstraintTag::NotNull));
        assert_eq!(col.constraints.len(), 1);
        assert!(col.is_not_null());
        assert!(!col.is_primary());
        assert_eq!(ConstraintTag::NotNull.as_str(), "not_null");
        assert_eq!(ConstraintTag::Primary.as_str(), "primary");
    }

    #[test]
    fn test_foreign_keys_dedup_by_pair() {
        let mut col = Column::new("user_id", "INT");
        assert!(col.add_foreign_key(ForeignReference::new("users", "id")));
        assert!(!col.add_foreign_key(ForeignReference::new("users", "id")));
        assert!(col.add_foreign_key(ForeignReference::new("users", "uuid")));
        assert_eq!(
            col.foreign_keys,
            vec![
                ForeignReference::new("users", "id"),
                ForeignReference::new("users", "uuid"),
            ]
        );
    }

    #[test]
    fn test_lookup_by_name() {
        let mut schema = Schema::default();
        let mut users = Table::new("users");
        users.columns.push(Column::new("id", "INT"));
        schema.tables.push(users);

        assert!(schema.table("users").is_some());
        assert!(schema.table("posts").is_none());

        let users = schema.table_mut("users").unwrap();
        users.column_mut("id").unwrap().add_constraint(ConstraintTag::Primary);
        assert_eq!(schema.table("users").unwrap().primary_key().unwrap().name, "id");
    }
}
