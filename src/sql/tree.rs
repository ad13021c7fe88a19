//! Structural parse tree produced by the SQL parser.
//!
//! The shape loosely follows the PostgreSQL raw parse tree: statements are
//! tagged, lists hold generic [`Node`] values, and anything the parser does
//! not model is kept as an `Other` variant so consumers can skip it.

/// A whole SQL script: top-level statements in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseTree {
    pub stmts: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateStmt),
    AlterTable(AlterTableStmt),
    /// Any other statement, tagged by its leading keyword.
    Other(String),
}

/// Generic list element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    String(String),
    Integer(i64),
    /// Anything else, kept as raw text.
    Other(String),
}

impl Node {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A possibly schema-qualified relation name.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeVar {
    pub schemaname: Option<String>,
    pub relname: String,
}

impl RangeVar {
    pub fn new(relname: impl Into<String>) -> Self {
        Self {
            schemaname: None,
            relname: relname.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateStmt {
    pub relation: RangeVar,
    pub table_elts: Vec<TableElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableElement {
    Column(ColumnDef),
    Constraint(Constraint),
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub colname: String,
    pub type_name: TypeName,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeName {
    /// Dot-separated name path, e.g. `pg_catalog.varchar`.
    pub names: Vec<Node>,
    /// Parenthesised modifiers, e.g. the `255` in `VARCHAR(255)`.
    pub typmods: Vec<Node>,
    /// Number of `[]` suffixes.
    pub array_bounds: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstrType {
    Null,
    NotNull,
    Default,
    Check,
    Primary,
    Unique,
    Foreign,
    /// EXCLUDE constraint; parsed past, never applied.
    Exclude,
}

/// A column or table constraint.
///
/// `keys` lists the columns of a table-level PRIMARY KEY / UNIQUE,
/// `fk_attrs` the local columns of a table-level FOREIGN KEY and
/// `pk_attrs` the referenced columns of any FOREIGN KEY.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub contype: ConstrType,
    pub conname: Option<String>,
    pub keys: Vec<Node>,
    pub fk_attrs: Vec<Node>,
    pub pk_table: Option<RangeVar>,
    pub pk_attrs: Vec<Node>,
}

impl Constraint {
    pub fn new(contype: ConstrType) -> Self {
        Self {
            contype,
            conname: None,
            keys: Vec::new(),
            fk_attrs: Vec::new(),
            pk_table: None,
            pk_attrs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableStmt {
    pub relation: RangeVar,
    pub cmds: Vec<AlterTableCmd>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterTableType {
    AddConstraint,
    AddColumn,
    DropColumn,
    DropConstraint,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterDef {
    Constraint(Constraint),
    Column(ColumnDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableCmd {
    pub subtype: AlterTableType,
    pub name: Option<String>,
    pub def: Option<AlterDef>,
}
