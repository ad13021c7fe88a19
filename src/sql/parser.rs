//! SQL parser for CREATE TABLE and ALTER TABLE statements.

use super::lexer::{LexError, Lexer, Token};
use super::tree::{
    AlterDef, AlterTableCmd, AlterTableStmt, AlterTableType, ColumnDef, ConstrType, Constraint,
    CreateStmt, Node, ParseTree, RangeVar, Statement, TableElement, TypeName,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected token: {0:?}")]
    UnexpectedToken(Token),
    #[error("Expected {expected}, found {found:?}")]
    Expected { expected: &'static str, found: Token },
    #[error("Unexpected end of input")]
    UnexpectedEof,
}

/// Parse a SQL script into a [`ParseTree`].
pub fn parse(input: &str) -> Result<ParseTree, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser::new(tokens).parse()
}

/// Second words of multi-word type names, e.g. `DOUBLE PRECISION`.
const TYPE_CONTINUATIONS: &[&str] = &["precision", "varying"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.current().is_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn error(&self, expected: &'static str) -> ParseError {
        match self.current() {
            Token::Eof => ParseError::UnexpectedEof,
            found => ParseError::Expected {
                expected,
                found: found.clone(),
            },
        }
    }

    /// Table, column or constraint name, case-folded unless quoted.
    fn expect_name(&mut self, expected: &'static str) -> Result<String, ParseError> {
        match self.current().identifier() {
            Some(name) => {
                self.advance();
                Ok(name)
            }
            None => Err(self.error(expected)),
        }
    }

    /// Type name segment, kept as written.
    fn expect_type_word(&mut self) -> Result<String, ParseError> {
        match self.current().as_name() {
            Some(word) => {
                let word = word.to_string();
                self.advance();
                Ok(word)
            }
            None => Err(self.error("type name")),
        }
    }

    fn parse(&mut self) -> Result<ParseTree, ParseError> {
        let mut stmts = Vec::new();

        loop {
            while self.eat(&Token::Semicolon) {}
            if self.current() == &Token::Eof {
                break;
            }

            let stmt = match self.current() {
                Token::Create => self.parse_create()?,
                Token::Alter => self.parse_alter()?,
                other => {
                    let tag = statement_tag(other);
                    self.skip_statement();
                    Statement::Other(tag)
                }
            };
            stmts.push(stmt);
        }

        Ok(ParseTree { stmts })
    }

    fn parse_create(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // CREATE

        // OR REPLACE, TEMP, UNLOGGED, ...
        if self.eat_word("or") {
            self.eat_word("replace");
        }
        for modifier in ["global", "local", "temp", "temporary", "unlogged"] {
            self.eat_word(modifier);
        }

        if !self.eat(&Token::Table) {
            let tag = format!("CREATE {}", statement_tag(self.current()));
            self.skip_statement();
            return Ok(Statement::Other(tag));
        }

        if self.eat(&Token::If) {
            self.expect(Token::Not, "NOT")?;
            self.expect(Token::Exists, "EXISTS")?;
        }

        let relation = self.parse_range_var()?;

        // CREATE TABLE ... AS / PARTITION OF / OF type
        if self.current() != &Token::LParen {
            self.skip_statement();
            return Ok(Statement::Other("CREATE TABLE".to_string()));
        }
        self.advance();

        let mut table_elts = Vec::new();
        loop {
            if self.current() == &Token::RParen {
                break;
            }
            table_elts.push(self.parse_table_element()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')' closing table elements")?;

        // Table options (INHERITS, WITH, ENGINE=, ...)
        self.skip_statement();

        Ok(Statement::CreateTable(CreateStmt {
            relation,
            table_elts,
        }))
    }

    fn parse_range_var(&mut self) -> Result<RangeVar, ParseError> {
        let first = self.expect_name("table name")?;
        if self.eat(&Token::Dot) {
            let relname = self.expect_name("table name")?;
            Ok(RangeVar {
                schemaname: Some(first),
                relname,
            })
        } else {
            Ok(RangeVar::new(first))
        }
    }

    fn parse_table_element(&mut self) -> Result<TableElement, ParseError> {
        match self.current() {
            Token::Constraint | Token::Primary | Token::Foreign | Token::Unique | Token::Check => {
                Ok(TableElement::Constraint(self.parse_table_constraint()?))
            }
            // MySQL inline KEY/INDEX definitions and LIKE/EXCLUDE clauses
            Token::Key | Token::Index if self.at_index_definition() => {
                self.skip_element();
                Ok(TableElement::Other("INDEX".to_string()))
            }
            tok if tok.is_word("like") || tok.is_word("exclude") || tok.is_word("fulltext") => {
                let tag = statement_tag(tok);
                self.skip_element();
                Ok(TableElement::Other(tag))
            }
            _ => Ok(TableElement::Column(self.parse_column_def()?)),
        }
    }

    /// `KEY (a)` or `KEY name (a, ...)`, as opposed to a column named `key`.
    fn at_index_definition(&self) -> bool {
        match self.peek_at(1) {
            Token::LParen => true,
            tok if tok.as_name().is_some() => {
                self.peek_at(2) == &Token::LParen && self.peek_at(3).as_name().is_some()
            }
            _ => false,
        }
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let colname = self.expect_name("column name")?;
        let type_name = self.parse_type_name()?;
        let constraints = self.parse_column_constraints()?;

        Ok(ColumnDef {
            colname,
            type_name,
            constraints,
        })
    }

    fn parse_type_name(&mut self) -> Result<TypeName, ParseError> {
        let mut type_name = TypeName::default();

        // Type names are optional in some dialects (SQLite)
        let Some(first) = self.current().as_name() else {
            return Ok(type_name);
        };
        let mut name = first.to_string();
        self.advance();

        loop {
            if self.current() == &Token::Dot {
                self.advance();
                type_name.names.push(Node::String(name));
                name = self.expect_type_word()?;
                continue;
            }
            match self.current() {
                Token::Ident(next) if TYPE_CONTINUATIONS.iter().any(|w| next.eq_ignore_ascii_case(w)) => {
                    name.push(' ');
                    name.push_str(next);
                    self.advance();
                }
                // TIMESTAMP WITH TIME ZONE / WITHOUT TIME ZONE
                Token::Ident(next)
                    if (next.eq_ignore_ascii_case("with") || next.eq_ignore_ascii_case("without"))
                        && self.peek_at(1).is_word("time") =>
                {
                    name.push(' ');
                    name.push_str(next);
                    self.advance();
                    for word in ["time", "zone"] {
                        if let Token::Ident(w) = self.current() {
                            if w.eq_ignore_ascii_case(word) {
                                name.push(' ');
                                name.push_str(w);
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        type_name.names.push(Node::String(name));

        if self.eat(&Token::LParen) {
            loop {
                let modifier = match self.current() {
                    Token::Num(n) => match n.parse::<i64>() {
                        Ok(v) => Node::Integer(v),
                        Err(_) => Node::Other(n.clone()),
                    },
                    Token::Ident(s) | Token::QuotedIdent(s) | Token::Str(s) => {
                        Node::Other(s.clone())
                    }
                    Token::RParen => break,
                    Token::Eof => return Err(ParseError::UnexpectedEof),
                    other => return Err(ParseError::UnexpectedToken(other.clone())),
                };
                type_name.typmods.push(modifier);
                self.advance();
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen, "')' closing type modifiers")?;
        }

        while self.current() == &Token::LBracket {
            self.advance();
            if matches!(self.current(), Token::Num(_)) {
                self.advance();
            }
            self.expect(Token::RBracket, "']'")?;
            type_name.array_bounds += 1;
        }

        Ok(type_name)
    }

    fn parse_column_constraints(&mut self) -> Result<Vec<Constraint>, ParseError> {
        let mut constraints = Vec::new();
        let mut conname = None;

        loop {
            let constraint = match self.current() {
                Token::Comma | Token::RParen | Token::Semicolon | Token::Eof => break,
                Token::Constraint => {
                    self.advance();
                    conname = Some(self.expect_name("constraint name")?);
                    continue;
                }
                Token::Not => {
                    self.advance();
                    self.expect(Token::Null, "NULL")?;
                    Constraint::new(ConstrType::NotNull)
                }
                Token::Null => {
                    self.advance();
                    Constraint::new(ConstrType::Null)
                }
                Token::Primary => {
                    self.advance();
                    self.expect(Token::Key, "KEY")?;
                    Constraint::new(ConstrType::Primary)
                }
                Token::Unique => {
                    self.advance();
                    self.eat(&Token::Key);
                    Constraint::new(ConstrType::Unique)
                }
                Token::Default => {
                    self.advance();
                    self.skip_default_expr();
                    Constraint::new(ConstrType::Default)
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized()?;
                    Constraint::new(ConstrType::Check)
                }
                Token::References => {
                    let mut constraint = Constraint::new(ConstrType::Foreign);
                    self.parse_references(&mut constraint)?;
                    constraint
                }
                Token::LParen => {
                    // Stray parenthesised clause, e.g. GENERATED ... AS (expr)
                    self.skip_parenthesized()?;
                    continue;
                }
                _ => {
                    // AUTO_INCREMENT, COLLATE x, GENERATED ..., COMMENT '...'
                    self.advance();
                    continue;
                }
            };

            constraints.push(Constraint {
                conname: conname.take(),
                ..constraint
            });
        }

        Ok(constraints)
    }

    /// `REFERENCES table [(col, ...)] [MATCH x] [ON DELETE|UPDATE action]...`
    fn parse_references(&mut self, constraint: &mut Constraint) -> Result<(), ParseError> {
        self.expect(Token::References, "REFERENCES")?;
        constraint.pk_table = Some(self.parse_range_var()?);
        if self.current() == &Token::LParen {
            constraint.pk_attrs = self.parse_name_list()?;
        }

        if self.eat_word("match") {
            self.advance(); // FULL | PARTIAL | SIMPLE
        }
        self.skip_on_actions();
        Ok(())
    }

    fn parse_table_constraint(&mut self) -> Result<Constraint, ParseError> {
        let conname = if self.eat(&Token::Constraint) {
            Some(self.expect_name("constraint name")?)
        } else {
            None
        };

        let mut constraint = match self.current() {
            Token::Primary => {
                self.advance();
                self.expect(Token::Key, "KEY")?;
                let mut c = Constraint::new(ConstrType::Primary);
                c.keys = self.parse_name_list()?;
                c
            }
            Token::Unique => {
                self.advance();
                self.eat(&Token::Key);
                // MySQL allows an index name here
                if self.current().as_name().is_some() {
                    self.advance();
                }
                let mut c = Constraint::new(ConstrType::Unique);
                c.keys = self.parse_name_list()?;
                c
            }
            Token::Foreign => {
                self.advance();
                self.expect(Token::Key, "KEY")?;
                let mut c = Constraint::new(ConstrType::Foreign);
                c.fk_attrs = self.parse_name_list()?;
                self.parse_references(&mut c)?;
                c
            }
            Token::Check => {
                self.advance();
                self.skip_parenthesized()?;
                Constraint::new(ConstrType::Check)
            }
            // EXCLUDE USING gist (...); the trailing skip below consumes it
            tok if tok.is_word("exclude") => {
                self.advance();
                Constraint::new(ConstrType::Exclude)
            }
            _ => return Err(self.error("PRIMARY KEY, UNIQUE, FOREIGN KEY, CHECK or EXCLUDE")),
        };
        constraint.conname = conname;

        // DEFERRABLE, INITIALLY DEFERRED, NOT VALID, USING INDEX ...
        while !matches!(
            self.current(),
            Token::Comma | Token::RParen | Token::Semicolon | Token::Eof
        ) {
            if self.current() == &Token::LParen {
                self.skip_parenthesized()?;
            } else {
                self.advance();
            }
        }

        Ok(constraint)
    }

    fn parse_name_list(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut names = Vec::new();

        loop {
            let name = self.expect_name("column name")?;
            names.push(Node::String(name));
            // Index prefix lengths and sort orders: col(10) DESC
            if self.current() == &Token::LParen {
                self.skip_parenthesized()?;
            }
            self.eat_word("asc");
            self.eat_word("desc");
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        self.expect(Token::RParen, "')' closing column list")?;
        Ok(names)
    }

    fn parse_alter(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // ALTER

        if !self.eat(&Token::Table) {
            let tag = format!("ALTER {}", statement_tag(self.current()));
            self.skip_statement();
            return Ok(Statement::Other(tag));
        }

        if self.eat(&Token::If) {
            self.expect(Token::Exists, "EXISTS")?;
        }
        self.eat(&Token::Only);

        let relation = self.parse_range_var()?;

        let mut cmds = Vec::new();
        loop {
            cmds.push(self.parse_alter_cmd()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        if !matches!(self.current(), Token::Semicolon | Token::Eof) {
            return Err(self.error("',' or ';' after ALTER TABLE command"));
        }

        Ok(Statement::AlterTable(AlterTableStmt { relation, cmds }))
    }

    fn parse_alter_cmd(&mut self) -> Result<AlterTableCmd, ParseError> {
        match self.current() {
            Token::Add => {
                self.advance();
                if matches!(
                    self.current(),
                    Token::Constraint | Token::Primary | Token::Foreign | Token::Unique | Token::Check
                ) || self.current().is_word("exclude")
                {
                    let constraint = self.parse_table_constraint()?;
                    return Ok(AlterTableCmd {
                        subtype: AlterTableType::AddConstraint,
                        name: constraint.conname.clone(),
                        def: Some(AlterDef::Constraint(constraint)),
                    });
                }

                self.eat(&Token::Column);
                if self.eat(&Token::If) {
                    self.expect(Token::Not, "NOT")?;
                    self.expect(Token::Exists, "EXISTS")?;
                }
                let column = self.parse_column_def()?;
                Ok(AlterTableCmd {
                    subtype: AlterTableType::AddColumn,
                    name: Some(column.colname.clone()),
                    def: Some(AlterDef::Column(column)),
                })
            }
            Token::Drop => {
                self.advance();
                let subtype = if self.eat(&Token::Constraint) {
                    AlterTableType::DropConstraint
                } else {
                    self.eat(&Token::Column);
                    AlterTableType::DropColumn
                };
                if self.eat(&Token::If) {
                    self.expect(Token::Exists, "EXISTS")?;
                }
                let name = self.current().identifier();
                self.skip_element();
                Ok(AlterTableCmd {
                    subtype,
                    name,
                    def: None,
                })
            }
            _ => {
                self.skip_element();
                Ok(AlterTableCmd {
                    subtype: AlterTableType::Other,
                    name: None,
                    def: None,
                })
            }
        }
    }

    fn skip_on_actions(&mut self) {
        while self.current() == &Token::On {
            self.advance();
            // DELETE or UPDATE
            if matches!(self.current(), Token::Delete | Token::Update) {
                self.advance();
            }
            // Action: CASCADE, RESTRICT, SET NULL, SET DEFAULT, NO ACTION
            match self.current() {
                Token::Cascade | Token::Restrict => {
                    self.advance();
                }
                tok if tok.is_word("set") => {
                    self.advance();
                    if matches!(self.current(), Token::Null | Token::Default) {
                        self.advance();
                    }
                }
                tok if tok.is_word("no") => {
                    self.advance();
                    self.eat_word("action");
                }
                _ => {}
            }
        }
    }

    /// Skip one default expression: a literal, a call or a parenthesised
    /// expression. Trailing cast words are dropped by the constraint loop.
    fn skip_default_expr(&mut self) {
        match self.current() {
            Token::LParen => {
                // Unbalanced input is reported by the enclosing list
                let _ = self.skip_parenthesized();
            }
            Token::Eof | Token::Comma | Token::RParen | Token::Semicolon => {}
            _ => {
                self.advance();
                if self.current() == &Token::LParen {
                    let _ = self.skip_parenthesized();
                }
            }
        }
    }

    fn skip_parenthesized(&mut self) -> Result<(), ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => return Err(ParseError::UnexpectedEof),
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Skip to the next `,` or `)` at the current nesting depth.
    fn skip_element(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => return,
                Token::RParen => depth -= 1,
                Token::Comma if depth == 0 => return,
                Token::Semicolon | Token::Eof => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        self.eat(&Token::Semicolon);
    }
}

fn statement_tag(token: &Token) -> String {
    match token {
        Token::Ident(s) => s.to_uppercase(),
        other => format!("{other:?}").to_uppercase(),
    }
}
