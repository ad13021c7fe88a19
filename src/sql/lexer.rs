//! SQL lexer for tokenizing DDL scripts.

use std::iter::Peekable;
use std::str::Chars;

/// SQL token types.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Create,
    Alter,
    Add,
    Drop,
    Table,
    Column,
    Only,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    On,
    Delete,
    Update,
    Cascade,
    Restrict,
    Constraint,
    Index,
    If,
    Exists,
    Check,

    // Identifiers and literals
    Ident(String),
    /// `"…"` or `` `…` `` identifier, kept exactly as written.
    QuotedIdent(String),
    Str(String),
    Num(String),

    // Symbols
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Dot,

    // End of input
    Eof,
}

impl Token {
    /// Text usable as a name: identifiers plus keywords PostgreSQL does not
    /// reserve, so columns called `key` or `update` still parse.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Token::Ident(s) | Token::QuotedIdent(s) => Some(s),
            Token::Key => Some("key"),
            Token::Add => Some("add"),
            Token::Drop => Some("drop"),
            Token::Column => Some("column"),
            Token::Only => Some("only"),
            Token::Delete => Some("delete"),
            Token::Update => Some("update"),
            Token::Cascade => Some("cascade"),
            Token::Restrict => Some("restrict"),
            Token::Index => Some("index"),
            Token::If => Some("if"),
            Token::Exists => Some("exists"),
            _ => None,
        }
    }

    /// Name as the catalog stores it: unquoted names fold to lower case,
    /// quoted names are kept verbatim.
    pub fn identifier(&self) -> Option<String> {
        match self {
            Token::QuotedIdent(s) => Some(s.clone()),
            other => other.as_name().map(str::to_lowercase),
        }
    }

    /// Whether this is an unquoted identifier equal to `word`, ignoring case.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(word))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unterminated quoted identifier")]
    UnterminatedIdentifier,
    #[error("Unterminated dollar-quoted string ${0}$")]
    UnterminatedDollarString(String),
    #[error("Unterminated block comment")]
    UnterminatedComment,
}

/// SQL lexer.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self { chars, current_char }
    }

    fn advance(&mut self) {
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            self.advance();
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        self.advance(); // skip *
        while let Some(c) = self.current_char {
            self.advance();
            if c == '*' && self.current_char == Some('/') {
                self.advance();
                return Ok(());
            }
        }
        Err(LexError::UnterminatedComment)
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    fn read_quoted(&mut self, quote: char) -> Option<String> {
        self.advance(); // skip opening quote
        let mut s = String::new();
        while let Some(c) = self.current_char {
            self.advance();
            if c == quote {
                // Doubled quote is an escaped quote
                if self.current_char == Some(quote) {
                    s.push(c);
                    self.advance();
                } else {
                    return Some(s);
                }
            } else {
                s.push(c);
            }
        }
        None
    }

    fn read_dollar_string(&mut self) -> Result<String, LexError> {
        self.advance(); // skip opening $
        let mut tag = String::new();
        while let Some(c) = self.current_char {
            self.advance();
            if c == '$' {
                break;
            }
            tag.push(c);
        }

        let closing: Vec<char> = format!("${tag}$").chars().collect();
        let mut body: Vec<char> = Vec::new();
        while let Some(c) = self.current_char {
            body.push(c);
            self.advance();
            if body.ends_with(&closing) {
                body.truncate(body.len() - closing.len());
                return Ok(body.into_iter().collect());
            }
        }
        Err(LexError::UnterminatedDollarString(tag))
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        let mut has_dot = false;

        if self.current_char == Some('-') {
            num.push('-');
            self.advance();
        }

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    fn keyword_or_ident(s: String) -> Token {
        match s.to_uppercase().as_str() {
            "CREATE" => Token::Create,
            "ALTER" => Token::Alter,
            "ADD" => Token::Add,
            "DROP" => Token::Drop,
            "TABLE" => Token::Table,
            "COLUMN" => Token::Column,
            "ONLY" => Token::Only,
            "PRIMARY" => Token::Primary,
            "KEY" => Token::Key,
            "FOREIGN" => Token::Foreign,
            "REFERENCES" => Token::References,
            "NOT" => Token::Not,
            "NULL" => Token::Null,
            "UNIQUE" => Token::Unique,
            "DEFAULT" => Token::Default,
            "ON" => Token::On,
            "DELETE" => Token::Delete,
            "UPDATE" => Token::Update,
            "CASCADE" => Token::Cascade,
            "RESTRICT" => Token::Restrict,
            "CONSTRAINT" => Token::Constraint,
            "INDEX" => Token::Index,
            "IF" => Token::If,
            "EXISTS" => Token::Exists,
            "CHECK" => Token::Check,
            _ => Token::Ident(s),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();

            let Some(c) = self.current_char else {
                return Ok(Token::Eof);
            };

            let token = match c {
                '-' if self.peek() == Some(&'-') => {
                    self.skip_line_comment();
                    continue;
                }
                '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                    Token::Num(self.read_number())
                }
                '/' if self.peek() == Some(&'*') => {
                    self.advance();
                    self.skip_block_comment()?;
                    continue;
                }
                '#' => {
                    self.skip_line_comment();
                    continue;
                }
                '$' if self
                    .peek()
                    .is_some_and(|c| *c == '$' || c.is_alphabetic() || *c == '_') =>
                {
                    Token::Str(self.read_dollar_string()?)
                }
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                ',' => self.single(Token::Comma),
                ';' => self.single(Token::Semicolon),
                '.' => self.single(Token::Dot),
                '"' | '`' => Token::QuotedIdent(
                    self.read_quoted(c)
                        .ok_or(LexError::UnterminatedIdentifier)?,
                ),
                '\'' => Token::Str(self.read_quoted(c).ok_or(LexError::UnterminatedString)?),
                c if c.is_ascii_digit() => Token::Num(self.read_number()),
                c if c.is_alphabetic() || c == '_' => {
                    let ident = self.read_identifier();
                    Self::keyword_or_ident(ident)
                }
                _ => {
                    // Operators and casts carry no structure we need
                    self.advance();
                    continue;
                }
            };
            return Ok(token);
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Collect all tokens, ending with [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(sql: &str) -> Vec<Token> {
        Lexer::new(sql).tokenize().unwrap()
    }

    #[test]
    fn test_simple_create_table() {
        let tokens = lex("CREATE TABLE users (id INT);");

        assert_eq!(tokens[0], Token::Create);
        assert_eq!(tokens[1], Token::Table);
        assert_eq!(tokens[2], Token::Ident("users".to_string()));
        assert_eq!(tokens[3], Token::LParen);
        assert_eq!(tokens[4], Token::Ident("id".to_string()));
        assert_eq!(tokens[5], Token::Ident("INT".to_string()));
        assert_eq!(tokens[6], Token::RParen);
        assert_eq!(tokens[7], Token::Semicolon);
        assert_eq!(tokens[8], Token::Eof);
    }

    #[test]
    fn test_quoted_identifiers() {
        let tokens = lex(r#"CREATE TABLE "User ""Table""" (`column name` INT);"#);

        assert_eq!(tokens[2], Token::QuotedIdent("User \"Table\"".to_string()));
        assert_eq!(tokens[4], Token::QuotedIdent("column name".to_string()));
    }

    #[test]
    fn test_identifier_case_folding() {
        let tokens = lex(r#"Users "Users" KEY"#);

        assert_eq!(tokens[0].identifier().as_deref(), Some("users"));
        assert_eq!(tokens[1].identifier().as_deref(), Some("Users"));
        assert_eq!(tokens[2].identifier().as_deref(), Some("key"));
        assert!(!Token::QuotedIdent("set".to_string()).is_word("set"));
    }

    #[test]
    fn test_comments() {
        let tokens = lex("-- comment\nCREATE /* block */ TABLE t (id INT); # trailing");

        assert_eq!(tokens[0], Token::Create);
        assert_eq!(tokens[1], Token::Table);
        assert_eq!(tokens.last(), Some(&Token::Eof));
    }

    #[test]
    fn test_dollar_quoted_body() {
        let tokens = lex("CREATE FUNCTION f() AS $body$ SELECT 1; $body$;");

        assert!(tokens.contains(&Token::Str(" SELECT 1; ".to_string())));
        assert_eq!(tokens[tokens.len() - 2], Token::Semicolon);
    }

    #[test]
    fn test_numbers_and_brackets() {
        let tokens = lex("DEFAULT -1 NUMERIC(10,2) int[]");

        assert_eq!(tokens[1], Token::Num("-1".to_string()));
        assert_eq!(tokens[4], Token::Num("10".to_string()));
        assert_eq!(tokens[6], Token::Num("2".to_string()));
        assert_eq!(tokens[9], Token::LBracket);
        assert_eq!(tokens[10], Token::RBracket);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("DEFAULT 'abc").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = Lexer::new("CREATE /* oops").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedComment));
    }

    #[test]
    fn test_unreserved_keyword_as_name() {
        assert_eq!(Token::Key.as_name(), Some("key"));
        assert_eq!(Token::Primary.as_name(), None);
        assert!(Token::Ident("Set".to_string()).is_word("SET"));
    }
}
