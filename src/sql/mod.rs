//! SQL text to parse tree.
//!
//! Only the statement shapes the schema builder consumes are modelled in
//! detail; every other statement is kept as a tagged placeholder.

mod lexer;
mod parser;
pub mod tree;

pub use lexer::{LexError, Token};
pub use parser::{ParseError, parse};
