//! emberdb schema SQL front end.
//!
//! Tokenizes and parses `CREATE DATABASE` / `CREATE TABLE` scripts into a
//! serializable AST.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{ColumnDef, Constraint, CreateDatabase, CreateTable, DataType, Statement, TableConstraint};
pub use lexer::{tokenize, Lexer};
pub use parser::Parser;
pub use token::{Keyword, Spanned, Token};

use ember_common::Result;

/// Parses a script of one or more `;`-terminated statements.
pub fn parse(sql: &str) -> Result<Vec<Statement>> {
    Parser::new(sql).parse_statements()
}
