//! Recursive-descent parser for `CREATE DATABASE` and `CREATE TABLE`.
//!
//! ```text
//! statement        := CREATE DATABASE ident ;
//!                   | CREATE TABLE ident ( column_def {, column_def} {, table_constraint} ) ;
//! column_def       := ident type {NOT NULL | PRIMARY KEY | AUTO_INCREMENT}
//! type             := INT | TEXT | VARCHAR [ ( integer ) ]
//! table_constraint := (NOT NULL | PRIMARY KEY | AUTO_INCREMENT) ( ident )
//! ```

use crate::ast::{ColumnDef, Constraint, CreateDatabase, CreateTable, DataType, Statement, TableConstraint};
use crate::lexer::Lexer;
use crate::token::{Keyword, Spanned, Token};
use ember_common::{EmberError, Result};
use std::collections::HashSet;
use tracing::debug;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Spanned<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.current.token, Token::Eof)
    }

    pub fn peek(&self) -> &Token<'a> {
        &self.current.token
    }

    fn advance(&mut self) -> Spanned<'a> {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    fn error_here(&self, message: impl Into<String>) -> EmberError {
        EmberError::parse(self.current.line, self.current.column, message)
    }

    fn unexpected(&self, expected: &str) -> EmberError {
        match self.current.token {
            Token::Error(message) => self.error_here(message),
            found => self.error_here(format!("expected {}, found {}", expected, found)),
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.current.token, Token::Keyword(k) if k == keyword)
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    fn consume_token(&mut self, expected: Token<'_>) -> bool {
        if std::mem::discriminant(&self.current.token) == std::mem::discriminant(&expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, expected: Token<'_>) -> Result<()> {
        if self.consume_token(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn expect_ident(&mut self) -> Result<&'a str> {
        match self.current.token {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Parses every statement up to end of input.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    pub fn parse_statement(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Create)?;
        let statement = if self.consume_keyword(Keyword::Database) {
            Statement::CreateDatabase(self.parse_create_database()?)
        } else if self.consume_keyword(Keyword::Table) {
            Statement::CreateTable(self.parse_create_table()?)
        } else {
            return Err(self.unexpected("DATABASE or TABLE after CREATE"));
        };
        self.expect_token(Token::Semicolon)?;
        debug!(?statement, "parsed statement");
        Ok(statement)
    }

    fn parse_create_database(&mut self) -> Result<CreateDatabase> {
        let name = self.expect_ident()?;
        Ok(CreateDatabase { name: name.to_string() })
    }

    fn parse_create_table(&mut self) -> Result<CreateTable> {
        let name = self.expect_ident()?.to_string();
        self.expect_token(Token::LParen)?;

        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut constraints = Vec::new();
        let mut seen = HashSet::new();

        loop {
            let (line, column) = (self.current.line, self.current.column);
            if let Some(constraint) = self.parse_constraint()? {
                constraints.push(self.parse_table_constraint(constraint, line, column)?);
            } else if constraints.is_empty() {
                let def = self.parse_column_def()?;
                if !seen.insert(def.name.clone()) {
                    return Err(EmberError::parse(
                        line,
                        column,
                        format!("duplicate column '{}'", def.name),
                    ));
                }
                columns.push(def);
            } else {
                return Err(self.unexpected("table constraint"));
            }

            if !self.consume_token(Token::Comma) {
                break;
            }
        }
        self.expect_token(Token::RParen)?;

        for (target, (line, column)) in &constraints {
            let def = columns
                .iter_mut()
                .find(|c| c.name == target.column)
                .ok_or_else(|| {
                    EmberError::parse(
                        *line,
                        *column,
                        format!("{} names unknown column '{}'", target.constraint, target.column),
                    )
                })?;
            def.apply(target.constraint);
        }

        Ok(CreateTable {
            name,
            columns,
            constraints: constraints.into_iter().map(|(c, _)| c).collect(),
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_ident()?;
        let data_type = self.parse_data_type()?;
        let mut def = ColumnDef::new(name, data_type);
        while let Some(constraint) = self.parse_constraint()? {
            def.apply(constraint);
        }
        Ok(def)
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        if self.consume_keyword(Keyword::Int) {
            return Ok(DataType::Int);
        }
        if self.consume_keyword(Keyword::Text) {
            return Ok(DataType::Text);
        }
        if !self.consume_keyword(Keyword::Varchar) {
            return Err(self.unexpected("column type"));
        }
        if !self.consume_token(Token::LParen) {
            return Ok(DataType::Varchar(None));
        }
        let length = match self.current.token {
            Token::Integer(digits) => digits
                .parse::<u32>()
                .map_err(|_| self.error_here(format!("VARCHAR length {} is out of range", digits)))?,
            _ => return Err(self.unexpected("VARCHAR length")),
        };
        self.advance();
        self.expect_token(Token::RParen)?;
        Ok(DataType::Varchar(Some(length)))
    }

    fn parse_constraint(&mut self) -> Result<Option<Constraint>> {
        if self.consume_keyword(Keyword::Not) {
            self.expect_keyword(Keyword::Null)?;
            Ok(Some(Constraint::NotNull))
        } else if self.consume_keyword(Keyword::Primary) {
            self.expect_keyword(Keyword::Key)?;
            Ok(Some(Constraint::PrimaryKey))
        } else if self.consume_keyword(Keyword::AutoIncrement) {
            Ok(Some(Constraint::AutoIncrement))
        } else {
            Ok(None)
        }
    }

    fn parse_table_constraint(
        &mut self,
        constraint: Constraint,
        line: usize,
        column: usize,
    ) -> Result<(TableConstraint, (usize, usize))> {
        self.expect_token(Token::LParen)?;
        let target = self.expect_ident()?.to_string();
        self.expect_token(Token::RParen)?;
        Ok((
            TableConstraint {
                constraint,
                column: target,
            },
            (line, column),
        ))
    }
}
