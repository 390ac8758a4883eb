//! Token definitions for the schema SQL subset.

use std::fmt;

/// Reserved words. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Create,
    Database,
    Table,
    Int,
    Varchar,
    Text,
    Not,
    Null,
    Primary,
    Key,
    AutoIncrement,
}

impl Keyword {
    pub fn from_ident(ident: &str) -> Option<Self> {
        let keyword = match ident.to_ascii_uppercase().as_str() {
            "CREATE" => Keyword::Create,
            "DATABASE" => Keyword::Database,
            "TABLE" => Keyword::Table,
            "INT" => Keyword::Int,
            "VARCHAR" => Keyword::Varchar,
            "TEXT" => Keyword::Text,
            "NOT" => Keyword::Not,
            "NULL" => Keyword::Null,
            "PRIMARY" => Keyword::Primary,
            "KEY" => Keyword::Key,
            "AUTO_INCREMENT" => Keyword::AutoIncrement,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Create => "CREATE",
            Keyword::Database => "DATABASE",
            Keyword::Table => "TABLE",
            Keyword::Int => "INT",
            Keyword::Varchar => "VARCHAR",
            Keyword::Text => "TEXT",
            Keyword::Not => "NOT",
            Keyword::Null => "NULL",
            Keyword::Primary => "PRIMARY",
            Keyword::Key => "KEY",
            Keyword::AutoIncrement => "AUTO_INCREMENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Keyword(Keyword),
    Ident(&'a str),
    Integer(&'a str),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Error(&'static str),
    Eof,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => f.write_str(k.as_str()),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Integer(s) => write!(f, "integer {}", s),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Semicolon => f.write_str("';'"),
            Token::Error(msg) => f.write_str(msg),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// A token with the line and column (both 1-based) where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub line: usize,
    pub column: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_ignores_case() {
        assert_eq!(Keyword::from_ident("create"), Some(Keyword::Create));
        assert_eq!(Keyword::from_ident("Auto_Increment"), Some(Keyword::AutoIncrement));
        assert_eq!(Keyword::from_ident("users"), None);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token::Keyword(Keyword::Primary).to_string(), "PRIMARY");
        assert_eq!(Token::Ident("id").to_string(), "identifier 'id'");
        assert_eq!(Token::Eof.to_string(), "end of input");
    }
}
