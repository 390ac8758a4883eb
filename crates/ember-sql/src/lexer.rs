//! Single-pass tokenizer for the schema SQL subset.
//!
//! Identifiers and integers borrow from the input. Whitespace and `--` line
//! comments are skipped. Every token records the line and column where it
//! starts; an unexpected character becomes `Token::Error` at its position.

use crate::token::{Keyword, Spanned, Token};
use ember_common::{EmberError, Result};

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn next_token(&mut self) -> Spanned<'a> {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        let token = self.scan();
        Spanned { token, line, column }
    }

    fn scan(&mut self) -> Token<'a> {
        if self.is_eof() {
            return Token::Eof;
        }

        let ch = self.current();
        if ch.is_ascii_alphabetic() || ch == b'_' {
            return self.scan_identifier_or_keyword();
        }
        if ch.is_ascii_digit() {
            return self.scan_integer();
        }

        self.advance();
        match ch {
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b',' => Token::Comma,
            b';' => Token::Semicolon,
            _ => Token::Error("unexpected character"),
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current(&self) -> u8 {
        self.bytes[self.pos]
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if self.is_eof() {
            return;
        }
        if self.current() == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if self.current() & 0xC0 != 0x80 {
            // Columns count characters, not UTF-8 continuation bytes.
            self.column += 1;
        }
        self.pos += 1;
    }

    fn skip_trivia(&mut self) {
        while !self.is_eof() {
            match self.current() {
                b' ' | b'\t' | b'\r' | b'\n' => self.advance(),
                b'-' if self.peek_char() == Some(b'-') => {
                    while !self.is_eof() && self.current() != b'\n' {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_identifier_or_keyword(&mut self) -> Token<'a> {
        let start = self.pos;
        while !self.is_eof() && (self.current().is_ascii_alphanumeric() || self.current() == b'_') {
            self.advance();
        }
        let ident = &self.input[start..self.pos];
        match Keyword::from_ident(ident) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Ident(ident),
        }
    }

    fn scan_integer(&mut self) -> Token<'a> {
        let start = self.pos;
        while !self.is_eof() && self.current().is_ascii_digit() {
            self.advance();
        }
        if !self.is_eof() && (self.current().is_ascii_alphabetic() || self.current() == b'_') {
            while !self.is_eof() && (self.current().is_ascii_alphanumeric() || self.current() == b'_') {
                self.advance();
            }
            return Token::Error("identifier cannot start with a digit");
        }
        Token::Integer(&self.input[start..self.pos])
    }
}

/// Tokenizes `input` up to and including `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Spanned<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let spanned = lexer.next_token();
        match spanned.token {
            Token::Error(message) => {
                return Err(EmberError::parse(spanned.line, spanned.column, message));
            }
            Token::Eof => {
                tokens.push(spanned);
                return Ok(tokens);
            }
            _ => tokens.push(spanned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_create_database() {
        assert_eq!(
            kinds("CREATE DATABASE users;"),
            vec![
                Token::Keyword(Keyword::Create),
                Token::Keyword(Keyword::Database),
                Token::Ident("users"),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("create Table t"),
            vec![
                Token::Keyword(Keyword::Create),
                Token::Keyword(Keyword::Table),
                Token::Ident("t"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_column_list_tokens() {
        assert_eq!(
            kinds("(id INT NOT NULL, name VARCHAR(255))"),
            vec![
                Token::LParen,
                Token::Ident("id"),
                Token::Keyword(Keyword::Int),
                Token::Keyword(Keyword::Not),
                Token::Keyword(Keyword::Null),
                Token::Comma,
                Token::Ident("name"),
                Token::Keyword(Keyword::Varchar),
                Token::LParen,
                Token::Integer("255"),
                Token::RParen,
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_positions() {
        let tokens = tokenize("-- schema\n  CREATE\n\tDATABASE db; -- trailing").unwrap();
        let positions: Vec<(usize, usize)> = tokens.iter().map(|s| (s.line, s.column)).collect();
        assert_eq!(positions, vec![(2, 3), (3, 2), (3, 11), (3, 13), (3, 26)]);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("CREATE TABLE t (\n  id INT @\n);").unwrap_err();
        match err {
            EmberError::Parse { line, column, message } => {
                assert_eq!((line, column), (2, 10));
                assert_eq!(message, "unexpected character");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_identifier_starting_with_digit() {
        assert!(matches!(tokenize("CREATE DATABASE 9lives;"), Err(EmberError::Parse { .. })));
    }

    #[test]
    fn test_single_dash_is_rejected() {
        assert!(tokenize("- x").is_err());
    }
}
