//! Schema statement AST.

use ember_common::types::KeyKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    CreateDatabase(CreateDatabase),
    CreateTable(CreateTable),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatabase {
    pub name: String,
}

/// `CREATE TABLE`. Table-level constraints are kept as written and also
/// folded into the flags of the column they name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
}

impl CreateTable {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The first column flagged as primary key.
    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub not_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null: false,
            primary_key: false,
            auto_increment: false,
        }
    }

    pub(crate) fn apply(&mut self, constraint: Constraint) {
        match constraint {
            Constraint::NotNull => self.not_null = true,
            Constraint::PrimaryKey => self.primary_key = true,
            Constraint::AutoIncrement => self.auto_increment = true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Text,
    /// `VARCHAR` with an optional maximum length.
    Varchar(Option<u32>),
}

impl DataType {
    /// Key kind of an index built over a column of this type.
    pub fn key_kind(&self) -> KeyKind {
        match self {
            DataType::Int => KeyKind::Integer,
            DataType::Text | DataType::Varchar(_) => KeyKind::String,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => f.write_str("INT"),
            DataType::Text => f.write_str("TEXT"),
            DataType::Varchar(None) => f.write_str("VARCHAR"),
            DataType::Varchar(Some(n)) => write!(f, "VARCHAR({})", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    NotNull,
    PrimaryKey,
    AutoIncrement,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Constraint::NotNull => "NOT NULL",
            Constraint::PrimaryKey => "PRIMARY KEY",
            Constraint::AutoIncrement => "AUTO_INCREMENT",
        })
    }
}

/// A constraint written after the column list, e.g. `PRIMARY KEY (id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConstraint {
    pub constraint: Constraint,
    pub column: String,
}
