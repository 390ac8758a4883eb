//! Key and value types for emberdb indexes.

use crate::error::{EmberError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Payload stored against a key. Immutable and cheap to clone.
pub type Value = Bytes;

/// The variant a key belongs to. An index holds keys of exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyKind {
    Integer = 1,
    String = 2,
}

impl KeyKind {
    /// Returns the SQL-facing name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            KeyKind::Integer => "INTEGER",
            KeyKind::String => "STRING",
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tagged index key.
///
/// Keys only order against keys of the same variant. Integers compare
/// numerically, strings compare by their UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Integer(i64),
    String(String),
}

impl Key {
    pub fn kind(&self) -> KeyKind {
        match self {
            Key::Integer(_) => KeyKind::Integer,
            Key::String(_) => KeyKind::String,
        }
    }

    /// Three-way comparison. Fails with `TypeMismatch` across variants.
    pub fn compare(&self, other: &Key) -> Result<Ordering> {
        match (self, other) {
            (Key::Integer(a), Key::Integer(b)) => Ok(a.cmp(b)),
            (Key::String(a), Key::String(b)) => Ok(a.as_bytes().cmp(b.as_bytes())),
            _ => Err(EmberError::TypeMismatch {
                expected: self.kind().to_string(),
                actual: other.kind().to_string(),
            }),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Key::Integer(v) => Some(*v),
            Key::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::String(s) => Some(s),
            Key::Integer(_) => None,
        }
    }

    /// Returns a `TypeMismatch` unless this key is of kind `expected`.
    pub fn expect_kind(&self, expected: KeyKind) -> Result<()> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(EmberError::TypeMismatch {
                expected: expected.to_string(),
                actual: self.kind().to_string(),
            })
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other).ok()
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Integer(v)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Integer(v) => write!(f, "{}", v),
            Key::String(s) => write!(f, "'{}'", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ordering() {
        let a = Key::Integer(-5);
        let b = Key::Integer(10);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
        assert_eq!(b.compare(&a).unwrap(), Ordering::Greater);
        assert_eq!(a.compare(&Key::Integer(-5)).unwrap(), Ordering::Equal);
        assert!(a < b);
    }

    #[test]
    fn test_string_ordering_is_bytewise() {
        let upper = Key::from("Zebra");
        let lower = Key::from("apple");
        // 'Z' (0x5A) sorts before 'a' (0x61)
        assert_eq!(upper.compare(&lower).unwrap(), Ordering::Less);
        assert_eq!(
            Key::from("abc").compare(&Key::from("abcd")).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Key::from("").compare(&Key::from("")).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_mixed_variants_rejected() {
        let int_key = Key::Integer(1);
        let str_key = Key::from("1");

        let err = int_key.compare(&str_key).unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch: expected INTEGER, got STRING");
        assert!(int_key.partial_cmp(&str_key).is_none());
        assert!(!(int_key < str_key));
        assert!(!(int_key > str_key));
        assert_ne!(int_key, str_key);
    }

    #[test]
    fn test_kind_and_accessors() {
        assert_eq!(Key::Integer(3).kind(), KeyKind::Integer);
        assert_eq!(Key::from("x").kind(), KeyKind::String);
        assert_eq!(Key::Integer(3).as_integer(), Some(3));
        assert_eq!(Key::Integer(3).as_str(), None);
        assert_eq!(Key::from("x").as_str(), Some("x"));
        assert!(Key::Integer(3).expect_kind(KeyKind::Integer).is_ok());
        assert!(matches!(
            Key::Integer(3).expect_kind(KeyKind::String),
            Err(EmberError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::Integer(42).to_string(), "42");
        assert_eq!(Key::from("bob").to_string(), "'bob'");
        assert_eq!(KeyKind::String.to_string(), "STRING");
    }
}
