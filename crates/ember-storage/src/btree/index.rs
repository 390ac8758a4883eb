//! Typed index over tagged keys.

use super::iter::Iter;
use super::tree::BTree;
use ember_common::config::IndexConfig;
use ember_common::types::{Key, KeyKind, Value};
use ember_common::{EmberError, Result};

#[derive(Debug, Clone)]
enum TypedTree {
    Integer(BTree<i64, Value>),
    String(BTree<String, Value>),
}

/// A B-tree index whose key kind is chosen at construction.
///
/// Every operation takes a tagged `Key`. A key of the other kind is
/// rejected with `TypeMismatch` before the tree is touched.
#[derive(Debug, Clone)]
pub struct Index {
    tree: TypedTree,
}

fn mismatch(expected: KeyKind, key: &Key) -> EmberError {
    EmberError::TypeMismatch {
        expected: expected.to_string(),
        actual: key.kind().to_string(),
    }
}

/// Runs `$body` against the concrete tree bound as `$tree`, with the key
/// unwrapped to the matching Rust type as `$k`.
macro_rules! with_key {
    ($self:expr, $key:expr, |$tree:ident, $k:ident| $body:expr) => {{
        let kind = $self.kind();
        match (&$self.tree, $key) {
            (TypedTree::Integer($tree), Key::Integer($k)) => Ok($body),
            (TypedTree::String($tree), Key::String($k)) => Ok($body),
            _ => Err(mismatch(kind, $key)),
        }
    }};
}

macro_rules! with_key_mut {
    ($self:expr, $key:expr, |$tree:ident, $k:ident| $body:expr) => {{
        let kind = $self.kind();
        match (&mut $self.tree, $key) {
            (TypedTree::Integer($tree), Key::Integer($k)) => Ok($body),
            (TypedTree::String($tree), Key::String($k)) => Ok($body),
            _ => Err(mismatch(kind, $key)),
        }
    }};
}

impl Index {
    /// Creates an empty index. Fails with `ConfigError` when the order is
    /// below 3.
    pub fn new(kind: KeyKind, config: &IndexConfig) -> Result<Self> {
        let tree = match kind {
            KeyKind::Integer => TypedTree::Integer(BTree::with_config(config)?),
            KeyKind::String => TypedTree::String(BTree::with_config(config)?),
        };
        Ok(Self { tree })
    }

    pub fn kind(&self) -> KeyKind {
        match self.tree {
            TypedTree::Integer(_) => KeyKind::Integer,
            TypedTree::String(_) => KeyKind::String,
        }
    }

    /// Inserts or overwrites; returns the previous value when overwriting.
    pub fn insert(&mut self, key: Key, value: Value) -> Result<Option<Value>> {
        let kind = self.kind();
        match (&mut self.tree, key) {
            (TypedTree::Integer(tree), Key::Integer(k)) => Ok(tree.insert(k, value)),
            (TypedTree::String(tree), Key::String(k)) => Ok(tree.insert(k, value)),
            (_, key) => Err(mismatch(kind, &key)),
        }
    }

    pub fn search(&self, key: &Key) -> Result<Option<Value>> {
        with_key!(self, key, |tree, k| tree.search(k).cloned())
    }

    pub fn contains(&self, key: &Key) -> Result<bool> {
        with_key!(self, key, |tree, k| tree.contains_key(k))
    }

    /// Overwrites the value of an existing key. Returns false, changing
    /// nothing, when the key is absent.
    pub fn update(&mut self, key: &Key, value: Value) -> Result<bool> {
        with_key_mut!(self, key, |tree, k| match tree.get_mut(k) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        })
    }

    pub fn remove(&mut self, key: &Key) -> Result<Option<Value>> {
        with_key_mut!(self, key, |tree, k| tree.remove(k))
    }

    /// Removes `key`. Returns false when it was absent.
    pub fn delete(&mut self, key: &Key) -> Result<bool> {
        Ok(self.remove(key)?.is_some())
    }

    /// All entries in ascending key order.
    pub fn iter_sorted(&self) -> IndexIter<'_> {
        match &self.tree {
            TypedTree::Integer(tree) => IndexIter::Integer(tree.iter()),
            TypedTree::String(tree) => IndexIter::String(tree.iter()),
        }
    }

    pub fn len(&self) -> usize {
        match &self.tree {
            TypedTree::Integer(tree) => tree.len(),
            TypedTree::String(tree) => tree.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn height(&self) -> usize {
        match &self.tree {
            TypedTree::Integer(tree) => tree.height(),
            TypedTree::String(tree) => tree.height(),
        }
    }

    pub fn check_invariants(&self) -> Result<()> {
        match &self.tree {
            TypedTree::Integer(tree) => tree.check_invariants(),
            TypedTree::String(tree) => tree.check_invariants(),
        }
    }

    pub fn clear(&mut self) {
        match &mut self.tree {
            TypedTree::Integer(tree) => tree.clear(),
            TypedTree::String(tree) => tree.clear(),
        }
    }
}

/// Sorted iterator over an `Index`, yielding owned tagged keys.
pub enum IndexIter<'a> {
    Integer(Iter<'a, i64, Value>),
    String(Iter<'a, String, Value>),
}

impl Iterator for IndexIter<'_> {
    type Item = (Key, Value);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            IndexIter::Integer(iter) => iter.next().map(|(k, v)| (Key::Integer(*k), v.clone())),
            IndexIter::String(iter) => iter.next().map(|(k, v)| (Key::String(k.clone()), v.clone())),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            IndexIter::Integer(iter) => iter.size_hint(),
            IndexIter::String(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for IndexIter<'_> {}
