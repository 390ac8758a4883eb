//! B-tree node layout.

use super::arena::NodeId;
use std::borrow::Borrow;

/// A key with its value. Pairs live at every level of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Pair<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// An ordered run of pairs plus, for internal nodes, one more child than
/// pairs. Leaves carry a non-owning link to the next leaf in key order.
#[derive(Debug, Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) pairs: Vec<Pair<K, V>>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) is_leaf: bool,
    pub(crate) next_leaf: Option<NodeId>,
}

impl<K, V> Node<K, V> {
    /// Empty leaf with room for `max_pairs` pairs.
    pub(crate) fn leaf(max_pairs: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(max_pairs),
            children: Vec::new(),
            is_leaf: true,
            next_leaf: None,
        }
    }

    /// Empty internal node with room for `max_pairs` pairs.
    pub(crate) fn internal(max_pairs: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(max_pairs),
            children: Vec::with_capacity(max_pairs + 1),
            is_leaf: false,
            next_leaf: None,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Position of `key`: `Ok(i)` when `pairs[i]` holds it, otherwise
    /// `Err(i)` with `i` the first pair greater than `key` (and so the
    /// child whose subtree would hold it).
    #[inline]
    pub(crate) fn find<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.pairs.binary_search_by(|pair| pair.key.borrow().cmp(key))
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.pairs.iter().map(|pair| &pair.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_with(keys: &[i64]) -> Node<i64, ()> {
        let mut node = Node::leaf(4);
        node.pairs = keys.iter().map(|&k| Pair::new(k, ())).collect();
        node
    }

    #[test]
    fn test_find_positions() {
        let node = leaf_with(&[10, 20, 30]);
        assert_eq!(node.find(&20), Ok(1));
        assert_eq!(node.find(&5), Err(0));
        assert_eq!(node.find(&25), Err(2));
        assert_eq!(node.find(&99), Err(3));
    }

    #[test]
    fn test_find_borrowed_str() {
        let mut node: Node<String, u8> = Node::leaf(4);
        node.pairs.push(Pair::new("apple".to_string(), 1));
        node.pairs.push(Pair::new("pear".to_string(), 2));
        assert_eq!(node.find("pear"), Ok(1));
        assert_eq!(node.find("banana"), Err(1));
    }

    #[test]
    fn test_new_nodes() {
        let leaf: Node<i64, ()> = Node::leaf(3);
        assert!(leaf.is_leaf);
        assert_eq!(leaf.len(), 0);
        assert!(leaf.next_leaf.is_none());

        let internal: Node<i64, ()> = Node::internal(3);
        assert!(!internal.is_leaf);
        assert!(internal.children.capacity() >= 4);
        assert_eq!(leaf_with(&[1, 2]).keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
