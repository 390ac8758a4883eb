//! Sorted traversal of a B-tree.

use super::arena::NodeId;
use super::node::Pair;
use super::tree::BTree;
use std::iter::FusedIterator;

/// In-order iterator over `(&K, &V)`.
///
/// Keeps an explicit stack of `(node, next pair)` positions, so each step
/// is amortised O(1) and the iterator never re-descends from the root.
pub struct Iter<'a, K, V> {
    tree: &'a BTree<K, V>,
    stack: Vec<(NodeId, usize)>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(tree: &'a BTree<K, V>) -> Self {
        let mut iter = Self {
            tree,
            stack: Vec::new(),
            remaining: tree.len,
        };
        iter.descend_left(tree.root);
        iter
    }

    fn descend_left(&mut self, mut id: NodeId) {
        loop {
            self.stack.push((id, 0));
            let node = &self.tree.arena[id];
            if node.is_leaf {
                return;
            }
            id = node.children[0];
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let (id, pos) = *self.stack.last()?;
            let node = &tree.arena[id];
            if pos == node.pairs.len() {
                self.stack.pop();
                continue;
            }
            if let Some(top) = self.stack.last_mut() {
                top.1 += 1;
            }
            if !node.is_leaf {
                self.descend_left(node.children[pos + 1]);
            }
            self.remaining -= 1;
            let pair = &node.pairs[pos];
            return Some((&pair.key, &pair.value));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Walks the leaf chain from the leftmost leaf, yielding each leaf's pairs.
///
/// Keys stored in internal nodes are not visited.
pub struct Leaves<'a, K, V> {
    tree: &'a BTree<K, V>,
    next: Option<NodeId>,
}

impl<'a, K, V> Iterator for Leaves<'a, K, V> {
    type Item = &'a [Pair<K, V>];

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let node = &tree.arena[self.next?];
        self.next = node.next_leaf;
        Some(&node.pairs)
    }
}

impl<K, V> FusedIterator for Leaves<'_, K, V> {}

impl<K: Ord, V> BTree<K, V> {
    /// Iterates all pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Iterates the leaves through their next-leaf links.
    pub fn leaves(&self) -> Leaves<'_, K, V> {
        let mut id = self.root;
        while !self.arena[id].is_leaf {
            id = self.arena[id].children[0];
        }
        Leaves {
            tree: self,
            next: Some(id),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a BTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
