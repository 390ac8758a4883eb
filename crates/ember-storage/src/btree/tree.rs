//! B-tree construction, insertion and lookup.

use super::arena::{NodeArena, NodeId};
use super::node::{Node, Pair};
use ember_common::config::IndexConfig;
use ember_common::Result;
use std::borrow::Borrow;
use tracing::debug;

/// An in-memory B-tree map with a fanout fixed at construction.
///
/// Every node holds between `min_pairs` and `max_pairs` pairs (the root may
/// hold fewer), internal nodes hold one more child than pairs, and all
/// leaves sit at the same depth. Inserting splits full nodes on the way
/// down, so a split never has to propagate back up. Removing tops up thin
/// children on the way down, so a merge never has to propagate back up.
#[derive(Debug, Clone)]
pub struct BTree<K, V> {
    pub(crate) arena: NodeArena<K, V>,
    pub(crate) root: NodeId,
    order: usize,
    pub(crate) min_pairs: usize,
    pub(crate) max_pairs: usize,
    pub(crate) len: usize,
}

impl<K: Ord, V> Default for BTree<K, V> {
    fn default() -> Self {
        Self::build(IndexConfig::default().order)
    }
}

impl<K: Ord, V> BTree<K, V> {
    /// Creates an empty tree. Fails with `ConfigError` when `order < 3`.
    ///
    /// Node capacity is `2 * ((order - 1) / 2) + 1` pairs. For even orders
    /// that is `order - 1`; odd orders get one extra pair, so an internal
    /// node may hold `order + 1` children.
    pub fn new(order: usize) -> Result<Self> {
        Self::with_config(&IndexConfig::with_order(order))
    }

    pub fn with_config(config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config.order))
    }

    fn build(order: usize) -> Self {
        let min_pairs = (order - 1) / 2;
        // Both halves of a split and the result of a merge must respect
        // min_pairs, which needs an odd capacity.
        let max_pairs = 2 * min_pairs + 1;
        let mut arena = NodeArena::new();
        let root = arena.alloc(Node::leaf(max_pairs));
        Self {
            arena,
            root,
            order,
            min_pairs,
            max_pairs,
            len: 0,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Fewest pairs a non-root node may hold.
    pub fn min_pairs(&self) -> usize {
        self.min_pairs
    }

    /// Most pairs any node may hold: `order - 1` for even orders, `order`
    /// for odd ones.
    pub fn max_pairs(&self) -> usize {
        self.max_pairs
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels; a lone root leaf has height 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut id = self.root;
        while !self.arena[id].is_leaf {
            id = self.arena[id].children[0];
            height += 1;
        }
        height
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.arena.live()
    }

    /// Drops every entry, leaving an empty root leaf.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = self.arena.alloc(Node::leaf(self.max_pairs));
        self.len = 0;
    }

    /// Finds the node and slot holding `key`.
    fn locate<Q>(&self, key: &Q) -> Option<(NodeId, usize)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut id = self.root;
        loop {
            let node = &self.arena[id];
            match node.find(key) {
                Ok(idx) => return Some((id, idx)),
                Err(_) if node.is_leaf => return None,
                Err(idx) => id = node.children[idx],
            }
        }
    }

    /// Looks up the value stored for `key`.
    pub fn search<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key)
            .map(|(id, idx)| &self.arena[id].pairs[idx].value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key).is_some()
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (id, idx) = self.locate(key)?;
        Some(&mut self.arena[id].pairs[idx].value)
    }

    /// Smallest key and its value.
    pub fn first(&self) -> Option<(&K, &V)> {
        let mut id = self.root;
        while !self.arena[id].is_leaf {
            id = self.arena[id].children[0];
        }
        self.arena[id].pairs.first().map(|p| (&p.key, &p.value))
    }

    /// Largest key and its value.
    pub fn last(&self) -> Option<(&K, &V)> {
        let mut id = self.root;
        while !self.arena[id].is_leaf {
            let node = &self.arena[id];
            id = node.children[node.children.len() - 1];
        }
        self.arena[id].pairs.last().map(|p| (&p.key, &p.value))
    }

    /// Inserts `value` under `key`.
    ///
    /// An existing key keeps its place and has its value replaced; the old
    /// value is returned. A new key returns `None`.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(slot) = self.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }

        if self.arena[self.root].len() == self.max_pairs {
            let old_root = self.root;
            let mut new_root = Node::internal(self.max_pairs);
            new_root.children.push(old_root);
            self.root = self.arena.alloc(new_root);
            self.split_child(self.root, 0);
            debug!(root = %self.root, height = self.height(), "root split, tree grew");
        }

        self.insert_nonfull(self.root, Pair::new(key, value));
        self.len += 1;
        None
    }

    /// Places `pair` in the subtree rooted at `id`, which is not full.
    /// Full children are split before the descent enters them.
    fn insert_nonfull(&mut self, mut id: NodeId, pair: Pair<K, V>) {
        loop {
            let node = &self.arena[id];
            let mut idx = node.pairs.partition_point(|p| p.key < pair.key);

            if node.is_leaf {
                self.arena[id].pairs.insert(idx, pair);
                return;
            }

            let child = node.children[idx];
            if self.arena[child].len() == self.max_pairs {
                self.split_child(id, idx);
                if self.arena[id].pairs[idx].key < pair.key {
                    idx += 1;
                }
            }
            id = self.arena[id].children[idx];
        }
    }

    /// Splits the full child at `parent.children[idx]`.
    ///
    /// The child keeps the pairs before the median, a new sibling takes the
    /// pairs after it, and the median pair moves up into the parent at
    /// `idx` with the sibling linked at `idx + 1`.
    pub(crate) fn split_child(&mut self, parent: NodeId, idx: usize) {
        let child_id = self.arena[parent].children[idx];
        let mid = self.max_pairs.div_ceil(2) - 1;

        let child = &mut self.arena[child_id];
        debug_assert_eq!(child.len(), self.max_pairs);
        let right_pairs = child.pairs.split_off(mid + 1);
        let median = child.pairs.remove(mid);
        let right_children = if child.is_leaf {
            Vec::new()
        } else {
            child.children.split_off(mid + 1)
        };
        let is_leaf = child.is_leaf;

        let mut sibling = if is_leaf {
            Node::leaf(self.max_pairs)
        } else {
            Node::internal(self.max_pairs)
        };
        sibling.pairs.extend(right_pairs);
        sibling.children.extend(right_children);
        if is_leaf {
            sibling.next_leaf = child.next_leaf;
        }

        let sibling_id = self.arena.alloc(sibling);
        if is_leaf {
            self.arena[child_id].next_leaf = Some(sibling_id);
        }

        let parent_node = &mut self.arena[parent];
        parent_node.pairs.insert(idx, median);
        parent_node.children.insert(idx + 1, sibling_id);

        debug!(node = %child_id, sibling = %sibling_id, leaf = is_leaf, "split node");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_common::EmberError;

    fn tree_from(keys: &[i64]) -> BTree<i64, String> {
        let mut tree = BTree::new(4).unwrap();
        for &k in keys {
            tree.insert(k, format!("v{}", k));
        }
        tree
    }

    #[test]
    fn test_rejects_small_order() {
        for order in 0..3 {
            assert!(matches!(
                BTree::<i64, ()>::new(order),
                Err(EmberError::ConfigError(_))
            ));
        }
        assert!(BTree::<i64, ()>::new(3).is_ok());
    }

    #[test]
    fn test_occupancy_bounds_per_order() {
        let cases = [(3, 1, 3), (4, 1, 3), (5, 2, 5), (6, 2, 5), (7, 3, 7), (8, 3, 7)];
        for (order, min, max) in cases {
            let tree = BTree::<i64, ()>::new(order).unwrap();
            assert_eq!(tree.min_pairs(), min, "order {}", order);
            assert_eq!(tree.max_pairs(), max, "order {}", order);
        }
    }

    #[test]
    fn test_odd_order_root_reaches_order_plus_one_children() {
        let mut tree = BTree::new(3).unwrap();
        let mut widest = 0;
        for k in 0..200i64 {
            tree.insert(k, ());
            if tree.height() > 1 {
                widest = widest.max(tree.arena[tree.root].children.len());
            }
        }
        assert_eq!(widest, tree.order() + 1);
        assert!(widest <= tree.max_pairs() + 1);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_empty_tree() {
        let tree = BTree::<i64, ()>::default();
        assert_eq!(tree.order(), 4);
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.search(&1).is_none());
        assert!(tree.first().is_none());
        assert!(tree.last().is_none());
    }

    #[test]
    fn test_insert_splits_root() {
        // 10, 20, 5, 30, 25 => root {10}, children {5} and {20, 25, 30}
        let tree = tree_from(&[10, 20, 5, 30, 25]);
        assert_eq!(tree.levels(), vec![vec![vec![10]], vec![vec![5], vec![20, 25, 30]]]);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.height(), 2);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_splits_child() {
        let tree = tree_from(&[10, 20, 5, 6, 12, 30, 7, 17]);
        assert_eq!(
            tree.levels(),
            vec![
                vec![vec![10, 20]],
                vec![vec![5, 6, 7], vec![12, 17], vec![30]],
            ]
        );
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_search_finds_every_level() {
        let tree = tree_from(&[10, 20, 5, 6, 12, 30, 7, 17]);
        // 10 and 20 only live in the root
        assert_eq!(tree.search(&10).map(String::as_str), Some("v10"));
        assert_eq!(tree.search(&20).map(String::as_str), Some("v20"));
        assert_eq!(tree.search(&6).map(String::as_str), Some("v6"));
        assert!(tree.search(&11).is_none());
        assert!(tree.contains_key(&17));
    }

    #[test]
    fn test_insert_existing_key_overwrites() {
        let mut tree = tree_from(&[10, 20, 5, 30, 25]);
        let before = tree.levels();

        assert_eq!(tree.insert(10, "ten".to_string()), Some("v10".to_string()));
        assert_eq!(tree.insert(25, "quarter".to_string()), Some("v25".to_string()));

        assert_eq!(tree.levels(), before);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.search(&10).map(String::as_str), Some("ten"));
        assert_eq!(tree.search(&25).map(String::as_str), Some("quarter"));
    }

    #[test]
    fn test_get_mut() {
        let mut tree = tree_from(&[1, 2, 3, 4]);
        tree.get_mut(&3).unwrap().push('!');
        assert_eq!(tree.search(&3).map(String::as_str), Some("v3!"));
        assert!(tree.get_mut(&9).is_none());
    }

    #[test]
    fn test_split_links_leaf_chain() {
        let tree = tree_from(&[10, 20, 5, 6, 12, 30, 7, 17]);
        let leaves: Vec<Vec<i64>> = tree
            .leaves()
            .map(|pairs| pairs.iter().map(|p| p.key).collect())
            .collect();
        assert_eq!(leaves, vec![vec![5, 6, 7], vec![12, 17], vec![30]]);
    }

    #[test]
    fn test_first_last_and_clear() {
        let mut tree = tree_from(&[40, 10, 30, 20, 50, 60, 70]);
        assert_eq!(tree.first().map(|(k, _)| *k), Some(10));
        assert_eq!(tree.last().map(|(k, _)| *k), Some(70));

        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.search(&10).is_none());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_ascending_inserts_odd_order() {
        let mut tree = BTree::new(5).unwrap();
        for k in 0..200i64 {
            assert!(tree.insert(k, k * 2).is_none());
            tree.check_invariants().unwrap();
        }
        assert_eq!(tree.len(), 200);
        for k in 0..200i64 {
            assert_eq!(tree.search(&k), Some(&(k * 2)));
        }
    }

    #[test]
    fn test_string_keys_borrowed_lookup() {
        let mut tree: BTree<String, u32> = BTree::new(3).unwrap();
        for (i, word) in ["kiwi", "apple", "mango", "banana", "cherry"].iter().enumerate() {
            tree.insert(word.to_string(), i as u32);
        }
        assert_eq!(tree.search("banana"), Some(&3));
        assert!(tree.search("grape").is_none());
        assert_eq!(tree.first().map(|(k, _)| k.as_str()), Some("apple"));
        tree.check_invariants().unwrap();
    }
}
