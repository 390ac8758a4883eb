//! B-tree removal and rebalancing.
//!
//! Removal descends from the root and, before entering a child holding
//! only `min_pairs` pairs, tops it up by borrowing through the parent from
//! a sibling or by merging it with a sibling. A key found in an internal
//! node is replaced by its predecessor or successor, which is then removed
//! from the leaf level by the same descent.

use super::arena::NodeId;
use super::node::Pair;
use super::tree::BTree;
use std::borrow::Borrow;
use tracing::{debug, trace};

impl<K: Ord, V> BTree<K, V> {
    /// Removes `key`, returning its value. Absent keys leave the tree
    /// untouched.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if !self.contains_key(key) {
            return None;
        }

        let removed = self.remove_from(self.root, key);

        let root = &self.arena[self.root];
        if root.pairs.is_empty() && !root.is_leaf {
            let old_root = self.root;
            self.root = root.children[0];
            self.arena.release(old_root);
            debug!(root = %self.root, height = self.height(), "root collapsed, tree shrank");
        }

        if removed.is_some() {
            self.len -= 1;
        }
        removed.map(|pair| pair.value)
    }

    /// Removes `key`. Returns false when it was absent.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove(key).is_some()
    }

    fn remove_from<Q>(&mut self, id: NodeId, key: &Q) -> Option<Pair<K, V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = &self.arena[id];
        let idx = node.pairs.partition_point(|p| p.key.borrow() < key);
        let found = node
            .pairs
            .get(idx)
            .is_some_and(|p| p.key.borrow() == key);

        if found {
            if node.is_leaf {
                return Some(self.arena[id].pairs.remove(idx));
            }
            return self.remove_from_internal(id, idx, key);
        }
        if node.is_leaf {
            return None;
        }

        let last = idx == node.len();
        if self.arena[node.children[idx]].len() <= self.min_pairs {
            self.fill(id, idx);
        }

        // Filling the last child may have merged it into its left sibling
        let node = &self.arena[id];
        let child = if last && idx > node.len() {
            node.children[idx - 1]
        } else {
            node.children[idx]
        };
        self.remove_from(child, key)
    }

    fn remove_from_internal<Q>(&mut self, id: NodeId, idx: usize, key: &Q) -> Option<Pair<K, V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = &self.arena[id];
        let left = node.children[idx];
        let right = node.children[idx + 1];

        if self.arena[left].len() > self.min_pairs {
            let predecessor = self.take_predecessor(id, idx);
            return Some(std::mem::replace(&mut self.arena[id].pairs[idx], predecessor));
        }
        if self.arena[right].len() > self.min_pairs {
            let successor = self.take_successor(id, idx);
            return Some(std::mem::replace(&mut self.arena[id].pairs[idx], successor));
        }

        self.merge(id, idx);
        self.remove_from(left, key)
    }

    /// Removes and returns the largest pair under `children[idx]`, keeping
    /// every node on the way at least `min_pairs + 1` full.
    fn take_predecessor(&mut self, parent: NodeId, idx: usize) -> Pair<K, V> {
        let mut id = self.arena[parent].children[idx];
        loop {
            let node = &self.arena[id];
            if node.is_leaf {
                let node = &mut self.arena[id];
                let last = node.pairs.len() - 1;
                return node.pairs.remove(last);
            }
            let last = node.len();
            if self.arena[node.children[last]].len() <= self.min_pairs {
                self.fill(id, last);
            }
            let node = &self.arena[id];
            id = node.children[node.children.len() - 1];
        }
    }

    /// Removes and returns the smallest pair under `children[idx + 1]`.
    fn take_successor(&mut self, parent: NodeId, idx: usize) -> Pair<K, V> {
        let mut id = self.arena[parent].children[idx + 1];
        loop {
            let node = &self.arena[id];
            if node.is_leaf {
                return self.arena[id].pairs.remove(0);
            }
            if self.arena[node.children[0]].len() <= self.min_pairs {
                self.fill(id, 0);
            }
            id = self.arena[id].children[0];
        }
    }

    /// Brings `children[idx]` of `parent` above `min_pairs`.
    fn fill(&mut self, parent: NodeId, idx: usize) {
        let node = &self.arena[parent];
        let num_pairs = node.len();

        if idx > 0 && self.arena[node.children[idx - 1]].len() > self.min_pairs {
            self.borrow_from_prev(parent, idx);
        } else if idx < num_pairs && self.arena[node.children[idx + 1]].len() > self.min_pairs {
            self.borrow_from_next(parent, idx);
        } else if idx < num_pairs {
            self.merge(parent, idx);
        } else {
            self.merge(parent, idx - 1);
        }
    }

    /// Rotates the left sibling's last pair up into the parent and the
    /// parent's separator down into the front of `children[idx]`.
    fn borrow_from_prev(&mut self, parent: NodeId, idx: usize) {
        let child_id = self.arena[parent].children[idx];
        let sibling_id = self.arena[parent].children[idx - 1];

        let sibling = &mut self.arena[sibling_id];
        let last = sibling.pairs.len() - 1;
        let moved_pair = sibling.pairs.remove(last);
        let moved_child = if sibling.is_leaf {
            None
        } else {
            let last = sibling.children.len() - 1;
            Some(sibling.children.remove(last))
        };

        let separator = std::mem::replace(&mut self.arena[parent].pairs[idx - 1], moved_pair);

        let child = &mut self.arena[child_id];
        child.pairs.insert(0, separator);
        if let Some(grandchild) = moved_child {
            child.children.insert(0, grandchild);
        }

        trace!(node = %child_id, from = %sibling_id, "borrowed from left sibling");
    }

    /// Rotates the right sibling's first pair up into the parent and the
    /// parent's separator down onto the end of `children[idx]`.
    fn borrow_from_next(&mut self, parent: NodeId, idx: usize) {
        let child_id = self.arena[parent].children[idx];
        let sibling_id = self.arena[parent].children[idx + 1];

        let sibling = &mut self.arena[sibling_id];
        let moved_pair = sibling.pairs.remove(0);
        let moved_child = if sibling.is_leaf {
            None
        } else {
            Some(sibling.children.remove(0))
        };

        let separator = std::mem::replace(&mut self.arena[parent].pairs[idx], moved_pair);

        let child = &mut self.arena[child_id];
        child.pairs.push(separator);
        if let Some(grandchild) = moved_child {
            child.children.push(grandchild);
        }

        trace!(node = %child_id, from = %sibling_id, "borrowed from right sibling");
    }

    /// Folds the separator at `idx` and all of `children[idx + 1]` into
    /// `children[idx]`, then releases the emptied sibling.
    fn merge(&mut self, parent: NodeId, idx: usize) {
        let parent_node = &mut self.arena[parent];
        let separator = parent_node.pairs.remove(idx);
        let child_id = parent_node.children[idx];
        let sibling_id = parent_node.children.remove(idx + 1);

        let sibling = self.arena.release(sibling_id);
        let child = &mut self.arena[child_id];
        child.pairs.push(separator);
        child.pairs.extend(sibling.pairs);
        child.children.extend(sibling.children);
        if child.is_leaf {
            child.next_leaf = sibling.next_leaf;
        }
        debug_assert!(child.len() <= self.max_pairs);

        debug!(node = %child_id, absorbed = %sibling_id, "merged nodes");
    }
}
