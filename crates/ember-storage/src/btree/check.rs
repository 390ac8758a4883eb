//! Structural validation and inspection of a B-tree.

use super::arena::NodeId;
use super::tree::BTree;
use ember_common::{EmberError, Result};

fn corrupted(message: String) -> EmberError {
    EmberError::IndexCorrupted(message)
}

/// State gathered while walking the tree depth first.
struct Walk {
    leaf_depth: Option<usize>,
    leaves: Vec<NodeId>,
    nodes: usize,
    pairs: usize,
}

impl<K: Ord, V> BTree<K, V> {
    /// Verifies every structural invariant of the tree:
    ///
    /// - non-root nodes hold `min_pairs..=max_pairs` pairs, the root at most `max_pairs`
    /// - internal nodes hold one more child than pairs, leaves hold none
    /// - keys are strictly increasing within a node and respect the
    ///   separators of every ancestor
    /// - all leaves sit at the same depth
    /// - the leaf chain visits exactly the leaves, left to right
    /// - no node is unreachable and `len()` matches the stored pairs
    pub fn check_invariants(&self) -> Result<()> {
        let mut walk = Walk {
            leaf_depth: None,
            leaves: Vec::new(),
            nodes: 0,
            pairs: 0,
        };
        self.check_node(self.root, 0, None, None, &mut walk)?;

        let mut chained = Vec::with_capacity(walk.leaves.len());
        let mut next = walk.leaves.first().copied();
        while let Some(id) = next {
            if chained.len() >= walk.leaves.len() {
                return Err(corrupted("leaf chain is longer than the leaf level".to_string()));
            }
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| corrupted(format!("leaf chain points at dead {}", id)))?;
            chained.push(id);
            next = node.next_leaf;
        }
        if chained != walk.leaves {
            return Err(corrupted(format!(
                "leaf chain {:?} does not match leaf order {:?}",
                chained, walk.leaves
            )));
        }

        if walk.nodes != self.arena.live() {
            return Err(corrupted(format!(
                "{} live nodes but only {} reachable",
                self.arena.live(),
                walk.nodes
            )));
        }
        if walk.pairs != self.len {
            return Err(corrupted(format!(
                "len is {} but the tree stores {} pairs",
                self.len, walk.pairs
            )));
        }
        Ok(())
    }

    fn check_node(
        &self,
        id: NodeId,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
        walk: &mut Walk,
    ) -> Result<()> {
        let node = self
            .arena
            .get(id)
            .ok_or_else(|| corrupted(format!("{} is referenced but not live", id)))?;
        walk.nodes += 1;
        walk.pairs += node.len();

        let is_root = id == self.root;
        if node.len() > self.max_pairs || (!is_root && node.len() < self.min_pairs) {
            return Err(corrupted(format!(
                "{} holds {} pairs, allowed {}..={}",
                id,
                node.len(),
                if is_root { 0 } else { self.min_pairs },
                self.max_pairs
            )));
        }

        if node.pairs.windows(2).any(|w| w[0].key >= w[1].key) {
            return Err(corrupted(format!("{} keys are not strictly increasing", id)));
        }
        if let (Some(lower), Some(first)) = (lower, node.pairs.first()) {
            if first.key <= *lower {
                return Err(corrupted(format!("{} has a key below its separator", id)));
            }
        }
        if let (Some(upper), Some(last)) = (upper, node.pairs.last()) {
            if last.key >= *upper {
                return Err(corrupted(format!("{} has a key above its separator", id)));
            }
        }

        if node.is_leaf {
            if !node.children.is_empty() {
                return Err(corrupted(format!("leaf {} has children", id)));
            }
            match walk.leaf_depth {
                None => walk.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(corrupted(format!(
                        "leaf {} at depth {}, expected {}",
                        id, depth, expected
                    )));
                }
                Some(_) => {}
            }
            walk.leaves.push(id);
            return Ok(());
        }

        if node.children.len() != node.len() + 1 {
            return Err(corrupted(format!(
                "{} has {} pairs but {} children",
                id,
                node.len(),
                node.children.len()
            )));
        }
        if node.next_leaf.is_some() {
            return Err(corrupted(format!("internal {} has a leaf link", id)));
        }

        for (i, &child) in node.children.iter().enumerate() {
            let child_lower = if i == 0 { lower } else { Some(&node.pairs[i - 1].key) };
            let child_upper = node.pairs.get(i).map(|p| &p.key).or(upper);
            self.check_node(child, depth + 1, child_lower, child_upper, walk)?;
        }
        Ok(())
    }

    /// Keys of every node, level by level from the root, left to right.
    pub fn levels(&self) -> Vec<Vec<Vec<K>>>
    where
        K: Clone,
    {
        let mut levels = Vec::new();
        let mut current = vec![self.root];
        while !current.is_empty() {
            let mut next = Vec::new();
            let mut level = Vec::with_capacity(current.len());
            for id in current {
                let node = &self.arena[id];
                level.push(node.keys().cloned().collect());
                next.extend_from_slice(&node.children);
            }
            levels.push(level);
            current = next;
        }
        levels
    }
}
