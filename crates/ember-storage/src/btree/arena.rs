//! Slot arena holding B-tree nodes.
//!
//! A `NodeId` plays the role a page number plays for an on-disk tree: the
//! parent stores child ids, leaves store the id of the next leaf. Released
//! slots go on a free list and are handed out again by later allocations.

use super::node::Node;
use std::ops::{Index, IndexMut};

/// Identifier of a node slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline]
    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeArena<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
}

impl<K, V> NodeArena<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Stores a node, reusing a released slot when one is available.
    pub(crate) fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            return id;
        }
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(node));
        id
    }

    /// Removes a node from the arena and returns it.
    pub(crate) fn release(&mut self, id: NodeId) -> Node<K, V> {
        match self.slots.get_mut(id.index()).and_then(Option::take) {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => panic!("released {} which is not a live node", id),
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<K, V>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl<K, V> Index<NodeId> for NodeArena<K, V> {
    type Output = Node<K, V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Node<K, V> {
        match self.slots.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("{} is not a live node", id),
        }
    }
}

impl<K, V> IndexMut<NodeId> for NodeArena<K, V> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match self.slots.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("{} is not a live node", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_alloc_and_reuse() {
        let mut arena: NodeArena<i64, ()> = NodeArena::new();
        let a = arena.alloc(Node::leaf(3));
        let b = arena.alloc(Node::leaf(3));
        assert_eq!(a.as_u32(), 0);
        assert_eq!(b.as_u32(), 1);
        assert_eq!(arena.live(), 2);

        arena.release(a);
        assert_eq!(arena.live(), 1);
        assert!(arena.get(a).is_none());

        let c = arena.alloc(Node::internal(3));
        assert_eq!(c, a, "released slot is reused");
        assert!(!arena[c].is_leaf);
        assert_eq!(arena.live(), 2);
    }

    #[test]
    #[should_panic(expected = "not a live node")]
    fn test_arena_double_release_panics() {
        let mut arena: NodeArena<i64, ()> = NodeArena::new();
        let a = arena.alloc(Node::leaf(3));
        arena.release(a);
        arena.release(a);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "node:7");
    }
}
