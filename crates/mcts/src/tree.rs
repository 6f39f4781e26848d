//! Transposition table of search nodes.
//!
//! Nodes are keyed by the game's canonical position key, so a position
//! reached through different move orders shares one set of statistics.
//! A table is owned by exactly one `Mcts`, which in turn serves one game.

use crate::node::Node;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
pub struct NodeTable<K, A> {
    nodes: HashMap<K, Node<A>>,
}

impl<K: Eq + Hash, A> NodeTable<K, A> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&Node<A>> {
        self.nodes.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut Node<A>> {
        self.nodes.get_mut(key)
    }

    /// Expanded node for `key`, if one exists.
    pub fn expanded(&self, key: &K) -> Option<&Node<A>> {
        self.nodes.get(key).filter(|n| n.expanded)
    }

    pub fn insert(&mut self, key: K, node: Node<A>) {
        self.nodes.insert(key, node);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<K: Eq + Hash, A> Default for NodeTable<K, A> {
    fn default() -> Self {
        Self::new()
    }
}
