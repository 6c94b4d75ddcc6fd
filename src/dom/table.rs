//! Element association table.
//!
//! Maps node identity to a value without keeping the node alive. Entries
//! whose node has been dropped are unreachable and get swept on insert.

use std::collections::HashMap;

use super::NodeRef;

pub struct ElementTable<N: NodeRef, V> {
    entries: HashMap<usize, (N::Weak, V)>,
}

impl<N: NodeRef, V> Default for ElementTable<N, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<N: NodeRef, V> ElementTable<N, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity keys can be reused once a node is freed, so every lookup
    /// confirms the stored weak handle still points at `node`.
    fn live(weak: &N::Weak, node: &N) -> bool {
        N::upgrade(weak).is_some_and(|current| current == *node)
    }

    pub fn get(&self, node: &N) -> Option<&V> {
        let (weak, value) = self.entries.get(&node.identity())?;
        Self::live(weak, node).then_some(value)
    }

    pub fn get_mut(&mut self, node: &N) -> Option<&mut V> {
        let (weak, value) = self.entries.get_mut(&node.identity())?;
        if Self::live(weak, node) {
            Some(value)
        } else {
            None
        }
    }

    pub fn contains(&self, node: &N) -> bool {
        self.get(node).is_some()
    }

    /// Insert or replace. Returns the previous value for the same node.
    pub fn insert(&mut self, node: &N, value: V) -> Option<V> {
        self.sweep();
        self.entries
            .insert(node.identity(), (node.downgrade(), value))
            .map(|(_, previous)| previous)
    }

    pub fn remove(&mut self, node: &N) -> Option<V> {
        let key = node.identity();
        let live = self
            .entries
            .get(&key)
            .is_some_and(|(weak, _)| Self::live(weak, node));
        if !live {
            return None;
        }
        self.entries.remove(&key).map(|(_, value)| value)
    }

    /// Drop entries whose node no longer exists.
    pub fn sweep(&mut self) {
        self.entries.retain(|_, (weak, _)| N::upgrade(weak).is_some());
    }

    /// Number of entries whose node is still alive.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|(weak, _)| N::upgrade(weak).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
