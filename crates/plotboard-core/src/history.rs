//! Snapshot-based undo/redo over the scene's nodes and connections.

use crate::node::{Connection, Node};
use crate::scene::SceneStore;

/// Immutable copy of the scene at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

impl HistoryEntry {
    /// Deep-copy the live scene.
    pub fn capture(store: &SceneStore) -> Self {
        Self {
            nodes: store.nodes().to_vec(),
            connections: store.connections().to_vec(),
        }
    }

    /// Overwrite the live scene with a copy of this entry.
    fn restore_into(&self, store: &mut SceneStore) {
        store.replace_contents(self.nodes.clone(), self.connections.clone());
    }
}

/// Ordered snapshots plus a cursor pointing at the visible state.
///
/// Entries before the cursor are undo targets, entries after it redo
/// targets. Pushing while not at the newest entry discards the redo tail.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    /// Oldest entries are dropped beyond this many; `None` keeps everything.
    max_entries: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `max_entries` snapshots (at least 1).
    pub fn with_limit(max_entries: Option<usize>) -> Self {
        Self {
            max_entries: max_entries.map(|m| m.max(1)),
            ..Self::default()
        }
    }

    /// Checkpoint the current scene.
    pub fn push_snapshot(&mut self, store: &SceneStore) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(HistoryEntry::capture(store));

        if let Some(max) = self.max_entries {
            let excess = self.entries.len().saturating_sub(max);
            if excess > 0 {
                self.entries.drain(..excess);
            }
        }
        self.cursor = self.entries.len() - 1;
        log::trace!("history: {} entries, cursor {}", self.entries.len(), self.cursor);
    }

    /// Step back one entry and restore it. No-op at the oldest entry.
    pub fn undo(&mut self, store: &mut SceneStore) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        self.entries[self.cursor].restore_into(store);
        true
    }

    /// Step forward one entry and restore it. No-op at the newest entry.
    pub fn redo(&mut self, store: &mut SceneStore) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        self.entries[self.cursor].restore_into(store);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The entry the cursor points at.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use kurbo::{Point, Size};

    fn rect(id: &str) -> Node {
        Node::shape(NodeKind::Rectangle, Point::ZERO, Size::new(10.0, 10.0)).with_id(id)
    }

    #[test]
    fn test_empty_history_is_inert() {
        let mut history = History::new();
        let mut store = SceneStore::new();
        store.add_node(rect("a"));
        assert!(!history.undo(&mut store));
        assert!(!history.redo(&mut store));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new();
        let mut store = SceneStore::new();
        history.push_snapshot(&store);

        store.add_node(rect("a"));
        history.push_snapshot(&store);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        assert!(history.undo(&mut store));
        assert!(store.is_empty());
        assert!(!history.undo(&mut store));

        assert!(history.redo(&mut store));
        assert!(store.contains("a"));
        assert!(!history.redo(&mut store));
    }

    #[test]
    fn test_push_discards_redo_tail() {
        let mut history = History::new();
        let mut store = SceneStore::new();
        history.push_snapshot(&store);
        store.add_node(rect("a"));
        history.push_snapshot(&store);
        store.add_node(rect("b"));
        history.push_snapshot(&store);

        history.undo(&mut store);
        history.undo(&mut store);
        store.add_node(rect("c"));
        history.push_snapshot(&store);

        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        history.undo(&mut store);
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshots_are_independent_copies() {
        let mut history = History::new();
        let mut store = SceneStore::new();
        store.add_node(rect("a"));
        history.push_snapshot(&store);

        store.update_node_position("a", 99.0, 99.0);
        assert_eq!(history.current().unwrap().nodes[0].position, Point::ZERO);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(Some(3));
        let mut store = SceneStore::new();
        for id in ["a", "b", "c", "d", "e"] {
            store.add_node(rect(id));
            history.push_snapshot(&store);
        }
        assert_eq!(history.len(), 3);
        assert!(history.undo(&mut store));
        assert!(history.undo(&mut store));
        assert!(!history.undo(&mut store));
        assert_eq!(store.len(), 3);
    }
}
