//! Two-stack undo/redo history over opaque snapshots.
//!
//! Recording a new checkpoint always discards the redo side: once a fresh
//! action happens, the undone futures are gone.

use std::collections::VecDeque;
use tracing::debug;

/// Linear undo/redo history.
///
/// Depth is unbounded unless a limit is set, in which case the oldest undo
/// checkpoint is dropped once the limit is exceeded.
#[derive(Debug, Clone)]
pub struct CheckpointStack<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    max_depth: Option<usize>,
}

impl<T> Default for CheckpointStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CheckpointStack<T> {
    /// Creates an unbounded history.
    pub fn new() -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: None,
        }
    }

    /// Creates a history that keeps at most `max_depth` undo checkpoints.
    pub fn with_max_depth(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            ..Self::new()
        }
    }

    /// Records the state as it was before a state-changing action.
    pub fn push(&mut self, snapshot: T) {
        self.undo.push_back(snapshot);
        self.redo.clear();

        if let Some(max) = self.max_depth {
            while self.undo.len() > max {
                self.undo.pop_front();
                debug!(max_depth = max, "dropped oldest checkpoint");
            }
        }
    }

    /// Steps back one checkpoint.
    ///
    /// With nothing to undo, `current` is handed back unchanged.
    pub fn undo(&mut self, current: T) -> T {
        match self.undo.pop_back() {
            Some(previous) => {
                self.redo.push(current);
                previous
            }
            None => current,
        }
    }

    /// Steps forward one checkpoint; the mirror image of `undo`.
    pub fn redo(&mut self, current: T) -> T {
        match self.redo.pop() {
            Some(next) => {
                self.undo.push_back(current);
                next
            }
            None => current,
        }
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_on_empty_returns_current() {
        let mut stack: CheckpointStack<u32> = CheckpointStack::new();
        assert_eq!(stack.undo(7), 7);
        assert_eq!(stack.redo(7), 7);
        assert_eq!(stack.undo_count(), 0);
        assert_eq!(stack.redo_count(), 0);
    }

    #[test]
    fn test_undo_then_redo() {
        let mut stack = CheckpointStack::new();
        stack.push(1);
        stack.push(2);

        // current state is 3
        assert_eq!(stack.undo(3), 2);
        assert_eq!(stack.undo(2), 1);
        assert_eq!(stack.undo_count(), 0);
        assert_eq!(stack.redo_count(), 2);

        assert_eq!(stack.redo(1), 2);
        assert_eq!(stack.redo(2), 3);
        assert_eq!(stack.redo_count(), 0);
        assert_eq!(stack.undo_count(), 2);
    }

    #[test]
    fn test_push_clears_redo() {
        let mut stack = CheckpointStack::new();
        stack.push("a");
        assert_eq!(stack.undo("b"), "a");
        assert_eq!(stack.redo_count(), 1);

        stack.push("a");
        assert_eq!(stack.redo_count(), 0);
        assert_eq!(stack.redo("c"), "c");
    }

    #[test]
    fn test_max_depth_drops_oldest() {
        let mut stack = CheckpointStack::with_max_depth(Some(2));
        stack.push(1);
        stack.push(2);
        stack.push(3);

        assert_eq!(stack.undo_count(), 2);
        assert_eq!(stack.undo(4), 3);
        assert_eq!(stack.undo(3), 2);
        assert_eq!(stack.undo(2), 2);
    }
}
