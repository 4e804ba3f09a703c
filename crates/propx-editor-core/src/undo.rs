//! Undo/redo management for editor operations.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo implementations
//! - `History<T>` - bounded snapshot stacks for any cloneable state

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// Snapshot history over a piece of state.
///
/// Callers snapshot the state *before* a change with [`History::record`], and
/// swap states with [`History::undo`]/[`History::redo`].
#[derive(Debug, Clone)]
pub struct History<T> {
    undo_stack: Vec<T>,
    redo_stack: Vec<T>,
    max_steps: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(100)
    }
}

impl<T> History<T> {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps: max_steps.max(1),
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Record the state before an edit.
    pub fn record(&mut self, before: T) {
        // Clear redo stack on new edit
        self.redo_stack.clear();
        self.undo_stack.push(before);

        // Trim if over max
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Swap `current` with the previous snapshot.
    pub fn undo(&mut self, current: &mut T) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(std::mem::replace(current, previous));
        true
    }

    /// Swap `current` with the next snapshot.
    pub fn redo(&mut self, current: &mut T) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(std::mem::replace(current, next));
        true
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_swaps_state() {
        let mut history = History::new(10);
        let mut state = String::from("a");

        history.record(state.clone());
        state.push('b');
        history.record(state.clone());
        state.push('c');

        assert!(history.undo(&mut state));
        assert_eq!(state, "ab");
        assert!(history.undo(&mut state));
        assert_eq!(state, "a");
        assert!(!history.undo(&mut state));

        assert!(history.redo(&mut state));
        assert_eq!(state, "ab");
        assert!(history.can_redo());
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new(10);
        let mut state = 1;
        history.record(state);
        state = 2;
        history.undo(&mut state);
        assert!(history.can_redo());
        history.record(state);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_max_steps_trims_oldest() {
        let mut history = History::new(3);
        let mut state = 0;
        for i in 1..=5 {
            history.record(state);
            state = i;
        }
        assert_eq!(history.undo_depth(), 3);
        while history.undo(&mut state) {}
        assert_eq!(state, 2);
    }
}
