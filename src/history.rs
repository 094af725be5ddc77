//! Command engine: a bounded undo/redo history over reified mutations.
//!
//! DESIGN
//! ======
//! A [`Command`] captures, at construction time, everything it needs to both
//! apply and exactly reverse itself against a target `T`. The history keeps
//! executed commands in order plus a count of how many are currently applied;
//! everything past that count is the redo branch.
//!
//! Executing a new command discards the redo branch. When the history grows
//! past its limit the oldest command is evicted and can no longer be undone.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::consts::DEFAULT_HISTORY_LIMIT;

/// A reversible mutation of `T`.
pub trait Command<T> {
    /// Perform the mutation. Called on execute and again on redo.
    fn apply(&mut self, target: &mut T);

    /// Restore the target to its state before `apply`.
    fn reverse(&mut self, target: &mut T);

    /// Short name used in logs.
    fn label(&self) -> &'static str {
        "command"
    }
}

/// Bounded undo/redo stack.
pub struct History<T> {
    entries: VecDeque<Box<dyn Command<T>>>,
    /// Number of leading entries currently applied. Cursor is `applied - 1`.
    applied: usize,
    limit: usize,
}

impl<T> std::fmt::Debug for History<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("len", &self.entries.len())
            .field("applied", &self.applied)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<T> History<T> {
    /// Create an empty history holding at most `limit` commands (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { entries: VecDeque::new(), applied: 0, limit: limit.max(1) }
    }

    /// Apply `command` to `target` and record it, discarding any redo branch.
    pub fn execute(&mut self, mut command: Box<dyn Command<T>>, target: &mut T) {
        self.entries.truncate(self.applied);
        command.apply(target);
        tracing::debug!(command = command.label(), depth = self.applied + 1, "command executed");
        self.entries.push_back(command);
        self.applied += 1;

        if self.entries.len() > self.limit {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::debug!(command = evicted.label(), limit = self.limit, "history full; oldest command evicted");
            }
            self.applied -= 1;
        }
    }

    /// Reverse the command at the cursor. Returns false if nothing is undoable.
    pub fn undo(&mut self, target: &mut T) -> bool {
        if !self.can_undo() {
            return false;
        }
        let index = self.applied - 1;
        let Some(command) = self.entries.get_mut(index) else {
            return false;
        };
        command.reverse(target);
        self.applied = index;
        true
    }

    /// Re-apply the next command on the redo branch. Returns false if none.
    pub fn redo(&mut self, target: &mut T) -> bool {
        if !self.can_redo() {
            return false;
        }
        let Some(command) = self.entries.get_mut(self.applied) else {
            return false;
        };
        command.apply(target);
        self.applied += 1;
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Forget every command. The target is left as it is.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }

    /// Index of the most recently applied command, `None` before the first.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    /// Number of recorded commands, applied or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
