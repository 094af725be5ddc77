//! Layout commands: insert, delete and update, each exactly reversible.
//!
//! Delete and update resolve their target when constructed and refuse to
//! exist if the id is absent. At apply/reverse time the remembered index is
//! trusted only while it still points at the same id; otherwise the widget is
//! found again by id so a transient placeholder shifting the list cannot make
//! a command touch the wrong widget.

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;

use tracing::warn;

use crate::history::Command;
use crate::layout::{Layout, LayoutTarget};
use crate::widget::{WidgetId, WidgetInstance, WidgetPatch, WidgetShapeError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("widget not found: {0}")]
    TargetNotFound(WidgetId),
    #[error("layout target not found: {0}")]
    MissingTarget(LayoutTarget),
    #[error("invalid patch for {id}: {source}")]
    InvalidPatch {
        id: WidgetId,
        #[source]
        source: WidgetShapeError,
    },
}

// =============================================================================
// INSERT
// =============================================================================

/// Append a widget to a layout list; reverse removes it again.
#[derive(Debug)]
pub struct InsertWidget {
    target: LayoutTarget,
    widget: WidgetInstance,
    index: Option<usize>,
}

impl InsertWidget {
    /// # Errors
    ///
    /// Returns `MissingTarget` when `target` does not exist in `layout`.
    pub fn new(layout: &Layout, target: LayoutTarget, widget: WidgetInstance) -> Result<Self, CommandError> {
        if layout.slots(&target).is_none() {
            return Err(CommandError::MissingTarget(target));
        }
        Ok(Self { target, widget, index: None })
    }

    #[must_use]
    pub fn widget(&self) -> &WidgetInstance {
        &self.widget
    }

    #[must_use]
    pub fn target(&self) -> &LayoutTarget {
        &self.target
    }
}

impl Command<Layout> for InsertWidget {
    fn apply(&mut self, layout: &mut Layout) {
        let Some(slots) = layout.slots_mut(&self.target) else {
            warn!(layout = %self.target, id = %self.widget.id, "insert: layout target vanished");
            self.index = None;
            return;
        };
        slots.push(self.widget.clone());
        self.index = Some(slots.len() - 1);
    }

    fn reverse(&mut self, layout: &mut Layout) {
        let Some(hint) = self.index.take() else {
            return;
        };
        let Some(index) = layout.index_in(&self.target, &self.widget.id, hint) else {
            warn!(layout = %self.target, id = %self.widget.id, "insert undo: widget no longer present");
            return;
        };
        if let Some(slots) = layout.slots_mut(&self.target) {
            slots.remove(index);
        }
    }

    fn label(&self) -> &'static str {
        "insert"
    }
}

// =============================================================================
// DELETE
// =============================================================================

/// Remove a widget; reverse re-inserts the snapshot at its original index.
#[derive(Debug)]
pub struct DeleteWidget {
    target: LayoutTarget,
    index: usize,
    snapshot: WidgetInstance,
}

impl DeleteWidget {
    /// # Errors
    ///
    /// Returns `TargetNotFound` when `id` is not in `layout`.
    pub fn new(layout: &Layout, id: &str) -> Result<Self, CommandError> {
        let (target, index) = layout
            .locate(id)
            .ok_or_else(|| CommandError::TargetNotFound(id.to_string()))?;
        let snapshot = layout
            .slots(&target)
            .and_then(|slots| slots.get(index))
            .map(WidgetInstance::without_placeholders)
            .ok_or_else(|| CommandError::TargetNotFound(id.to_string()))?;
        Ok(Self { target, index, snapshot })
    }

    #[must_use]
    pub fn removed(&self) -> &WidgetInstance {
        &self.snapshot
    }
}

impl Command<Layout> for DeleteWidget {
    fn apply(&mut self, layout: &mut Layout) {
        let Some(index) = layout.index_in(&self.target, &self.snapshot.id, self.index) else {
            warn!(layout = %self.target, id = %self.snapshot.id, "delete: widget not present");
            return;
        };
        if let Some(slots) = layout.slots_mut(&self.target) {
            slots.remove(index);
            self.index = index;
        }
    }

    fn reverse(&mut self, layout: &mut Layout) {
        let Some(slots) = layout.slots_mut(&self.target) else {
            warn!(layout = %self.target, id = %self.snapshot.id, "delete undo: layout target vanished");
            return;
        };
        let index = self.index.min(slots.len());
        slots.insert(index, self.snapshot.without_placeholders());
    }

    fn label(&self) -> &'static str {
        "delete"
    }
}

// =============================================================================
// UPDATE
// =============================================================================

/// Merge a patch into a widget; reverse restores the before-image wholesale.
#[derive(Debug)]
pub struct UpdateWidget {
    target: LayoutTarget,
    index: usize,
    before: WidgetInstance,
    after: WidgetInstance,
    patch: WidgetPatch,
}

impl UpdateWidget {
    /// # Errors
    ///
    /// Returns `TargetNotFound` when `id` is not in `layout`, or
    /// `InvalidPatch` when the patch does not fit the widget's schema.
    pub fn new(layout: &Layout, id: &str, patch: WidgetPatch) -> Result<Self, CommandError> {
        let (target, index) = layout
            .locate(id)
            .ok_or_else(|| CommandError::TargetNotFound(id.to_string()))?;
        let before = layout
            .slots(&target)
            .and_then(|slots| slots.get(index))
            .map(WidgetInstance::without_placeholders)
            .ok_or_else(|| CommandError::TargetNotFound(id.to_string()))?;
        let after = patch
            .apply_to(&before)
            .map_err(|source| CommandError::InvalidPatch { id: id.to_string(), source })?;
        Ok(Self { target, index, before, after, patch })
    }

    #[must_use]
    pub fn patch(&self) -> &WidgetPatch {
        &self.patch
    }

    #[must_use]
    pub fn updated(&self) -> &WidgetInstance {
        &self.after
    }

    /// Slot list the widget lives in.
    #[must_use]
    pub fn target(&self) -> &LayoutTarget {
        &self.target
    }

    /// Put `image` in place of the widget. Images never carry placeholders;
    /// a drag in progress keeps the one it already has in the live widget.
    fn write(&mut self, layout: &mut Layout, image: &WidgetInstance) {
        let Some(index) = layout.index_in(&self.target, &image.id, self.index) else {
            warn!(layout = %self.target, id = %image.id, "update: widget not present");
            return;
        };
        if let Some(slot) = layout.slots_mut(&self.target).and_then(|s| s.get_mut(index)) {
            *slot = image.with_live_placeholders(slot);
            self.index = index;
        }
    }
}

impl Command<Layout> for UpdateWidget {
    fn apply(&mut self, layout: &mut Layout) {
        let image = self.after.clone();
        self.write(layout, &image);
    }

    fn reverse(&mut self, layout: &mut Layout) {
        let image = self.before.clone();
        self.write(layout, &image);
    }

    fn label(&self) -> &'static str {
        "update"
    }
}
