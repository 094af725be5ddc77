//! Layout model: the ordered list of placed widgets.
//!
//! Insertion order is paint order. A tab container's panes each hold their
//! own ordered child list; [`LayoutTarget`] addresses either the root list or
//! one pane so commands and drag surfaces can work on both the same way.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::widget::{WidgetId, WidgetInstance};

/// Which widget list an operation addresses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutTarget {
    /// The main canvas.
    Root,
    /// One pane of a tab container placed on the main canvas.
    Pane { container: WidgetId, pane: usize },
}

impl std::fmt::Display for LayoutTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Pane { container, pane } => write!(f, "{container}[{pane}]"),
        }
    }
}

/// The designer's single source of truth for placed widgets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    widgets: Vec<WidgetInstance>,
}

impl Layout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_widgets(widgets: Vec<WidgetInstance>) -> Self {
        Self { widgets }
    }

    /// Root widgets in paint order, placeholders included.
    #[must_use]
    pub fn widgets(&self) -> &[WidgetInstance] {
        &self.widgets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Replace every widget wholesale. Only import/clear do this.
    pub fn replace_all(&mut self, widgets: Vec<WidgetInstance>) {
        self.widgets = widgets;
    }

    /// Widget list addressed by `target`, if it exists.
    #[must_use]
    pub fn slots(&self, target: &LayoutTarget) -> Option<&Vec<WidgetInstance>> {
        match target {
            LayoutTarget::Root => Some(&self.widgets),
            LayoutTarget::Pane { container, pane } => self
                .widgets
                .iter()
                .find(|w| &w.id == container)
                .and_then(|w| w.config.panes())
                .and_then(|panes| panes.get(*pane))
                .map(|p| &p.children),
        }
    }

    /// Mutable widget list addressed by `target`, if it exists.
    pub fn slots_mut(&mut self, target: &LayoutTarget) -> Option<&mut Vec<WidgetInstance>> {
        match target {
            LayoutTarget::Root => Some(&mut self.widgets),
            LayoutTarget::Pane { container, pane } => self
                .widgets
                .iter_mut()
                .find(|w| &w.id == container)
                .and_then(|w| w.config.panes_mut())
                .and_then(|panes| panes.get_mut(*pane))
                .map(|p| &mut p.children),
        }
    }

    /// Find which list holds `id` and at what index. Root is searched first.
    #[must_use]
    pub fn locate(&self, id: &str) -> Option<(LayoutTarget, usize)> {
        if let Some(index) = self.widgets.iter().position(|w| w.id == id) {
            return Some((LayoutTarget::Root, index));
        }
        for container in &self.widgets {
            let Some(panes) = container.config.panes() else {
                continue;
            };
            for (pane, p) in panes.iter().enumerate() {
                if let Some(index) = p.children.iter().position(|w| w.id == id) {
                    return Some((LayoutTarget::Pane { container: container.id.clone(), pane }, index));
                }
            }
        }
        None
    }

    /// Look up a widget anywhere in the layout.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WidgetInstance> {
        let (target, index) = self.locate(id)?;
        self.slots(&target)?.get(index)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.locate(id).is_some()
    }

    /// Resolve the current index of `id` in `target`, trusting `hint` when it
    /// still points at the same widget.
    #[must_use]
    pub fn index_in(&self, target: &LayoutTarget, id: &str, hint: usize) -> Option<usize> {
        let slots = self.slots(target)?;
        if slots.get(hint).is_some_and(|w| w.id == id) {
            return Some(hint);
        }
        slots.iter().position(|w| w.id == id)
    }

    /// Every id in the layout, nested panes included.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for widget in &self.widgets {
            out.push(widget.id.as_str());
            if let Some(panes) = widget.config.panes() {
                for pane in panes {
                    out.extend(pane.children.iter().map(|c| c.id.as_str()));
                }
            }
        }
        out
    }

    /// First id that occurs more than once, if any.
    #[must_use]
    pub fn first_duplicate_id(&self) -> Option<String> {
        let mut seen = HashSet::new();
        self.ids()
            .into_iter()
            .find(|id| !seen.insert(*id))
            .map(str::to_string)
    }

    /// Snapshot of the persistent widgets: placeholders removed at every level.
    #[must_use]
    pub fn persistent(&self) -> Vec<WidgetInstance> {
        self.widgets
            .iter()
            .filter(|w| !w.is_placeholder())
            .map(WidgetInstance::without_placeholders)
            .collect()
    }
}
