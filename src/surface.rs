//! Drop surfaces: the policy a drag coordinator runs against.
//!
//! The main canvas and a nested tab pane share one coordinator
//! implementation. What differs between them lives here: which layout list
//! they write to, which placeholder id they reserve, which widget types they
//! accept, and how they take part in the hand-off.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use crate::consts::{CANVAS_PLACEHOLDER_ID, NESTED_PLACEHOLDER_ID};
use crate::layout::LayoutTarget;
use crate::registry::WidgetRegistry;
use crate::widget::WidgetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Canvas,
    NestedTab,
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Canvas => "canvas",
            Self::NestedTab => "nested-tab",
        })
    }
}

pub trait DropSurface {
    fn kind(&self) -> SurfaceKind;

    /// Layout list that receives placeholders and dropped widgets.
    fn target(&self) -> LayoutTarget;

    fn placeholder_id(&self) -> &str;

    /// Whether a widget of `widget_type` may be dropped here.
    fn can_accept_type(&self, registry: &WidgetRegistry, widget_type: &str) -> bool;

    /// Give up placeholder and drop authority while a nested surface is
    /// hovered or has consumed the drop.
    fn yields_to_nested(&self) -> bool {
        false
    }

    /// Publish enter/leave notifications so an outer surface can yield.
    fn announces_hover(&self) -> bool {
        false
    }
}

/// The main designer canvas.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanvasSurface;

impl DropSurface for CanvasSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Canvas
    }

    fn target(&self) -> LayoutTarget {
        LayoutTarget::Root
    }

    fn placeholder_id(&self) -> &str {
        CANVAS_PLACEHOLDER_ID
    }

    fn can_accept_type(&self, registry: &WidgetRegistry, widget_type: &str) -> bool {
        registry.descriptor(widget_type).is_some()
    }

    fn yields_to_nested(&self) -> bool {
        true
    }
}

/// One pane of a tab container placed on the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedTabSurface {
    container: WidgetId,
    container_type: String,
    pane: usize,
}

impl NestedTabSurface {
    #[must_use]
    pub fn new(container: &str, container_type: &str, pane: usize) -> Self {
        Self { container: container.to_string(), container_type: container_type.to_string(), pane }
    }

    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    #[must_use]
    pub fn pane(&self) -> usize {
        self.pane
    }
}

impl DropSurface for NestedTabSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::NestedTab
    }

    fn target(&self) -> LayoutTarget {
        LayoutTarget::Pane { container: self.container.clone(), pane: self.pane }
    }

    fn placeholder_id(&self) -> &str {
        NESTED_PLACEHOLDER_ID
    }

    fn can_accept_type(&self, registry: &WidgetRegistry, widget_type: &str) -> bool {
        registry.descriptor(widget_type).is_some() && registry.can_nest(&self.container_type, widget_type)
    }

    fn announces_hover(&self) -> bool {
        true
    }
}
