//! Pixel-space primitives and the grid-geometry collaborator.
//!
//! The designer never converts pixels to cells itself. It asks a
//! [`GridGeometry`] for an item handle by id, positions the handle's visual
//! state, and lets the handle translate that into a [`GridPos`]. Hosts plug in
//! their own grid library; [`UniformGrid`] is a fixed-cell implementation used
//! by the binary and by tests.
//!
//! ERROR HANDLING
//! ==============
//! Geometry calls return [`GeometryError`]. Callers treat every failure as
//! transient: they log it and carry on with the drag.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::widget::{GridPos, WidgetId};

// =============================================================================
// PIXEL SPACE
// =============================================================================

/// A pointer position in surface pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box of a drop surface, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    /// Strict containment: a pointer on the edge is outside.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.left && p.x < self.right && p.y > self.top && p.y < self.bottom
    }

    /// `p` relative to this rectangle's top-left corner.
    #[must_use]
    pub fn local(&self, p: Point) -> Point {
        Point { x: p.x - self.left, y: p.y - self.top }
    }
}

// =============================================================================
// COLLABORATOR CONTRACT
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("grid item not mounted: {0}")]
    NotMounted(WidgetId),
    #[error("grid geometry failed: {0}")]
    Failed(String),
}

/// Pixel offset applied to an item while it follows the pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisualState {
    pub top: f64,
    pub left: f64,
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridDragPhase {
    DragStart,
    DragEnd,
}

/// One grid item as seen by the drag coordinator.
pub trait GridItemHandle {
    fn visual_state(&mut self) -> &mut VisualState;

    /// Convert a pixel offset into the cell the item would occupy.
    ///
    /// # Errors
    ///
    /// Implementations fail when the grid is not laid out yet.
    fn calc_xy(&self, top: f64, left: f64) -> Result<GridPos, GeometryError>;
}

/// The grid library the designer renders into.
pub trait GridGeometry {
    /// Handle for `id`, or `None` while it is not rendered.
    fn item(&mut self, id: &str) -> Option<&mut dyn GridItemHandle>;

    /// Notify the grid that `id` is being dragged to (or released at) `pos`.
    ///
    /// # Errors
    ///
    /// Implementations may fail at any time; callers swallow the error.
    fn drag_event(&mut self, phase: GridDragPhase, id: &str, pos: GridPos, h: u32, w: u32) -> Result<(), GeometryError>;
}

// =============================================================================
// UNIFORM GRID
// =============================================================================

/// Grid with fixed column width and row height. Items are materialized on
/// first lookup, the way a rendering grid mounts a freshly pushed entry.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    col_width: f64,
    row_height: f64,
    cols: u32,
    items: HashMap<WidgetId, UniformItem>,
    drag_log: Vec<(GridDragPhase, WidgetId, GridPos)>,
}

#[derive(Debug, Clone)]
struct UniformItem {
    visual: VisualState,
    col_width: f64,
    row_height: f64,
    cols: u32,
}

impl UniformGrid {
    #[must_use]
    pub fn new(col_width: f64, row_height: f64, cols: u32) -> Self {
        Self { col_width, row_height, cols, items: HashMap::new(), drag_log: Vec::new() }
    }

    /// Every `drag_event` received so far, oldest first.
    #[must_use]
    pub fn drag_log(&self) -> &[(GridDragPhase, WidgetId, GridPos)] {
        &self.drag_log
    }

    /// Last visual state assigned to `id`, if it was ever mounted.
    #[must_use]
    pub fn visual(&self, id: &str) -> Option<VisualState> {
        self.items.get(id).map(|item| item.visual)
    }
}

impl Default for UniformGrid {
    /// Twelve 40px columns with 30px rows.
    fn default() -> Self {
        Self::new(40.0, 30.0, 12)
    }
}

impl GridItemHandle for UniformItem {
    fn visual_state(&mut self) -> &mut VisualState {
        &mut self.visual
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn calc_xy(&self, top: f64, left: f64) -> Result<GridPos, GeometryError> {
        if !(self.col_width > 0.0 && self.row_height > 0.0) || self.cols == 0 {
            return Err(GeometryError::Failed("grid has no cells".into()));
        }
        if !top.is_finite() || !left.is_finite() {
            return Err(GeometryError::Failed("non-finite pixel offset".into()));
        }
        let col = (left / self.col_width).floor().max(0.0) as u32;
        let row = (top / self.row_height).floor().max(0.0) as u32;
        Ok(GridPos::new(col.min(self.cols - 1), row))
    }
}

impl GridGeometry for UniformGrid {
    fn item(&mut self, id: &str) -> Option<&mut dyn GridItemHandle> {
        let (col_width, row_height, cols) = (self.col_width, self.row_height, self.cols);
        let item = self.items.entry(id.to_string()).or_insert_with(|| UniformItem {
            visual: VisualState::default(),
            col_width,
            row_height,
            cols,
        });
        Some(item)
    }

    fn drag_event(&mut self, phase: GridDragPhase, id: &str, pos: GridPos, _h: u32, _w: u32) -> Result<(), GeometryError> {
        if phase == GridDragPhase::DragEnd {
            self.items.remove(id);
        }
        self.drag_log.push((phase, id.to_string(), pos));
        Ok(())
    }
}
