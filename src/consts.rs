//! Shared constants for the designer core.

use std::time::Duration;

// ── History ─────────────────────────────────────────────────────

/// Maximum number of commands retained for undo/redo.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

// ── Drag / drop ─────────────────────────────────────────────────

/// Minimum interval between two processed pointer-move updates.
pub const DEFAULT_DRAG_THROTTLE: Duration = Duration::from_millis(50);

/// Layout id reserved for the main-canvas drag placeholder.
pub const CANVAS_PLACEHOLDER_ID: &str = "drop";

/// Layout id reserved for a nested tab container's drag placeholder.
pub const NESTED_PLACEHOLDER_ID: &str = "tab-drop";

/// Type tag carried by placeholder entries.
pub const PLACEHOLDER_TYPE: &str = "__placeholder__";

// ── Registry fallbacks ──────────────────────────────────────────

/// Label reported for an unregistered widget type.
pub const UNKNOWN_WIDGET_LABEL: &str = "Unknown widget";

/// Icon reported for an unregistered widget type.
pub const UNKNOWN_WIDGET_ICON: &str = "Grid";
