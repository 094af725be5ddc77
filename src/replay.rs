//! Scripted host: drives a [`DesignerSession`] from a JSON script.
//!
//! A script stands in for the UI layer. It declares the canvas bounds and
//! grid metrics once, then lists store operations and pointer drags in the
//! order a user would perform them. Pointer points addressed to a tab pane
//! are delivered to that pane first and then bubble to the canvas flagged as
//! over a nested container, the same order DOM events arrive in.
//!
//! ERROR HANDLING
//! ==============
//! A malformed script is fatal. A step the designer rejects is recorded in
//! the report and the replay moves on, so one bad step does not hide the
//! outcome of the rest.

#[cfg(test)]
#[path = "replay_test.rs"]
mod replay_test;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::DesignerConfig;
use crate::drag::{DropOutcome, PointerSample};
use crate::geometry::{Point, Rect, UniformGrid};
use crate::layout::LayoutTarget;
use crate::registry::CreateOverrides;
use crate::session::DesignerSession;
use crate::store::DesignerError;
use crate::widget::{GridPos, WidgetId, WidgetPatch};

// =============================================================================
// SCRIPT FORMAT
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("export failed: {0}")]
    Export(#[source] DesignerError),
}

/// Why a single step was not applied.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Designer(#[from] DesignerError),
    #[error("no such component: {0}")]
    NoSuchComponent(WidgetId),
}

/// Grid metrics shared by the canvas and every mounted pane.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridMetrics {
    pub col_width: f64,
    pub row_height: f64,
    pub cols: u32,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self { col_width: 40.0, row_height: 30.0, cols: 12 }
    }
}

impl GridMetrics {
    #[must_use]
    pub fn build(&self) -> UniformGrid {
        UniformGrid::new(self.col_width, self.row_height, self.cols)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Script {
    #[serde(default = "default_canvas")]
    pub canvas: Rect,
    #[serde(default)]
    pub grid: GridMetrics,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_canvas() -> Rect {
    Rect::new(0.0, 0.0, 480.0, 600.0)
}

fn root_target() -> LayoutTarget {
    LayoutTarget::Root
}

impl Script {
    /// # Errors
    ///
    /// Returns `Parse` when `raw` is not a valid script.
    pub fn parse(raw: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Add {
        #[serde(rename = "type")]
        widget_type: String,
        #[serde(default)]
        x: u32,
        #[serde(default)]
        y: u32,
        #[serde(default = "root_target")]
        into: LayoutTarget,
        #[serde(default)]
        id: Option<WidgetId>,
    },
    Remove {
        id: WidgetId,
    },
    Update {
        id: WidgetId,
        patch: WidgetPatch,
    },
    Select {
        #[serde(default)]
        id: Option<WidgetId>,
    },
    Undo,
    Redo,
    Clear,
    Import {
        layout: Value,
    },
    MountTab {
        container: WidgetId,
        #[serde(default)]
        pane: usize,
        bounds: Rect,
    },
    UnmountTab {
        container: WidgetId,
        #[serde(default)]
        pane: usize,
    },
    /// Drag a palette item through `points`; drop at the last one unless
    /// `cancel` is set.
    Drag {
        #[serde(rename = "type")]
        widget_type: String,
        #[serde(default)]
        points: Vec<DragPoint>,
        #[serde(default)]
        cancel: bool,
    },
}

impl Step {
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Update { .. } => "update",
            Self::Select { .. } => "select",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Clear => "clear",
            Self::Import { .. } => "import",
            Self::MountTab { .. } => "mount_tab",
            Self::UnmountTab { .. } => "unmount_tab",
            Self::Drag { .. } => "drag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DragPoint {
    #[serde(default = "root_target")]
    pub surface: LayoutTarget,
    pub x: f64,
    pub y: f64,
    /// Milliseconds since the previous point. Defaults to the throttle interval.
    #[serde(default)]
    pub gap_ms: Option<u64>,
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    pub index: usize,
    pub op: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub applied: usize,
    pub failures: Vec<StepFailure>,
    /// Final outcome of every drag step, in script order.
    pub drops: Vec<DropOutcome>,
    /// Exported layout after the last step.
    pub layout: String,
}

// =============================================================================
// REPLAYER
// =============================================================================

pub struct Replayer {
    session: DesignerSession,
    canvas: Rect,
    grid: GridMetrics,
    panes: BTreeMap<LayoutTarget, Rect>,
    clock: Instant,
    gap: Duration,
}

impl Replayer {
    #[must_use]
    pub fn new(config: DesignerConfig, canvas: Rect, grid: GridMetrics) -> Self {
        let gap = config.drag_throttle;
        let session = DesignerSession::new(config, Box::new(grid.build()));
        Self { session, canvas, grid, panes: BTreeMap::new(), clock: Instant::now(), gap }
    }

    #[must_use]
    pub fn session(&self) -> &DesignerSession {
        &self.session
    }

    /// Run every step of `script` and export the result.
    ///
    /// # Errors
    ///
    /// Returns `Export` if the final layout cannot be serialized.
    pub fn run(config: DesignerConfig, script: &Script) -> Result<ReplayReport, ReplayError> {
        let mut replayer = Self::new(config, script.canvas, script.grid);
        info!(session = %replayer.session.id(), steps = script.steps.len(), "replay started");

        let mut report = ReplayReport { applied: 0, failures: Vec::new(), drops: Vec::new(), layout: String::new() };
        for (index, step) in script.steps.iter().enumerate() {
            match replayer.apply(step) {
                Ok(outcome) => {
                    report.applied += 1;
                    report.drops.extend(outcome);
                }
                Err(e) => {
                    warn!(index, op = step.op(), error = %e, "replay: step rejected");
                    report.failures.push(StepFailure { index, op: step.op(), message: e.to_string() });
                }
            }
        }
        report.layout = replayer.session.store().export_config().map_err(ReplayError::Export)?;
        info!(applied = report.applied, failed = report.failures.len(), "replay finished");
        Ok(report)
    }

    /// Apply one step. Drag steps return their drop outcome.
    ///
    /// # Errors
    ///
    /// Whatever the designer reports for the underlying operation.
    pub fn apply(&mut self, step: &Step) -> Result<Option<DropOutcome>, StepError> {
        debug!(op = step.op(), "replay step");
        match step {
            Step::Add { widget_type, x, y, into, id } => {
                let overrides = id.as_ref().map(|id| CreateOverrides { id: Some(id.clone()), ..Default::default() });
                let pos = GridPos::new(*x, *y);
                self.session
                    .apply(|store| store.add_component_to(into.clone(), widget_type, pos, overrides.as_ref()))?;
            }
            Step::Remove { id } => {
                self.session.apply(|store| store.remove_component(id))?;
            }
            Step::Update { id, patch } => {
                self.session.apply(|store| store.update_component(id, patch.clone()))?;
            }
            Step::Select { id } => {
                if !self.session.apply(|store| store.select_component(id.as_deref())) {
                    if let Some(id) = id {
                        return Err(StepError::NoSuchComponent(id.clone()));
                    }
                }
            }
            Step::Undo => {
                if !self.session.apply(crate::store::DesignerStore::undo) {
                    debug!("replay: nothing to undo");
                }
            }
            Step::Redo => {
                if !self.session.apply(crate::store::DesignerStore::redo) {
                    debug!("replay: nothing to redo");
                }
            }
            Step::Clear => self.session.apply(crate::store::DesignerStore::clear),
            Step::Import { layout } => {
                let raw = serde_json::to_string(layout).map_err(DesignerError::from)?;
                self.session
                    .apply(|store| store.import_config(&raw))
                    .map_err(DesignerError::from)?;
                self.panes.clear();
            }
            Step::MountTab { container, pane, bounds } => {
                self.session.mount_nested(container, *pane, Box::new(self.grid.build()))?;
                self.panes
                    .insert(LayoutTarget::Pane { container: container.clone(), pane: *pane }, *bounds);
            }
            Step::UnmountTab { container, pane } => {
                self.session.unmount_nested(container, *pane);
                self.panes.remove(&LayoutTarget::Pane { container: container.clone(), pane: *pane });
            }
            Step::Drag { widget_type, points, cancel } => {
                return self.drag(widget_type, points, *cancel).map(Some);
            }
        }
        Ok(None)
    }

    fn drag(&mut self, widget_type: &str, points: &[DragPoint], cancel: bool) -> Result<DropOutcome, StepError> {
        self.session.begin_drag(widget_type)?;
        for point in points {
            self.clock += point.gap_ms.map_or(self.gap, Duration::from_millis);
            let pointer = Point::new(point.x, point.y);
            let canvas_sample = if point.surface == LayoutTarget::Root {
                PointerSample::new(pointer, self.canvas)
            } else {
                let sample = PointerSample::new(pointer, self.pane_bounds(&point.surface));
                self.session.pointer_move(&point.surface, &sample, self.clock);
                PointerSample::new(pointer, self.canvas).over_nested()
            };
            self.session.pointer_move(&LayoutTarget::Root, &canvas_sample, self.clock);
        }

        let last = points.last().filter(|_| !cancel);
        let Some(last) = last else {
            self.session.cancel_drag();
            return Ok(DropOutcome::Idle);
        };
        let pointer = Point::new(last.x, last.y);
        if last.surface == LayoutTarget::Root {
            return Ok(self.session.drop_on(&LayoutTarget::Root, &PointerSample::new(pointer, self.canvas)));
        }
        let nested = self
            .session
            .drop_on(&last.surface, &PointerSample::new(pointer, self.pane_bounds(&last.surface)));
        let canvas = self
            .session
            .drop_on(&LayoutTarget::Root, &PointerSample::new(pointer, self.canvas).over_nested());
        debug!(nested = ?nested, canvas = ?canvas, "replay: bubbled drop");
        Ok(nested)
    }

    /// Bounds of a mounted pane. An unknown pane gets empty bounds, so every
    /// point is outside it.
    fn pane_bounds(&self, target: &LayoutTarget) -> Rect {
        self.panes.get(target).copied().unwrap_or_default()
    }
}
