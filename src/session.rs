//! Designer session: the composition root.
//!
//! One session owns one event channel, one store, the main-canvas drag
//! coordinator and a coordinator per mounted tab pane. Hosts route pointer
//! input through the session; after every routed call it drains each
//! coordinator's inbox so the hand-off state is current before the next
//! input arrives.
//!
//! Independent sessions share nothing, so several designers (or tests) can
//! run side by side.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, info_span, warn};
use uuid::Uuid;

use crate::config::DesignerConfig;
use crate::drag::{DragCoordinator, DropOutcome, HitTarget, MoveOutcome, PointerSample};
use crate::events::{DesignerEvent, EventChannel};
use crate::geometry::GridGeometry;
use crate::layout::LayoutTarget;
use crate::registry::WidgetRegistry;
use crate::store::{DesignerError, DesignerStore};
use crate::surface::{CanvasSurface, DropSurface, NestedTabSurface};

/// Upper bound on inbox drain rounds per sync. Each round can only be
/// triggered by a coordinator publishing while handling the previous one.
const MAX_SYNC_ROUNDS: usize = 8;

pub struct DesignerSession {
    id: Uuid,
    span: tracing::Span,
    config: DesignerConfig,
    events: Rc<EventChannel>,
    store: DesignerStore,
    canvas: DragCoordinator<CanvasSurface>,
    nested: Vec<DragCoordinator<NestedTabSurface>>,
}

impl std::fmt::Debug for DesignerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignerSession")
            .field("id", &self.id)
            .field("widgets", &self.store.layout().len())
            .field("nested", &self.nested.len())
            .finish_non_exhaustive()
    }
}

impl DesignerSession {
    /// Session with the built-in widget catalogue.
    #[must_use]
    pub fn new(config: DesignerConfig, canvas_geometry: Box<dyn GridGeometry>) -> Self {
        Self::with_registry(config, WidgetRegistry::with_builtin(), canvas_geometry)
    }

    #[must_use]
    pub fn with_registry(config: DesignerConfig, registry: WidgetRegistry, canvas_geometry: Box<dyn GridGeometry>) -> Self {
        let id = Uuid::new_v4();
        let span = info_span!("designer", session = %id);
        let events = Rc::new(EventChannel::new());
        let store = DesignerStore::with_registry(&config, registry, Rc::clone(&events));
        let canvas = DragCoordinator::new(CanvasSurface, canvas_geometry, Rc::clone(&events), config.drag_throttle);
        span.in_scope(|| debug!(history_limit = config.history_limit, "session created"));
        Self { id, span, config, events, store, canvas, nested: Vec::new() }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &DesignerConfig {
        &self.config
    }

    #[must_use]
    pub fn events(&self) -> &Rc<EventChannel> {
        &self.events
    }

    #[must_use]
    pub fn store(&self) -> &DesignerStore {
        &self.store
    }

    #[must_use]
    pub fn canvas(&self) -> &DragCoordinator<CanvasSurface> {
        &self.canvas
    }

    #[must_use]
    pub fn nested(&self, container: &str, pane: usize) -> Option<&DragCoordinator<NestedTabSurface>> {
        self.nested
            .iter()
            .find(|c| c.surface().container() == container && c.surface().pane() == pane)
    }

    /// Run `f` against the store, then bring every coordinator up to date.
    pub fn apply<R>(&mut self, f: impl FnOnce(&mut DesignerStore) -> R) -> R {
        let out = f(&mut self.store);
        self.sync();
        out
    }

    // --- surfaces ----------------------------------------------------------

    /// Start coordinating drops into pane `pane` of tab container `container`.
    /// Mounting the same pane again replaces its coordinator.
    ///
    /// # Errors
    ///
    /// Returns `TargetMissing` if the pane does not exist on the canvas.
    pub fn mount_nested(&mut self, container: &str, pane: usize, geometry: Box<dyn GridGeometry>) -> Result<(), DesignerError> {
        let span = self.span.clone();
        let _guard = span.enter();
        let target = LayoutTarget::Pane { container: container.to_string(), pane };
        let container_type = match self.store.layout().get(container) {
            Some(widget) if self.store.layout().slots(&target).is_some() => widget.type_tag().to_string(),
            _ => {
                warn!(layout = %target, "mount: tab pane not found");
                return Err(DesignerError::TargetMissing(target));
            }
        };
        self.remove_nested(container, pane);

        let surface = NestedTabSurface::new(container, &container_type, pane);
        let mut coordinator = DragCoordinator::new(surface, geometry, Rc::clone(&self.events), self.config.drag_throttle);
        let state = self.store.state();
        if let Some(widget_type) = state.dragged_type.clone().filter(|_| state.dragging) {
            if let Some(d) = self.store.registry().descriptor(&widget_type) {
                let (w, h) = (d.w, d.h);
                coordinator.begin(&mut self.store, &widget_type, w, h);
            }
        }
        debug!(layout = %target, "nested pane mounted");
        self.nested.push(coordinator);
        self.sync();
        Ok(())
    }

    /// Stop coordinating a pane. Returns `false` if it was not mounted.
    pub fn unmount_nested(&mut self, container: &str, pane: usize) -> bool {
        let span = self.span.clone();
        let _guard = span.enter();
        let removed = self.remove_nested(container, pane);
        self.sync();
        removed
    }

    fn remove_nested(&mut self, container: &str, pane: usize) -> bool {
        let Some(index) = self
            .nested
            .iter()
            .position(|c| c.surface().container() == container && c.surface().pane() == pane)
        else {
            return false;
        };
        let mut coordinator = self.nested.remove(index);
        coordinator.cancel(&mut self.store);
        true
    }

    // --- drag routing ------------------------------------------------------

    /// Begin dragging a palette item.
    ///
    /// # Errors
    ///
    /// Returns `Registry(UnknownType)` for an unregistered type.
    pub fn begin_drag(&mut self, widget_type: &str) -> Result<(), DesignerError> {
        let result = {
            let _guard = self.span.enter();
            self.store.start_drag(widget_type)
        };
        self.sync();
        result
    }

    /// Deliver a pointer move to the surface writing into `surface`.
    ///
    /// A canvas sample that is not over a nested container also tells every
    /// hovered pane the pointer has left it, since those panes see no move of
    /// their own once the pointer is back on the canvas.
    pub fn pointer_move(&mut self, surface: &LayoutTarget, sample: &PointerSample, now: Instant) -> MoveOutcome {
        let span = self.span.clone();
        let _guard = span.enter();
        self.events.publish(&DesignerEvent::DragMove { surface: surface.clone(), pointer: sample.pointer });
        if *surface == LayoutTarget::Root && sample.hit == HitTarget::Surface {
            self.release_panes();
        }
        let outcome = match surface {
            LayoutTarget::Root => self.canvas.on_move(&mut self.store, sample, now),
            LayoutTarget::Pane { container, pane } => {
                match self.nested.iter_mut().find(|c| c.surface().container() == container && c.surface().pane() == *pane) {
                    Some(coordinator) => coordinator.on_move(&mut self.store, sample, now),
                    None => {
                        debug!(layout = %surface, "move: pane not mounted");
                        MoveOutcome::Idle
                    }
                }
            }
        };
        self.sync();
        outcome
    }

    fn release_panes(&mut self) {
        let mut released = 0;
        for coordinator in &mut self.nested {
            if coordinator.pointer_elsewhere(&mut self.store) {
                released += 1;
            }
        }
        if released > 0 {
            debug!(released, "pointer back on canvas, panes released");
            self.sync();
        }
    }

    /// Deliver a drop to one surface. A drop on the main canvas also ends the
    /// drag, so hosts drop on the innermost surface first.
    pub fn drop_on(&mut self, surface: &LayoutTarget, sample: &PointerSample) -> DropOutcome {
        let outcome = {
            let _guard = self.span.enter();
            match surface {
                LayoutTarget::Root => {
                    let outcome = self.canvas.on_drop(&mut self.store, sample);
                    self.store.end_drag();
                    outcome
                }
                LayoutTarget::Pane { container, pane } => {
                    match self.nested.iter_mut().find(|c| c.surface().container() == container && c.surface().pane() == *pane) {
                        Some(coordinator) => coordinator.on_drop(&mut self.store, sample),
                        None => {
                            debug!(layout = %surface, "drop: pane not mounted");
                            DropOutcome::Idle
                        }
                    }
                }
            }
        };
        self.sync();
        outcome
    }

    /// Abort the current drag on every surface.
    pub fn cancel_drag(&mut self) {
        {
            let _guard = self.span.enter();
            self.store.end_drag();
        }
        self.sync();
    }

    /// Drain every coordinator inbox. Coordinators whose pane is gone are
    /// cancelled first, so a pane that was hovered still announces the leave.
    pub fn sync(&mut self) {
        let _guard = self.span.enter();
        let store = &self.store;
        let (stale, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nested)
            .into_iter()
            .partition(|c| store.layout().slots(&c.surface().target()).is_none());
        self.nested = live;
        if !stale.is_empty() {
            debug!(removed = stale.len(), "nested panes pruned");
        }
        for mut coordinator in stale {
            coordinator.cancel(&mut self.store);
        }

        for _ in 0..MAX_SYNC_ROUNDS {
            let mut processed = self.canvas.sync(&mut self.store);
            for coordinator in &mut self.nested {
                processed += coordinator.sync(&mut self.store);
            }
            if processed == 0 {
                return;
            }
        }
        warn!(rounds = MAX_SYNC_ROUNDS, "sync did not settle");
    }
}
