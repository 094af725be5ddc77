//! Drag/drop coordination for one drop surface.
//!
//! DESIGN
//! ======
//! A [`DragCoordinator`] runs the `idle -> dragging -> dropped | cancelled ->
//! idle` cycle for a single [`DropSurface`]. The main canvas and every mounted
//! tab pane each get their own coordinator; they never reference each other.
//! Everything they need to know about one another travels over the
//! [`EventChannel`]:
//!
//! - `DragStart` / `DragEnd` from the store open and close every session.
//! - A nested pane publishes `DragOverNested` when the pointer enters or
//!   leaves it, and `NestedDropConsumed` after it created a widget.
//! - The canvas folds those into its [`Handoff`] state and withdraws its own
//!   placeholder whenever it does not own the drag.
//!
//! Channel handlers only queue events into the coordinator's inbox. The
//! owner calls [`DragCoordinator::sync`] with store access to apply them, so
//! no handler ever needs a reference to the layout.
//!
//! ERROR HANDLING
//! ==============
//! Geometry failures are logged and swallowed. Cleanup removes the
//! placeholder and resets the session on every path, and calling it again is
//! a no-op.

#[cfg(test)]
#[path = "drag_test.rs"]
mod drag_test;

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::events::{DesignerEvent, EventChannel, EventKind, HandlerError, SubscriptionId};
use crate::geometry::{GridDragPhase, GridGeometry, Point, Rect};
use crate::layout::LayoutTarget;
use crate::store::DesignerStore;
use crate::surface::DropSurface;
use crate::throttle::Throttle;
use crate::widget::{GridPos, WidgetId};

// =============================================================================
// POINTER INPUT
// =============================================================================

/// What the host's hit test found under the pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitTarget {
    /// The surface itself, or a plain widget on it.
    #[default]
    Surface,
    /// An element that belongs to a nested tab container.
    NestedContainer,
}

/// One pointer reading as delivered to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub pointer: Point,
    /// The receiving surface's bounds at the time of the event.
    pub bounds: Rect,
    #[serde(default)]
    pub hit: HitTarget,
}

impl PointerSample {
    #[must_use]
    pub fn new(pointer: Point, bounds: Rect) -> Self {
        Self { pointer, bounds, hit: HitTarget::Surface }
    }

    /// Same sample, hit-tested onto a nested container.
    #[must_use]
    pub fn over_nested(mut self) -> Self {
        self.hit = HitTarget::NestedContainer;
        self
    }

    #[must_use]
    pub fn inside(&self) -> bool {
        self.bounds.contains(self.pointer)
    }
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Who holds drop authority, from the main canvas's point of view.
///
/// `Consumed` is absorbing: once a nested pane took the drop, no later
/// enter/leave notification can hand authority back before the drag ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Handoff {
    #[default]
    Owned,
    /// At least one nested pane is under the pointer.
    Deferred { hovered: BTreeSet<LayoutTarget> },
    Consumed,
}

impl Handoff {
    pub fn enter(&mut self, pane: LayoutTarget) {
        match self {
            Self::Owned => *self = Self::Deferred { hovered: BTreeSet::from([pane]) },
            Self::Deferred { hovered } => {
                hovered.insert(pane);
            }
            Self::Consumed => {}
        }
    }

    pub fn leave(&mut self, pane: &LayoutTarget) {
        if let Self::Deferred { hovered } = self {
            hovered.remove(pane);
            if hovered.is_empty() {
                *self = Self::Owned;
            }
        }
    }

    pub fn consume(&mut self) {
        *self = Self::Consumed;
    }

    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned)
    }
}

/// Ephemeral state of one drag over one surface.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub widget_type: String,
    pub w: u32,
    pub h: u32,
    /// Last pointer position seen, throttled or not.
    pub pointer: Option<Point>,
    /// Last cell the placeholder was moved to.
    pub cell: Option<GridPos>,
    /// Whether this surface's placeholder is currently in the layout.
    pub placeholder: bool,
    pub handoff: Handoff,
    /// Whether the pointer was inside this surface at the last processed move.
    pub hovering: bool,
}

impl DragSession {
    #[must_use]
    pub fn new(widget_type: &str, w: u32, h: u32) -> Self {
        Self {
            widget_type: widget_type.to_string(),
            w,
            h,
            pointer: None,
            cell: None,
            placeholder: false,
            handoff: Handoff::Owned,
            hovering: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No drag in progress on this surface.
    Idle,
    /// Pointer recorded; processing skipped by the throttle.
    Throttled,
    /// A nested pane owns the drag; this surface shows no placeholder.
    Deferred,
    Outside,
    Placed(GridPos),
    /// The grid could not position the placeholder this time.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Idle,
    Created(WidgetId),
    Outside,
    /// The pointer was over a nested pane; this surface stood aside.
    Yielded,
    /// A nested pane already created the widget.
    Consumed,
    /// This surface does not accept the dragged type.
    Refused,
    /// The store rejected the insert.
    Failed,
}

// =============================================================================
// COORDINATOR
// =============================================================================

pub struct DragCoordinator<S: DropSurface> {
    surface: S,
    geometry: Box<dyn GridGeometry>,
    throttle: Throttle,
    events: Rc<EventChannel>,
    inbox: Rc<RefCell<VecDeque<DesignerEvent>>>,
    subscriptions: Vec<SubscriptionId>,
    session: Option<DragSession>,
}

impl<S: DropSurface> std::fmt::Debug for DragCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragCoordinator")
            .field("surface", &self.surface.target())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<S: DropSurface> DragCoordinator<S> {
    pub fn new(surface: S, geometry: Box<dyn GridGeometry>, events: Rc<EventChannel>, throttle: Duration) -> Self {
        let inbox: Rc<RefCell<VecDeque<DesignerEvent>>> = Rc::new(RefCell::new(VecDeque::new()));
        let mut kinds = vec![EventKind::DragStart, EventKind::DragEnd];
        if surface.yields_to_nested() {
            kinds.extend([EventKind::DragOverNested, EventKind::NestedDropConsumed]);
        }
        let subscriptions = kinds
            .into_iter()
            .map(|kind| {
                let inbox = Rc::clone(&inbox);
                events.subscribe(kind, move |event| {
                    let Ok(mut queue) = inbox.try_borrow_mut() else {
                        return Err(HandlerError::new("drag inbox is busy"));
                    };
                    queue.push_back(event.clone());
                    Ok(())
                })
            })
            .collect();

        Self { surface, geometry, throttle: Throttle::new(throttle), events, inbox, subscriptions, session: None }
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session for a drag already in progress.
    pub fn begin(&mut self, store: &mut DesignerStore, widget_type: &str, w: u32, h: u32) {
        self.finish(store);
        debug!(surface = %self.surface.kind(), widget_type = %widget_type, "drag session opened");
        self.session = Some(DragSession::new(widget_type, w, h));
    }

    /// Apply queued channel events. Returns how many were processed.
    pub fn sync(&mut self, store: &mut DesignerStore) -> usize {
        let mut processed = 0;
        loop {
            let next = match self.inbox.try_borrow_mut() {
                Ok(mut queue) => queue.pop_front(),
                Err(_) => None,
            };
            let Some(event) = next else {
                break;
            };
            processed += 1;
            self.handle(store, event);
        }
        processed
    }

    fn handle(&mut self, store: &mut DesignerStore, event: DesignerEvent) {
        match event {
            DesignerEvent::DragStart { widget_type, w, h } => self.begin(store, &widget_type, w, h),
            DesignerEvent::DragEnd => {
                self.finish(store);
            }
            DesignerEvent::DragOverNested { target, over } => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if over {
                    session.handoff.enter(target);
                } else {
                    session.handoff.leave(&target);
                }
                if !session.handoff.is_owned() {
                    self.withdraw_placeholder(store);
                }
            }
            DesignerEvent::NestedDropConsumed { target, id } => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                session.handoff.consume();
                debug!(layout = %target, %id, "drop consumed by nested pane");
                self.withdraw_placeholder(store);
            }
            _ => {}
        }
    }

    /// Process one pointer move over this surface.
    pub fn on_move(&mut self, store: &mut DesignerStore, sample: &PointerSample, now: Instant) -> MoveOutcome {
        let Some(session) = self.session.as_mut() else {
            return MoveOutcome::Idle;
        };
        session.pointer = Some(sample.pointer);
        if !self.throttle.ready(now) {
            return MoveOutcome::Throttled;
        }

        let inside = sample.inside();
        if self.surface.announces_hover() && inside != session.hovering {
            session.hovering = inside;
            self.events.publish(&DesignerEvent::DragOverNested { target: self.surface.target(), over: inside });
        }

        let deferred = !session.handoff.is_owned() || sample.hit == HitTarget::NestedContainer;
        if self.surface.yields_to_nested() && deferred {
            self.withdraw_placeholder(store);
            return MoveOutcome::Deferred;
        }
        if !inside {
            self.withdraw_placeholder(store);
            return MoveOutcome::Outside;
        }
        self.track(store, sample)
    }

    /// The pointer is somewhere this surface never hears about, such as the
    /// bare canvas. A hovered surface drops its placeholder and announces the
    /// leave. Returns `true` if it was hovered.
    pub fn pointer_elsewhere(&mut self, store: &mut DesignerStore) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.hovering {
            return false;
        }
        session.hovering = false;
        self.withdraw_placeholder(store);
        if self.surface.announces_hover() {
            self.events.publish(&DesignerEvent::DragOverNested { target: self.surface.target(), over: false });
        }
        true
    }

    /// Ensure the placeholder exists and follow the pointer with it.
    fn track(&mut self, store: &mut DesignerStore, sample: &PointerSample) -> MoveOutcome {
        let target = self.surface.target();
        let id = self.surface.placeholder_id().to_string();
        let Some(session) = self.session.as_mut() else {
            return MoveOutcome::Idle;
        };
        let (w, h) = (session.w, session.h);

        if !session.placeholder {
            if !store.place_placeholder(&target, &id, w, h, session.cell.unwrap_or_default()) {
                warn!(layout = %target, "drag: surface layout missing, placeholder not placed");
                return MoveOutcome::Unavailable;
            }
            session.placeholder = true;
        }

        let local = sample.bounds.local(sample.pointer);
        let Some(item) = self.geometry.item(&id) else {
            debug!(%id, "drag: grid item not mounted yet");
            return MoveOutcome::Unavailable;
        };
        let visual = item.visual_state();
        visual.top = local.y;
        visual.left = local.x;
        visual.hidden = true;
        let cell = match item.calc_xy(local.y, local.x) {
            Ok(cell) => cell,
            Err(e) => {
                warn!(error = %e, %id, "drag: cell conversion failed");
                return MoveOutcome::Unavailable;
            }
        };
        if let Err(e) = self.geometry.drag_event(GridDragPhase::DragStart, &id, cell, h, w) {
            warn!(error = %e, %id, "drag: grid drag start failed");
        }
        if !store.place_placeholder(&target, &id, w, h, cell) {
            warn!(layout = %target, %id, "drag: surface layout missing, placeholder not moved");
            session.placeholder = false;
            return MoveOutcome::Unavailable;
        }
        session.cell = Some(cell);
        MoveOutcome::Placed(cell)
    }

    /// Handle a drop on this surface. The session is over afterwards.
    pub fn on_drop(&mut self, store: &mut DesignerStore, sample: &PointerSample) -> DropOutcome {
        let Some(session) = self.session.as_ref() else {
            return DropOutcome::Idle;
        };
        let widget_type = session.widget_type.clone();
        let last_cell = session.cell;

        if self.surface.yields_to_nested() {
            if session.handoff == Handoff::Consumed {
                self.finish(store);
                return DropOutcome::Consumed;
            }
            if !session.handoff.is_owned() || sample.hit == HitTarget::NestedContainer {
                self.finish(store);
                return DropOutcome::Yielded;
            }
        }
        if !sample.inside() {
            self.finish(store);
            return DropOutcome::Outside;
        }
        if !self.surface.can_accept_type(store.registry(), &widget_type) {
            warn!(surface = %self.surface.kind(), widget_type = %widget_type, "drop refused");
            self.finish(store);
            return DropOutcome::Refused;
        }

        let cell = self.cell_at(sample).or(last_cell).unwrap_or_default();
        self.finish(store);

        let target = self.surface.target();
        match store.add_component_to(target.clone(), &widget_type, cell, None) {
            Ok(id) => {
                info!(layout = %target, %id, widget_type = %widget_type, x = cell.x, y = cell.y, "widget dropped");
                if self.surface.announces_hover() {
                    self.events.publish(&DesignerEvent::NestedDropConsumed { target, id: id.clone() });
                }
                DropOutcome::Created(id)
            }
            Err(e) => {
                warn!(layout = %target, error = %e, "drop: insert failed");
                DropOutcome::Failed
            }
        }
    }

    /// Cancel from outside the drag flow (unmount, explicit abort). Also
    /// tells outer surfaces this pane is no longer hovered.
    pub fn cancel(&mut self, store: &mut DesignerStore) {
        let hovering = self.session.as_ref().is_some_and(|s| s.hovering);
        self.finish(store);
        if hovering && self.surface.announces_hover() {
            self.events.publish(&DesignerEvent::DragOverNested { target: self.surface.target(), over: false });
        }
    }

    /// Remove the placeholder and reset the session. Safe to call repeatedly.
    fn finish(&mut self, store: &mut DesignerStore) {
        self.withdraw_placeholder(store);
        let target = self.surface.target();
        let id = self.surface.placeholder_id();
        if store.take_placeholder(&target, id) {
            debug!(layout = %target, "drag: stray placeholder removed");
        }
        if self.session.take().is_some() {
            debug!(surface = %self.surface.kind(), "drag session closed");
        }
        self.throttle.reset();
    }

    /// Take this surface's placeholder out of the layout, keeping the session.
    fn withdraw_placeholder(&mut self, store: &mut DesignerStore) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.placeholder {
            return;
        }
        session.placeholder = false;
        let target = self.surface.target();
        let id = self.surface.placeholder_id();
        let cell = session.cell.unwrap_or_default();
        if let Err(e) = self.geometry.drag_event(GridDragPhase::DragEnd, id, cell, session.h, session.w) {
            warn!(error = %e, %id, "drag: grid drag end failed, continuing cleanup");
        }
        store.take_placeholder(&target, id);
    }

    fn cell_at(&mut self, sample: &PointerSample) -> Option<GridPos> {
        let id = self.surface.placeholder_id();
        let local = sample.bounds.local(sample.pointer);
        let item = self.geometry.item(id)?;
        match item.calc_xy(local.y, local.x) {
            Ok(cell) => Some(cell),
            Err(e) => {
                warn!(error = %e, %id, "drop: cell conversion failed, using last position");
                None
            }
        }
    }
}

impl<S: DropSurface> Drop for DragCoordinator<S> {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            if !self.events.unsubscribe(id) {
                debug!(subscription = %id, "drag coordinator subscription already gone");
            }
        }
    }
}
