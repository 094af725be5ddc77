//! Typed publish/subscribe channel shared by the store and drag surfaces.
//!
//! DESIGN
//! ======
//! Every event is a variant of [`DesignerEvent`] with its own payload, and
//! handlers subscribe per [`EventKind`]. Dispatch is synchronous and runs in
//! subscription order over a snapshot of the handler list, so a handler may
//! subscribe, unsubscribe or publish again without disturbing the walk in
//! progress.
//!
//! ERROR HANDLING
//! ==============
//! A handler that returns `Err`, panics, or is re-entered while still running
//! is counted as failed and logged. Its siblings still run and the publisher
//! always gets a [`DispatchReport`] back.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::warn;

use crate::geometry::Point;
use crate::layout::LayoutTarget;
use crate::widget::{WidgetId, WidgetInstance, WidgetPatch};

// =============================================================================
// EVENTS
// =============================================================================

/// Names of the event streams a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DragStart,
    DragMove,
    DragEnd,
    DragOverNested,
    WidgetAdded,
    WidgetRemoved,
    WidgetUpdated,
    LayoutChanged,
    ComponentSelect,
    NestedDropConsumed,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DragStart => "drag:start",
            Self::DragMove => "drag:move",
            Self::DragEnd => "drag:end",
            Self::DragOverNested => "drag:over-nested",
            Self::WidgetAdded => "widget:added",
            Self::WidgetRemoved => "widget:removed",
            Self::WidgetUpdated => "widget:updated",
            Self::LayoutChanged => "layout:changed",
            Self::ComponentSelect => "component:select",
            Self::NestedDropConsumed => "nested:drop-consumed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DesignerEvent {
    /// A palette item started dragging with its registry-default size.
    DragStart { widget_type: String, w: u32, h: u32 },
    /// Raw pointer position over a surface.
    DragMove { surface: LayoutTarget, pointer: Point },
    /// The drag finished or was cancelled; every surface cleans up.
    DragEnd,
    /// The pointer entered (`over`) or left a nested tab pane.
    DragOverNested { target: LayoutTarget, over: bool },
    WidgetAdded { target: LayoutTarget, widget: WidgetInstance },
    WidgetRemoved { id: WidgetId },
    WidgetUpdated { id: WidgetId, patch: WidgetPatch },
    /// The layout changed; `revision` increases on every change.
    LayoutChanged { revision: u64 },
    ComponentSelect { id: Option<WidgetId> },
    /// A nested pane created a widget from the current drag.
    NestedDropConsumed { target: LayoutTarget, id: WidgetId },
}

impl DesignerEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DragStart { .. } => EventKind::DragStart,
            Self::DragMove { .. } => EventKind::DragMove,
            Self::DragEnd => EventKind::DragEnd,
            Self::DragOverNested { .. } => EventKind::DragOverNested,
            Self::WidgetAdded { .. } => EventKind::WidgetAdded,
            Self::WidgetRemoved { .. } => EventKind::WidgetRemoved,
            Self::WidgetUpdated { .. } => EventKind::WidgetUpdated,
            Self::LayoutChanged { .. } => EventKind::LayoutChanged,
            Self::ComponentSelect { .. } => EventKind::ComponentSelect,
            Self::NestedDropConsumed { .. } => EventKind::NestedDropConsumed,
        }
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

/// A subscriber's failure, reported back to the channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event handler failed: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Handle returned by `subscribe`; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of one `publish` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

type Handler = Box<dyn FnMut(&DesignerEvent) -> Result<(), HandlerError>>;

struct Entry {
    id: SubscriptionId,
    once: bool,
    handler: Rc<RefCell<Handler>>,
}

#[derive(Default)]
pub struct EventChannel {
    handlers: RefCell<HashMap<EventKind, Vec<Entry>>>,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total: usize = self.handlers.borrow().values().map(Vec::len).sum();
        f.debug_struct("EventChannel").field("subscribers", &total).finish()
    }
}

impl EventChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&DesignerEvent) -> Result<(), HandlerError> + 'static,
    {
        self.insert(kind, false, Box::new(handler))
    }

    /// Register `handler` for the next event of `kind` only.
    pub fn once<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&DesignerEvent) -> Result<(), HandlerError> + 'static,
    {
        self.insert(kind, true, Box::new(handler))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        for list in handlers.values_mut() {
            if let Some(pos) = list.iter().position(|e| e.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deliver `event` to every handler subscribed to its kind.
    pub fn publish(&self, event: &DesignerEvent) -> DispatchReport {
        let kind = event.kind();
        let snapshot: Vec<(SubscriptionId, Rc<RefCell<Handler>>)> = {
            let mut handlers = self.handlers.borrow_mut();
            let Some(list) = handlers.get_mut(&kind) else {
                return DispatchReport::default();
            };
            let snapshot = list.iter().map(|e| (e.id, Rc::clone(&e.handler))).collect();
            list.retain(|e| !e.once);
            snapshot
        };

        let mut report = DispatchReport::default();
        for (id, handler) in snapshot {
            let Ok(mut handler) = handler.try_borrow_mut() else {
                warn!(event = %kind, subscription = %id, "handler re-entered during its own dispatch");
                report.failed += 1;
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| (*handler)(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(event = %kind, subscription = %id, error = %e, "event handler failed");
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(event = %kind, subscription = %id, "event handler panicked");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Drop every handler for `kind`.
    pub fn clear_kind(&self, kind: EventKind) {
        self.handlers.borrow_mut().remove(&kind);
    }

    pub fn clear_all(&self) {
        self.handlers.borrow_mut().clear();
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.borrow().get(&kind).map_or(0, Vec::len)
    }

    fn insert(&self, kind: EventKind, once: bool, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.handlers.borrow_mut().entry(kind).or_default().push(Entry {
            id,
            once,
            handler: Rc::new(RefCell::new(handler)),
        });
        id
    }
}
