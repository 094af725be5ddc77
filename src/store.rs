//! Designer store: the facade the UI talks to.
//!
//! DESIGN
//! ======
//! The store owns the one [`Layout`], its command [`History`], the widget and
//! editor registries, and the small UI state (selection, drag flag, undo/redo
//! availability). Every persistent mutation goes through a command; only
//! `clear` and `import_config` replace the layout wholesale, and both drop the
//! history because it no longer describes the current layout.
//!
//! After each change the store refreshes [`DesignerState`], then publishes
//! `LayoutChanged` followed by the operation's own event on the shared
//! [`EventChannel`].
//!
//! Drag placeholders are written straight into the layout without commands.
//! They are transient, never undoable and never exported.
//!
//! ERROR HANDLING
//! ==============
//! Lookup failures return `Err` and log a warning. A failed operation leaves
//! the layout and history exactly as they were.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::commands::{CommandError, DeleteWidget, InsertWidget, UpdateWidget};
use crate::config::DesignerConfig;
use crate::editors::{EditorKind, EditorRegistry};
use crate::events::{DesignerEvent, EventChannel};
use crate::history::History;
use crate::layout::{Layout, LayoutTarget};
use crate::registry::{CreateOverrides, RegistryError, WidgetRegistry};
use crate::widget::{GridPos, WidgetId, WidgetInstance, WidgetPatch};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("layout is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("layout must be a JSON array of widgets")]
    NotASequence,
    #[error("widget #{index} is malformed: {source}")]
    Shape {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate widget id: {0}")]
    DuplicateId(WidgetId),
    #[error("`{child}` cannot be placed inside `{parent}`")]
    Nesting { parent: String, child: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DesignerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("`{child}` cannot be placed inside `{parent}`")]
    NestingRejected { parent: String, child: String },
    #[error("layout target not found: {0}")]
    TargetMissing(LayoutTarget),
    #[error("widget id already in use: {0}")]
    DuplicateId(WidgetId),
    #[error("failed to serialize layout: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read-only UI state derived from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesignerState {
    pub selected: Option<WidgetId>,
    pub dragging: bool,
    pub dragged_type: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug)]
pub struct DesignerStore {
    layout: Layout,
    history: History<Layout>,
    registry: WidgetRegistry,
    editors: EditorRegistry,
    events: Rc<EventChannel>,
    state: DesignerState,
    revision: u64,
}

impl DesignerStore {
    /// Store with the built-in widget catalogue.
    #[must_use]
    pub fn new(config: &DesignerConfig, events: Rc<EventChannel>) -> Self {
        Self::with_registry(config, WidgetRegistry::with_builtin(), events)
    }

    #[must_use]
    pub fn with_registry(config: &DesignerConfig, registry: WidgetRegistry, events: Rc<EventChannel>) -> Self {
        Self {
            layout: Layout::new(),
            history: History::new(config.history_limit),
            registry,
            editors: EditorRegistry::new(),
            events,
            state: DesignerState::default(),
            revision: 0,
        }
    }

    // --- accessors ---------------------------------------------------------

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn state(&self) -> &DesignerState {
        &self.state
    }

    #[must_use]
    pub fn history(&self) -> &History<Layout> {
        &self.history
    }

    #[must_use]
    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WidgetRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn editors(&self) -> &EditorRegistry {
        &self.editors
    }

    pub fn editors_mut(&mut self) -> &mut EditorRegistry {
        &mut self.editors
    }

    #[must_use]
    pub fn events(&self) -> &Rc<EventChannel> {
        &self.events
    }

    /// Increases on every layout change, placeholders included.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.state.can_undo
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.state.can_redo
    }

    /// Editor for a placed widget, or `None` if `id` is not placed.
    #[must_use]
    pub fn editor_for(&self, id: &str) -> Option<EditorKind> {
        self.component(id).map(|w| self.editors.get_editor(w.type_tag()))
    }

    /// A placed widget by id. Placeholders are not components.
    #[must_use]
    pub fn component(&self, id: &str) -> Option<&WidgetInstance> {
        self.layout.get(id).filter(|w| !w.is_placeholder())
    }

    // --- commands ----------------------------------------------------------

    /// Create a `widget_type` instance at `pos` on the main canvas.
    ///
    /// # Errors
    ///
    /// See [`DesignerStore::add_component_to`].
    pub fn add_component(&mut self, widget_type: &str, pos: GridPos) -> Result<WidgetId, DesignerError> {
        self.add_component_to(LayoutTarget::Root, widget_type, pos, None)
    }

    /// Create an instance in `target` through an undoable insert.
    ///
    /// # Errors
    ///
    /// - `TargetMissing` when `target` does not exist
    /// - `NestingRejected` when the pane's container may not hold this type
    /// - `Registry` for unknown types, taken ids and bad overrides
    pub fn add_component_to(
        &mut self,
        target: LayoutTarget,
        widget_type: &str,
        pos: GridPos,
        overrides: Option<&CreateOverrides>,
    ) -> Result<WidgetId, DesignerError> {
        if let LayoutTarget::Pane { container, .. } = &target {
            if let Some(parent) = self.layout.get(container) {
                let parent_type = parent.type_tag();
                if !self.registry.can_nest(parent_type, widget_type) {
                    warn!(parent = %parent_type, child = %widget_type, "add: nesting rejected");
                    return Err(DesignerError::NestingRejected {
                        parent: parent_type.to_string(),
                        child: widget_type.to_string(),
                    });
                }
            }
        }
        if self.layout.slots(&target).is_none() {
            warn!(layout = %target, widget_type = %widget_type, "add: layout target not found");
            return Err(DesignerError::TargetMissing(target));
        }

        let layout = &self.layout;
        let widget = self.registry.create_with(widget_type, pos, overrides, &|id| layout.contains(id))?;
        self.check_placement(&target, &widget)?;
        let command = InsertWidget::new(&self.layout, target.clone(), widget.clone())?;
        self.history.execute(Box::new(command), &mut self.layout);

        let id = widget.id.clone();
        debug!(layout = %target, %id, widget_type = %widget_type, "component added");
        self.changed();
        self.events.publish(&DesignerEvent::WidgetAdded { target, widget });
        Ok(id)
    }

    /// Remove a placed widget through an undoable delete.
    ///
    /// # Errors
    ///
    /// Returns `Command(TargetNotFound)` when `id` is not placed.
    pub fn remove_component(&mut self, id: &str) -> Result<WidgetInstance, DesignerError> {
        if self.component(id).is_none() {
            warn!(%id, "remove: widget not found");
            return Err(CommandError::TargetNotFound(id.to_string()).into());
        }
        let command = DeleteWidget::new(&self.layout, id)?;
        let removed = command.removed().clone();
        self.history.execute(Box::new(command), &mut self.layout);

        debug!(%id, "component removed");
        self.changed();
        self.events.publish(&DesignerEvent::WidgetRemoved { id: id.to_string() });
        self.drop_stale_selection();
        Ok(removed)
    }

    /// Merge `patch` into a placed widget through an undoable update.
    /// An empty patch changes nothing and records nothing.
    ///
    /// # Errors
    ///
    /// Returns `Command(TargetNotFound)` for an unknown id and
    /// `Command(InvalidPatch)` when the configuration does not fit.
    pub fn update_component(&mut self, id: &str, patch: WidgetPatch) -> Result<(), DesignerError> {
        if self.component(id).is_none() {
            warn!(%id, "update: widget not found");
            return Err(CommandError::TargetNotFound(id.to_string()).into());
        }
        if patch.is_empty() {
            debug!(%id, "update: empty patch ignored");
            return Ok(());
        }
        let command = UpdateWidget::new(&self.layout, id, patch).inspect_err(|e| {
            warn!(%id, error = %e, "update: patch rejected");
        })?;
        self.check_placement(command.target(), command.updated())?;
        let patch = command.patch().clone();
        self.history.execute(Box::new(command), &mut self.layout);

        self.changed();
        self.events.publish(&DesignerEvent::WidgetUpdated { id: id.to_string(), patch });
        Ok(())
    }

    /// Step back one command. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.history.undo(&mut self.layout) {
            return false;
        }
        self.changed();
        self.drop_stale_selection();
        true
    }

    /// Re-apply the next command. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        if !self.history.redo(&mut self.layout) {
            return false;
        }
        self.changed();
        self.drop_stale_selection();
        true
    }

    /// Empty the layout and forget all history.
    pub fn clear(&mut self) {
        self.layout.replace_all(Vec::new());
        self.history.clear();
        info!("layout cleared");
        self.changed();
        self.drop_stale_selection();
    }

    // --- selection & drag --------------------------------------------------

    /// Select a placed widget, or clear the selection with `None`.
    /// Returns `false` (selection unchanged) when `id` is not placed.
    pub fn select_component(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id {
            if self.component(id).is_none() {
                warn!(%id, "select: widget not found");
                return false;
            }
        }
        self.state.selected = id.map(str::to_string);
        self.events.publish(&DesignerEvent::ComponentSelect { id: self.state.selected.clone() });
        true
    }

    /// Begin dragging a palette item of `widget_type`.
    ///
    /// # Errors
    ///
    /// Returns `Registry(UnknownType)` when the type is not registered.
    pub fn start_drag(&mut self, widget_type: &str) -> Result<(), DesignerError> {
        let Some(descriptor) = self.registry.descriptor(widget_type) else {
            warn!(widget_type = %widget_type, "drag: unknown widget type");
            return Err(RegistryError::UnknownType(widget_type.to_string()).into());
        };
        let (w, h) = (descriptor.w, descriptor.h);
        self.state.dragging = true;
        self.state.dragged_type = Some(widget_type.to_string());
        debug!(widget_type = %widget_type, w, h, "drag started");
        self.events.publish(&DesignerEvent::DragStart { widget_type: widget_type.to_string(), w, h });
        Ok(())
    }

    /// Finish or cancel the current drag. Always publishes `DragEnd` so every
    /// surface cleans up; returns whether a drag was active.
    pub fn end_drag(&mut self) -> bool {
        let was_dragging = self.state.dragging;
        self.state.dragging = false;
        self.state.dragged_type = None;
        self.events.publish(&DesignerEvent::DragEnd);
        was_dragging
    }

    // --- import / export ---------------------------------------------------

    /// Replace the layout with a serialized widget list and drop history.
    /// Returns the number of root widgets imported.
    ///
    /// # Errors
    ///
    /// Any parse, shape, duplicate-id or nesting failure; nothing is changed.
    pub fn import_config(&mut self, raw: &str) -> Result<usize, ImportError> {
        let widgets = self.parse_layout(raw).inspect_err(|e| {
            warn!(error = %e, "import rejected");
        })?;
        let count = widgets.len();
        self.layout.replace_all(widgets);
        self.history.clear();
        info!(count, "layout imported");
        self.changed();
        self.drop_stale_selection();
        Ok(count)
    }

    /// Serialize the persistent layout. Placeholders and history are left out.
    ///
    /// # Errors
    ///
    /// Returns `Serialize` if JSON encoding fails.
    pub fn export_config(&self) -> Result<String, DesignerError> {
        Ok(serde_json::to_string_pretty(&self.layout.persistent())?)
    }

    fn parse_layout(&self, raw: &str) -> Result<Vec<WidgetInstance>, ImportError> {
        let value: Value = serde_json::from_str(raw).map_err(ImportError::Parse)?;
        let Value::Array(items) = value else {
            return Err(ImportError::NotASequence);
        };
        let widgets = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| serde_json::from_value::<WidgetInstance>(item).map_err(|source| ImportError::Shape { index, source }))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some((parent, child)) = widgets.iter().find_map(|w| nesting_violation(&self.registry, w)) {
            return Err(ImportError::Nesting { parent, child });
        }
        let candidate = Layout::from_widgets(widgets);
        if let Some(id) = candidate.first_duplicate_id() {
            return Err(ImportError::DuplicateId(id));
        }
        Ok(candidate.persistent())
    }

    /// Check that `widget` may sit in `target`, replacing the widget with the
    /// same id if there is one, without breaking nesting or id uniqueness.
    fn check_placement(&self, target: &LayoutTarget, widget: &WidgetInstance) -> Result<(), DesignerError> {
        if let Some((parent, child)) = nesting_violation(&self.registry, widget) {
            warn!(id = %widget.id, %parent, %child, "nesting rejected");
            return Err(DesignerError::NestingRejected { parent, child });
        }
        let mut candidate = self.layout.clone();
        let Some(slots) = candidate.slots_mut(target) else {
            return Err(DesignerError::TargetMissing(target.clone()));
        };
        match slots.iter().position(|w| w.id == widget.id) {
            Some(index) => slots[index] = widget.clone(),
            None => slots.push(widget.clone()),
        }
        // Drag placeholders share ids across panes; only persistent ids count.
        if let Some(id) = Layout::from_widgets(candidate.persistent()).first_duplicate_id() {
            warn!(id = %widget.id, duplicate = %id, "duplicate widget id rejected");
            return Err(DesignerError::DuplicateId(id));
        }
        Ok(())
    }

    // --- placeholders ------------------------------------------------------

    /// Put a placeholder `id` of `w × h` at `pos` in `target`, or move the
    /// existing one. Returns `false` if `target` does not exist.
    pub fn place_placeholder(&mut self, target: &LayoutTarget, id: &str, w: u32, h: u32, pos: GridPos) -> bool {
        let Some(slots) = self.layout.slots_mut(target) else {
            return false;
        };
        if let Some(existing) = slots.iter_mut().find(|s| s.is_placeholder() && s.id == id) {
            if existing.position() == pos {
                return true;
            }
            existing.x = pos.x;
            existing.y = pos.y;
        } else {
            let mut placeholder = WidgetInstance::placeholder(id, w, h);
            placeholder.x = pos.x;
            placeholder.y = pos.y;
            slots.push(placeholder);
        }
        self.transient_change();
        true
    }

    /// Remove placeholder `id` from `target`. Returns whether one was removed.
    pub fn take_placeholder(&mut self, target: &LayoutTarget, id: &str) -> bool {
        let Some(slots) = self.layout.slots_mut(target) else {
            return false;
        };
        let before = slots.len();
        slots.retain(|s| !(s.is_placeholder() && s.id == id));
        if slots.len() == before {
            return false;
        }
        self.transient_change();
        true
    }

    #[must_use]
    pub fn has_placeholder(&self, target: &LayoutTarget, id: &str) -> bool {
        self.layout
            .slots(target)
            .is_some_and(|slots| slots.iter().any(|s| s.is_placeholder() && s.id == id))
    }

    // --- internals ---------------------------------------------------------

    fn changed(&mut self) {
        self.state.can_undo = self.history.can_undo();
        self.state.can_redo = self.history.can_redo();
        self.transient_change();
    }

    fn transient_change(&mut self) {
        self.revision += 1;
        self.events.publish(&DesignerEvent::LayoutChanged { revision: self.revision });
    }

    fn drop_stale_selection(&mut self) {
        let stale = self.state.selected.as_deref().is_some_and(|id| self.component(id).is_none());
        if stale {
            self.state.selected = None;
            self.events.publish(&DesignerEvent::ComponentSelect { id: None });
        }
    }
}

/// First parent/child type pair in `widget`'s panes that the registry does
/// not allow, at any depth.
fn nesting_violation(registry: &WidgetRegistry, widget: &WidgetInstance) -> Option<(String, String)> {
    let panes = widget.config.panes()?;
    panes.iter().flat_map(|pane| &pane.children).find_map(|child| {
        if registry.can_nest(widget.type_tag(), child.type_tag()) {
            nesting_violation(registry, child)
        } else {
            Some((widget.type_tag().to_string(), child.type_tag().to_string()))
        }
    })
}
