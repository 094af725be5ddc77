use std::cell::RefCell;

use serde_json::json;

use super::*;
use crate::events::EventKind;

fn store() -> DesignerStore {
    DesignerStore::new(&DesignerConfig::default(), Rc::new(EventChannel::new()))
}

/// Record the kind of every event the store publishes.
fn watch(store: &DesignerStore) -> Rc<RefCell<Vec<EventKind>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        EventKind::LayoutChanged,
        EventKind::WidgetAdded,
        EventKind::WidgetRemoved,
        EventKind::WidgetUpdated,
        EventKind::ComponentSelect,
        EventKind::DragStart,
        EventKind::DragEnd,
    ] {
        let sink = Rc::clone(&log);
        store.events().subscribe(kind, move |event| {
            sink.borrow_mut().push(event.kind());
            Ok(())
        });
    }
    log
}

fn add_tab(store: &mut DesignerStore) -> WidgetId {
    store.add_component("tab", GridPos::new(0, 4)).unwrap()
}

fn pane(container: &str) -> LayoutTarget {
    LayoutTarget::Pane { container: container.into(), pane: 0 }
}

// =============================================================
// Add / undo / redo
// =============================================================

#[test]
fn add_undo_redo_round_trip_keeps_id() {
    let mut store = store();
    let id = store.add_component("briefingCard", GridPos::new(0, 0)).unwrap();
    let placed = store.layout().get(&id).cloned().unwrap();
    assert_eq!(store.layout().len(), 1);
    assert_eq!(placed.type_tag(), "briefingCard");
    assert_eq!(placed.position(), GridPos::new(0, 0));

    assert!(store.undo());
    assert!(store.layout().is_empty());
    assert!(store.redo());
    assert_eq!(store.layout().widgets(), &[placed]);
}

#[test]
fn availability_flags_track_history() {
    let mut store = store();
    assert!(!store.can_undo() && !store.can_redo());
    store.add_component("steps", GridPos::default()).unwrap();
    assert!(store.can_undo() && !store.can_redo());
    store.undo();
    assert!(!store.can_undo() && store.can_redo());
    assert!(!store.undo());
}

#[test]
fn add_unknown_type_changes_nothing() {
    let mut store = store();
    let log = watch(&store);
    let err = store.add_component("nope", GridPos::default()).unwrap_err();
    assert!(matches!(err, DesignerError::Registry(RegistryError::UnknownType(_))));
    assert!(store.layout().is_empty());
    assert!(!store.can_undo());
    assert!(log.borrow().is_empty());
}

#[test]
fn add_publishes_layout_changed_then_widget_added() {
    let mut store = store();
    let log = watch(&store);
    store.add_component("steps", GridPos::default()).unwrap();
    assert_eq!(*log.borrow(), vec![EventKind::LayoutChanged, EventKind::WidgetAdded]);
}

#[test]
fn history_limit_comes_from_config() {
    let config = DesignerConfig::default().with_history_limit(2);
    let mut store = DesignerStore::new(&config, Rc::new(EventChannel::new()));
    for _ in 0..3 {
        store.add_component("steps", GridPos::default()).unwrap();
    }
    assert!(store.undo());
    assert!(store.undo());
    assert!(!store.undo());
    assert_eq!(store.layout().len(), 1);
}

// =============================================================
// Nested panes
// =============================================================

#[test]
fn add_into_pane_is_undoable() {
    let mut store = store();
    let tab = add_tab(&mut store);
    let child = store.add_component_to(pane(&tab), "richText", GridPos::new(1, 0), None).unwrap();
    assert_eq!(store.layout().locate(&child), Some((pane(&tab), 0)));
    store.undo();
    assert!(!store.layout().contains(&child));
    assert!(store.layout().contains(&tab));
}

#[test]
fn tab_inside_tab_is_rejected() {
    let mut store = store();
    let tab = add_tab(&mut store);
    let err = store.add_component_to(pane(&tab), "tab", GridPos::default(), None).unwrap_err();
    assert!(matches!(err, DesignerError::NestingRejected { .. }));
    assert_eq!(store.history().len(), 1);
}

#[test]
fn missing_pane_is_rejected() {
    let mut store = store();
    let err = store.add_component_to(pane("ghost"), "steps", GridPos::default(), None).unwrap_err();
    assert!(matches!(err, DesignerError::TargetMissing(_)));
}

// =============================================================
// Remove / update
// =============================================================

#[test]
fn remove_clears_selection_of_removed_widget() {
    let mut store = store();
    let id = store.add_component("steps", GridPos::default()).unwrap();
    assert!(store.select_component(Some(&id)));
    let removed = store.remove_component(&id).unwrap();
    assert_eq!(removed.id, id);
    assert_eq!(store.state().selected, None);
    assert!(store.undo());
    assert!(store.layout().contains(&id));
}

#[test]
fn remove_unknown_id_is_an_error() {
    let mut store = store();
    assert!(matches!(
        store.remove_component("zz"),
        Err(DesignerError::Command(CommandError::TargetNotFound(_)))
    ));
}

#[test]
fn update_then_undo_reverts_only_height() {
    let mut store = store();
    store
        .import_config(&json!([{"id": "w1", "x": 2, "y": 1, "w": 4, "h": 3, "type": "briefingCard", "config": {"title": "A"}}]).to_string())
        .unwrap();
    let before = store.component("w1").cloned().unwrap();
    store.update_component("w1", WidgetPatch { h: Some(5), ..Default::default() }).unwrap();
    assert_eq!(store.component("w1").map(|w| w.h), Some(5));
    store.undo();
    assert_eq!(store.component("w1"), Some(&before));
}

#[test]
fn update_with_bad_config_is_rejected_without_history() {
    let mut store = store();
    let id = store.add_component("dataTable", GridPos::default()).unwrap();
    let patch = WidgetPatch { config: json!({"pageSize": "lots"}).as_object().cloned(), ..Default::default() };
    assert!(store.update_component(&id, patch).is_err());
    assert_eq!(store.history().len(), 1);
}

#[test]
fn empty_patch_records_nothing() {
    let mut store = store();
    let id = store.add_component("steps", GridPos::default()).unwrap();
    store.update_component(&id, WidgetPatch::default()).unwrap();
    assert_eq!(store.history().len(), 1);
}

#[test]
fn placeholders_are_not_components() {
    let mut store = store();
    assert!(store.place_placeholder(&LayoutTarget::Root, "drop", 2, 2, GridPos::new(1, 1)));
    assert!(store.component("drop").is_none());
    assert!(store.remove_component("drop").is_err());
    assert!(store.update_component("drop", WidgetPatch::size(1, 1)).is_err());
    assert!(!store.select_component(Some("drop")));
}

fn panes_patch(children: &Value) -> WidgetPatch {
    WidgetPatch { config: json!({"panes": [{"label": "A", "children": children}]}).as_object().cloned(), ..Default::default() }
}

#[test]
fn pane_patch_cannot_reuse_a_placed_id() {
    let mut store = store();
    let steps = store.add_component("steps", GridPos::default()).unwrap();
    let tab = add_tab(&mut store);
    let before = store.layout().clone();

    let patch = panes_patch(&json!([{"id": steps, "x": 0, "y": 0, "w": 6, "h": 2, "type": "steps"}]));
    let err = store.update_component(&tab, patch).unwrap_err();
    assert!(matches!(err, DesignerError::DuplicateId(ref id) if *id == steps));
    assert_eq!(store.layout(), &before);
    assert_eq!(store.history().len(), 2);
}

#[test]
fn pane_patch_cannot_nest_a_tab_in_a_tab() {
    let mut store = store();
    let tab = add_tab(&mut store);
    let before = store.layout().clone();

    let patch = panes_patch(&json!([{"id": "inner", "x": 0, "y": 0, "w": 12, "h": 6, "type": "tab"}]));
    let err = store.update_component(&tab, patch).unwrap_err();
    assert!(matches!(err, DesignerError::NestingRejected { ref parent, ref child } if parent == "tab" && child == "tab"));
    assert_eq!(store.layout(), &before);
}

#[test]
fn accepted_pane_patch_exports_a_layout_that_imports_again() {
    let mut fresh = store();
    let mut store = store();
    let tab = add_tab(&mut store);
    let patch = panes_patch(&json!([{"id": "inner", "x": 0, "y": 0, "w": 6, "h": 2, "type": "steps"}]));
    store.update_component(&tab, patch).unwrap();
    assert_eq!(store.layout().locate("inner"), Some((pane(&tab), 0)));

    let exported = store.export_config().unwrap();
    assert_eq!(fresh.import_config(&exported).unwrap(), 1);
    assert!(fresh.layout().contains("inner"));
}

#[test]
fn create_overrides_are_held_to_the_same_rules() {
    let mut store = store();
    let steps = store.add_component("steps", GridPos::default()).unwrap();
    let duplicate = CreateOverrides {
        id: None,
        patch: panes_patch(&json!([{"id": steps, "x": 0, "y": 0, "w": 6, "h": 2, "type": "steps"}])),
    };
    let err = store.add_component_to(LayoutTarget::Root, "tab", GridPos::new(0, 4), Some(&duplicate)).unwrap_err();
    assert!(matches!(err, DesignerError::DuplicateId(_)));

    let nested_tab = CreateOverrides {
        id: None,
        patch: panes_patch(&json!([{"id": "inner", "x": 0, "y": 0, "w": 12, "h": 6, "type": "tab"}])),
    };
    let err = store.add_component_to(LayoutTarget::Root, "tab", GridPos::new(0, 4), Some(&nested_tab)).unwrap_err();
    assert!(matches!(err, DesignerError::NestingRejected { .. }));
    assert_eq!(store.layout().ids(), vec![steps.as_str()]);
    assert_eq!(store.history().len(), 1);
}

// =============================================================
// Selection / drag state
// =============================================================

#[test]
fn select_unknown_keeps_selection() {
    let mut store = store();
    let id = store.add_component("steps", GridPos::default()).unwrap();
    store.select_component(Some(&id));
    assert!(!store.select_component(Some("nope")));
    assert_eq!(store.state().selected.as_deref(), Some(id.as_str()));
    assert!(store.select_component(None));
    assert_eq!(store.state().selected, None);
}

#[test]
fn start_and_end_drag_toggle_state_and_publish() {
    let mut store = store();
    let log = watch(&store);
    store.start_drag("carousel").unwrap();
    assert!(store.state().dragging);
    assert_eq!(store.state().dragged_type.as_deref(), Some("carousel"));
    assert!(store.end_drag());
    assert!(!store.end_drag());
    assert!(!store.state().dragging);
    assert_eq!(*log.borrow(), vec![EventKind::DragStart, EventKind::DragEnd, EventKind::DragEnd]);
}

#[test]
fn start_drag_unknown_type_fails() {
    let mut store = store();
    assert!(store.start_drag("nope").is_err());
    assert!(!store.state().dragging);
}

#[test]
fn editor_for_placed_widget() {
    let mut store = store();
    let id = add_tab(&mut store);
    assert_eq!(store.editor_for(&id), Some(EditorKind::Tab));
    assert_eq!(store.editor_for("nope"), None);
}

// =============================================================
// Import / export / clear
// =============================================================

#[test]
fn import_not_a_list_changes_nothing() {
    let mut store = store();
    store.add_component("steps", GridPos::default()).unwrap();
    let before = store.layout().clone();
    let err = store.import_config("{not a list}").unwrap_err();
    assert!(matches!(err, ImportError::Parse(_)));
    assert!(matches!(store.import_config(r#"{"id": "w1"}"#), Err(ImportError::NotASequence)));
    assert_eq!(store.layout(), &before);
    assert!(store.can_undo());
}

#[test]
fn import_rejects_malformed_records() {
    let mut store = store();
    let bad = json!([{"id": "a", "x": 0, "y": 0, "w": 1, "h": 1, "type": "steps"}, {"id": "b", "x": -1}]);
    assert!(matches!(store.import_config(&bad.to_string()), Err(ImportError::Shape { index: 1, .. })));
    let dup = json!([
        {"id": "a", "x": 0, "y": 0, "w": 1, "h": 1, "type": "steps"},
        {"id": "a", "x": 1, "y": 0, "w": 1, "h": 1, "type": "steps"}
    ]);
    assert!(matches!(store.import_config(&dup.to_string()), Err(ImportError::DuplicateId(ref id)) if id == "a"));
    let placeholder = json!([{"id": "drop", "x": 0, "y": 0, "w": 1, "h": 1, "type": "__placeholder__"}]);
    assert!(store.import_config(&placeholder.to_string()).is_err());
    assert!(store.layout().is_empty());
}

#[test]
fn import_rejects_tab_in_tab() {
    let mut store = store();
    let raw = json!([{
        "id": "t1", "x": 0, "y": 0, "w": 12, "h": 6, "type": "tab",
        "config": {"panes": [{"label": "A", "children": [
            {"id": "t2", "x": 0, "y": 0, "w": 6, "h": 3, "type": "tab"}
        ]}]}
    }]);
    assert!(matches!(store.import_config(&raw.to_string()), Err(ImportError::Nesting { .. })));
}

#[test]
fn import_replaces_layout_and_clears_history() {
    let mut store = store();
    let id = store.add_component("steps", GridPos::default()).unwrap();
    store.select_component(Some(&id));
    let raw = json!([
        {"id": "w1", "x": 0, "y": 0, "w": 4, "h": 3, "type": "briefingCard"},
        {"i": "w2", "x": 4, "y": 0, "w": 3, "h": 3, "type": "sparkline", "config": {"series": [1, 2]}}
    ]);
    assert_eq!(store.import_config(&raw.to_string()).unwrap(), 2);
    assert!(!store.can_undo());
    assert_eq!(store.state().selected, None);
    assert_eq!(store.layout().ids(), vec!["w1", "w2"]);
}

#[test]
fn export_round_trips_and_skips_placeholders() {
    let mut store = store();
    let tab = add_tab(&mut store);
    store.add_component_to(pane(&tab), "richText", GridPos::default(), None).unwrap();
    store.place_placeholder(&LayoutTarget::Root, "drop", 2, 2, GridPos::new(0, 9));
    store.place_placeholder(&pane(&tab), "tab-drop", 2, 2, GridPos::new(1, 1));

    let exported = store.export_config().unwrap();
    assert!(!exported.contains("__placeholder__"));

    let mut other = self::store();
    other.import_config(&exported).unwrap();
    assert_eq!(other.layout().widgets(), store.layout().persistent().as_slice());
}

#[test]
fn clear_empties_layout_and_history() {
    let mut store = store();
    store.add_component("steps", GridPos::default()).unwrap();
    store.clear();
    assert!(store.layout().is_empty());
    assert!(!store.can_undo() && !store.can_redo());
}

// =============================================================
// Placeholders
// =============================================================

#[test]
fn placeholder_place_move_take() {
    let mut store = store();
    let root = LayoutTarget::Root;
    let rev = store.revision();
    assert!(store.place_placeholder(&root, "drop", 3, 2, GridPos::new(1, 1)));
    assert!(store.place_placeholder(&root, "drop", 3, 2, GridPos::new(2, 1)));
    assert_eq!(store.layout().len(), 1);
    assert_eq!(store.layout().get("drop").map(WidgetInstance::position), Some(GridPos::new(2, 1)));
    // Same position again does not count as a change.
    store.place_placeholder(&root, "drop", 3, 2, GridPos::new(2, 1));
    assert_eq!(store.revision(), rev + 2);
    assert!(store.has_placeholder(&root, "drop"));
    assert!(store.take_placeholder(&root, "drop"));
    assert!(!store.take_placeholder(&root, "drop"));
    assert!(store.layout().is_empty());
    assert!(!store.can_undo());
}

#[test]
fn placeholder_in_missing_target_is_refused() {
    let mut store = store();
    assert!(!store.place_placeholder(&pane("ghost"), "tab-drop", 1, 1, GridPos::default()));
    assert!(!store.take_placeholder(&pane("ghost"), "tab-drop"));
}
