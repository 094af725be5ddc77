use serde_json::json;

use super::*;

fn card(id: &str) -> WidgetInstance {
    WidgetInstance {
        id: id.to_string(),
        x: 1,
        y: 2,
        w: 4,
        h: 3,
        config: WidgetConfig::BriefingCard(BriefingCardConfig { title: "Revenue".into(), ..Default::default() }),
    }
}

fn fields(value: serde_json::Value) -> ConfigFields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => ConfigFields::new(),
    }
}

// =============================================================
// WidgetKind
// =============================================================

#[test]
fn kind_tags_resolve_back() {
    for kind in WidgetKind::ALL {
        assert_eq!(WidgetKind::from_tag(kind.as_str()), Some(kind));
    }
}

#[test]
fn kind_unknown_tag_is_none() {
    assert_eq!(WidgetKind::from_tag("hexagon"), None);
    assert_eq!(WidgetKind::from_tag(PLACEHOLDER_TYPE), None);
}

#[test]
fn tab_container_tag_is_tab() {
    assert_eq!(WidgetKind::Tab.as_str(), "tab");
    assert_eq!(WidgetKind::Tab.to_string(), "tab");
}

// =============================================================
// Wire format
// =============================================================

#[test]
fn instance_serializes_flat_record() {
    let value = serde_json::to_value(card("w1")).unwrap();
    assert_eq!(value["id"], "w1");
    assert_eq!(value["type"], "briefingCard");
    assert_eq!(value["x"], 1);
    assert_eq!(value["h"], 3);
    assert_eq!(value["config"]["title"], "Revenue");
}

#[test]
fn instance_accepts_legacy_i_key() {
    let widget: WidgetInstance =
        serde_json::from_value(json!({"i": "w9", "x": 0, "y": 0, "w": 2, "h": 2, "type": "richText"})).unwrap();
    assert_eq!(widget.id, "w9");
    assert_eq!(widget.config, WidgetConfig::RichText(RichTextConfig::default()));
}

#[test]
fn record_without_config_reads_top_level_fields() {
    let widget: WidgetInstance = serde_json::from_value(json!({
        "i": "w7", "x": 0, "y": 0, "w": 4, "h": 3, "type": "briefingCard", "title": "Sales", "unit": "EUR"
    }))
    .unwrap();
    let WidgetConfig::BriefingCard(cfg) = &widget.config else {
        panic!("expected a briefing card, got {:?}", widget.config);
    };
    assert_eq!((cfg.title.as_str(), cfg.unit.as_str()), ("Sales", "EUR"));
    // Exported in the current shape.
    assert_eq!(serde_json::to_value(&widget).unwrap()["config"]["title"], "Sales");
}

#[test]
fn stray_keys_beside_config_are_rejected() {
    let err = serde_json::from_value::<WidgetInstance>(json!({
        "id": "w1", "x": 0, "y": 0, "w": 4, "h": 3, "type": "briefingCard",
        "config": {"title": "A"}, "subtitle": "lost"
    }))
    .unwrap_err();
    assert!(err.to_string().contains("subtitle"), "{err}");
}

#[test]
fn flat_record_with_mistyped_field_is_rejected() {
    let result = serde_json::from_value::<WidgetInstance>(json!({
        "id": "w1", "x": 0, "y": 0, "w": 2, "h": 2, "type": "steps", "steps": "one"
    }));
    assert!(result.is_err());
}

#[test]
fn instance_rejects_negative_geometry() {
    let result = serde_json::from_value::<WidgetInstance>(json!({
        "id": "w1", "x": -1, "y": 0, "w": 2, "h": 2, "type": "steps"
    }));
    assert!(result.is_err());
}

#[test]
fn instance_rejects_empty_id() {
    let result = serde_json::from_value::<WidgetInstance>(json!({
        "id": "", "x": 0, "y": 0, "w": 2, "h": 2, "type": "steps"
    }));
    assert!(result.is_err());
}

#[test]
fn instance_rejects_placeholder_type() {
    let result = serde_json::from_value::<WidgetInstance>(json!({
        "id": "drop", "x": 0, "y": 0, "w": 2, "h": 2, "type": "__placeholder__"
    }));
    assert!(result.is_err());
}

#[test]
fn instance_rejects_mistyped_config() {
    let result = serde_json::from_value::<WidgetInstance>(json!({
        "id": "w1", "x": 0, "y": 0, "w": 2, "h": 2, "type": "steps", "config": {"steps": "one"}
    }));
    assert!(result.is_err());
}

#[test]
fn unknown_type_is_kept_as_extension() {
    let input = json!({
        "id": "x1", "x": 0, "y": 0, "w": 3, "h": 1, "type": "gauge", "config": {"max": 100}
    });
    let widget: WidgetInstance = serde_json::from_value(input.clone()).unwrap();
    assert_eq!(widget.type_tag(), "gauge");
    assert!(widget.config.kind().is_none());
    assert_eq!(serde_json::to_value(&widget).unwrap(), input);
}

#[test]
fn tab_children_parse_recursively() {
    let widget: WidgetInstance = serde_json::from_value(json!({
        "id": "t1", "x": 0, "y": 0, "w": 12, "h": 6, "type": "tab",
        "config": {"panes": [{"label": "A", "children": [
            {"id": "c1", "x": 0, "y": 0, "w": 2, "h": 2, "type": "formField"}
        ]}]}
    }))
    .unwrap();
    let panes = widget.config.panes().unwrap();
    assert_eq!(panes.len(), 1);
    assert_eq!(panes[0].children[0].id, "c1");
}

// =============================================================
// Merge / patch
// =============================================================

#[test]
fn merged_overrides_and_keeps_other_fields() {
    let cfg = WidgetConfig::BriefingCard(BriefingCardConfig {
        title: "Revenue".into(),
        unit: "USD".into(),
        ..Default::default()
    });
    let next = cfg.merged(&fields(json!({"title": "Costs"}))).unwrap();
    let WidgetConfig::BriefingCard(card) = next else {
        panic!("kind changed");
    };
    assert_eq!(card.title, "Costs");
    assert_eq!(card.unit, "USD");
}

#[test]
fn merged_null_resets_to_default() {
    let cfg = WidgetConfig::Iframe(IframeConfig { src: "https://a".into(), allow_fullscreen: true });
    let next = cfg.merged(&fields(json!({"src": null}))).unwrap();
    assert_eq!(next, WidgetConfig::Iframe(IframeConfig { src: String::new(), allow_fullscreen: true }));
}

#[test]
fn merged_rejects_schema_violation() {
    let cfg = WidgetConfig::Carousel(CarouselConfig::default());
    assert!(cfg.merged(&fields(json!({"autoplay": "yes"}))).is_err());
}

#[test]
fn merged_placeholder_is_rejected() {
    assert!(WidgetConfig::Placeholder.merged(&ConfigFields::new()).is_err());
}

#[test]
fn patch_applies_only_present_fields() {
    let widget = card("w1");
    let next = WidgetPatch { h: Some(5), ..Default::default() }.apply_to(&widget).unwrap();
    assert_eq!(next.h, 5);
    assert_eq!(next.w, widget.w);
    assert_eq!(next.x, widget.x);
    assert_eq!(next.config, widget.config);
    assert_eq!(next.id, "w1");
}

#[test]
fn patch_default_is_empty() {
    assert!(WidgetPatch::default().is_empty());
    assert!(!WidgetPatch::size(1, 1).is_empty());
    assert!(!WidgetPatch::position(GridPos::new(0, 0)).is_empty());
}

#[test]
fn patch_skips_absent_fields_when_serialized() {
    let serialized = serde_json::to_string(&WidgetPatch { x: Some(3), ..Default::default() }).unwrap();
    assert_eq!(serialized, "{\"x\":3}");
}

#[test]
fn without_placeholders_strips_pane_children() {
    let mut tab = WidgetInstance {
        id: "t1".into(),
        x: 0,
        y: 0,
        w: 12,
        h: 6,
        config: WidgetConfig::Tab(TabConfig {
            panes: vec![TabPane { label: "A".into(), children: vec![card("c1")] }],
            active: 0,
        }),
    };
    if let Some(panes) = tab.config.panes_mut() {
        panes[0].children.push(WidgetInstance::placeholder("tab-drop", 2, 2));
    }
    let clean = tab.without_placeholders();
    assert_eq!(clean.config.panes().unwrap()[0].children.len(), 1);
}
