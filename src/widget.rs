//! Widget model: placed instances, their typed configuration, and sparse patches.
//!
//! This module defines what sits on the designer canvas (`WidgetInstance`),
//! the closed set of known widget kinds (`WidgetKind`) with one strongly typed
//! configuration schema each (`WidgetConfig`), and the sparse-update type used
//! by property edits (`WidgetPatch`).
//!
//! On the wire an instance is a flat record:
//! `{"id", "x", "y", "w", "h", "type", "config": {...}}`. Records without a
//! `config` object read their configuration from the remaining top-level
//! keys; records with one may not carry any other keys. Unknown type tags are
//! kept verbatim in [`WidgetConfig::Extension`] so layouts written by newer
//! palettes survive an import/export cycle.

#[cfg(test)]
#[path = "widget_test.rs"]
mod widget_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::PLACEHOLDER_TYPE;

/// Unique identifier for a widget within a layout.
pub type WidgetId = String;

/// Open-ended key/value configuration, as carried on the wire.
pub type ConfigFields = Map<String, Value>;

// =============================================================================
// GEOMETRY
// =============================================================================

/// A cell position on the designer grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    /// Column index.
    pub x: u32,
    /// Row index.
    pub y: u32,
}

impl GridPos {
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

// =============================================================================
// KINDS
// =============================================================================

/// The widget types the designer ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    BriefingCard,
    Steps,
    /// Container of tab panes, each holding its own child layout.
    Tab,
    FormField,
    DataTable,
    DataEntry,
    DataDynamics,
    TimeLine,
    Carousel,
    RichText,
    Iframe,
}

impl WidgetKind {
    /// Every built-in kind, in palette order.
    pub const ALL: [WidgetKind; 11] = [
        Self::BriefingCard,
        Self::Steps,
        Self::Tab,
        Self::FormField,
        Self::DataTable,
        Self::DataEntry,
        Self::DataDynamics,
        Self::TimeLine,
        Self::Carousel,
        Self::RichText,
        Self::Iframe,
    ];

    /// Wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BriefingCard => "briefingCard",
            Self::Steps => "steps",
            Self::Tab => "tab",
            Self::FormField => "formField",
            Self::DataTable => "dataTable",
            Self::DataEntry => "dataEntry",
            Self::DataDynamics => "dataDynamics",
            Self::TimeLine => "timeLine",
            Self::Carousel => "carousel",
            Self::RichText => "richText",
            Self::Iframe => "iframe",
        }
    }

    /// Resolve a wire tag. Returns `None` for extension and reserved tags.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TYPED CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BriefingCardConfig {
    pub title: String,
    pub subtitle: String,
    pub value: String,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepsConfig {
    pub steps: Vec<String>,
    /// Zero-based index of the highlighted step.
    pub active: usize,
}

/// One pane of a tab container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TabPane {
    pub label: String,
    /// Child layout rendered inside this pane, in paint order.
    pub children: Vec<WidgetInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TabConfig {
    pub panes: Vec<TabPane>,
    /// Zero-based index of the visible pane.
    pub active: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormFieldConfig {
    pub label: String,
    /// Input flavour as understood by the renderer (`text`, `number`, `date`, ...).
    pub field_type: String,
    pub required: bool,
    pub placeholder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableColumn {
    pub key: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataTableConfig {
    pub columns: Vec<TableColumn>,
    pub page_size: u32,
    pub striped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataEntryConfig {
    pub fields: Vec<String>,
    pub submit_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataDynamicsConfig {
    pub title: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineEntry {
    pub time: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeLineConfig {
    pub entries: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CarouselConfig {
    pub images: Vec<String>,
    pub interval_ms: u32,
    pub autoplay: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RichTextConfig {
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IframeConfig {
    pub src: String,
    pub allow_fullscreen: bool,
}

/// Per-kind configuration, tagged by widget type.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetConfig {
    BriefingCard(BriefingCardConfig),
    Steps(StepsConfig),
    Tab(TabConfig),
    FormField(FormFieldConfig),
    DataTable(DataTableConfig),
    DataEntry(DataEntryConfig),
    DataDynamics(DataDynamicsConfig),
    TimeLine(TimeLineConfig),
    Carousel(CarouselConfig),
    RichText(RichTextConfig),
    Iframe(IframeConfig),
    /// Transient drag placeholder. Never persisted.
    Placeholder,
    /// A type this build does not know; fields are carried through untouched.
    Extension { widget_type: String, fields: ConfigFields },
}

/// Why a wire record could not become a widget.
#[derive(Debug, thiserror::Error)]
pub enum WidgetShapeError {
    #[error("widget id must not be empty")]
    EmptyId,
    #[error("widget type must not be empty")]
    EmptyType,
    #[error("widget type `{0}` is reserved")]
    ReservedType(String),
    #[error("unexpected keys next to `config`: {}", .0.join(", "))]
    StrayKeys(Vec<String>),
    #[error("invalid `{widget_type}` configuration: {source}")]
    Config {
        widget_type: String,
        #[source]
        source: serde_json::Error,
    },
}

impl WidgetConfig {
    /// Default configuration for a built-in kind.
    #[must_use]
    pub fn default_for(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::BriefingCard => Self::BriefingCard(BriefingCardConfig::default()),
            WidgetKind::Steps => Self::Steps(StepsConfig::default()),
            WidgetKind::Tab => Self::Tab(TabConfig::default()),
            WidgetKind::FormField => Self::FormField(FormFieldConfig::default()),
            WidgetKind::DataTable => Self::DataTable(DataTableConfig::default()),
            WidgetKind::DataEntry => Self::DataEntry(DataEntryConfig::default()),
            WidgetKind::DataDynamics => Self::DataDynamics(DataDynamicsConfig::default()),
            WidgetKind::TimeLine => Self::TimeLine(TimeLineConfig::default()),
            WidgetKind::Carousel => Self::Carousel(CarouselConfig::default()),
            WidgetKind::RichText => Self::RichText(RichTextConfig::default()),
            WidgetKind::Iframe => Self::Iframe(IframeConfig::default()),
        }
    }

    /// Wire tag of this configuration's widget type.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Placeholder => PLACEHOLDER_TYPE,
            Self::Extension { widget_type, .. } => widget_type,
            other => other.kind().map_or(PLACEHOLDER_TYPE, WidgetKind::as_str),
        }
    }

    /// Built-in kind, if this is not a placeholder or extension.
    #[must_use]
    pub fn kind(&self) -> Option<WidgetKind> {
        let kind = match self {
            Self::BriefingCard(_) => WidgetKind::BriefingCard,
            Self::Steps(_) => WidgetKind::Steps,
            Self::Tab(_) => WidgetKind::Tab,
            Self::FormField(_) => WidgetKind::FormField,
            Self::DataTable(_) => WidgetKind::DataTable,
            Self::DataEntry(_) => WidgetKind::DataEntry,
            Self::DataDynamics(_) => WidgetKind::DataDynamics,
            Self::TimeLine(_) => WidgetKind::TimeLine,
            Self::Carousel(_) => WidgetKind::Carousel,
            Self::RichText(_) => WidgetKind::RichText,
            Self::Iframe(_) => WidgetKind::Iframe,
            Self::Placeholder | Self::Extension { .. } => return None,
        };
        Some(kind)
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// Tab panes, when this is a tab container.
    #[must_use]
    pub fn panes(&self) -> Option<&[TabPane]> {
        match self {
            Self::Tab(cfg) => Some(&cfg.panes),
            _ => None,
        }
    }

    /// Mutable tab panes, when this is a tab container.
    pub fn panes_mut(&mut self) -> Option<&mut Vec<TabPane>> {
        match self {
            Self::Tab(cfg) => Some(&mut cfg.panes),
            _ => None,
        }
    }

    /// Build a configuration from a wire tag and its raw fields.
    ///
    /// # Errors
    ///
    /// Returns `Config` when a built-in kind's fields do not match its schema,
    /// and `EmptyType` for an empty tag.
    pub fn from_parts(widget_type: &str, fields: ConfigFields) -> Result<Self, WidgetShapeError> {
        if widget_type.is_empty() {
            return Err(WidgetShapeError::EmptyType);
        }
        if widget_type == PLACEHOLDER_TYPE {
            return Ok(Self::Placeholder);
        }
        let Some(kind) = WidgetKind::from_tag(widget_type) else {
            return Ok(Self::Extension { widget_type: widget_type.to_string(), fields });
        };

        let value = Value::Object(fields);
        let parsed = match kind {
            WidgetKind::BriefingCard => serde_json::from_value(value).map(Self::BriefingCard),
            WidgetKind::Steps => serde_json::from_value(value).map(Self::Steps),
            WidgetKind::Tab => serde_json::from_value(value).map(Self::Tab),
            WidgetKind::FormField => serde_json::from_value(value).map(Self::FormField),
            WidgetKind::DataTable => serde_json::from_value(value).map(Self::DataTable),
            WidgetKind::DataEntry => serde_json::from_value(value).map(Self::DataEntry),
            WidgetKind::DataDynamics => serde_json::from_value(value).map(Self::DataDynamics),
            WidgetKind::TimeLine => serde_json::from_value(value).map(Self::TimeLine),
            WidgetKind::Carousel => serde_json::from_value(value).map(Self::Carousel),
            WidgetKind::RichText => serde_json::from_value(value).map(Self::RichText),
            WidgetKind::Iframe => serde_json::from_value(value).map(Self::Iframe),
        };
        parsed.map_err(|source| WidgetShapeError::Config { widget_type: widget_type.to_string(), source })
    }

    /// Flatten this configuration into wire fields.
    #[must_use]
    pub fn to_fields(&self) -> ConfigFields {
        let value = match self {
            Self::BriefingCard(cfg) => serde_json::to_value(cfg),
            Self::Steps(cfg) => serde_json::to_value(cfg),
            Self::Tab(cfg) => serde_json::to_value(cfg),
            Self::FormField(cfg) => serde_json::to_value(cfg),
            Self::DataTable(cfg) => serde_json::to_value(cfg),
            Self::DataEntry(cfg) => serde_json::to_value(cfg),
            Self::DataDynamics(cfg) => serde_json::to_value(cfg),
            Self::TimeLine(cfg) => serde_json::to_value(cfg),
            Self::Carousel(cfg) => serde_json::to_value(cfg),
            Self::RichText(cfg) => serde_json::to_value(cfg),
            Self::Iframe(cfg) => serde_json::to_value(cfg),
            Self::Placeholder => return ConfigFields::new(),
            Self::Extension { fields, .. } => return fields.clone(),
        };
        match value {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => ConfigFields::new(),
            Err(e) => {
                tracing::error!(error = %e, widget_type = self.type_tag(), "config serialization failed");
                ConfigFields::new()
            }
        }
    }

    /// Shallow-merge `incoming` over this configuration's fields.
    ///
    /// Keys with a `null` value are removed, which resets typed fields to
    /// their schema default.
    ///
    /// # Errors
    ///
    /// Returns `ReservedType` for placeholders and `Config` when the merged
    /// fields no longer match the kind's schema.
    pub fn merged(&self, incoming: &ConfigFields) -> Result<Self, WidgetShapeError> {
        if self.is_placeholder() {
            return Err(WidgetShapeError::ReservedType(PLACEHOLDER_TYPE.to_string()));
        }
        let mut fields = self.to_fields();
        for (k, v) in incoming {
            if v.is_null() {
                fields.remove(k);
            } else {
                fields.insert(k.clone(), v.clone());
            }
        }
        Self::from_parts(self.type_tag(), fields)
    }
}

// =============================================================================
// INSTANCES
// =============================================================================

/// A placed widget. `(x, y, w, h)` are grid units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWidget", into = "RawWidget")]
pub struct WidgetInstance {
    pub id: WidgetId,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub config: WidgetConfig,
}

impl WidgetInstance {
    /// Transient placeholder reserving `w × h` cells during a drag.
    #[must_use]
    pub fn placeholder(id: &str, w: u32, h: u32) -> Self {
        Self { id: id.to_string(), x: 0, y: 0, w, h, config: WidgetConfig::Placeholder }
    }

    /// Wire tag of this widget's type.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.config.type_tag()
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.config.is_placeholder()
    }

    #[must_use]
    pub fn position(&self) -> GridPos {
        GridPos { x: self.x, y: self.y }
    }

    /// Copy of this widget with placeholders stripped from any nested panes.
    #[must_use]
    pub fn without_placeholders(&self) -> Self {
        let mut out = self.clone();
        if let Some(panes) = out.config.panes_mut() {
            for pane in panes {
                pane.children.retain(|child| !child.is_placeholder());
            }
        }
        out
    }

    /// Placeholder-free copy of this widget that keeps whatever drag
    /// placeholders `live` currently holds in the same panes.
    #[must_use]
    pub fn with_live_placeholders(&self, live: &Self) -> Self {
        let mut out = self.without_placeholders();
        let (Some(panes), Some(live_panes)) = (out.config.panes_mut(), live.config.panes()) else {
            return out;
        };
        for (pane, live_pane) in panes.iter_mut().zip(live_panes) {
            pane.children
                .extend(live_pane.children.iter().filter(|child| child.is_placeholder()).cloned());
        }
        out
    }
}

/// Flat wire record for a widget.
///
/// Older exports carry configuration keys beside the geometry instead of
/// under `config`. Those land in `rest` and are only accepted when there is
/// no `config` object.
#[derive(Serialize, Deserialize)]
struct RawWidget {
    #[serde(alias = "i")]
    id: String,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    #[serde(rename = "type")]
    widget_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    config: Option<ConfigFields>,
    #[serde(flatten)]
    rest: ConfigFields,
}

impl TryFrom<RawWidget> for WidgetInstance {
    type Error = WidgetShapeError;

    fn try_from(raw: RawWidget) -> Result<Self, Self::Error> {
        if raw.id.is_empty() {
            return Err(WidgetShapeError::EmptyId);
        }
        if raw.widget_type == PLACEHOLDER_TYPE {
            return Err(WidgetShapeError::ReservedType(raw.widget_type));
        }
        let fields = match raw.config {
            None => raw.rest,
            Some(config) if raw.rest.is_empty() => config,
            Some(_) => return Err(WidgetShapeError::StrayKeys(raw.rest.keys().cloned().collect())),
        };
        let config = WidgetConfig::from_parts(&raw.widget_type, fields)?;
        Ok(Self { id: raw.id, x: raw.x, y: raw.y, w: raw.w, h: raw.h, config })
    }
}

impl From<WidgetInstance> for RawWidget {
    fn from(widget: WidgetInstance) -> Self {
        let config = Some(widget.config.to_fields()).filter(|fields| !fields.is_empty());
        let widget_type = widget.config.type_tag().to_string();
        Self { id: widget.id, x: widget.x, y: widget.y, w: widget.w, h: widget.h, widget_type, config, rest: Map::new() }
    }
}

// =============================================================================
// PATCHES
// =============================================================================

/// Sparse update for a widget. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    /// Configuration keys to merge or remove (null values delete keys).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigFields>,
}

impl WidgetPatch {
    /// Patch that only moves the widget.
    #[must_use]
    pub fn position(pos: GridPos) -> Self {
        Self { x: Some(pos.x), y: Some(pos.y), ..Default::default() }
    }

    /// Patch that only resizes the widget.
    #[must_use]
    pub fn size(w: u32, h: u32) -> Self {
        Self { w: Some(w), h: Some(h), ..Default::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.w.is_none() && self.h.is_none() && self.config.is_none()
    }

    /// Produce the patched copy of `widget`. The id is never touched.
    ///
    /// # Errors
    ///
    /// Propagates configuration merge failures from [`WidgetConfig::merged`].
    pub fn apply_to(&self, widget: &WidgetInstance) -> Result<WidgetInstance, WidgetShapeError> {
        let mut next = widget.clone();
        if let Some(x) = self.x {
            next.x = x;
        }
        if let Some(y) = self.y {
            next.y = y;
        }
        if let Some(w) = self.w {
            next.w = w;
        }
        if let Some(h) = self.h {
            next.h = h;
        }
        if let Some(ref fields) = self.config {
            next.config = widget.config.merged(fields)?;
        }
        Ok(next)
    }
}
