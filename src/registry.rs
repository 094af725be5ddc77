//! Widget registry: palette descriptors, instance creation, nesting policy.
//!
//! DESIGN
//! ======
//! A descriptor owns a default [`WidgetConfig`]; creating an instance clones
//! it, so instances of one type never share configuration. Ids come from the
//! caller when supplied, otherwise from `"{type}-{seq}"` with a per-registry
//! sequence that skips ids the caller reports as taken.
//!
//! The nesting rule lives in [`NestingPolicy`], a table of denied
//! parent/child pairs. Callers only ever ask [`WidgetRegistry::can_nest`].

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::consts::{UNKNOWN_WIDGET_ICON, UNKNOWN_WIDGET_LABEL};
use crate::widget::{
    BriefingCardConfig, CarouselConfig, DataTableConfig, FormFieldConfig, GridPos, StepsConfig, TabConfig, TabPane,
    TableColumn, WidgetConfig, WidgetId, WidgetInstance, WidgetKind, WidgetPatch, WidgetShapeError,
};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown widget type: {0}")]
    UnknownType(String),
    #[error("widget type `{0}` cannot be registered")]
    ReservedType(String),
    #[error("widget id already in use: {0}")]
    IdTaken(WidgetId),
    #[error("invalid overrides for {widget_type}: {source}")]
    InvalidOverrides {
        widget_type: String,
        #[source]
        source: WidgetShapeError,
    },
}

/// Palette entry for one widget type.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDescriptor {
    pub label: String,
    pub icon: String,
    /// Default width in grid columns.
    pub w: u32,
    /// Default height in grid rows.
    pub h: u32,
    /// Default configuration; its variant decides the type tag.
    pub config: WidgetConfig,
}

impl WidgetDescriptor {
    #[must_use]
    pub fn new(label: &str, icon: &str, w: u32, h: u32, config: WidgetConfig) -> Self {
        Self { label: label.to_string(), icon: icon.to_string(), w, h, config }
    }

    #[must_use]
    pub fn widget_type(&self) -> &str {
        self.config.type_tag()
    }
}

/// Display metadata for a type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetInfo {
    pub label: String,
    pub icon: String,
}

/// Caller-supplied values that win over descriptor defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateOverrides {
    pub id: Option<WidgetId>,
    pub patch: WidgetPatch,
}

/// Denied parent/child type pairs. Anything not listed may nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestingPolicy {
    denied: Vec<(String, String)>,
}

impl Default for NestingPolicy {
    /// A tab container may not directly hold another tab container.
    fn default() -> Self {
        let tab = WidgetKind::Tab.as_str().to_string();
        Self { denied: vec![(tab.clone(), tab)] }
    }
}

impl NestingPolicy {
    /// Policy that allows every pair.
    #[must_use]
    pub fn permissive() -> Self {
        Self { denied: Vec::new() }
    }

    pub fn deny(&mut self, parent: &str, child: &str) {
        if !self.denied.iter().any(|(p, c)| p == parent && c == child) {
            self.denied.push((parent.to_string(), child.to_string()));
        }
    }

    #[must_use]
    pub fn allows(&self, parent: &str, child: &str) -> bool {
        !self.denied.iter().any(|(p, c)| p == parent && c == child)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    descriptors: Vec<WidgetDescriptor>,
    index: HashMap<String, usize>,
    policy: NestingPolicy,
    next_seq: u64,
}

impl WidgetRegistry {
    /// Empty registry with the default nesting policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with every built-in widget type.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin_descriptors() {
            if let Err(e) = registry.register(descriptor) {
                warn!(error = %e, "built-in descriptor rejected");
            }
        }
        registry
    }

    /// Add or overwrite a descriptor. Overwriting keeps palette position.
    ///
    /// # Errors
    ///
    /// Returns `ReservedType` for the placeholder type or an empty tag.
    pub fn register(&mut self, descriptor: WidgetDescriptor) -> Result<(), RegistryError> {
        let tag = descriptor.widget_type().to_string();
        if descriptor.config.is_placeholder() || tag.is_empty() {
            return Err(RegistryError::ReservedType(tag));
        }
        if let Some(&slot) = self.index.get(&tag) {
            debug!(widget_type = %tag, "registry: descriptor overwritten");
            self.descriptors[slot] = descriptor;
        } else {
            self.index.insert(tag, self.descriptors.len());
            self.descriptors.push(descriptor);
        }
        Ok(())
    }

    #[must_use]
    pub fn descriptor(&self, widget_type: &str) -> Option<&WidgetDescriptor> {
        self.index.get(widget_type).and_then(|&i| self.descriptors.get(i))
    }

    /// Registered descriptors in palette order.
    #[must_use]
    pub fn descriptors(&self) -> &[WidgetDescriptor] {
        &self.descriptors
    }

    /// Label and icon for `widget_type`, with a generic fallback.
    #[must_use]
    pub fn info(&self, widget_type: &str) -> WidgetInfo {
        match self.descriptor(widget_type) {
            Some(d) => WidgetInfo { label: d.label.clone(), icon: d.icon.clone() },
            None => WidgetInfo { label: UNKNOWN_WIDGET_LABEL.to_string(), icon: UNKNOWN_WIDGET_ICON.to_string() },
        }
    }

    #[must_use]
    pub fn can_nest(&self, parent_type: &str, child_type: &str) -> bool {
        self.policy.allows(parent_type, child_type)
    }

    #[must_use]
    pub fn policy(&self) -> &NestingPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut NestingPolicy {
        &mut self.policy
    }

    /// Materialize a new instance of `widget_type` at `pos`.
    ///
    /// # Errors
    ///
    /// See [`WidgetRegistry::create_with`].
    pub fn create(
        &mut self,
        widget_type: &str,
        pos: GridPos,
        overrides: Option<&CreateOverrides>,
    ) -> Result<WidgetInstance, RegistryError> {
        self.create_with(widget_type, pos, overrides, &|_| false)
    }

    /// Like [`create`](Self::create), consulting `taken` so generated ids
    /// never collide with ids already placed.
    ///
    /// # Errors
    ///
    /// - `UnknownType` when `widget_type` is not registered (nothing changes)
    /// - `IdTaken` when the caller-supplied id is already in use
    /// - `InvalidOverrides` when the override patch does not fit the schema
    pub fn create_with(
        &mut self,
        widget_type: &str,
        pos: GridPos,
        overrides: Option<&CreateOverrides>,
        taken: &dyn Fn(&str) -> bool,
    ) -> Result<WidgetInstance, RegistryError> {
        let Some(descriptor) = self.descriptor(widget_type) else {
            warn!(widget_type = %widget_type, "create: unknown widget type");
            return Err(RegistryError::UnknownType(widget_type.to_string()));
        };
        let mut widget = WidgetInstance {
            id: String::new(),
            x: pos.x,
            y: pos.y,
            w: descriptor.w,
            h: descriptor.h,
            config: descriptor.config.clone(),
        };

        if let Some(over) = overrides {
            widget = over.patch.apply_to(&widget).map_err(|source| {
                warn!(widget_type = %widget_type, error = %source, "create: overrides rejected");
                RegistryError::InvalidOverrides { widget_type: widget_type.to_string(), source }
            })?;
        }

        widget.id = match overrides.and_then(|o| o.id.clone()) {
            Some(id) if taken(&id) => {
                warn!(widget_type = %widget_type, %id, "create: id already in use");
                return Err(RegistryError::IdTaken(id));
            }
            Some(id) => id,
            None => self.fresh_id(widget_type, taken),
        };
        debug!(widget_type = %widget_type, id = %widget.id, x = widget.x, y = widget.y, "widget created");
        Ok(widget)
    }

    fn fresh_id(&mut self, widget_type: &str, taken: &dyn Fn(&str) -> bool) -> WidgetId {
        loop {
            self.next_seq += 1;
            let id = format!("{widget_type}-{}", self.next_seq);
            if !taken(&id) {
                return id;
            }
        }
    }
}

// =============================================================================
// BUILT-IN CATALOGUE
// =============================================================================

fn builtin_descriptors() -> Vec<WidgetDescriptor> {
    WidgetKind::ALL
        .into_iter()
        .map(|kind| {
            let (label, icon, w, h) = match kind {
                WidgetKind::BriefingCard => ("Briefing card", "Memo", 4, 3),
                WidgetKind::Steps => ("Steps", "Guide", 6, 2),
                WidgetKind::Tab => ("Tabs", "Folder", 12, 6),
                WidgetKind::FormField => ("Form field", "EditPen", 4, 2),
                WidgetKind::DataTable => ("Data table", "List", 8, 6),
                WidgetKind::DataEntry => ("Data entry", "Edit", 6, 4),
                WidgetKind::DataDynamics => ("Data dynamics", "TrendCharts", 4, 4),
                WidgetKind::TimeLine => ("Timeline", "Clock", 4, 6),
                WidgetKind::Carousel => ("Carousel", "Picture", 6, 4),
                WidgetKind::RichText => ("Rich text", "Document", 6, 3),
                WidgetKind::Iframe => ("Embedded page", "Link", 6, 6),
            };
            WidgetDescriptor::new(label, icon, w, h, builtin_config(kind))
        })
        .collect()
}

fn builtin_config(kind: WidgetKind) -> WidgetConfig {
    match kind {
        WidgetKind::BriefingCard => WidgetConfig::BriefingCard(BriefingCardConfig {
            title: "Metric".into(),
            value: "0".into(),
            ..Default::default()
        }),
        WidgetKind::Steps => WidgetConfig::Steps(StepsConfig {
            steps: vec!["Start".into(), "Review".into(), "Done".into()],
            active: 0,
        }),
        WidgetKind::Tab => WidgetConfig::Tab(TabConfig {
            panes: vec![
                TabPane { label: "Tab 1".into(), children: Vec::new() },
                TabPane { label: "Tab 2".into(), children: Vec::new() },
            ],
            active: 0,
        }),
        WidgetKind::FormField => WidgetConfig::FormField(FormFieldConfig {
            label: "Field".into(),
            field_type: "text".into(),
            ..Default::default()
        }),
        WidgetKind::DataTable => WidgetConfig::DataTable(DataTableConfig {
            columns: vec![TableColumn { key: "name".into(), title: "Name".into() }],
            page_size: 10,
            striped: true,
        }),
        WidgetKind::Carousel => WidgetConfig::Carousel(CarouselConfig { interval_ms: 3000, autoplay: true, ..Default::default() }),
        other => WidgetConfig::default_for(other),
    }
}
