//! Property-editor lookup by widget type.
//!
//! The property panel asks for an editor per selected widget. Lookup never
//! fails: types without a dedicated editor get [`EditorKind::Common`].

#[cfg(test)]
#[path = "editors_test.rs"]
mod editors_test;

use std::collections::HashMap;

use crate::widget::WidgetKind;

/// Editor flavours the property panel knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorKind {
    BriefingCard,
    Tab,
    FormField,
    DataTable,
    /// Position, size and raw configuration fields.
    Common,
}

#[derive(Debug, Clone)]
pub struct EditorRegistry {
    editors: HashMap<String, EditorKind>,
}

impl Default for EditorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorRegistry {
    /// Registry with a dedicated editor for each kind that has one.
    #[must_use]
    pub fn new() -> Self {
        let editors = WidgetKind::ALL
            .into_iter()
            .map(|kind| {
                let editor = match kind {
                    WidgetKind::BriefingCard => EditorKind::BriefingCard,
                    WidgetKind::Tab => EditorKind::Tab,
                    WidgetKind::FormField => EditorKind::FormField,
                    WidgetKind::DataTable => EditorKind::DataTable,
                    _ => EditorKind::Common,
                };
                (kind.as_str().to_string(), editor)
            })
            .collect();
        Self { editors }
    }

    #[must_use]
    pub fn get_editor(&self, widget_type: &str) -> EditorKind {
        self.editors.get(widget_type).copied().unwrap_or(EditorKind::Common)
    }

    pub fn register_editor(&mut self, widget_type: &str, editor: EditorKind) {
        self.editors.insert(widget_type.to_string(), editor);
    }

    #[must_use]
    pub fn has_editor(&self, widget_type: &str) -> bool {
        self.editors.contains_key(widget_type)
    }
}
