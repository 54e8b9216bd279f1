//! Metric widgets: one field engine per widget name.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use topolive_core::fields::{FieldDescriptor, FieldEngine, FieldRules};

/// Renderable state of one widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub visible: Vec<String>,
    pub row: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct WidgetRegistry {
    rules: FieldRules,
    widgets: BTreeMap<String, FieldEngine>,
}

impl WidgetRegistry {
    pub fn new(rules: FieldRules) -> Self {
        Self {
            rules,
            widgets: BTreeMap::new(),
        }
    }

    /// Feed a metric object to `widget`, creating its engine on first sight.
    pub fn observe(&mut self, widget: &str, metric: Map<String, Value>) {
        let engine = self
            .widgets
            .entry(widget.to_string())
            .or_insert_with(|| FieldEngine::new(self.rules.clone()));
        engine.observe(metric);
        tracing::trace!(widget, fields = engine.fields().len(), "widget updated");
    }

    /// Returns false when the widget or field is unknown.
    pub fn toggle(&mut self, widget: &str, field: &str) -> bool {
        self.widgets
            .get_mut(widget)
            .is_some_and(|engine| engine.toggle(field))
    }

    pub fn get(&self, widget: &str) -> Option<&FieldEngine> {
        self.widgets.get(widget)
    }

    pub fn view(&self, widget: &str) -> Option<WidgetView> {
        let engine = self.widgets.get(widget)?;
        Some(WidgetView {
            name: widget.to_string(),
            fields: engine.fields().to_vec(),
            visible: engine.visible_fields().map(|f| f.name().to_string()).collect(),
            row: engine.row().clone(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.widgets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}
