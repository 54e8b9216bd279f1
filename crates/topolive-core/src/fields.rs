//! Field visibility inference for heterogeneous metric objects.
//!
//! One [`FieldEngine`] backs one metrics widget. It keeps a stable, ordered
//! list of field descriptors across object revisions and decides which
//! columns are shown, without ever overriding an explicit user toggle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TIME_FIELDS: [&str; 2] = ["Start", "Last"];
pub const DEFAULT_FIELDS: [&str; 4] = ["RxBytes", "RxPackets", "TxBytes", "TxPackets"];

/// What happens to descriptors whose key stops appearing in updates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrunePolicy {
    /// Keep them forever so the column layout never shifts.
    #[default]
    Retain,
    /// Drop a descriptor after it has been missing from this many consecutive
    /// updates. Time fields and user-toggled fields are always kept.
    AfterMissing(u32),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldRules {
    /// Labels pinned to the front and always visible unless toggled off.
    pub time_fields: Vec<String>,
    /// Labels forced visible when every other metric would be hidden.
    pub default_fields: Vec<String>,
    pub prune: PrunePolicy,
}

impl Default for FieldRules {
    fn default() -> Self {
        Self {
            time_fields: TIME_FIELDS.iter().map(|s| s.to_string()).collect(),
            default_fields: DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect(),
            prune: PrunePolicy::Retain,
        }
    }
}

impl FieldRules {
    fn is_time(&self, label: &str) -> bool {
        self.time_fields.iter().any(|t| t == label)
    }

    fn is_default(&self, label: &str) -> bool {
        self.default_fields.iter().any(|d| d == label)
    }
}

/// Display state of one key of a metric object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    name: String,
    label: String,
    visible: bool,
    user_overridden: bool,
    #[serde(skip)]
    missing_updates: u32,
}

impl FieldDescriptor {
    fn new(key: &str, visible: bool) -> Self {
        Self {
            name: key.to_string(),
            label: key.to_string(),
            visible,
            user_overridden: false,
            missing_updates: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn user_overridden(&self) -> bool {
        self.user_overridden
    }
}

/// A value is worth a column when it is a non-empty string or a positive number.
pub fn can_show(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|v| v > 0.0),
        _ => false,
    }
}

#[derive(Clone, Debug, Default)]
pub struct FieldEngine {
    rules: FieldRules,
    fields: Vec<FieldDescriptor>,
    row: Map<String, Value>,
}

impl FieldEngine {
    pub fn new(rules: FieldRules) -> Self {
        Self {
            rules,
            fields: Vec::new(),
            row: Map::new(),
        }
    }

    /// Feed a new revision of the metric object.
    pub fn observe(&mut self, object: Map<String, Value>) {
        let mut changed = false;
        if self.fields.is_empty() {
            changed |= self.generate(&object);
        }
        changed |= self.update(&object);
        self.row = object;

        if changed {
            self.apply_zero_metrics_fallback();
        }
    }

    /// Flip a field's visibility on behalf of the user. The field is never
    /// recomputed automatically afterwards. Returns false for unknown names.
    pub fn toggle(&mut self, name: &str) -> bool {
        let Some(field) = self.fields.iter_mut().find(|f| f.name == name) else {
            return false;
        };
        field.visible = !field.visible;
        field.user_overridden = true;
        self.apply_zero_metrics_fallback();
        true
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.visible)
    }

    /// Latest observed object, the single row rendered by the widget.
    pub fn row(&self) -> &Map<String, Value> {
        &self.row
    }

    pub fn rules(&self) -> &FieldRules {
        &self.rules
    }

    fn generate(&mut self, object: &Map<String, Value>) -> bool {
        for (key, value) in object {
            if self.rules.is_time(key) {
                self.fields.insert(0, FieldDescriptor::new(key, true));
            } else {
                self.fields.push(FieldDescriptor::new(key, can_show(value)));
            }
        }
        !object.is_empty()
    }

    fn update(&mut self, object: &Map<String, Value>) -> bool {
        let mut changed = false;

        for field in &mut self.fields {
            let Some(value) = object.get(&field.name) else {
                field.missing_updates = field.missing_updates.saturating_add(1);
                continue;
            };
            field.missing_updates = 0;
            if field.user_overridden {
                continue;
            }
            let visible = can_show(value) || self.rules.is_time(&field.label);
            if field.visible != visible {
                field.visible = visible;
                changed = true;
            }
        }

        for (key, value) in object {
            if self.fields.iter().any(|f| &f.name == key) {
                continue;
            }
            self.fields.push(FieldDescriptor::new(key, can_show(value)));
            changed = true;
        }

        if let PrunePolicy::AfterMissing(limit) = self.rules.prune {
            let rules = &self.rules;
            let before = self.fields.len();
            self.fields.retain(|f| {
                f.missing_updates == 0
                    || f.missing_updates < limit
                    || f.user_overridden
                    || rules.is_time(&f.label)
            });
            if self.fields.len() != before {
                tracing::debug!(pruned = before - self.fields.len(), "pruned stale fields");
                changed = true;
            }
        }

        changed
    }

    fn zero_metrics(&self) -> bool {
        !self
            .fields
            .iter()
            .any(|f| f.visible && !self.rules.is_time(&f.label))
    }

    // Keeps the widget from rendering blank when every counter is zero.
    fn apply_zero_metrics_fallback(&mut self) {
        if !self.zero_metrics() {
            return;
        }
        for field in &mut self.fields {
            if self.rules.is_default(&field.label) {
                field.visible = true;
            }
        }
    }
}
