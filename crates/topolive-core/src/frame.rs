use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::CorrelationId;

pub const NAMESPACE_GRAPH: &str = "Graph";
pub const NAMESPACE_METRICS: &str = "Metrics";
pub const TYPE_HIGHLIGHT: &str = "Highlight";
pub const TYPE_METRIC_UPDATE: &str = "MetricUpdate";

/// Envelope of every message exchanged over the websocket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "Namespace")]
    pub namespace: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "UUID", default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<CorrelationId>,
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(rename = "Obj", default)]
    pub obj: Value,
}

impl Frame {
    pub fn parse(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn highlight_request(id: CorrelationId, expr: &str) -> Self {
        Self {
            namespace: NAMESPACE_GRAPH.into(),
            kind: TYPE_HIGHLIGHT.into(),
            uuid: Some(id),
            status: None,
            obj: serde_json::json!({ "Expr": expr }),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// `(widget, object)` when this frame is a metric update.
    pub fn metric_update(&self) -> Option<(&str, &Map<String, Value>)> {
        if self.namespace != NAMESPACE_METRICS || self.kind != TYPE_METRIC_UPDATE {
            return None;
        }
        let widget = self.obj.get("Widget")?.as_str()?;
        let metric = self.obj.get("Metric")?.as_object()?;
        Some((widget, metric))
    }
}
