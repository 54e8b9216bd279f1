use serde::Serialize;

use crate::ids::CorrelationId;
use crate::operations::{OperationState, OperationTracker};

/// Graph selection and highlight state driven by UI actions.
#[derive(Debug, Default)]
pub struct ViewState {
    current_node: Option<String>,
    current_edge: Option<String>,
    highlighted_nodes: Vec<String>,
    emphasized_nodes: Vec<String>,
    topology_filter: String,
    topology_highlight: String,
    topology_time_context: i64,
    highlights: OperationTracker,
}

/// Read-only copy of [`ViewState`] handed to observers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub current_node: Option<String>,
    pub current_edge: Option<String>,
    pub highlighted_nodes: Vec<String>,
    pub emphasized_nodes: Vec<String>,
    pub topology_filter: String,
    pub topology_highlight: String,
    pub topology_time_context: i64,
    pub highlights_in_progress: usize,
}

fn insert_unique(set: &mut Vec<String>, id: String) -> bool {
    if set.contains(&id) {
        return false;
    }
    set.push(id);
    true
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_node(&mut self, id: impl Into<String>) {
        self.current_node = Some(id.into());
    }

    pub fn unselect_node(&mut self) {
        self.current_node = None;
    }

    pub fn select_edge(&mut self, id: impl Into<String>) {
        self.current_edge = Some(id.into());
    }

    pub fn unselect_edge(&mut self) {
        self.current_edge = None;
    }

    pub fn highlight(&mut self, id: impl Into<String>) -> bool {
        insert_unique(&mut self.highlighted_nodes, id.into())
    }

    pub fn unhighlight(&mut self, id: &str) {
        self.highlighted_nodes.retain(|n| n != id);
    }

    pub fn emphasize(&mut self, id: impl Into<String>) -> bool {
        insert_unique(&mut self.emphasized_nodes, id.into())
    }

    pub fn deemphasize(&mut self, id: &str) {
        self.emphasized_nodes.retain(|n| n != id);
    }

    pub fn set_topology_filter(&mut self, filter: impl Into<String>) {
        self.topology_filter = filter.into();
    }

    pub fn set_topology_highlight(&mut self, expr: impl Into<String>) {
        self.topology_highlight = expr.into();
    }

    /// Zero means live data; anything else is a point in the past.
    pub fn set_time_context(&mut self, time: i64) {
        self.topology_time_context = time;
    }

    pub fn current_highlight_expr(&self) -> &str {
        &self.topology_highlight
    }

    pub fn begin_highlight(&mut self, id: CorrelationId) {
        self.highlights.begin(id);
    }

    pub fn end_highlight(&mut self, id: CorrelationId) {
        self.highlights.complete(id);
    }

    pub fn discard_highlight(&mut self, id: &CorrelationId) {
        self.highlights.discard(id);
    }

    pub fn highlight_status(&self, id: &CorrelationId) -> OperationState {
        self.highlights.status_of(id)
    }

    pub fn is_highlight_pending(&self, id: &CorrelationId) -> bool {
        self.highlights.is_pending(id)
    }

    pub fn highlights(&self) -> &OperationTracker {
        &self.highlights
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            current_node: self.current_node.clone(),
            current_edge: self.current_edge.clone(),
            highlighted_nodes: self.highlighted_nodes.clone(),
            emphasized_nodes: self.emphasized_nodes.clone(),
            topology_filter: self.topology_filter.clone(),
            topology_highlight: self.topology_highlight.clone(),
            topology_time_context: self.topology_time_context,
            highlights_in_progress: self.highlights.pending_ids().len(),
        }
    }
}
