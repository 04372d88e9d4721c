//! Graph view projections and the persisted client layout blob.

use crate::model::circle::CircleId;
use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Layout key shared by every client.
pub const DEFAULT_LAYOUT_KEY: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: PersonId,
    pub name: String,
    pub avatar: Option<String>,
    pub circle_ids: Vec<CircleId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: PersonId,
    pub target: PersonId,
    pub relation_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Opaque client layout; the backend never inspects `layout_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLayout {
    pub layout_json: Value,
    pub updated_at: Option<i64>,
}

impl GraphLayout {
    pub fn empty() -> Self {
        Self {
            layout_json: Value::Object(Default::default()),
            updated_at: None,
        }
    }
}
