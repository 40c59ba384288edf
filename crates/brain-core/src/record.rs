//! Storage records: the explicit persistence contract for canvases.
//!
//! A canvas row carries its graph as a JSON payload:
//!
//! ```json
//! { "version": 1,
//!   "nodes": [{ "id": "...", "type": "task", "position": {"x":0,"y":0},
//!               "size": {"width":250,"height":150}, "data": { ... } }],
//!   "edges": [{ "id": "...", "source": {"nodeId":"...","port":"right"},
//!               "target": {"nodeId":"...","port":"left"} }] }
//! ```
//!
//! Payloads are validated on the way in. Rows written before versioning
//! (no `version` key) are read as version 0 and migrated.

use crate::error::PersistenceError;
use crate::id::{CanvasId, EdgeId, NodeId, UserId};
use crate::model::*;
use crate::registry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Payload version written by this build.
pub const CURRENT_VERSION: u32 = 1;

/// One canvas row as held by the storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRow {
    pub id: CanvasId,
    pub user_id: UserId,
    pub name: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanvasRow {
    pub fn summary(&self) -> CanvasSummary {
        CanvasSummary {
            id: self.id,
            owner: self.user_id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Decode into a full canvas, validating the payload.
    pub fn into_canvas(self) -> Result<Canvas, PersistenceError> {
        let graph = decode_graph(self.data)?;
        Ok(Canvas {
            id: self.id,
            owner: self.user_id,
            name: self.name,
            graph,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Payload {
    /// Absent in pre-versioning rows.
    #[serde(default)]
    version: u32,
    #[serde(default)]
    nodes: Vec<NodeRecord>,
    #[serde(default)]
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Point,
    pub size: Size,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Version 0 rows may omit edge ids; one is minted on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
    pub source: Endpoint,
    pub target: Endpoint,
}

// ─── Encode ──────────────────────────────────────────────────────────────

pub fn encode_graph(graph: &Graph) -> Result<Value, PersistenceError> {
    let nodes = graph
        .nodes
        .iter()
        .map(|n| -> Result<NodeRecord, PersistenceError> {
            Ok(NodeRecord {
                id: n.id,
                kind: n.kind(),
                position: n.position,
                size: n.size,
                data: encode_data(&n.data)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let edges = graph
        .edges
        .iter()
        .map(|e| EdgeRecord {
            id: Some(e.id),
            source: e.source,
            target: e.target,
        })
        .collect();
    let payload = Payload {
        version: CURRENT_VERSION,
        nodes,
        edges,
    };
    Ok(serde_json::to_value(payload)?)
}

fn encode_data(data: &NodeData) -> Result<Value, serde_json::Error> {
    match data {
        NodeData::Rectangle | NodeData::Circle => Ok(Value::Object(Default::default())),
        NodeData::Text(d) => serde_json::to_value(d),
        NodeData::Note(d) => serde_json::to_value(d),
        NodeData::Task(d) => serde_json::to_value(d),
        NodeData::Image(d) => serde_json::to_value(d),
    }
}

// ─── Decode ──────────────────────────────────────────────────────────────

/// Validate and decode a stored payload. `null` decodes to an empty graph.
pub fn decode_graph(value: Value) -> Result<Graph, PersistenceError> {
    if value.is_null() {
        return Ok(Graph::new());
    }
    let payload: Payload = serde_json::from_value(value)
        .map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    if payload.version > CURRENT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: payload.version,
            supported: CURRENT_VERSION,
        });
    }
    if payload.version == 0 {
        log::debug!("migrating unversioned canvas payload");
    }

    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(payload.nodes.len());
    for record in payload.nodes {
        if !seen.insert(record.id) {
            return Err(PersistenceError::Malformed(format!(
                "duplicate node id {}",
                record.id
            )));
        }
        nodes.push(decode_node(record)?);
    }

    let mut edge_ids = HashSet::new();
    let mut edges = Vec::with_capacity(payload.edges.len());
    for record in payload.edges {
        let id = record.id.unwrap_or_else(|| EdgeId::generate("edge"));
        if !seen.contains(&record.source.node_id) || !seen.contains(&record.target.node_id) {
            log::warn!("dropping dangling edge {id}");
            continue;
        }
        if !edge_ids.insert(id) {
            log::warn!("dropping duplicate edge {id}");
            continue;
        }
        edges.push(Edge {
            id,
            source: record.source,
            target: record.target,
        });
    }

    Ok(Graph { nodes, edges })
}

fn decode_node(record: NodeRecord) -> Result<Node, PersistenceError> {
    let NodeRecord {
        id,
        kind,
        position,
        size,
        data,
    } = record;
    if !position.is_finite() || !size.is_finite() {
        return Err(PersistenceError::Malformed(format!(
            "node {id} has non-finite geometry"
        )));
    }
    let data = decode_data(kind, data)
        .map_err(|e| PersistenceError::Malformed(format!("node {id}: {e}")))?;
    let min = registry::min_size(kind);
    let clamped = size.clamp_min(min);
    if clamped != size {
        log::debug!("clamping node {id} up to minimum size");
    }
    Ok(Node {
        id,
        position,
        size: clamped,
        data,
    })
}

fn decode_data(kind: NodeKind, data: Value) -> Result<NodeData, serde_json::Error> {
    // Missing payloads fall back to the variant's empty shape.
    let data = if data.is_null() {
        Value::Object(Default::default())
    } else {
        data
    };
    Ok(match kind {
        NodeKind::Rectangle => NodeData::Rectangle,
        NodeKind::Circle => NodeData::Circle,
        NodeKind::Text => NodeData::Text(serde_json::from_value(data)?),
        NodeKind::Note => NodeData::Note(serde_json::from_value(data)?),
        NodeKind::Task => NodeData::Task(serde_json::from_value(data)?),
        NodeKind::Image => NodeData::Image(serde_json::from_value(data)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_graph() -> Graph {
        let task = Node {
            id: NodeId::intern("rec_task"),
            position: Point::new(100.0, 100.0),
            size: Size::new(250.0, 150.0),
            data: NodeData::Task(TaskData {
                title: "Write report".into(),
                description: "Q3 numbers".into(),
                priority: TaskPriority::High,
                status: TaskStatus::InProgress,
                task_id: Some("t-42".into()),
            }),
        };
        let note = Node {
            id: NodeId::intern("rec_note"),
            position: Point::new(400.0, 100.0),
            size: Size::new(260.0, 210.0),
            data: NodeData::Note(NoteData {
                title: "Ideas".into(),
                content: "<p>one</p>".into(),
                category: "work".into(),
                note_id: Some("n-7".into()),
            }),
        };
        let edge = Edge {
            id: EdgeId::intern("rec_edge"),
            source: Endpoint::new(task.id, Port::Right),
            target: Endpoint::new(note.id, Port::Left),
        };
        Graph {
            nodes: vec![task, note],
            edges: vec![edge],
        }
    }

    #[test]
    fn encoded_shape_matches_storage_contract() {
        let value = encode_graph(&sample_graph()).unwrap();
        assert_eq!(value["version"], json!(1));
        assert_eq!(value["nodes"][0]["type"], json!("task"));
        assert_eq!(value["nodes"][0]["data"]["status"], json!("in-progress"));
        assert_eq!(value["nodes"][0]["data"]["taskId"], json!("t-42"));
        assert_eq!(value["nodes"][1]["data"]["noteId"], json!("n-7"));
        assert_eq!(
            value["edges"][0]["source"],
            json!({"nodeId": "rec_task", "port": "right"})
        );
    }

    #[test]
    fn decode_inverts_encode() {
        let graph = sample_graph();
        let decoded = decode_graph(encode_graph(&graph).unwrap()).unwrap();
        assert_eq!(decoded, graph);
    }

    #[test]
    fn unversioned_payload_is_migrated() {
        let value = json!({
            "nodes": [
                {"id": "legacy_a", "type": "rectangle", "position": {"x": 0, "y": 0},
                 "size": {"width": 120, "height": 80}},
                {"id": "legacy_b", "type": "text", "position": {"x": 10, "y": 10},
                 "size": {"width": 200, "height": 50}, "data": {"text": "hello"}}
            ],
            "edges": [
                {"source": {"nodeId": "legacy_a", "port": "bottom"},
                 "target": {"nodeId": "legacy_b", "port": "top"}}
            ]
        });
        let graph = decode_graph(value).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(
            graph.nodes[1].data,
            NodeData::Text(TextData {
                text: "hello".into()
            })
        );
    }

    #[test]
    fn future_version_is_rejected() {
        let err = decode_graph(json!({"version": 99, "nodes": [], "edges": []})).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedVersion { found: 99, .. }
        ));
    }

    #[test]
    fn unknown_type_is_malformed() {
        let err = decode_graph(json!({
            "version": 1,
            "nodes": [{"id": "x", "type": "hexagon", "position": {"x": 0, "y": 0},
                       "size": {"width": 1, "height": 1}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed(_)));
    }

    #[test]
    fn duplicate_node_ids_are_malformed() {
        let node = json!({"id": "dup", "type": "circle", "position": {"x": 0, "y": 0},
                          "size": {"width": 100, "height": 100}});
        let err = decode_graph(json!({"version": 1, "nodes": [node.clone(), node]})).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed(_)));
    }

    #[test]
    fn dangling_edges_are_dropped_and_small_nodes_clamped() {
        let graph = decode_graph(json!({
            "version": 1,
            "nodes": [{"id": "tiny", "type": "image", "position": {"x": 0, "y": 0},
                       "size": {"width": 1, "height": 1}, "data": {"url": "https://x/y.png"}}],
            "edges": [{"id": "e", "source": {"nodeId": "tiny", "port": "top"},
                       "target": {"nodeId": "nowhere", "port": "top"}}]
        }))
        .unwrap();
        assert!(graph.edges.is_empty());
        assert_eq!(graph.nodes[0].size, registry::min_size(NodeKind::Image));
    }

    #[test]
    fn null_payload_is_empty_graph() {
        assert!(decode_graph(Value::Null).unwrap().is_empty());
    }
}
