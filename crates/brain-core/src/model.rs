//! Core data model for Brain canvases.
//!
//! A canvas holds a graph: an ordered list of typed, positioned nodes
//! (order is the paint stack, back to front) and a set of edges joining
//! node ports. The node payload is a closed sum type over the six variants.

use crate::error::Error;
use crate::id::{CanvasId, EdgeId, NodeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Geometry ────────────────────────────────────────────────────────────

/// A position in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_finite(&self) -> bool {
        self.width.is_finite() && self.height.is_finite()
    }

    /// Grow each dimension to at least `min`.
    pub fn clamp_min(self, min: Size) -> Self {
        Self {
            width: self.width.max(min.width),
            height: self.height.max(min.height),
        }
    }
}

/// One of the four fixed attachment sides of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Port {
    Top,
    Right,
    Bottom,
    Left,
}

impl Port {
    pub const ALL: [Port; 4] = [Port::Top, Port::Right, Port::Bottom, Port::Left];

    /// Anchor point of this port on a node's bounding box (side midpoint).
    pub fn anchor(self, position: Point, size: Size) -> Point {
        let Point { x, y } = position;
        let Size { width, height } = size;
        match self {
            Port::Top => Point::new(x + width / 2.0, y),
            Port::Right => Point::new(x + width, y + height / 2.0),
            Port::Bottom => Point::new(x + width / 2.0, y + height),
            Port::Left => Point::new(x, y + height / 2.0),
        }
    }
}

// ─── Node variants ───────────────────────────────────────────────────────

/// The type tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Rectangle,
    Circle,
    Text,
    Note,
    Task,
    Image,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Rectangle,
        NodeKind::Circle,
        NodeKind::Text,
        NodeKind::Note,
        NodeKind::Task,
        NodeKind::Image,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Rectangle => "rectangle",
            NodeKind::Circle => "circle",
            NodeKind::Text => "text",
            NodeKind::Note => "note",
            NodeKind::Task => "task",
            NodeKind::Image => "image",
        }
    }

    /// Whether double-clicking opens an in-place text editor.
    pub fn is_text_bearing(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::Note | NodeKind::Task)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown node type `{s}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextData {
    pub text: String,
}

/// A note card. `content` is opaque rich-text markup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteData {
    pub title: String,
    pub content: String,
    pub category: String,
    /// Back-reference to the source Note entity.
    pub note_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskData {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    /// Back-reference to the source Task entity.
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageData {
    pub url: String,
    pub caption: Option<String>,
}

/// Type-specific payload of a node. The variant is the node's type.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Rectangle,
    Circle,
    Text(TextData),
    Note(NoteData),
    Task(TaskData),
    Image(ImageData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Rectangle => NodeKind::Rectangle,
            NodeData::Circle => NodeKind::Circle,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Note(_) => NodeKind::Note,
            NodeData::Task(_) => NodeKind::Task,
            NodeData::Image(_) => NodeKind::Image,
        }
    }

    /// The field edited in place on double-click, if any.
    pub fn primary_text(&self) -> Option<&str> {
        match self {
            NodeData::Text(d) => Some(&d.text),
            NodeData::Note(d) => Some(&d.title),
            NodeData::Task(d) => Some(&d.title),
            _ => None,
        }
    }

    /// Replace the in-place editable field. Returns `false` for variants without one.
    pub fn set_primary_text(&mut self, value: String) -> bool {
        match self {
            NodeData::Text(d) => d.text = value,
            NodeData::Note(d) => d.title = value,
            NodeData::Task(d) => d.title = value,
            _ => return false,
        }
        true
    }
}

// ─── Nodes & edges ───────────────────────────────────────────────────────

/// A positioned, typed, resizable canvas element.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    pub size: Size,
    pub data: NodeData,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

/// Partial update applied by `GraphDocument::update_node`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub data: Option<NodeData>,
}

impl NodePatch {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn data(data: NodeData) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.size.is_none() && self.data.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub node_id: NodeId,
    pub port: Port,
}

impl Endpoint {
    pub const fn new(node_id: NodeId, port: Port) -> Self {
        Self { node_id, port }
    }
}

/// A connection between two node ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: Endpoint,
    pub target: Endpoint,
}

impl Edge {
    pub fn touches(&self, node: NodeId) -> bool {
        self.source.node_id == node || self.target.node_id == node
    }
}

// ─── Graph & canvas ──────────────────────────────────────────────────────

/// Immutable value form of a canvas graph, as produced by
/// `GraphDocument::snapshot` and consumed by persistence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges whose endpoints reference a node not present in this graph.
    pub fn dangling_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| {
            self.node(e.source.node_id).is_none() || self.node(e.target.node_id).is_none()
        })
    }
}

/// List entry for a canvas, without its graph payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSummary {
    pub id: CanvasId,
    pub owner: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named, user-owned canvas document.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub id: CanvasId,
    pub owner: UserId,
    pub name: String,
    pub graph: Graph,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Canvas {
    pub fn summary(&self) -> CanvasSummary {
        CanvasSummary {
            id: self.id,
            owner: self.owner.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_parses_known_tags() {
        assert_eq!("task".parse::<NodeKind>().unwrap(), NodeKind::Task);
        assert_eq!("circle".parse::<NodeKind>().unwrap(), NodeKind::Circle);
        let err = "hexagon".parse::<NodeKind>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn port_anchors_are_side_midpoints() {
        let pos = Point::new(100.0, 100.0);
        let size = Size::new(200.0, 50.0);
        assert_eq!(Port::Top.anchor(pos, size), Point::new(200.0, 100.0));
        assert_eq!(Port::Right.anchor(pos, size), Point::new(300.0, 125.0));
        assert_eq!(Port::Bottom.anchor(pos, size), Point::new(200.0, 150.0));
        assert_eq!(Port::Left.anchor(pos, size), Point::new(100.0, 125.0));
    }

    #[test]
    fn task_status_uses_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn primary_text_only_for_text_bearing_variants() {
        let mut text = NodeData::Text(TextData { text: "hi".into() });
        assert!(text.set_primary_text("bye".into()));
        assert_eq!(text.primary_text(), Some("bye"));

        let mut rect = NodeData::Rectangle;
        assert!(!rect.set_primary_text("nope".into()));
        assert_eq!(rect.primary_text(), None);
    }

    #[test]
    fn dangling_edges_are_detected() {
        let a = NodeId::intern("dangle_a");
        let graph = Graph {
            nodes: vec![Node {
                id: a,
                position: Point::default(),
                size: Size::new(10.0, 10.0),
                data: NodeData::Rectangle,
            }],
            edges: vec![Edge {
                id: EdgeId::intern("dangle_e"),
                source: Endpoint::new(a, Port::Right),
                target: Endpoint::new(NodeId::intern("dangle_missing"), Port::Left),
            }],
        };
        assert_eq!(graph.dangling_edges().count(), 1);
    }
}
