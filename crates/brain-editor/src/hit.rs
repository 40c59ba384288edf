//! Hit testing: canvas point → what is under it.
//!
//! Walks nodes front-to-back (last painted = topmost). For each node the
//! port anchors win over the resize handle, which wins over the body.
//! Edges are only considered when no node is hit.

use brain_core::model::{Endpoint, Node, NodeKind, Point, Port};
use brain_core::{EdgeId, GraphDocument, NodeId};
use kurbo::{Ellipse, Line, ParamCurveNearest, Rect, Shape};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    Port(Endpoint),
    ResizeHandle(NodeId),
    Node(NodeId),
    Edge(EdgeId),
    Empty,
}

/// Hit radii in canvas units (already divided by zoom).
#[derive(Debug, Clone, Copy)]
pub struct HitRadii {
    pub port: f64,
    pub handle: f64,
    pub edge: f64,
}

impl HitRadii {
    pub fn scaled(port: f32, handle: f32, edge: f32, zoom: f32) -> Self {
        let zoom = f64::from(zoom.max(f32::EPSILON));
        Self {
            port: f64::from(port) / zoom,
            handle: f64::from(handle) / zoom,
            edge: f64::from(edge) / zoom,
        }
    }
}

pub fn hit_test(doc: &GraphDocument, at: Point, radii: HitRadii) -> HitTarget {
    let p = to_kurbo(at);

    for node in doc.nodes().rev() {
        if let Some(port) = port_at(node, p, radii.port) {
            return HitTarget::Port(Endpoint::new(node.id, port));
        }
        if handle_rect(node, radii.handle).contains(p) {
            return HitTarget::ResizeHandle(node.id);
        }
        if body_contains(node, p) {
            return HitTarget::Node(node.id);
        }
    }

    match edge_at(doc, p, radii.edge) {
        Some(id) => HitTarget::Edge(id),
        None => HitTarget::Empty,
    }
}

/// Only the topmost node's ports, used when a drawn edge is released.
pub fn port_under(doc: &GraphDocument, at: Point, radius: f64) -> Option<Endpoint> {
    let p = to_kurbo(at);
    doc.nodes()
        .rev()
        .find_map(|node| port_at(node, p, radius).map(|port| Endpoint::new(node.id, port)))
}

fn port_at(node: &Node, p: kurbo::Point, radius: f64) -> Option<Port> {
    Port::ALL
        .into_iter()
        .map(|port| (port, to_kurbo(port.anchor(node.position, node.size)).distance(p)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(port, _)| port)
}

fn bounds(node: &Node) -> Rect {
    let x = f64::from(node.position.x);
    let y = f64::from(node.position.y);
    Rect::new(
        x,
        y,
        x + f64::from(node.size.width),
        y + f64::from(node.size.height),
    )
}

/// Square handle centred on the bottom-right corner.
fn handle_rect(node: &Node, size: f64) -> Rect {
    let corner = bounds(node);
    let half = size / 2.0;
    Rect::new(corner.x1 - half, corner.y1 - half, corner.x1 + half, corner.y1 + half)
}

fn body_contains(node: &Node, p: kurbo::Point) -> bool {
    let rect = bounds(node);
    match node.kind() {
        NodeKind::Circle => Ellipse::from_rect(rect).contains(p),
        _ => rect.contains(p),
    }
}

fn edge_at(doc: &GraphDocument, p: kurbo::Point, tolerance: f64) -> Option<EdgeId> {
    let mut best: Option<(EdgeId, f64)> = None;
    for edge in doc.edges() {
        let (Some(a), Some(b)) = (anchor_of(doc, edge.source), anchor_of(doc, edge.target)) else {
            continue;
        };
        let distance = Line::new(a, b).nearest(p, 1e-6).distance_sq.sqrt();
        if distance <= tolerance && best.is_none_or(|(_, d)| distance < d) {
            best = Some((edge.id, distance));
        }
    }
    best.map(|(id, _)| id)
}

pub fn anchor_of(doc: &GraphDocument, endpoint: Endpoint) -> Option<kurbo::Point> {
    doc.node(endpoint.node_id)
        .map(|n| to_kurbo(endpoint.port.anchor(n.position, n.size)))
}

fn to_kurbo(p: Point) -> kurbo::Point {
    kurbo::Point::new(f64::from(p.x), f64::from(p.y))
}
