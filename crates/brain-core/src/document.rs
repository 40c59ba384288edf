//! Graph document model: the authoritative in-memory graph for a session.
//!
//! Nodes and edges live in a `StableDiGraph`, so removing a node drops its
//! incident edges with it. Paint order and edge order are tracked alongside
//! so snapshots are deterministic. No I/O happens here.

use crate::error::{EntityKind, Error, Result};
use crate::id::{EdgeId, NodeId};
use crate::model::*;
use crate::registry;
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use smallvec::SmallVec;
use std::collections::HashMap;

/// A mutation produced by canvas interaction and applied to the document.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphMutation {
    AddNode { node: Box<Node> },
    MoveNode { id: NodeId, position: Point },
    ResizeNode { id: NodeId, size: Size },
    SetData { id: NodeId, data: NodeData },
    RemoveNode { id: NodeId },
    AddEdge { edge: Edge },
    RemoveEdge { id: EdgeId },
    BringToFront { id: NodeId },
    SendToBack { id: NodeId },
}

/// What `remove_node` took out of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    pub edges: SmallVec<[Edge; 4]>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphDocument {
    graph: StableDiGraph<Node, Edge>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
    /// Paint order, back to front.
    order: Vec<NodeId>,
    /// Edge insertion order.
    edge_order: Vec<EdgeId>,
    revision: u64,
    saved_revision: u64,
}

impl GraphDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a graph, treating it as the saved state.
    pub fn from_graph(graph: Graph) -> Self {
        let mut doc = Self::new();
        doc.replace_graph(graph);
        doc
    }

    // ─── Whole-graph operations ──────────────────────────────────────────

    /// Discard current content and install `graph`. Marks the document clean.
    ///
    /// Duplicate node ids keep the first occurrence; edges that dangle or
    /// reuse an id are dropped.
    pub fn replace_graph(&mut self, graph: Graph) {
        self.install(graph);
        self.revision += 1;
        self.saved_revision = self.revision;
    }

    /// Install `graph` as an edit (undo/redo), leaving the document dirty.
    pub fn restore(&mut self, graph: Graph) {
        self.install(graph);
        self.touch();
    }

    fn install(&mut self, graph: Graph) {
        self.graph.clear();
        self.node_index.clear();
        self.edge_index.clear();
        self.order.clear();
        self.edge_order.clear();

        for node in graph.nodes {
            if self.node_index.contains_key(&node.id) {
                log::warn!("dropping duplicate node {} on install", node.id);
                continue;
            }
            self.push_node(node);
        }
        for edge in graph.edges {
            if let Err(err) = self.push_edge(edge) {
                log::warn!("dropping edge {} on install: {err}", edge.id);
            }
        }
    }

    /// Immutable copy of the current graph.
    pub fn snapshot(&self) -> Graph {
        Graph {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().copied().collect(),
        }
    }

    // ─── Dirty tracking ──────────────────────────────────────────────────

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Record that the state at `revision` reached storage. Only clears the
    /// dirty flag if nothing changed since; returns whether it did.
    pub fn mark_saved(&mut self, revision: u64) -> bool {
        if revision == self.revision {
            self.saved_revision = revision;
            true
        } else {
            false
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Nodes in paint order, back to front.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.node(*id))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_order.iter().filter_map(|id| self.edge(*id))
    }

    /// Edges with `id` as either endpoint.
    pub fn edges_of(&self, id: NodeId) -> Vec<&Edge> {
        let Some(&idx) = self.node_index.get(&id) else {
            return Vec::new();
        };
        let mut found: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.id())
            .collect();
        found.sort();
        found.dedup();
        found.into_iter().map(|e| &self.graph[e]).collect()
    }

    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    /// Place a new node of `kind` at `position` with the variant's default
    /// size. `data` defaults to the variant's default payload.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        position: Point,
        data: Option<NodeData>,
    ) -> Result<Node> {
        if let Some(d) = &data
            && d.kind() != kind
        {
            return Err(Error::validation(format!(
                "`{}` data given for a `{kind}` node",
                d.kind()
            )));
        }
        let spec = registry::defaults_for(kind);
        let data = data.unwrap_or_else(|| spec.default_data());
        let node = Node {
            id: NodeId::generate(kind.as_str()),
            position,
            size: spec.default_size,
            data,
        };
        self.insert_node(node.clone())?;
        Ok(node)
    }

    /// Like `add_node`, but with the type given as its string tag.
    pub fn add_node_tagged(
        &mut self,
        tag: &str,
        position: Point,
        data: Option<NodeData>,
    ) -> Result<Node> {
        let kind: NodeKind = tag.parse()?;
        self.add_node(kind, position, data)
    }

    /// Insert a fully built node. Size is clamped to the variant minimum.
    pub fn insert_node(&mut self, mut node: Node) -> Result<()> {
        if self.node_index.contains_key(&node.id) {
            return Err(Error::validation(format!("node {} already exists", node.id)));
        }
        check_position(node.position)?;
        check_size(node.size)?;
        node.size = node.size.clamp_min(registry::min_size(node.kind()));
        log::debug!("add {} node {}", node.kind(), node.id);
        self.push_node(node);
        self.touch();
        Ok(())
    }

    /// Apply a partial update. All checks run before anything changes.
    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<&Node> {
        let idx = self.index_of(id)?;
        let kind = self.graph[idx].kind();
        if let Some(p) = patch.position {
            check_position(p)?;
        }
        if let Some(s) = patch.size {
            check_size(s)?;
        }
        if let Some(d) = &patch.data
            && d.kind() != kind
        {
            return Err(Error::validation(format!(
                "cannot change node {id} from {kind} to {}",
                d.kind()
            )));
        }

        let node = &mut self.graph[idx];
        if let Some(p) = patch.position {
            node.position = p;
        }
        if let Some(s) = patch.size {
            node.size = s.clamp_min(registry::min_size(kind));
        }
        if let Some(d) = patch.data {
            node.data = d;
        }
        self.touch();
        Ok(&self.graph[idx])
    }

    /// Remove a node and every edge that references it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<RemovedNode> {
        let idx = self.index_of(id)?;
        let edges: SmallVec<[Edge; 4]> = self.edges_of(id).into_iter().copied().collect();
        for edge in &edges {
            self.edge_index.remove(&edge.id);
        }
        self.edge_order
            .retain(|e| !edges.iter().any(|removed| removed.id == *e));
        self.order.retain(|n| *n != id);
        self.node_index.remove(&id);
        let node = self
            .graph
            .remove_node(idx)
            .ok_or_else(|| Error::not_found(EntityKind::Node, id))?;
        log::debug!("remove node {id} (+{} edges)", edges.len());
        self.touch();
        Ok(RemovedNode { node, edges })
    }

    /// Move a node to the top of the paint stack. Returns whether order changed.
    pub fn bring_to_front(&mut self, id: NodeId) -> Result<bool> {
        self.index_of(id)?;
        if self.order.last() == Some(&id) {
            return Ok(false);
        }
        self.order.retain(|n| *n != id);
        self.order.push(id);
        self.touch();
        Ok(true)
    }

    /// Move a node to the bottom of the paint stack. Returns whether order changed.
    pub fn send_to_back(&mut self, id: NodeId) -> Result<bool> {
        self.index_of(id)?;
        if self.order.first() == Some(&id) {
            return Ok(false);
        }
        self.order.retain(|n| *n != id);
        self.order.insert(0, id);
        self.touch();
        Ok(true)
    }

    // ─── Edges ───────────────────────────────────────────────────────────

    /// Connect two node ports. Self-loops are allowed.
    pub fn add_edge(&mut self, source: Endpoint, target: Endpoint) -> Result<Edge> {
        let edge = Edge {
            id: EdgeId::generate("edge"),
            source,
            target,
        };
        self.insert_edge(edge)?;
        Ok(edge)
    }

    pub fn insert_edge(&mut self, edge: Edge) -> Result<()> {
        self.push_edge(edge)?;
        log::debug!(
            "connect {}:{:?} -> {}:{:?}",
            edge.source.node_id,
            edge.source.port,
            edge.target.node_id,
            edge.target.port
        );
        self.touch();
        Ok(())
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge> {
        let idx = self
            .edge_index
            .remove(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Edge, id))?;
        self.edge_order.retain(|e| *e != id);
        let edge = self
            .graph
            .remove_edge(idx)
            .ok_or_else(|| Error::not_found(EntityKind::Edge, id))?;
        self.touch();
        Ok(edge)
    }

    // ─── Mutation dispatch ───────────────────────────────────────────────

    /// Apply a mutation produced by the interaction layer.
    pub fn apply(&mut self, mutation: GraphMutation) -> Result<()> {
        match mutation {
            GraphMutation::AddNode { node } => self.insert_node(*node),
            GraphMutation::MoveNode { id, position } => {
                self.update_node(id, NodePatch::position(position)).map(|_| ())
            }
            GraphMutation::ResizeNode { id, size } => {
                self.update_node(id, NodePatch::size(size)).map(|_| ())
            }
            GraphMutation::SetData { id, data } => {
                self.update_node(id, NodePatch::data(data)).map(|_| ())
            }
            GraphMutation::RemoveNode { id } => self.remove_node(id).map(|_| ()),
            GraphMutation::AddEdge { edge } => self.insert_edge(edge),
            GraphMutation::RemoveEdge { id } => self.remove_edge(id).map(|_| ()),
            GraphMutation::BringToFront { id } => self.bring_to_front(id).map(|_| ()),
            GraphMutation::SendToBack { id } => self.send_to_back(id).map(|_| ()),
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn index_of(&self, id: NodeId) -> Result<NodeIndex> {
        self.node_index
            .get(&id)
            .copied()
            .ok_or_else(|| Error::not_found(EntityKind::Node, id))
    }

    fn push_node(&mut self, node: Node) {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        self.order.push(id);
    }

    fn push_edge(&mut self, edge: Edge) -> Result<()> {
        if self.edge_index.contains_key(&edge.id) {
            return Err(Error::validation(format!("edge {} already exists", edge.id)));
        }
        let source = self.index_of(edge.source.node_id)?;
        let target = self.index_of(edge.target.node_id)?;
        let idx = self.graph.add_edge(source, target, edge);
        self.edge_index.insert(edge.id, idx);
        self.edge_order.push(edge.id);
        Ok(())
    }
}

fn check_position(p: Point) -> Result<()> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(Error::validation(format!("non-finite position {p:?}")))
    }
}

fn check_size(s: Size) -> Result<()> {
    if s.is_finite() {
        Ok(())
    } else {
        Err(Error::validation(format!("non-finite size {s:?}")))
    }
}
