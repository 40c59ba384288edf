//! Interaction controller: pointer and keyboard input → graph mutations.
//!
//! A state machine keyed on the active [`ToolMode`] plus an
//! [`InteractionState`]. The controller reads the document but never
//! mutates it; every committing transition returns the mutations for the
//! caller to apply, in order.

use crate::config::EditorConfig;
use crate::hit::{HitRadii, HitTarget, hit_test, port_under};
use crate::input::{InputEvent, Modifiers};
use crate::tools::{ToolMode, place_node};
use crate::viewport::Viewport;
use brain_core::model::{Edge, Endpoint, Point, Size};
use brain_core::registry;
use brain_core::{EdgeId, GraphDocument, GraphMutation, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    /// `grab` is the pointer's offset from the node's top-left corner.
    /// `placing` is set while a freshly placed node is still being positioned.
    DraggingNode {
        id: NodeId,
        grab: Point,
        placing: bool,
    },
    ResizingNode {
        id: NodeId,
        origin: Point,
        start_size: Size,
    },
    DrawingEdge {
        source: Endpoint,
        cursor: Point,
    },
    /// `last` is in screen space.
    Panning {
        last: Point,
    },
    EditingText {
        id: NodeId,
        draft: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Edge(EdgeId),
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: ToolMode,
    state: InteractionState,
    selection: Selection,
    viewport: Viewport,
    config: EditorConfig,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl InteractionController {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            mode: ToolMode::default(),
            state: InteractionState::Idle,
            selection: Selection::None,
            viewport: Viewport::default(),
            config,
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    /// Switch tools. Any gesture in progress is abandoned first.
    pub fn set_mode(&mut self, mode: ToolMode, doc: &GraphDocument) -> Vec<GraphMutation> {
        let mutations = if self.is_idle() {
            Vec::new()
        } else {
            self.cancel(doc)
        };
        self.mode = mode;
        mutations
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn is_editing_text(&self) -> bool {
        matches!(self.state, InteractionState::EditingText { .. })
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Source endpoint and cursor of the edge being drawn, for rendering.
    pub fn provisional_edge(&self) -> Option<(Endpoint, Point)> {
        match &self.state {
            InteractionState::DrawingEdge { source, cursor } => Some((*source, *cursor)),
            _ => None,
        }
    }

    /// Undo label for the gesture currently in progress.
    pub fn gesture_label(&self) -> Option<&'static str> {
        Some(match &self.state {
            InteractionState::Idle | InteractionState::Panning { .. } => return None,
            InteractionState::DraggingNode { placing: true, .. } => "Add node",
            InteractionState::DraggingNode { .. } => "Move node",
            InteractionState::ResizingNode { .. } => "Resize node",
            InteractionState::DrawingEdge { .. } => "Connect",
            InteractionState::EditingText { .. } => "Edit text",
        })
    }

    // ─── Event dispatch ──────────────────────────────────────────────────

    pub fn handle(&mut self, event: &InputEvent, doc: &GraphDocument) -> Vec<GraphMutation> {
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                let mut out = Vec::new();
                if self.is_editing_text() {
                    out.extend(self.commit_text(doc));
                }
                out.extend(self.pointer_down(*x, *y, doc));
                out
            }
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(*x, *y, doc),
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(*x, *y, doc),
            InputEvent::DoubleClick { x, y } => {
                self.double_click(*x, *y, doc);
                Vec::new()
            }
            InputEvent::Scroll { x, y, dx, dy, zoom } => {
                if (*zoom - 1.0).abs() > f32::EPSILON {
                    self.viewport.zoom_at(
                        *zoom,
                        *x,
                        *y,
                        self.config.min_zoom,
                        self.config.max_zoom,
                    );
                } else {
                    self.viewport.pan_by(-dx, -dy);
                }
                Vec::new()
            }
            InputEvent::Key { key, modifiers } => self.key(key, *modifiers, doc),
            InputEvent::TextInput { text } => {
                if let InteractionState::EditingText { draft, .. } = &mut self.state {
                    draft.clone_from(text);
                }
                Vec::new()
            }
            InputEvent::Blur => {
                if self.is_editing_text() {
                    self.commit_text(doc)
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn pointer_down(&mut self, sx: f32, sy: f32, doc: &GraphDocument) -> Vec<GraphMutation> {
        if !self.is_idle() {
            return Vec::new();
        }
        if self.mode == ToolMode::Pan {
            self.state = InteractionState::Panning {
                last: Point::new(sx, sy),
            };
            return Vec::new();
        }

        let at = self.viewport.to_canvas(sx, sy);
        match hit_test(doc, at, self.radii()) {
            HitTarget::Port(source) => {
                self.state = InteractionState::DrawingEdge { source, cursor: at };
                Vec::new()
            }
            HitTarget::ResizeHandle(id) => {
                let Some(node) = doc.node(id) else {
                    return Vec::new();
                };
                self.selection = Selection::Node(id);
                self.state = InteractionState::ResizingNode {
                    id,
                    origin: at,
                    start_size: node.size,
                };
                Vec::new()
            }
            HitTarget::Node(id) => {
                let Some(node) = doc.node(id) else {
                    return Vec::new();
                };
                self.selection = Selection::Node(id);
                self.state = InteractionState::DraggingNode {
                    id,
                    grab: Point::new(at.x - node.position.x, at.y - node.position.y),
                    placing: false,
                };
                vec![GraphMutation::BringToFront { id }]
            }
            HitTarget::Edge(id) if self.mode == ToolMode::Select => {
                self.selection = Selection::Edge(id);
                Vec::new()
            }
            HitTarget::Edge(_) | HitTarget::Empty => match self.mode.placement_kind() {
                Some(kind) => {
                    let node = place_node(kind, at);
                    let id = node.id;
                    log::trace!("placing {kind} node {id} at ({}, {})", at.x, at.y);
                    self.selection = Selection::Node(id);
                    self.state = InteractionState::DraggingNode {
                        id,
                        grab: Point::default(),
                        placing: true,
                    };
                    vec![GraphMutation::AddNode {
                        node: Box::new(node),
                    }]
                }
                None => {
                    self.selection = Selection::None;
                    Vec::new()
                }
            },
        }
    }

    fn pointer_move(&mut self, sx: f32, sy: f32, doc: &GraphDocument) -> Vec<GraphMutation> {
        let at = self.viewport.to_canvas(sx, sy);
        match &mut self.state {
            InteractionState::DraggingNode { id, grab, .. } => {
                if doc.node(*id).is_none() {
                    return Vec::new();
                }
                vec![GraphMutation::MoveNode {
                    id: *id,
                    position: Point::new(at.x - grab.x, at.y - grab.y),
                }]
            }
            InteractionState::ResizingNode {
                id,
                origin,
                start_size,
            } => {
                let Some(node) = doc.node(*id) else {
                    return Vec::new();
                };
                let wanted = Size::new(
                    start_size.width + (at.x - origin.x),
                    start_size.height + (at.y - origin.y),
                );
                vec![GraphMutation::ResizeNode {
                    id: *id,
                    size: wanted.clamp_min(registry::min_size(node.kind())),
                }]
            }
            InteractionState::DrawingEdge { cursor, .. } => {
                *cursor = at;
                Vec::new()
            }
            InteractionState::Panning { last } => {
                self.viewport.pan_by(sx - last.x, sy - last.y);
                *last = Point::new(sx, sy);
                Vec::new()
            }
            InteractionState::Idle | InteractionState::EditingText { .. } => Vec::new(),
        }
    }

    fn pointer_up(&mut self, sx: f32, sy: f32, doc: &GraphDocument) -> Vec<GraphMutation> {
        let at = self.viewport.to_canvas(sx, sy);
        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::DrawingEdge { source, .. } => {
                let radius = self.radii().port;
                match port_under(doc, at, radius) {
                    Some(target) if self.may_connect(source, target) => {
                        let edge = Edge {
                            id: EdgeId::generate("edge"),
                            source,
                            target,
                        };
                        self.selection = Selection::Edge(edge.id);
                        vec![GraphMutation::AddEdge { edge }]
                    }
                    _ => {
                        log::trace!("edge from {} cancelled", source.node_id);
                        Vec::new()
                    }
                }
            }
            state @ InteractionState::EditingText { .. } => {
                self.state = state;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn may_connect(&self, source: Endpoint, target: Endpoint) -> bool {
        if source == target {
            return false;
        }
        self.config.allow_self_loops || source.node_id != target.node_id
    }

    fn double_click(&mut self, sx: f32, sy: f32, doc: &GraphDocument) {
        if !self.is_idle() || self.mode == ToolMode::Pan {
            return;
        }
        let at = self.viewport.to_canvas(sx, sy);
        let HitTarget::Node(id) = hit_test(doc, at, self.radii()) else {
            return;
        };
        let Some(node) = doc.node(id) else {
            return;
        };
        if let Some(text) = node.data.primary_text() {
            self.selection = Selection::Node(id);
            self.state = InteractionState::EditingText {
                id,
                draft: text.to_string(),
            };
        }
    }

    fn key(&mut self, key: &str, modifiers: Modifiers, doc: &GraphDocument) -> Vec<GraphMutation> {
        match key {
            "Escape" => self.cancel(doc),
            "Enter" if self.is_editing_text() && !modifiers.shift => self.commit_text(doc),
            _ => Vec::new(),
        }
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Return to idle, discarding provisional state. An unplaced node is
    /// removed; moves and resizes already applied stay. From idle, clears
    /// the selection.
    pub fn cancel(&mut self, doc: &GraphDocument) -> Vec<GraphMutation> {
        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::Idle => {
                self.selection = Selection::None;
                Vec::new()
            }
            InteractionState::DraggingNode {
                id, placing: true, ..
            } => {
                self.selection = Selection::None;
                if doc.node(id).is_some() {
                    vec![GraphMutation::RemoveNode { id }]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    /// Remove whatever is selected. Ignored mid-gesture.
    pub fn delete_selection(&mut self, doc: &GraphDocument) -> Vec<GraphMutation> {
        if !self.is_idle() {
            return Vec::new();
        }
        match std::mem::take(&mut self.selection) {
            Selection::Node(id) if doc.node(id).is_some() => vec![GraphMutation::RemoveNode { id }],
            Selection::Edge(id) if doc.edge(id).is_some() => vec![GraphMutation::RemoveEdge { id }],
            _ => Vec::new(),
        }
    }

    /// Finish an in-place text edit, keeping the draft.
    pub fn commit_text(&mut self, doc: &GraphDocument) -> Vec<GraphMutation> {
        let InteractionState::EditingText { id, draft } =
            std::mem::replace(&mut self.state, InteractionState::Idle)
        else {
            return Vec::new();
        };
        let Some(node) = doc.node(id) else {
            return Vec::new();
        };
        if node.data.primary_text() == Some(draft.as_str()) {
            return Vec::new();
        }
        let mut data = node.data.clone();
        if data.set_primary_text(draft) {
            vec![GraphMutation::SetData { id, data }]
        } else {
            Vec::new()
        }
    }

    /// Drop references to elements no longer in `doc` (after undo, reload,
    /// or a rejected mutation).
    pub fn prune(&mut self, doc: &GraphDocument) {
        let stale = match self.selection {
            Selection::Node(id) => doc.node(id).is_none(),
            Selection::Edge(id) => doc.edge(id).is_none(),
            Selection::None => false,
        };
        if stale {
            self.selection = Selection::None;
        }
        let gone = match &self.state {
            InteractionState::DraggingNode { id, .. }
            | InteractionState::ResizingNode { id, .. }
            | InteractionState::EditingText { id, .. } => doc.node(*id).is_none(),
            InteractionState::DrawingEdge { source, .. } => doc.node(source.node_id).is_none(),
            InteractionState::Idle | InteractionState::Panning { .. } => false,
        };
        if gone {
            self.state = InteractionState::Idle;
        }
    }

    /// Forget everything tied to the current document (canvas switch).
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
        self.selection = Selection::None;
    }

    fn radii(&self) -> HitRadii {
        HitRadii::scaled(
            self.config.port_radius,
            self.config.handle_size,
            self.config.edge_tolerance,
            self.viewport.zoom,
        )
    }
}
