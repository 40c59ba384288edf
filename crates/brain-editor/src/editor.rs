//! `CanvasEditor`: the handle view components talk to.
//!
//! Owns the document, the interaction controller and the undo stack, and
//! routes input between them. Each pointer gesture is recorded as a single
//! undo step.

use crate::commands::CommandStack;
use crate::config::EditorConfig;
use crate::controller::{InteractionController, Selection};
use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::{ToolMode, place_node};
use crate::viewport::Viewport;
use brain_core::model::{Edge, Endpoint, Graph, Node, NodeData, NodeKind, Point};
use brain_core::{EdgeId, EntityKind, Error, GraphDocument, GraphMutation, Result};

/// Label of the placement gesture; the tool reverts to select once it ends.
const ADD_NODE: &str = "Add node";
const EDIT_TEXT: &str = "Edit text";
const CANCEL: &str = "Cancel";

pub struct CanvasEditor {
    doc: GraphDocument,
    controller: InteractionController,
    commands: CommandStack,
    /// Screen size, used as the anchor for keyboard zoom.
    screen: (f32, f32),
}

impl Default for CanvasEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl CanvasEditor {
    pub fn new(config: EditorConfig) -> Self {
        let commands = CommandStack::new(config.undo_depth);
        Self {
            doc: GraphDocument::new(),
            controller: InteractionController::new(config),
            commands,
            screen: (0.0, 0.0),
        }
    }

    pub fn document(&self) -> &GraphDocument {
        &self.doc
    }

    /// Direct document access for persistence bookkeeping. Edits made here
    /// bypass undo.
    pub fn document_mut(&mut self) -> &mut GraphDocument {
        &mut self.doc
    }

    /// Install a freshly loaded graph. History and selection are dropped.
    pub fn replace_graph(&mut self, graph: Graph) {
        self.doc.replace_graph(graph);
        self.clear_history();
    }

    pub fn clear_history(&mut self) {
        self.commands.clear();
        self.controller.reset();
    }

    pub fn snapshot(&self) -> Graph {
        self.doc.snapshot()
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn mode(&self) -> ToolMode {
        self.controller.mode()
    }

    pub fn selection(&self) -> Selection {
        self.controller.selection()
    }

    pub fn viewport(&self) -> &Viewport {
        self.controller.viewport()
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.screen = (width, height);
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Feed one input event. Returns whether the graph changed.
    ///
    /// Rejected mutations are logged and dropped; the graph is left as it
    /// was. Other errors are returned.
    pub fn dispatch(&mut self, event: &InputEvent) -> Result<bool> {
        if let InputEvent::Key { key, modifiers } = event
            && !self.controller.is_editing_text()
            && let Some(action) = ShortcutMap::resolve(key, *modifiers)
        {
            return self.run_action(action);
        }

        // Close the text edit as its own step before the press starts a
        // new gesture.
        let mut committed = false;
        if matches!(event, InputEvent::PointerDown { .. }) && self.controller.is_editing_text() {
            let before = self.controller.gesture_label();
            let mutations = self.controller.commit_text(&self.doc);
            committed = self.settle(before, mutations, EDIT_TEXT)?;
        }

        let before = self.controller.gesture_label();
        let mutations = self.controller.handle(event, &self.doc);
        Ok(self.settle(before, mutations, "Edit")? || committed)
    }

    pub fn run_action(&mut self, action: ShortcutAction) -> Result<bool> {
        match action {
            ShortcutAction::Tool(mode) => self.set_mode(mode),
            ShortcutAction::Undo => Ok(self.undo()),
            ShortcutAction::Redo => Ok(self.redo()),
            ShortcutAction::Delete => self.delete_selected(),
            ShortcutAction::Cancel => {
                let before = self.controller.gesture_label();
                let mutations = self.controller.cancel(&self.doc);
                self.settle(before, mutations, CANCEL)
            }
            ShortcutAction::ZoomIn | ShortcutAction::ZoomOut => {
                let step = self.controller.config().zoom_step;
                let factor = if action == ShortcutAction::ZoomIn {
                    step
                } else {
                    1.0 / step
                };
                let (min, max) = {
                    let cfg = self.controller.config();
                    (cfg.min_zoom, cfg.max_zoom)
                };
                let (w, h) = self.screen;
                self.controller
                    .viewport_mut()
                    .zoom_at(factor, w / 2.0, h / 2.0, min, max);
                Ok(false)
            }
            ShortcutAction::ZoomReset => {
                self.controller.viewport_mut().reset();
                Ok(false)
            }
            ShortcutAction::BringToFront | ShortcutAction::SendToBack => {
                let Selection::Node(id) = self.controller.selection() else {
                    return Ok(false);
                };
                let mutation = if action == ShortcutAction::BringToFront {
                    GraphMutation::BringToFront { id }
                } else {
                    GraphMutation::SendToBack { id }
                };
                self.settle(None, vec![mutation], "Reorder")
            }
        }
    }

    /// Switch tools, abandoning any gesture in progress.
    pub fn set_mode(&mut self, mode: ToolMode) -> Result<bool> {
        let before = self.controller.gesture_label();
        let mutations = self.controller.set_mode(mode, &self.doc);
        self.settle(before, mutations, CANCEL)
    }

    /// Apply controller output and keep gesture batching in step with the
    /// controller's state.
    fn settle(
        &mut self,
        before: Option<&'static str>,
        mutations: Vec<GraphMutation>,
        label: &str,
    ) -> Result<bool> {
        let start = self.doc.revision();
        let after = self.controller.gesture_label();
        if before.is_none() && after.is_some() {
            self.commands.begin_batch(&self.doc);
        }

        let outcome = self.commands.execute(&mut self.doc, mutations, label);
        if outcome.is_err() {
            self.controller.prune(&self.doc);
        }

        let now = self.controller.gesture_label();
        match before {
            Some(prev) if now != before => {
                self.commands.end_batch(&self.doc, prev);
                if now.is_some() {
                    self.commands.begin_batch(&self.doc);
                } else if prev == ADD_NODE && label != CANCEL {
                    // A committed placement hands back to select; a cancelled
                    // one keeps whatever tool is now active.
                    self.controller.set_mode(ToolMode::Select, &self.doc);
                }
            }
            None => {
                if let Some(started) = after
                    && now.is_none()
                {
                    self.commands.end_batch(&self.doc, started);
                }
            }
            _ => {}
        }

        let changed = self.doc.revision() != start;
        match outcome {
            Ok(()) => Ok(changed),
            Err(Error::Validation(msg)) => {
                log::warn!("rejected {label}: {msg}");
                Ok(changed)
            }
            Err(err) => Err(err),
        }
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        if !self.controller.is_idle() {
            return false;
        }
        let undone = self.commands.undo(&mut self.doc).is_some();
        self.controller.prune(&self.doc);
        undone
    }

    pub fn redo(&mut self) -> bool {
        if !self.controller.is_idle() {
            return false;
        }
        let redone = self.commands.redo(&mut self.doc).is_some();
        self.controller.prune(&self.doc);
        redone
    }

    pub fn delete_selected(&mut self) -> Result<bool> {
        let mutations = self.controller.delete_selection(&self.doc);
        self.settle(None, mutations, "Delete")
    }

    /// Place a node without pointer input, as one undo step.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        position: Point,
        data: Option<NodeData>,
    ) -> Result<Node> {
        let mut node = place_node(kind, position);
        if let Some(data) = data {
            if data.kind() != kind {
                return Err(Error::validation(format!(
                    "`{}` data given for a `{kind}` node",
                    data.kind()
                )));
            }
            node.data = data;
        }
        let id = node.id;
        self.commands.execute(
            &mut self.doc,
            vec![GraphMutation::AddNode {
                node: Box::new(node),
            }],
            ADD_NODE,
        )?;
        self.doc
            .node(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Node, id))
    }

    /// Connect two ports without pointer input, as one undo step.
    pub fn connect(&mut self, source: Endpoint, target: Endpoint) -> Result<Edge> {
        let edge = Edge {
            id: EdgeId::generate("edge"),
            source,
            target,
        };
        self.commands
            .execute(&mut self.doc, vec![GraphMutation::AddEdge { edge }], "Connect")?;
        Ok(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use brain_core::model::Port;
    use pretty_assertions::assert_eq;

    fn click(editor: &mut CanvasEditor, x: f32, y: f32) {
        editor.dispatch(&InputEvent::pointer_down(x, y)).unwrap();
        editor.dispatch(&InputEvent::pointer_up(x, y)).unwrap();
    }

    fn command_key(key: &str) -> InputEvent {
        InputEvent::Key {
            key: key.to_string(),
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        }
    }

    #[test]
    fn placement_reverts_to_select() {
        let mut editor = CanvasEditor::default();
        editor.dispatch(&InputEvent::key("k")).unwrap();
        assert_eq!(editor.mode(), ToolMode::Task);
        click(&mut editor, 100.0, 100.0);
        assert_eq!(editor.document().node_count(), 1);
        assert_eq!(editor.mode(), ToolMode::Select);
    }

    #[test]
    fn drag_gesture_is_one_undo_step() {
        let mut editor = CanvasEditor::default();
        let node = editor
            .add_node(NodeKind::Rectangle, Point::new(0.0, 0.0), None)
            .unwrap();

        editor.dispatch(&InputEvent::pointer_down(20.0, 20.0)).unwrap();
        for x in [30.0, 40.0, 60.0] {
            editor.dispatch(&InputEvent::pointer_move(x, 20.0)).unwrap();
        }
        editor.dispatch(&InputEvent::pointer_up(60.0, 20.0)).unwrap();
        assert_eq!(
            editor.document().node(node.id).unwrap().position,
            Point::new(40.0, 0.0)
        );

        editor.dispatch(&command_key("z")).unwrap();
        assert_eq!(
            editor.document().node(node.id).unwrap().position,
            Point::new(0.0, 0.0)
        );

        // The placement itself is the next step back.
        assert!(editor.undo());
        assert_eq!(editor.document().node_count(), 0);
        assert!(!editor.can_undo());

        editor.dispatch(&command_key("y")).unwrap();
        assert_eq!(editor.document().node_count(), 1);
    }

    #[test]
    fn escape_during_placement_leaves_no_history() {
        let mut editor = CanvasEditor::default();
        editor.dispatch(&InputEvent::key("o")).unwrap();
        editor.dispatch(&InputEvent::pointer_down(10.0, 10.0)).unwrap();
        assert_eq!(editor.document().node_count(), 1);
        editor.dispatch(&InputEvent::key("Escape")).unwrap();
        assert_eq!(editor.document().node_count(), 0);
        assert!(!editor.can_undo());
    }

    #[test]
    fn switching_tools_mid_placement_keeps_the_new_tool() {
        let mut editor = CanvasEditor::default();
        editor.dispatch(&InputEvent::key("r")).unwrap();
        editor.dispatch(&InputEvent::pointer_down(10.0, 10.0)).unwrap();
        assert_eq!(editor.document().node_count(), 1);

        editor.dispatch(&InputEvent::key("k")).unwrap();
        assert_eq!(editor.mode(), ToolMode::Task);
        assert_eq!(editor.document().node_count(), 0);
        assert!(!editor.can_undo());
    }

    #[test]
    fn press_after_text_edit_is_a_separate_step() {
        let mut editor = CanvasEditor::default();
        let a = editor
            .add_node(NodeKind::Note, Point::new(0.0, 0.0), None)
            .unwrap();
        let b = editor
            .add_node(NodeKind::Note, Point::new(300.0, 0.0), None)
            .unwrap();

        editor
            .dispatch(&InputEvent::DoubleClick { x: 100.0, y: 100.0 })
            .unwrap();
        editor
            .dispatch(&InputEvent::TextInput {
                text: "Roadmap".into(),
            })
            .unwrap();
        // Pressing the note again commits the text, then raises it over `b`.
        click(&mut editor, 100.0, 100.0);
        let order: Vec<_> = editor.document().nodes().map(|n| n.id).collect();
        assert_eq!(order, vec![b.id, a.id]);

        assert!(editor.undo());
        let order: Vec<_> = editor.document().nodes().map(|n| n.id).collect();
        assert_eq!(order, vec![a.id, b.id]);
        assert_eq!(
            editor.document().node(a.id).unwrap().data.primary_text(),
            Some("Roadmap")
        );

        assert!(editor.undo());
        assert_eq!(
            editor.document().node(a.id).unwrap().data.primary_text(),
            Some("New Note")
        );
    }

    #[test]
    fn delete_key_removes_selected_node_and_its_edges() {
        let mut editor = CanvasEditor::default();
        let a = editor
            .add_node(NodeKind::Rectangle, Point::new(0.0, 0.0), None)
            .unwrap();
        let b = editor
            .add_node(NodeKind::Rectangle, Point::new(300.0, 0.0), None)
            .unwrap();
        editor
            .connect(
                Endpoint::new(a.id, Port::Right),
                Endpoint::new(b.id, Port::Left),
            )
            .unwrap();

        click(&mut editor, 20.0, 20.0);
        assert_eq!(editor.selection(), Selection::Node(a.id));
        assert!(editor.dispatch(&InputEvent::key("Backspace")).unwrap());
        assert_eq!(editor.document().node_count(), 1);
        assert_eq!(editor.document().edge_count(), 0);

        assert!(editor.undo());
        assert_eq!(editor.document().edge_count(), 1);
    }

    #[test]
    fn keys_go_to_text_editor_while_editing() {
        let mut editor = CanvasEditor::default();
        let note = editor
            .add_node(NodeKind::Note, Point::new(0.0, 0.0), None)
            .unwrap();
        editor
            .dispatch(&InputEvent::DoubleClick { x: 100.0, y: 100.0 })
            .unwrap();
        assert!(editor.controller().is_editing_text());

        // "k" is text, not the task tool.
        editor.dispatch(&InputEvent::key("k")).unwrap();
        assert_eq!(editor.mode(), ToolMode::Select);

        editor
            .dispatch(&InputEvent::TextInput {
                text: "Roadmap".into(),
            })
            .unwrap();
        assert!(editor.dispatch(&InputEvent::key("Enter")).unwrap());
        assert_eq!(
            editor.document().node(note.id).unwrap().data.primary_text(),
            Some("Roadmap")
        );

        assert!(editor.undo());
        assert_eq!(
            editor.document().node(note.id).unwrap().data.primary_text(),
            Some("New Note")
        );
    }

    #[test]
    fn undo_marks_document_dirty() {
        let mut editor = CanvasEditor::default();
        editor
            .add_node(NodeKind::Circle, Point::new(0.0, 0.0), None)
            .unwrap();
        let rev = editor.document().revision();
        assert!(editor.document_mut().mark_saved(rev));
        assert!(editor.undo());
        assert!(editor.document().is_dirty());
    }

    #[test]
    fn keyboard_zoom_is_clamped() {
        let mut editor = CanvasEditor::default();
        editor.resize(800.0, 600.0);
        for _ in 0..50 {
            editor.dispatch(&command_key("=")).unwrap();
        }
        assert_eq!(editor.viewport().zoom, 4.0);
        editor.dispatch(&command_key("0")).unwrap();
        assert_eq!(editor.viewport().zoom, 1.0);
    }

    #[test]
    fn replace_graph_drops_history() {
        let mut editor = CanvasEditor::default();
        editor
            .add_node(NodeKind::Text, Point::new(0.0, 0.0), None)
            .unwrap();
        editor.replace_graph(Graph::new());
        assert!(!editor.can_undo());
        assert!(!editor.document().is_dirty());
    }
}
