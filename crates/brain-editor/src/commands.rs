//! Undo/Redo command stack.
//!
//! Every undo step is a pair of graph snapshots taken before and after the
//! edit. Pointer gestures use **snapshot batching**: the graph is captured
//! when the gesture starts and again when it ends, so the live moves in
//! between collapse into one step.

use brain_core::{Graph, GraphDocument, GraphMutation, Result};

#[derive(Debug, Clone)]
struct Command {
    before: Graph,
    after: Graph,
    description: String,
}

/// Manages undo/redo stacks with batch grouping for gestures.
#[derive(Debug)]
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    batch_snapshot: Option<Graph>,
    batch_dirty: bool,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
            batch_dirty: false,
        }
    }

    /// Start a batch group. Mutations until `end_batch()` are applied live
    /// but recorded as one step.
    pub fn begin_batch(&mut self, doc: &GraphDocument) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(doc.snapshot());
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
    }

    /// Close a batch group. The outermost close records a step if the
    /// graph actually changed.
    pub fn end_batch(&mut self, doc: &GraphDocument, description: &str) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        let before = self.batch_snapshot.take();
        if let Some(before) = before
            && self.batch_dirty
        {
            let after = doc.snapshot();
            if before != after {
                self.push(Command {
                    before,
                    after,
                    description: description.to_string(),
                });
            }
        }
        self.batch_dirty = false;
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Apply `mutations` in order. Outside a batch they form one undo step
    /// and are all-or-nothing: if one fails, the graph is put back.
    pub fn execute(
        &mut self,
        doc: &mut GraphDocument,
        mutations: Vec<GraphMutation>,
        description: &str,
    ) -> Result<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        if self.batch_depth > 0 {
            self.batch_dirty = true;
            for mutation in mutations {
                doc.apply(mutation)?;
            }
            return Ok(());
        }

        let before = doc.snapshot();
        let start = doc.revision();
        for mutation in mutations {
            if let Err(err) = doc.apply(mutation) {
                if doc.revision() != start {
                    doc.restore(before);
                }
                return Err(err);
            }
        }
        let after = doc.snapshot();
        if before != after {
            self.push(Command {
                before,
                after,
                description: description.to_string(),
            });
        }
        Ok(())
    }

    /// Undo the last step. Returns its description.
    pub fn undo(&mut self, doc: &mut GraphDocument) -> Option<String> {
        let cmd = self.undo_stack.pop()?;
        doc.restore(cmd.before.clone());
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        log::debug!("undo {desc}");
        Some(desc)
    }

    pub fn redo(&mut self, doc: &mut GraphDocument) -> Option<String> {
        let cmd = self.redo_stack.pop()?;
        doc.restore(cmd.after.clone());
        let desc = cmd.description.clone();
        self.undo_stack.push(cmd);
        log::debug!("redo {desc}");
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop all history (a different canvas was loaded).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
        self.batch_dirty = false;
    }

    fn push(&mut self, cmd: Command) {
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }
}
