//! Tool modes: how pointer input on the canvas is interpreted.
//!
//! | Mode | Pointer-down on empty canvas | On a node body |
//! |------|------------------------------|----------------|
//! | `select` | clear selection | select + drag |
//! | `pan` | pan viewport | pan viewport |
//! | placement (`rectangle` … `image`) | place node, drag to position | select + drag |
//!
//! Port and resize handles work in every mode except `pan`.

use brain_core::model::{Node, NodeKind, Point};
use brain_core::{NodeId, defaults_for};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Select,
    Pan,
    Rectangle,
    Circle,
    Text,
    Note,
    Task,
    Image,
}

impl ToolMode {
    /// The node type this mode places, if it is a placement tool.
    pub fn placement_kind(self) -> Option<NodeKind> {
        match self {
            ToolMode::Select | ToolMode::Pan => None,
            ToolMode::Rectangle => Some(NodeKind::Rectangle),
            ToolMode::Circle => Some(NodeKind::Circle),
            ToolMode::Text => Some(NodeKind::Text),
            ToolMode::Note => Some(NodeKind::Note),
            ToolMode::Task => Some(NodeKind::Task),
            ToolMode::Image => Some(NodeKind::Image),
        }
    }

    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Rectangle => ToolMode::Rectangle,
            NodeKind::Circle => ToolMode::Circle,
            NodeKind::Text => ToolMode::Text,
            NodeKind::Note => ToolMode::Note,
            NodeKind::Task => ToolMode::Task,
            NodeKind::Image => ToolMode::Image,
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolMode::Select => f.write_str("select"),
            ToolMode::Pan => f.write_str("pan"),
            other => match other.placement_kind() {
                Some(kind) => f.write_str(kind.as_str()),
                None => Ok(()),
            },
        }
    }
}

/// Build a node of `kind` with its registry defaults, top-left at `at`.
pub fn place_node(kind: NodeKind, at: Point) -> Node {
    let spec = defaults_for(kind);
    Node {
        id: NodeId::generate(kind.as_str()),
        position: at,
        size: spec.default_size,
        data: spec.default_data(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_modes_round_trip_kinds() {
        for kind in NodeKind::ALL {
            assert_eq!(ToolMode::for_kind(kind).placement_kind(), Some(kind));
        }
        assert_eq!(ToolMode::Select.placement_kind(), None);
        assert_eq!(ToolMode::Pan.placement_kind(), None);
    }

    #[test]
    fn mode_names() {
        assert_eq!(ToolMode::Task.to_string(), "task");
        assert_eq!(ToolMode::Pan.to_string(), "pan");
    }

    #[test]
    fn placed_nodes_get_defaults_and_fresh_ids() {
        let a = place_node(NodeKind::Task, Point::new(100.0, 100.0));
        let b = place_node(NodeKind::Task, Point::new(100.0, 100.0));
        assert_ne!(a.id, b.id);
        assert_eq!(a.size, defaults_for(NodeKind::Task).default_size);
        assert_eq!(a.position, Point::new(100.0, 100.0));
    }
}
