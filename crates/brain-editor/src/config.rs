//! Editor configuration.
//!
//! Sizes are in screen pixels and are divided by the zoom factor before
//! hit testing, so handles feel the same at every zoom level.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Side of the square resize handle at a node's bottom-right corner.
    pub handle_size: f32,
    /// Radius around a port anchor that counts as grabbing the port.
    pub port_radius: f32,
    /// Max distance from an edge line that still selects it.
    pub edge_tolerance: f32,
    pub undo_depth: usize,
    /// Whether an edge may start and end on the same node.
    pub allow_self_loops: bool,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Factor applied by the zoom in/out shortcuts.
    pub zoom_step: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            handle_size: 10.0,
            port_radius: 8.0,
            edge_tolerance: 6.0,
            undo_depth: 100,
            allow_self_loops: true,
            min_zoom: 0.1,
            max_zoom: 4.0,
            zoom_step: 1.2,
        }
    }
}

impl EditorConfig {
    /// Parse from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
