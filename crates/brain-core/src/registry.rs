//! Node variant registry: static lookup from type tag to placement defaults
//! and preview rendering.
//!
//! The table is closed. A new node type means a new `NodeKind` variant and a
//! new row in `VARIANTS`; existing rows don't change.

use crate::model::*;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::LazyLock;

/// Character budget for body previews.
pub const PREVIEW_CHARS: usize = 100;

const ELLIPSIS: &str = "...";

/// Per-variant placement defaults.
#[derive(Debug, Clone, Copy)]
pub struct VariantSpec {
    pub kind: NodeKind,
    pub label: &'static str,
    pub default_size: Size,
    pub min_size: Size,
    default_data: fn() -> NodeData,
}

impl VariantSpec {
    pub fn default_data(&self) -> NodeData {
        (self.default_data)()
    }
}

static VARIANTS: [VariantSpec; 6] = [
    VariantSpec {
        kind: NodeKind::Rectangle,
        label: "Rectangle",
        default_size: Size::new(120.0, 80.0),
        min_size: Size::new(40.0, 40.0),
        default_data: || NodeData::Rectangle,
    },
    VariantSpec {
        kind: NodeKind::Circle,
        label: "Circle",
        default_size: Size::new(100.0, 100.0),
        min_size: Size::new(40.0, 40.0),
        default_data: || NodeData::Circle,
    },
    VariantSpec {
        kind: NodeKind::Text,
        label: "Text",
        default_size: Size::new(200.0, 50.0),
        min_size: Size::new(60.0, 30.0),
        default_data: || {
            NodeData::Text(TextData {
                text: "Text".into(),
            })
        },
    },
    VariantSpec {
        kind: NodeKind::Note,
        label: "Note",
        default_size: Size::new(250.0, 200.0),
        min_size: Size::new(150.0, 100.0),
        default_data: || {
            NodeData::Note(NoteData {
                title: "New Note".into(),
                ..Default::default()
            })
        },
    },
    VariantSpec {
        kind: NodeKind::Task,
        label: "Task",
        default_size: Size::new(250.0, 150.0),
        min_size: Size::new(150.0, 80.0),
        default_data: || {
            NodeData::Task(TaskData {
                title: "New Task".into(),
                ..Default::default()
            })
        },
    },
    VariantSpec {
        kind: NodeKind::Image,
        label: "Image",
        default_size: Size::new(200.0, 200.0),
        min_size: Size::new(50.0, 50.0),
        default_data: || NodeData::Image(ImageData::default()),
    },
];

/// Look up the defaults for a node type.
pub fn defaults_for(kind: NodeKind) -> &'static VariantSpec {
    // Rows are in `NodeKind::ALL` order.
    &VARIANTS[kind as usize]
}

pub fn min_size(kind: NodeKind) -> Size {
    defaults_for(kind).min_size
}

/// Display-ready summary of a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePreview {
    pub title: String,
    pub body: String,
    pub badges: SmallVec<[String; 2]>,
}

/// Build a preview for a node. Pure.
pub fn render_preview(node: &Node) -> NodePreview {
    match &node.data {
        NodeData::Rectangle | NodeData::Circle => NodePreview::default(),
        NodeData::Text(d) => NodePreview {
            body: truncate(&collapse_whitespace(&d.text), PREVIEW_CHARS),
            ..Default::default()
        },
        NodeData::Note(d) => {
            let mut badges = SmallVec::new();
            if !d.category.is_empty() {
                badges.push(d.category.clone());
            }
            NodePreview {
                title: d.title.clone(),
                body: truncate(&strip_markup(&d.content), PREVIEW_CHARS),
                badges,
            }
        }
        NodeData::Task(d) => NodePreview {
            title: d.title.clone(),
            body: truncate(&collapse_whitespace(&d.description), PREVIEW_CHARS),
            badges: SmallVec::from_iter([
                priority_label(d.priority).to_string(),
                status_label(d.status).to_string(),
            ]),
        },
        NodeData::Image(d) => NodePreview {
            title: d.caption.clone().unwrap_or_default(),
            body: d.url.clone(),
            ..Default::default()
        },
    }
}

pub fn priority_label(p: TaskPriority) -> &'static str {
    match p {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
    }
}

pub fn status_label(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in-progress",
        TaskStatus::Completed => "completed",
    }
}

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Reduce rich-text markup to plain text.
pub fn strip_markup(markup: &str) -> String {
    let text = TAG.replace_all(markup, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&text)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `budget` characters, marking the cut with an ellipsis.
fn truncate(s: &str, budget: usize) -> String {
    if s.chars().count() <= budget {
        return s.to_string();
    }
    let mut out: String = s.chars().take(budget).collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    out
}
