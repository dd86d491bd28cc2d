//! One-shot snapshot of open documents into a persisted diagram file.
//!
//! Unrelated to the live canvas despite the shared vocabulary: this
//! writes the host application's diagram-file JSON format once and never
//! looks back. Documents with a path become `file` nodes; pathless views
//! (graphs, search panes) fall back to labeled `text` nodes. The focused
//! document is marked with the host's first accent color.
//!
//! The grid is square-ish: `ceil(sqrt(n))` columns, filled row by row.
//! With auto-layout disabled everything lands in a single column.

use cardwall_config::Config;
use serde::Serialize;

use crate::canvas::{CanvasError, OpenDocumentRef};

/// Geometry of the exported grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub card_width: i64,
    pub card_height: i64,
    pub spacing: i64,
    pub auto_layout: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExportOptions {
    pub fn from_config(config: &Config) -> Self {
        let export = &config.export;
        Self {
            card_width: export.card_width.0.round() as i64,
            card_height: export.card_height.0.round() as i64,
            spacing: export.spacing.0.round() as i64,
            auto_layout: export.auto_layout,
        }
    }
}

/// The persisted diagram document.
#[derive(Debug, Serialize, PartialEq)]
pub struct DiagramFile {
    pub nodes: Vec<DiagramNode>,
    /// Present in the format but never produced by the snapshot.
    pub edges: Vec<DiagramEdge>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiagramNode {
    File {
        id: String,
        file: String,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Text {
        id: String,
        text: String,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdge {
    pub id: String,
    pub from_node: String,
    pub to_node: String,
}

/// Builds the diagram snapshot for the given documents, in their given
/// order.
pub fn diagram_from_documents(
    docs: &[OpenDocumentRef],
    options: &ExportOptions,
) -> DiagramFile {
    let positions = grid_positions(docs.len(), options);

    let nodes = docs
        .iter()
        .zip(positions)
        .enumerate()
        .map(|(index, (doc, (x, y)))| {
            let id = format!("tab-node-{index}");
            let color = doc.is_active.then(|| "1".to_string());

            if doc.path.as_str().is_empty() {
                DiagramNode::Text {
                    id,
                    text: format!("{}\n({})", doc.title, doc.view.kind),
                    x,
                    y,
                    width: options.card_width,
                    height: options.card_height,
                    color,
                }
            } else {
                DiagramNode::File {
                    id,
                    file: doc.path.as_str().to_string(),
                    x,
                    y,
                    width: options.card_width,
                    height: options.card_height,
                    color,
                }
            }
        })
        .collect();

    DiagramFile {
        nodes,
        edges: Vec::new(),
    }
}

/// Serializes the snapshot the way the host persists it: pretty-printed,
/// two-space indent.
pub fn to_json(diagram: &DiagramFile) -> Result<String, CanvasError> {
    Ok(serde_json::to_string_pretty(diagram)?)
}

fn grid_positions(count: usize, options: &ExportOptions) -> Vec<(i64, i64)> {
    let stride_x = options.card_width + options.spacing;
    let stride_y = options.card_height + options.spacing;

    if !options.auto_layout {
        return (0..count).map(|i| (0, i as i64 * stride_y)).collect();
    }

    let columns = ((count as f64).sqrt().ceil() as i64).max(1);
    (0..count as i64)
        .map(|i| {
            let col = i % columns;
            let row = i / columns;
            (col * stride_x, row * stride_y)
        })
        .collect()
}
