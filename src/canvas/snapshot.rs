//! Typed layout snapshots for golden-style assertions.
//!
//! Tests compare these structs directly instead of serialized blobs, so
//! a failure prints the exact divergence.

use cardwall_config::LayoutMode;

use super::{Canvas, ContentRenderer};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CanvasSnapshot {
    pub cards: Vec<CardSnapshot>,
    pub zoom: f64,
    pub pan: (f64, f64),
    pub mode: LayoutMode,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CardSnapshot {
    pub path: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub order: usize,
    pub group: Option<u64>,
    pub active: bool,
}

impl<R: ContentRenderer> Canvas<R> {
    /// Deterministic snapshot of the rendered cards, ordered by manual
    /// order index.
    pub(crate) fn snapshot(&self) -> CanvasSnapshot {
        let mut cards: Vec<CardSnapshot> = self
            .cards
            .iter()
            .map(|card| {
                let state = self
                    .registry
                    .get(card.path())
                    .expect("rendered card without state");
                CardSnapshot {
                    path: card.path().as_str().to_string(),
                    x: state.pos.x,
                    y: state.pos.y,
                    width: state.size.width,
                    height: state.size.height,
                    order: state.order_index,
                    group: state.group.map(|group| group.0),
                    active: card.is_active(),
                }
            })
            .collect();
        cards.sort_by_key(|card| card.order);

        CanvasSnapshot {
            cards,
            zoom: self.session.zoom,
            pan: (self.session.pan.x, self.session.pan.y),
            mode: self.session.layout_mode,
        }
    }
}
