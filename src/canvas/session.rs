//! Per-canvas session state and the command boundary.
//!
//! The UI surface never mutates engine fields directly; it sends
//! [`Command`] values and the engine applies them with clamping. This
//! keeps every knob testable without a UI host and gives invalid input
//! exactly one fate: silent clamping, never an error.

use std::collections::HashSet;

use cardwall_config::{Config, LayoutMode, SortOrder};
use kurbo::Vec2;

use crate::geometry::Viewport;

use super::{
    Canvas, ContentRenderer, DocPath, MAX_COLUMNS, MAX_CONTENT_SCALE, MIN_CONTENT_SCALE,
};

/// View state of one canvas instance, alive from open to close.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSessionState {
    pub zoom: f64,
    pub pan: Vec2,
    pub scroll: Vec2,
    pub content_scale: f64,
    pub manual_columns: Option<u8>,
    pub sort: SortOrder,
    pub search_query: String,
    pub layout_mode: LayoutMode,

    /// Paths suppressed from the canvas while open. Survives layout
    /// resets; cleared only by explicit reveal commands.
    pub hidden: HashSet<DocPath>,
}

impl ViewSessionState {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            zoom: 1.,
            pan: Vec2::ZERO,
            scroll: Vec2::ZERO,
            content_scale: config
                .layout
                .content_scale
                .0
                .clamp(MIN_CONTENT_SCALE, MAX_CONTENT_SCALE),
            manual_columns: config.layout.columns.map(|n| n.clamp(1, MAX_COLUMNS)),
            sort: config.layout.sort,
            search_query: String::new(),
            layout_mode: config.layout.mode,
            hidden: HashSet::new(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            pan: self.pan,
            zoom: self.zoom,
            scroll: self.scroll,
        }
    }

    /// Combined zoom and content scale; drives automatic column count.
    pub fn effective_scale(&self) -> f64 {
        self.zoom * self.content_scale
    }
}

/// Commands from the host UI surface into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetZoom(f64),
    ZoomIn,
    ZoomOut,
    ResetZoom,
    SetContentScale(f64),
    /// `None` returns to automatic column count.
    SetColumns(Option<u8>),
    SetSortOrder(SortOrder),
    SetSearchQuery(String),
    SetLayoutMode(LayoutMode),
    HideCard(DocPath),
    RevealCard(DocPath),
    RevealAllHidden,
    /// Re-packs every card and clears geometry memory; the hidden set
    /// survives.
    ResetLayout,
    /// Forces a reconciliation pass on the next poll.
    Reload,
}

impl<R: ContentRenderer> Canvas<R> {
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SetZoom(zoom) => self.set_zoom(zoom),
            Command::ZoomIn => self.set_zoom(round_step(self.session.zoom + self.options.zoom_step)),
            Command::ZoomOut => {
                self.set_zoom(round_step(self.session.zoom - self.options.zoom_step))
            }
            Command::ResetZoom => self.set_zoom(1.),
            Command::SetContentScale(scale) => {
                let scale = scale.clamp(MIN_CONTENT_SCALE, MAX_CONTENT_SCALE);
                if scale != self.session.content_scale {
                    self.session.content_scale = scale;
                    self.needs_layout = true;
                }
            }
            Command::SetColumns(columns) => {
                self.session.manual_columns = columns.map(|n| n.clamp(1, MAX_COLUMNS));
                self.needs_layout = true;
            }
            Command::SetSortOrder(sort) => {
                if self.session.sort != sort {
                    self.session.sort = sort;
                    self.debounce.request_now();
                }
            }
            Command::SetSearchQuery(query) => {
                if self.session.search_query != query {
                    self.session.search_query = query;
                    self.debounce.request_now();
                }
            }
            Command::SetLayoutMode(mode) => {
                if self.session.layout_mode != mode {
                    self.session.layout_mode = mode;
                    self.needs_layout = true;
                }
            }
            Command::HideCard(path) => {
                // Phase transitions belong to reconciliation; the command
                // only edits the hidden set and forces a pass.
                if self.session.hidden.insert(path) {
                    self.debounce.request_now();
                }
            }
            Command::RevealCard(path) => {
                if self.session.hidden.remove(&path) {
                    self.debounce.request_now();
                }
            }
            Command::RevealAllHidden => {
                if !self.session.hidden.is_empty() {
                    self.session.hidden.clear();
                    self.debounce.request_now();
                }
            }
            Command::ResetLayout => self.reset_layout(),
            Command::Reload => self.debounce.request_now(),
        }
    }

    fn set_zoom(&mut self, zoom: f64) {
        let zoom = zoom.clamp(self.options.min_zoom, self.options.max_zoom);
        if zoom != self.session.zoom {
            self.session.zoom = zoom;
            // Automatic column count depends on the effective scale.
            self.needs_layout = true;
        }
    }

    /// Restores the session defaults (except the hidden set), clears
    /// geometry memory and re-packs into columns.
    fn reset_layout(&mut self) {
        let hidden = std::mem::take(&mut self.session.hidden);
        self.session = self.default_session.clone();
        self.session.hidden = hidden;

        self.registry.reset_layout(&self.visible_order);
        self.selected = self
            .selected
            .take()
            .filter(|path| self.registry.get(path).is_some());

        self.needs_layout = true;
        self.force_pack = true;
        self.debounce.request_now();
    }
}

fn round_step(zoom: f64) -> f64 {
    (zoom * 10.).round() / 10.
}
