//! Card canvas logic.
//!
//! The canvas mirrors the host's open documents as cards. A card's
//! geometry lives in the [`CardRegistry`] and survives reconciliation;
//! the rendered [`Card`] list is rebuilt against it whenever the open
//! set changes. Two layout strategies exist: masonry, which recomputes
//! every position from the sorted order each cycle, and free-form, where
//! positions are authoritative and only an explicit reset re-packs them.
//!
//! The engine is generic over the host's [`ContentRenderer`] the same way
//! a compositor layout is generic over its window type: production code
//! passes the real renderer, tests pass a counting stub and drive the
//! whole engine headlessly.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use cardwall_config::Config;
use kurbo::{Rect, Size, Vec2};

use crate::clock::Clock;
use crate::geometry::Viewport;

pub mod card;
pub mod connections;
pub mod freeform;
pub mod interaction;
pub mod masonry;
pub mod reconcile;
pub mod registry;
pub mod session;

#[cfg(test)]
mod snapshot;


pub use card::Card;
pub use connections::{ConnectionGraph, GroupId};
pub use interaction::{ResizeEdge, SnapTarget};
pub use reconcile::{hosted_in_diagram, OpenDocumentRef, ViewDescriptor, WorkspaceEvent};
pub use registry::{CardPhase, CardRegistry, CardState};
pub use session::{Command, ViewSessionState};

use interaction::InteractionState;
use reconcile::Debouncer;

/// Hard cap on the manual column count.
pub const MAX_COLUMNS: u8 = 20;

/// Smallest size a card can be resized to.
pub const MIN_CARD_SIZE: Size = Size::new(80., 60.);

/// Content scale bounds; below half scale previews are unreadable.
pub const MIN_CONTENT_SCALE: f64 = 0.5;
pub const MAX_CONTENT_SCALE: f64 = 1.0;

/// Stable document identity: the vault-relative path.
///
/// Cheap to clone; the canvas passes these around liberally.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(Arc<str>);

impl DocPath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for DocPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// Renders document content into a card's content region.
///
/// Mounting is asynchronous on the host side: the handle is returned
/// immediately, and the measured content height arrives later through
/// [`Canvas::preview_ready`]. Handles must be released exactly once;
/// implementations swallow their own disposal failures.
pub trait ContentRenderer {
    type Handle;

    fn mount(&mut self, path: &DocPath, region: Rect) -> Self::Handle;

    fn unmount(&mut self, handle: Self::Handle);
}

/// An action the canvas asks the host application to perform.
///
/// The engine never opens, closes or focuses documents itself; it hands
/// these out from interaction entry points and the host executes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    FocusDocument(DocPath),
    CloseDocument(DocPath),
    OpenInBackground(DocPath),
    /// A transient, non-fatal message for the user.
    Notice(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("could not find file: {0}")]
    DocumentNotFound(DocPath),
    #[error("failed to serialize diagram snapshot")]
    Serialize(#[from] serde_json::Error),
}

/// Resolved configurable properties of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub card_width: f64,
    pub card_height_min: f64,
    pub card_height_max: f64,
    pub gap_x: f64,
    pub gap_y: f64,
    /// Document byte size at which the synthetic card height saturates.
    pub base_size_bytes: u64,
    /// Offset between default positions of consecutively created cards.
    pub stagger: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    /// Screen-space snap radius for edge connections.
    pub snap_distance: f64,
    /// Screen-space movement below which a press-release is a click.
    pub drag_threshold: f64,
    pub double_click_window: Duration,
    pub debounce: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Options {
    pub fn from_config(config: &Config) -> Self {
        let layout = &config.layout;
        let zoom = &config.zoom;
        let interaction = &config.interaction;

        let card_height_min = layout.card_height_min.0;
        let card_height_max = f64::max(layout.card_height_max.0, card_height_min);
        let min_zoom = zoom.min.0.max(0.01);
        let max_zoom = f64::max(zoom.max.0, min_zoom);

        Self {
            card_width: layout.card_width.0,
            card_height_min,
            card_height_max,
            gap_x: layout.gap_x.0,
            gap_y: layout.gap_y.0,
            base_size_bytes: layout.base_size_bytes.max(1),
            stagger: layout.stagger.0,
            min_zoom,
            max_zoom,
            zoom_step: zoom.step.0.max(0.01),
            snap_distance: interaction.snap_distance.0,
            drag_threshold: interaction.drag_threshold.0,
            double_click_window: Duration::from_millis(interaction.double_click_ms),
            debounce: Duration::from_millis(config.reconcile.debounce_ms),
        }
    }
}

/// The card canvas engine.
///
/// Owns every card's visual state and the per-session view state; emits
/// [`HostRequest`]s for anything that touches real documents.
pub struct Canvas<R: ContentRenderer> {
    pub(crate) registry: CardRegistry,

    /// Rendered cards, in z-order from top to bottom.
    ///
    /// In masonry mode the order matches the sorted visible order; cards
    /// never overlap there, so z is irrelevant.
    pub(crate) cards: Vec<Card<R::Handle>>,

    pub(crate) session: ViewSessionState,

    /// Session values restored by an explicit layout reset.
    pub(crate) default_session: ViewSessionState,

    pub(crate) options: Rc<Options>,
    pub(crate) clock: Clock,
    pub(crate) debounce: Debouncer,
    pub(crate) interaction: InteractionState,

    /// Size of the hosting container in screen pixels.
    pub(crate) view_size: Size,

    /// Sorted visible paths from the last reconciliation; drives masonry
    /// packing and manual-order stability.
    pub(crate) visible_order: Vec<DocPath>,

    /// Card selected by the last click, if it still exists.
    pub(crate) selected: Option<DocPath>,

    pub(crate) needs_layout: bool,

    /// One-shot: the next relayout packs columns even in free-form mode.
    pub(crate) force_pack: bool,
}

impl<R: ContentRenderer> Canvas<R> {
    pub fn new(clock: Clock, config: &Config) -> Self {
        Self::with_options(clock, config, Options::from_config(config))
    }

    fn with_options(clock: Clock, config: &Config, options: Options) -> Self {
        let session = ViewSessionState::from_config(config);
        let debounce = Debouncer::new(options.debounce);

        Self {
            registry: CardRegistry::new(),
            cards: Vec::new(),
            default_session: session.clone(),
            session,
            options: Rc::new(options),
            clock,
            debounce,
            interaction: InteractionState::default(),
            view_size: Size::new(1280., 720.),
            visible_order: Vec::new(),
            selected: None,
            needs_layout: false,
            force_pack: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn session(&self) -> &ViewSessionState {
        &self.session
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn viewport(&self) -> Viewport {
        self.session.viewport()
    }

    pub fn view_size(&self) -> Size {
        self.view_size
    }

    /// Updates the hosting container size; masonry re-packs on the next
    /// frame.
    pub fn set_view_size(&mut self, size: Size) {
        if self.view_size == size {
            return;
        }
        self.view_size = size;
        self.needs_layout = true;
    }

    /// Updates the host container's scroll offset, which participates in
    /// the screen transform alongside pan and zoom.
    pub fn set_scroll(&mut self, scroll: Vec2) {
        self.session.scroll = scroll;
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card<R::Handle>> {
        self.cards.iter()
    }

    /// Rendered cards with their canvas-space rectangles, in z-order from
    /// top to bottom. Transient gesture deltas are applied, so this is
    /// what the host paints.
    pub fn cards_with_rects(&self) -> impl Iterator<Item = (&Card<R::Handle>, Rect)> {
        self.cards.iter().filter_map(|card| {
            let rect = self.card_rect(card.path())?;
            let offset = self.gesture_offset(card.path());
            Some((card, rect + offset))
        })
    }

    /// Committed canvas-space rectangle of a card, without transient
    /// gesture offsets.
    pub fn card_rect(&self, path: &DocPath) -> Option<Rect> {
        let state = self.registry.get(path)?;
        Some(Rect::from_origin_size(state.pos, state.size))
    }

    /// Whether a rendered card currently exists for the path.
    ///
    /// Asynchronous preview callbacks check this before touching their
    /// target; a card destroyed between scheduling and completion must be
    /// left alone.
    pub fn is_live(&self, path: &DocPath) -> bool {
        self.cards.iter().any(|card| card.path() == path)
    }

    pub fn selected(&self) -> Option<&DocPath> {
        self.selected.as_ref()
    }

    pub fn hidden_count(&self) -> usize {
        self.session.hidden.len()
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Connects two cards as if they were snapped together, merging
    /// their groups. No-op unless both cards have state.
    pub fn connect_cards(&mut self, a: &DocPath, b: &DocPath) -> Option<GroupId> {
        self.registry.connect(a, b)
    }

    /// Detaches a card from its neighbors and its group.
    pub fn disconnect_card(&mut self, path: &DocPath) {
        self.registry.disconnect(path)
    }

    /// The card's whole connected group, or the card alone when it is
    /// ungrouped. Drags translate every member returned here.
    pub fn group_members(&self, path: &DocPath) -> std::collections::HashSet<DocPath> {
        self.registry.group_members(path)
    }

    // =========================================================================
    // Host callbacks
    // =========================================================================

    /// Applies the measured content height reported by a finished preview
    /// load. Returns `false` when the card has since been destroyed and
    /// the result was discarded.
    pub fn preview_ready(&mut self, path: &DocPath, height: f64) -> bool {
        let Some(card) = self.cards.iter_mut().find(|card| card.path() == path) else {
            debug!("discarding preview for destroyed card {path}");
            return false;
        };

        card.measured_height = Some(height.max(1.));
        self.needs_layout = true;
        true
    }

    /// Close-button press on a card.
    pub fn request_close(&self, path: &DocPath) -> Result<HostRequest, CanvasError> {
        if !self.is_live(path) {
            return Err(CanvasError::DocumentNotFound(path.clone()));
        }
        Ok(HostRequest::CloseDocument(path.clone()))
    }

    /// A path-shaped payload dropped onto the canvas from outside.
    pub fn drop_payload(&mut self, payload: &str) -> HostRequest {
        HostRequest::OpenInBackground(DocPath::new(payload.trim()))
    }

    /// The host failed to resolve a previously requested open.
    pub fn open_failed(&mut self, path: &DocPath) -> HostRequest {
        HostRequest::Notice(format!("could not find file: {path}"))
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Runs the pending layout pass, if any.
    ///
    /// Reconciliation never lays out synchronously; the host calls this
    /// from its next paint frame so a burst of document changes costs one
    /// re-flow.
    pub fn relayout(&mut self) {
        if !self.needs_layout {
            return;
        }
        self.needs_layout = false;

        let force_pack = std::mem::take(&mut self.force_pack);
        if self.session.layout_mode == cardwall_config::LayoutMode::Masonry || force_pack {
            self.pack_visible();
        }
    }

    // =========================================================================
    // Test helpers
    // =========================================================================

    #[cfg(test)]
    pub(crate) fn verify_invariants(&self) {
        use std::collections::HashSet;

        // Rendered cards: unique per path, each backed by an Open entry.
        let mut seen = HashSet::new();
        for card in &self.cards {
            assert!(
                seen.insert(card.path().clone()),
                "duplicate rendered card for {}",
                card.path()
            );

            let state = self
                .registry
                .get(card.path())
                .unwrap_or_else(|| panic!("rendered card {} has no state", card.path()));
            assert_eq!(
                state.phase,
                CardPhase::Open,
                "rendered card {} must be in the open phase",
                card.path()
            );
        }

        // The rendered set matches the last reconciled visible order.
        let visible: HashSet<_> = self.visible_order.iter().cloned().collect();
        assert_eq!(
            visible.len(),
            self.visible_order.len(),
            "visible order must not repeat paths"
        );
        assert_eq!(seen, visible, "rendered cards must match visible order");

        // Phase/hidden coherence.
        for (path, state) in self.registry.iter() {
            match state.phase {
                CardPhase::Hidden => assert!(
                    self.session.hidden.contains(path),
                    "hidden card {path} missing from the hidden set"
                ),
                CardPhase::Open | CardPhase::Retained => {}
            }
            assert_eq!(
                state.group,
                self.registry.connections().group_of(path),
                "stale group cache on {path}"
            );
        }

        self.registry.verify_invariants();

        // Session bounds.
        let session = &self.session;
        assert!(session.zoom >= self.options.min_zoom && session.zoom <= self.options.max_zoom);
        assert!(
            session.content_scale >= MIN_CONTENT_SCALE
                && session.content_scale <= MAX_CONTENT_SCALE
        );
        if let Some(columns) = session.manual_columns {
            assert!((1..=MAX_COLUMNS).contains(&columns));
        }

        // A selected card must still exist in the registry.
        if let Some(selected) = &self.selected {
            assert!(
                self.registry.get(selected).is_some(),
                "selection points at a removed card"
            );
        }

        self.interaction.verify_invariants(&self.registry);
    }
}
