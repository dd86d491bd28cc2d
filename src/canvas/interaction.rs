//! Pointer gestures: drag, resize, pan, click and snap-connect.
//!
//! A press lands on either a card edge (resize), a card body (a pending
//! press that becomes a drag once movement passes the threshold), or the
//! bare canvas (pan). Drags and resizes hold transient deltas and commit
//! to the registry only on release, after checking the card still exists;
//! a document closing mid-gesture simply makes the commit a no-op. Pan
//! has no cancel concept and commits on every motion event.
//!
//! All pointer math goes through [`Viewport`]: positions through the
//! inverse transform, deltas through the zoom division. No gesture does
//! its own coordinate arithmetic.
//!
//! [`Viewport`]: crate::geometry::Viewport

use std::collections::HashSet;
use std::time::Duration;

use bitflags::bitflags;
use cardwall_config::{LayoutMode, SortOrder};
use kurbo::{Point, Rect, Vec2};

use crate::geometry::{self, Edge};

use super::{Canvas, ContentRenderer, DocPath, HostRequest};

#[cfg(test)]
use super::registry::CardRegistry;

/// Screen-space margin around a card border where a press starts a
/// resize instead of a drag.
const RESIZE_MARGIN: f64 = 8.;

bitflags! {
    /// Edges taking part in an interactive resize. Corners set two bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResizeEdge: u8 {
        const LEFT = 0b0001;
        const RIGHT = 0b0010;
        const TOP = 0b0100;
        const BOTTOM = 0b1000;
    }
}

/// The edge a dragged card would snap-connect to on release. Exposed so
/// the host can paint a drop indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapTarget {
    pub other: DocPath,
    pub edge: Edge,
    pub distance: f64,
}

#[derive(Debug)]
enum Gesture {
    /// Press on a card body; a click until movement says otherwise.
    Press(PressData),
    Drag(DragData),
    Resize(ResizeData),
    Pan(PanData),
}

#[derive(Debug)]
struct PressData {
    path: DocPath,
    start_screen: Point,
}

#[derive(Debug)]
struct DragData {
    path: DocPath,

    /// Canvas-space origin of every card moving with this drag: the whole
    /// group in free-form, just the dragged card for a reorder.
    origins: Vec<(DocPath, Point)>,

    start_screen: Point,
    last_screen: Point,

    /// Transient canvas-space delta; committed on release.
    delta: Vec2,

    snap: Option<SnapTarget>,

    /// Manual-order reorder (masonry) instead of a free move.
    reorder: bool,
}

#[derive(Debug)]
struct ResizeData {
    path: DocPath,
    edges: ResizeEdge,
    start_screen: Point,
    original_pos: Point,
    original_size: kurbo::Size,
    delta: Vec2,
}

#[derive(Debug)]
struct PanData {
    last_screen: Point,
}

#[derive(Debug, Default)]
pub(crate) struct InteractionState {
    gesture: Option<Gesture>,

    /// Card and time of the last completed click, for double-click
    /// detection.
    last_click: Option<(DocPath, Duration)>,
}

impl InteractionState {
    #[cfg(test)]
    pub(crate) fn verify_invariants(&self, _registry: &CardRegistry) {
        if let Some(Gesture::Drag(drag)) = &self.gesture {
            assert!(
                drag.origins.iter().any(|(path, _)| path == &drag.path),
                "drag origins must include the dragged card"
            );
            assert!(drag.delta.x.is_finite() && drag.delta.y.is_finite());
        }
    }
}

impl<R: ContentRenderer> Canvas<R> {
    // =========================================================================
    // Pointer entry points
    // =========================================================================

    pub fn pointer_down(&mut self, screen: Point) {
        if self.interaction.gesture.is_some() {
            return;
        }

        let gesture = if let Some((path, edges)) = self.resize_edges_under(screen) {
            let Some(state) = self.registry.get(&path) else {
                return;
            };
            Gesture::Resize(ResizeData {
                path,
                edges,
                start_screen: screen,
                original_pos: state.pos,
                original_size: state.size,
                delta: Vec2::ZERO,
            })
        } else if let Some(path) = self.card_under(screen) {
            Gesture::Press(PressData {
                path,
                start_screen: screen,
            })
        } else {
            Gesture::Pan(PanData {
                last_screen: screen,
            })
        };

        self.interaction.gesture = Some(gesture);
    }

    pub fn pointer_motion(&mut self, screen: Point) {
        let Some(gesture) = self.interaction.gesture.take() else {
            return;
        };

        let gesture = match gesture {
            Gesture::Press(press) => {
                let moved = (screen - press.start_screen).hypot();
                if moved >= self.options.drag_threshold {
                    match self.begin_drag(press.path.clone(), press.start_screen, screen) {
                        Some(drag) => Gesture::Drag(drag),
                        // Dragging is disabled right now; the press stays
                        // a (sloppy) click.
                        None => Gesture::Press(press),
                    }
                } else {
                    Gesture::Press(press)
                }
            }
            Gesture::Drag(mut drag) => {
                self.update_drag(&mut drag, screen);
                Gesture::Drag(drag)
            }
            Gesture::Resize(mut resize) => {
                resize.delta = self
                    .viewport()
                    .screen_delta_to_canvas(screen - resize.start_screen);
                Gesture::Resize(resize)
            }
            Gesture::Pan(mut pan) => {
                // Pan is screen-space by definition and commits as it
                // goes; there is nothing to cancel.
                self.session.pan += screen - pan.last_screen;
                pan.last_screen = screen;
                Gesture::Pan(pan)
            }
        };

        self.interaction.gesture = Some(gesture);
    }

    pub fn pointer_up(&mut self) -> Vec<HostRequest> {
        let mut requests = Vec::new();
        let Some(gesture) = self.interaction.gesture.take() else {
            return requests;
        };

        match gesture {
            Gesture::Press(press) => {
                if self.registry.get(&press.path).is_some() {
                    if self.session.layout_mode == LayoutMode::Freeform {
                        self.raise_card(&press.path);
                    }
                    self.selected = Some(press.path.clone());

                    let now = self.clock.now();
                    let is_double = self.interaction.last_click.take().is_some_and(
                        |(path, time)| {
                            path == press.path
                                && now.saturating_sub(time) <= self.options.double_click_window
                        },
                    );
                    if is_double {
                        requests.push(HostRequest::FocusDocument(press.path));
                    } else {
                        self.interaction.last_click = Some((press.path, now));
                    }
                }
            }
            Gesture::Drag(drag) => self.commit_drag(drag),
            Gesture::Resize(resize) => self.commit_resize(resize),
            Gesture::Pan(_) => {}
        }

        requests
    }

    /// Abandons the gesture in flight without committing anything.
    pub fn pointer_cancel(&mut self) {
        self.interaction.gesture = None;
    }

    // =========================================================================
    // Hit testing
    // =========================================================================

    /// Topmost card under a screen position.
    pub fn card_under(&self, screen: Point) -> Option<DocPath> {
        self.card_under_excluding(screen, None)
    }

    fn card_under_excluding(&self, screen: Point, exclude: Option<&DocPath>) -> Option<DocPath> {
        let pos = self.viewport().screen_to_canvas(screen);
        self.cards.iter().find_map(|card| {
            if exclude == Some(card.path()) {
                return None;
            }
            let rect = self.card_rect(card.path())? + self.gesture_offset(card.path());
            rect.contains(pos).then(|| card.path().clone())
        })
    }

    /// Card border under a screen position, with the edges a resize
    /// there would move. The body of a card above always wins over the
    /// border of a card below.
    pub fn resize_edges_under(&self, screen: Point) -> Option<(DocPath, ResizeEdge)> {
        let pos = self.viewport().screen_to_canvas(screen);
        let margin = RESIZE_MARGIN / self.session.zoom.max(f64::EPSILON);

        for card in &self.cards {
            let Some(rect) = self.card_rect(card.path()) else {
                continue;
            };
            if !rect.inflate(margin, margin).contains(pos) {
                continue;
            }

            let mut edges = ResizeEdge::empty();
            if (pos.x - rect.x0).abs() <= margin {
                edges |= ResizeEdge::LEFT;
            }
            if (pos.x - rect.x1).abs() <= margin {
                edges |= ResizeEdge::RIGHT;
            }
            if (pos.y - rect.y0).abs() <= margin {
                edges |= ResizeEdge::TOP;
            }
            if (pos.y - rect.y1).abs() <= margin {
                edges |= ResizeEdge::BOTTOM;
            }

            if !edges.is_empty() {
                return Some((card.path().clone(), edges));
            }
            if rect.contains(pos) {
                // Card body; a press here is a drag, not a resize.
                return None;
            }
        }

        None
    }

    /// Transient canvas-space offset of a card taking part in the
    /// current gesture; zero otherwise. Painting adds this on top of the
    /// committed position.
    pub(crate) fn gesture_offset(&self, path: &DocPath) -> Vec2 {
        match &self.interaction.gesture {
            Some(Gesture::Drag(drag)) => {
                if drag.origins.iter().any(|(member, _)| member == path) {
                    drag.delta
                } else {
                    Vec2::ZERO
                }
            }
            _ => Vec2::ZERO,
        }
    }

    /// The snap-connect target of the drag in flight, for painting a
    /// drop indicator.
    pub fn snap_target(&self) -> Option<&SnapTarget> {
        match &self.interaction.gesture {
            Some(Gesture::Drag(drag)) => drag.snap.as_ref(),
            _ => None,
        }
    }

    // =========================================================================
    // Drag
    // =========================================================================

    fn begin_drag(
        &mut self,
        path: DocPath,
        start_screen: Point,
        screen: Point,
    ) -> Option<DragData> {
        self.registry.get(&path)?;

        let reorder = self.session.layout_mode == LayoutMode::Masonry;
        if reorder && self.session.sort != SortOrder::Manual {
            // Masonry positions are overwritten every cycle, and without
            // manual sort there is no order to edit either.
            return None;
        }

        let origins: Vec<(DocPath, Point)> = if reorder {
            vec![(path.clone(), self.registry.get(&path)?.pos)]
        } else {
            let mut members: Vec<DocPath> =
                self.registry.group_members(&path).into_iter().collect();
            members.sort();
            members
                .into_iter()
                .filter_map(|member| {
                    let pos = self.registry.get(&member)?.pos;
                    Some((member, pos))
                })
                .collect()
        };

        if !reorder {
            self.raise_card(&path);
        }

        let mut drag = DragData {
            path,
            origins,
            start_screen,
            last_screen: screen,
            delta: Vec2::ZERO,
            snap: None,
            reorder,
        };
        self.update_drag(&mut drag, screen);
        Some(drag)
    }

    fn update_drag(&self, drag: &mut DragData, screen: Point) {
        drag.last_screen = screen;
        drag.delta = self
            .viewport()
            .screen_delta_to_canvas(screen - drag.start_screen);
        drag.snap = if drag.reorder {
            None
        } else {
            self.snap_candidate(drag)
        };
    }

    fn snap_candidate(&self, drag: &DragData) -> Option<SnapTarget> {
        let origin = drag
            .origins
            .iter()
            .find(|(path, _)| path == &drag.path)?
            .1;
        let dragged_pos = origin + drag.delta;

        let members: HashSet<&DocPath> = drag.origins.iter().map(|(path, _)| path).collect();
        let candidates: Vec<(DocPath, Rect)> = self
            .cards
            .iter()
            .filter(|card| !members.contains(card.path()))
            .filter_map(|card| {
                self.card_rect(card.path())
                    .map(|rect| (card.path().clone(), rect))
            })
            .collect();

        let hit = geometry::nearest_edge(
            dragged_pos,
            candidates.iter().map(|(_, rect)| *rect),
            self.options.snap_distance,
            self.session.zoom,
        )?;

        Some(SnapTarget {
            other: candidates[hit.index].0.clone(),
            edge: hit.edge,
            distance: hit.distance,
        })
    }

    fn commit_drag(&mut self, drag: DragData) {
        let DragData {
            path,
            origins,
            last_screen,
            mut delta,
            snap,
            reorder,
            ..
        } = drag;

        if reorder {
            // The card under the release point decides the new manual
            // index.
            let target = self.card_under_excluding(last_screen, Some(&path));
            if let Some(target) = target {
                if let Some(state) = self.registry.get(&target) {
                    let index = state.order_index;
                    self.registry.move_to_index(&path, index);
                    self.debounce.request_now();
                }
            }
            return;
        }

        // The drag may have outlived some of its cards; whoever is gone
        // is silently skipped, whoever is left moves.
        let snap = snap.filter(|snap| {
            self.registry.get(&path).is_some() && self.registry.get(&snap.other).is_some()
        });

        if let Some(snap) = &snap {
            if let Some(adjust) = self.snap_adjustment(&path, &origins, delta, snap) {
                delta += adjust;
            }
        }

        for (member, origin) in &origins {
            if let Some(state) = self.registry.get_mut(member) {
                state.pos = *origin + delta;
            }
        }

        if let Some(snap) = snap {
            self.registry.connect(&path, &snap.other);
        }
    }

    /// Extra translation that puts the dragged card flush against the
    /// matched edge, applied to the whole moving group so its shape is
    /// preserved.
    fn snap_adjustment(
        &self,
        path: &DocPath,
        origins: &[(DocPath, Point)],
        delta: Vec2,
        snap: &SnapTarget,
    ) -> Option<Vec2> {
        let origin = origins.iter().find(|(member, _)| member == path)?.1;
        let loose = origin + delta;
        let size = self.registry.get(path)?.size;

        let other = self.registry.get(&snap.other)?;
        let flush = match snap.edge {
            Edge::Top => Point::new(other.pos.x, other.pos.y - size.height),
            Edge::Bottom => Point::new(other.pos.x, other.pos.y + other.size.height),
            Edge::Left => Point::new(other.pos.x - size.width, other.pos.y),
            Edge::Right => Point::new(other.pos.x + other.size.width, other.pos.y),
        };

        Some(flush - loose)
    }

    // =========================================================================
    // Resize
    // =========================================================================

    fn commit_resize(&mut self, resize: ResizeData) {
        // The document may have closed mid-resize.
        let Some(state) = self.registry.get_mut(&resize.path) else {
            return;
        };

        let mut width = resize.original_size.width;
        let mut height = resize.original_size.height;
        if resize.edges.contains(ResizeEdge::RIGHT) {
            width += resize.delta.x;
        }
        if resize.edges.contains(ResizeEdge::LEFT) {
            width -= resize.delta.x;
        }
        if resize.edges.contains(ResizeEdge::BOTTOM) {
            height += resize.delta.y;
        }
        if resize.edges.contains(ResizeEdge::TOP) {
            height -= resize.delta.y;
        }

        let size = kurbo::Size::new(
            width.max(super::MIN_CARD_SIZE.width),
            height.max(super::MIN_CARD_SIZE.height),
        );

        // Left/top resizes keep the opposite edge in place.
        let mut pos = resize.original_pos;
        if resize.edges.contains(ResizeEdge::LEFT) {
            pos.x = resize.original_pos.x + resize.original_size.width - size.width;
        }
        if resize.edges.contains(ResizeEdge::TOP) {
            pos.y = resize.original_pos.y + resize.original_size.height - size.height;
        }

        state.pos = pos;
        state.size = size;
        state.custom_size = Some(size);
        self.needs_layout = true;
    }
}
