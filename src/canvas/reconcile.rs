//! Reconciling the live open-document set against the card state.
//!
//! The host notifies the canvas whenever its workspace changes; a burst
//! of notifications collapses into one debounced pass. Each pass walks
//! the same pipeline: collect (filter and de-duplicate the snapshot),
//! sort, diff against the rendered cards, self-heal duplicates, and
//! defer the actual re-layout to the host's next paint frame.

use std::collections::HashSet;
use std::time::Duration;

use cardwall_config::{LayoutMode, SortOrder};
use kurbo::Size;

use super::card::{self, Card};
use super::freeform;
use super::registry::CardPhase;
use super::{Canvas, ContentRenderer, DocPath};

/// Transient snapshot of one open document, supplied by the host's tab
/// registry every pass. Never stored; a document may vanish between
/// passes.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenDocumentRef {
    /// Opaque identity of the hosting view or pane.
    pub id: String,
    pub path: DocPath,
    pub title: String,
    pub size_bytes: u64,
    /// Modification time, as a duration since the epoch.
    pub modified_at: Duration,
    /// Whether this is the focused document.
    pub is_active: bool,
    pub view: ViewDescriptor,
}

/// What kind of view hosts a document. Used to keep documents embedded
/// in a diagram view from being mirrored as cards, which would recurse
/// into mirroring the diagram's own previews.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewDescriptor {
    /// The host's authoritative capability answer, when it has one.
    pub embeds_diagram: Option<bool>,
    /// View type string, e.g. `"markdown"`.
    pub kind: String,
    /// Type of the parent view, for documents nested in split panes.
    pub parent_kind: Option<String>,
    /// Whether an ancestor element of the view carries a diagram class.
    pub diagram_ancestry: bool,
}

/// Ranked-fallback check for documents hosted inside a nested diagram
/// view. The authoritative answer wins outright; the string and
/// ancestry heuristics only apply when the host cannot answer.
pub fn hosted_in_diagram(view: &ViewDescriptor) -> bool {
    if let Some(answer) = view.embeds_diagram {
        return answer;
    }

    let looks_like_diagram = |kind: &str| kind.contains("diagram") || kind.contains("graph");
    if looks_like_diagram(&view.kind) {
        return true;
    }
    if view.parent_kind.as_deref().is_some_and(looks_like_diagram) {
        return true;
    }
    view.diagram_ancestry
}

/// Workspace change notification kinds. All three trigger the same
/// debounced reconciliation; the distinction exists only for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceEvent {
    DocumentOpened,
    FocusChanged,
    LayoutChanged,
}

/// Trailing-edge coalescing of change notifications: every event pushes
/// the deadline out, so a storm of open/close events costs exactly one
/// reconciliation once it quiets down.
#[derive(Debug)]
pub(crate) struct Debouncer {
    delay: Duration,
    deadline: Option<Duration>,
    immediate: bool,
}

impl Debouncer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            immediate: false,
        }
    }

    pub(crate) fn notify(&mut self, now: Duration) {
        self.deadline = Some(now + self.delay);
    }

    /// Explicit user actions skip the debounce window.
    pub(crate) fn request_now(&mut self) {
        self.immediate = true;
    }

    pub(crate) fn due(&self, now: Duration) -> bool {
        self.immediate || self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub(crate) fn clear(&mut self) {
        self.deadline = None;
        self.immediate = false;
    }
}

impl<R: ContentRenderer> Canvas<R> {
    pub fn notify_workspace_event(&mut self, event: WorkspaceEvent) {
        trace!("workspace event: {event:?}");
        self.debounce.notify(self.clock.now());
    }

    /// Whether a reconciliation pass is due. The host polls this from
    /// its timer or frame callback and, when true, calls [`reconcile`]
    /// with a fresh document snapshot.
    ///
    /// [`reconcile`]: Canvas::reconcile
    pub fn reconcile_due(&self) -> bool {
        self.debounce.due(self.clock.now())
    }

    /// Runs one reconciliation pass against a snapshot of the open
    /// documents.
    ///
    /// Geometry of surviving cards is untouched. New paths get state and
    /// a mounted preview; departed paths release their preview and keep
    /// their geometry for a future reopen, unless they were hidden, in
    /// which case nothing is retained. Layout is deferred to the next
    /// [`relayout`] call.
    ///
    /// [`relayout`]: Canvas::relayout
    pub fn reconcile(&mut self, docs: &[OpenDocumentRef], renderer: &mut R) {
        self.debounce.clear();

        // Collect: drop diagram-hosted views, first occurrence wins for
        // documents open in several panes.
        let mut seen = HashSet::new();
        let open: Vec<&OpenDocumentRef> = docs
            .iter()
            .filter(|doc| !hosted_in_diagram(&doc.view))
            .filter(|doc| seen.insert(doc.path.clone()))
            .collect();

        // Entries leaving the open set: hidden ones retain nothing,
        // everything else keeps its geometry for a future reopen.
        let open_paths: HashSet<&DocPath> = open.iter().map(|doc| &doc.path).collect();
        let departed: Vec<DocPath> = self
            .registry
            .iter()
            .filter(|&(path, state)| {
                state.phase != CardPhase::Retained && !open_paths.contains(path)
            })
            .map(|(path, _)| path.clone())
            .collect();
        for path in departed {
            if self.session.hidden.contains(&path) {
                self.registry.remove(&path);
            } else {
                self.registry.set_phase(&path, CardPhase::Retained);
            }
        }

        // Every open document gets registry state, staggered away from
        // the origin on first sight; reopened paths keep their old
        // geometry and merely flip back to the open phase.
        for doc in &open {
            let hidden = self.session.hidden.contains(&doc.path);
            let options = self.options.clone();
            let size_bytes = doc.size_bytes;
            let state = self.registry.upsert_with(&doc.path, |created| {
                (
                    freeform::staggered_position(created, &options),
                    Size::new(
                        options.card_width,
                        card::synthetic_height(size_bytes, &options),
                    ),
                )
            });
            state.phase = if hidden {
                CardPhase::Hidden
            } else {
                CardPhase::Open
            };
        }

        // Visible set: open, not hidden, matching the search query.
        let query = self.session.search_query.trim().to_lowercase();
        let mut visible: Vec<&OpenDocumentRef> = open
            .iter()
            .filter(|doc| !self.session.hidden.contains(&doc.path))
            .filter(|doc| query.is_empty() || doc.title.to_lowercase().contains(&query))
            .copied()
            .collect();

        self.sort_docs(&mut visible);

        let visible_paths: HashSet<DocPath> =
            visible.iter().map(|doc| doc.path.clone()).collect();

        // Destroy departures and self-heal duplicate cards. Duplicates
        // can only appear through races between passes; correcting them
        // here keeps the damage to one cycle.
        let mut kept = HashSet::new();
        let mut idx = 0;
        while idx < self.cards.len() {
            let path = self.cards[idx].path().clone();
            if visible_paths.contains(&path) {
                if kept.insert(path.clone()) {
                    idx += 1;
                    continue;
                }
                warn!("duplicate card for {path}; discarding the extra one");
            }

            let mut removed = self.cards.remove(idx);
            if let Some(handle) = removed.preview.take() {
                renderer.unmount(handle);
            }
        }

        // Refresh survivors, create arrivals on top of the stack.
        for doc in &visible {
            if let Some(existing) = self
                .cards
                .iter_mut()
                .find(|card| card.path() == &doc.path)
            {
                existing.title = doc.title.clone();
                existing.size_bytes = doc.size_bytes;
                existing.modified_at = doc.modified_at;
                existing.is_active = doc.is_active;
            } else {
                let region = self.card_rect(&doc.path).unwrap_or_default();
                let preview = renderer.mount(&doc.path, region);
                self.cards.insert(
                    0,
                    Card {
                        path: doc.path.clone(),
                        title: doc.title.clone(),
                        size_bytes: doc.size_bytes,
                        modified_at: doc.modified_at,
                        is_active: doc.is_active,
                        preview: Some(preview),
                        measured_height: None,
                    },
                );
            }
        }

        // Masonry has no overlap, so render order simply follows the
        // sorted order there.
        if self.session.layout_mode == LayoutMode::Masonry {
            let order: Vec<DocPath> = visible.iter().map(|doc| doc.path.clone()).collect();
            self.cards.sort_by_key(|c| {
                order
                    .iter()
                    .position(|path| path == c.path())
                    .unwrap_or(usize::MAX)
            });
        }

        self.visible_order = visible.iter().map(|doc| doc.path.clone()).collect();
        self.selected = self
            .selected
            .take()
            .filter(|path| self.registry.get(path).is_some());

        debug!(
            "reconciled {} open documents into {} cards",
            open.len(),
            self.cards.len()
        );

        // Never lay out synchronously here; many documents changing in
        // one tick must cost one re-flow on the next frame.
        self.needs_layout = true;
    }

    fn sort_docs(&self, docs: &mut [&OpenDocumentRef]) {
        match self.session.sort {
            SortOrder::Manual => docs.sort_by_key(|doc| {
                self.registry
                    .get(&doc.path)
                    .map(|state| state.order_index)
                    .unwrap_or(usize::MAX)
            }),
            SortOrder::NameAsc => docs.sort_by(|a, b| a.title.cmp(&b.title)),
            SortOrder::NameDesc => docs.sort_by(|a, b| b.title.cmp(&a.title)),
            SortOrder::SizeAsc => docs.sort_by_key(|doc| doc.size_bytes),
            SortOrder::SizeDesc => docs.sort_by_key(|doc| std::cmp::Reverse(doc.size_bytes)),
            SortOrder::Modified => docs.sort_by_key(|doc| std::cmp::Reverse(doc.modified_at)),
        }
    }
}
