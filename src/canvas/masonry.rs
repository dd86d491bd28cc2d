//! Masonry layout: deterministic shortest-column packing.
//!
//! Recomputed from the sorted visible order every cycle, so positions are
//! never authoritative here; free-form dragging is disabled while this
//! strategy is active.

use kurbo::Size;

use crate::geometry;

use super::{Canvas, ContentRenderer, MAX_COLUMNS};

impl<R: ContentRenderer> Canvas<R> {
    /// Effective column count: the manual override when set, otherwise
    /// whatever fits the container at the current effective scale.
    pub(crate) fn column_count(&self) -> usize {
        match self.session.manual_columns {
            Some(columns) => usize::from(columns.clamp(1, MAX_COLUMNS)),
            None => geometry::auto_column_count(
                self.view_size.width,
                self.options.card_width,
                self.options.gap_x,
                self.session.effective_scale(),
            ),
        }
    }

    /// Packs every visible card into columns, in the sorted order from
    /// the last reconciliation.
    pub(crate) fn pack_visible(&mut self) {
        let columns = self.column_count();

        let heights: Vec<f64> = self
            .visible_order
            .iter()
            .map(|path| {
                let custom = self
                    .registry
                    .get(path)
                    .and_then(|state| state.custom_size)
                    .map(|size| size.height);
                custom.unwrap_or_else(|| {
                    self.cards
                        .iter()
                        .find(|card| card.path() == path)
                        .map(|card| card.packing_height(&self.options))
                        .unwrap_or(self.options.card_height_min)
                })
            })
            .collect();

        let positions = geometry::pack_columns(
            &heights,
            columns,
            self.options.card_width,
            self.options.gap_x,
            self.options.gap_y,
        );

        for ((path, pos), height) in self.visible_order.iter().zip(positions).zip(heights) {
            if let Some(state) = self.registry.get_mut(path) {
                state.pos = pos;
                state.size = Size::new(self.options.card_width, height);
            }
        }
    }
}
