//! Free-form layout: authoritative positions with staggered defaults.
//!
//! Nothing here recomputes existing positions; a card stays where the
//! user (or its creation default) put it until an explicit layout reset.

use kurbo::Point;

use super::{Canvas, ContentRenderer, DocPath, Options};

/// Cards created in one run cascade down-right so new arrivals never
/// stack exactly on the origin; each run of the cascade starts one card
/// width further over so long sessions do not march off the visible
/// area diagonally forever.
pub(crate) fn staggered_position(created: u64, options: &Options) -> Point {
    const RUN: u64 = 10;
    let run = created / RUN;
    let step = created % RUN;

    Point::new(
        run as f64 * (options.card_width + options.gap_x) + step as f64 * options.stagger,
        step as f64 * options.stagger,
    )
}

impl<R: ContentRenderer> Canvas<R> {
    /// Brings a card to the top of the z-order.
    pub(crate) fn raise_card(&mut self, path: &DocPath) {
        let Some(idx) = self.cards.iter().position(|card| card.path() == path) else {
            return;
        };
        let card = self.cards.remove(idx);
        self.cards.insert(0, card);
    }
}
