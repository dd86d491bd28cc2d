//! A rendered card mirroring one open document.

use std::time::Duration;

use super::{DocPath, Options};

/// Render-side record of a card: everything the host needs to paint a
/// header and host a preview. Geometry lives in the registry, not here,
/// so it survives the card being destroyed and recreated.
#[derive(Debug)]
pub struct Card<H> {
    pub(crate) path: DocPath,
    pub(crate) title: String,
    pub(crate) size_bytes: u64,
    pub(crate) modified_at: Duration,

    /// Whether this card mirrors the focused document.
    pub(crate) is_active: bool,

    /// Mounted preview, released when the card is destroyed.
    pub(crate) preview: Option<H>,

    /// Content height reported by the finished preview load. Until it
    /// arrives the card packs at its synthetic byte-size height.
    pub(crate) measured_height: Option<f64>,
}

impl<H> Card<H> {
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn modified_at(&self) -> Duration {
        self.modified_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn preview(&self) -> Option<&H> {
        self.preview.as_ref()
    }

    /// Height used for masonry packing: measured content height when
    /// known, synthetic byte-size height otherwise.
    pub(crate) fn packing_height(&self, options: &Options) -> f64 {
        self.measured_height
            .unwrap_or_else(|| synthetic_height(self.size_bytes, options))
    }
}

/// Height estimate for a card whose content has not been measured:
/// larger documents get proportionally taller cards, saturating at the
/// configured base size.
pub(crate) fn synthetic_height(size_bytes: u64, options: &Options) -> f64 {
    let ratio = (size_bytes as f64 / options.base_size_bytes as f64).min(1.);
    (options.card_height_min + (options.card_height_max - options.card_height_min) * ratio).floor()
}
