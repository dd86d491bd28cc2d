//! Configuration for the card canvas, parsed from KDL.
//!
//! The schema is intentionally small: one node per tunable, grouped into
//! sections that mirror the engine's subsystems. Values are range-checked
//! at decode time where a hard range exists, and clamped by the engine's
//! `Options` conversion otherwise, so a hand-edited config can never crash
//! the canvas.
//!
//! ```kdl
//! layout {
//!     card-width 250
//!     gap-x 24
//!     gap-y 24
//!     mode "freeform"
//! }
//!
//! zoom {
//!     min 0.25
//!     max 3.0
//! }
//! ```

use std::path::Path;

use miette::{Context, IntoDiagnostic};
use tracing::debug;

mod float_or_int;

pub use float_or_int::FloatOrInt;

#[derive(knuffel::Decode, Debug, Clone, PartialEq, Default)]
pub struct Config {
    #[knuffel(child, default)]
    pub layout: Layout,
    #[knuffel(child, default)]
    pub zoom: Zoom,
    #[knuffel(child, default)]
    pub interaction: Interaction,
    #[knuffel(child, default)]
    pub reconcile: Reconcile,
    #[knuffel(child, default)]
    pub export: Export,
}

/// Card sizing and arrangement.
#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Layout {
    #[knuffel(child, unwrap(argument), default = Self::default().card_width)]
    pub card_width: FloatOrInt<1, 10000>,
    #[knuffel(child, unwrap(argument), default = Self::default().card_height_min)]
    pub card_height_min: FloatOrInt<1, 10000>,
    #[knuffel(child, unwrap(argument), default = Self::default().card_height_max)]
    pub card_height_max: FloatOrInt<1, 10000>,
    #[knuffel(child, unwrap(argument), default = Self::default().gap_x)]
    pub gap_x: FloatOrInt<0, 65535>,
    #[knuffel(child, unwrap(argument), default = Self::default().gap_y)]
    pub gap_y: FloatOrInt<0, 65535>,
    /// Document byte size at which a card reaches its maximum synthetic height.
    #[knuffel(child, unwrap(argument), default = Self::default().base_size_bytes)]
    pub base_size_bytes: u64,
    /// Fixed column count; omit for automatic.
    #[knuffel(child, unwrap(argument))]
    pub columns: Option<u8>,
    #[knuffel(child, unwrap(argument), default)]
    pub mode: LayoutMode,
    #[knuffel(child, unwrap(argument), default)]
    pub sort: SortOrder,
    /// Offset between default positions of consecutively created cards.
    #[knuffel(child, unwrap(argument), default = Self::default().stagger)]
    pub stagger: FloatOrInt<0, 1000>,
    #[knuffel(child, unwrap(argument), default = Self::default().content_scale)]
    pub content_scale: FloatOrInt<0, 1>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            card_width: FloatOrInt(250.),
            card_height_min: FloatOrInt(120.),
            card_height_max: FloatOrInt(480.),
            gap_x: FloatOrInt(24.),
            gap_y: FloatOrInt(24.),
            base_size_bytes: 10240,
            columns: None,
            mode: LayoutMode::default(),
            sort: SortOrder::default(),
            stagger: FloatOrInt(32.),
            content_scale: FloatOrInt(1.),
        }
    }
}

#[derive(knuffel::DecodeScalar, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Card positions are authoritative and survive reconciliation.
    #[default]
    Freeform,
    /// Positions are recomputed by column packing every cycle.
    Masonry,
}

#[derive(knuffel::DecodeScalar, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Manual,
    NameAsc,
    NameDesc,
    SizeAsc,
    SizeDesc,
    Modified,
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Zoom {
    #[knuffel(child, unwrap(argument), default = Self::default().min)]
    pub min: FloatOrInt<0, 10>,
    #[knuffel(child, unwrap(argument), default = Self::default().max)]
    pub max: FloatOrInt<0, 10>,
    #[knuffel(child, unwrap(argument), default = Self::default().step)]
    pub step: FloatOrInt<0, 1>,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            min: FloatOrInt(0.25),
            max: FloatOrInt(3.),
            step: FloatOrInt(0.1),
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    /// Screen-space distance within which a dragged card snaps to an edge.
    #[knuffel(child, unwrap(argument), default = Self::default().snap_distance)]
    pub snap_distance: FloatOrInt<0, 500>,
    /// Screen-space movement below which a press-release counts as a click.
    #[knuffel(child, unwrap(argument), default = Self::default().drag_threshold)]
    pub drag_threshold: FloatOrInt<0, 100>,
    #[knuffel(child, unwrap(argument), default = Self::default().double_click_ms)]
    pub double_click_ms: u64,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            snap_distance: FloatOrInt(16.),
            drag_threshold: FloatOrInt(6.),
            double_click_ms: 300,
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Reconcile {
    /// Coalescing window for workspace change notifications.
    #[knuffel(child, unwrap(argument), default = Self::default().debounce_ms)]
    pub debounce_ms: u64,
}

impl Default for Reconcile {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

/// Geometry of the one-shot diagram-file snapshot.
#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Export {
    #[knuffel(child, unwrap(argument), default = Self::default().card_width)]
    pub card_width: FloatOrInt<1, 10000>,
    #[knuffel(child, unwrap(argument), default = Self::default().card_height)]
    pub card_height: FloatOrInt<1, 10000>,
    #[knuffel(child, unwrap(argument), default = Self::default().spacing)]
    pub spacing: FloatOrInt<0, 10000>,
    #[knuffel(child, unwrap(argument), default = Self::default().auto_layout)]
    pub auto_layout: bool,
}

impl Default for Export {
    fn default() -> Self {
        Self {
            card_width: FloatOrInt(250.),
            card_height: FloatOrInt(150.),
            spacing: FloatOrInt(50.),
            auto_layout: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let config = Self::parse(
            path.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("config.kdl"),
            &contents,
        )
        .context("error parsing")?;

        debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        knuffel::parse(filename, text)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn do_parse(text: &str) -> Config {
        Config::parse("test.kdl", text)
            .map_err(miette::Report::new)
            .unwrap()
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(do_parse(""), Config::default());
    }

    #[test]
    fn parse_full() {
        let parsed = do_parse(
            r##"
            layout {
                card-width 300
                card-height-min 100
                card-height-max 400.5
                gap-x 16
                gap-y 20
                base-size-bytes 4096
                columns 4
                mode "masonry"
                sort "name-asc"
                stagger 48
                content-scale 0.8
            }

            zoom {
                min 0.5
                max 2.0
                step 0.25
            }

            interaction {
                snap-distance 24
                drag-threshold 8
                double-click-ms 400
            }

            reconcile {
                debounce-ms 250
            }

            export {
                card-width 200
                card-height 120
                spacing 40
                auto-layout false
            }
            "##,
        );

        assert_eq!(
            parsed,
            Config {
                layout: Layout {
                    card_width: FloatOrInt(300.),
                    card_height_min: FloatOrInt(100.),
                    card_height_max: FloatOrInt(400.5),
                    gap_x: FloatOrInt(16.),
                    gap_y: FloatOrInt(20.),
                    base_size_bytes: 4096,
                    columns: Some(4),
                    mode: LayoutMode::Masonry,
                    sort: SortOrder::NameAsc,
                    stagger: FloatOrInt(48.),
                    content_scale: FloatOrInt(0.8),
                },
                zoom: Zoom {
                    min: FloatOrInt(0.5),
                    max: FloatOrInt(2.),
                    step: FloatOrInt(0.25),
                },
                interaction: Interaction {
                    snap_distance: FloatOrInt(24.),
                    drag_threshold: FloatOrInt(8.),
                    double_click_ms: 400,
                },
                reconcile: Reconcile { debounce_ms: 250 },
                export: Export {
                    card_width: FloatOrInt(200.),
                    card_height: FloatOrInt(120.),
                    spacing: FloatOrInt(40.),
                    auto_layout: false,
                },
            },
        );
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let parsed = do_parse(
            r#"
            layout {
                card-width 180
            }
            "#,
        );

        assert_eq!(
            parsed.layout,
            Layout {
                card_width: FloatOrInt(180.),
                ..Layout::default()
            },
        );
        assert_eq!(parsed.zoom, Zoom::default());
    }

    #[test]
    fn out_of_range_is_an_error() {
        assert!(Config::parse(
            "test.kdl",
            r#"
            layout {
                card-width 0
            }
            "#,
        )
        .is_err());
    }

    #[test]
    fn unknown_mode_is_an_error() {
        assert!(Config::parse(
            "test.kdl",
            r#"
            layout {
                mode "diagonal"
            }
            "#,
        )
        .is_err());
    }
}
