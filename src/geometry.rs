//! Pure coordinate and packing math.
//!
//! Everything here is stateless: the canvas passes in whatever pan, zoom
//! and measured sizes it has, and gets positions back. Two coordinate
//! spaces exist. *Screen* coordinates are what pointer events carry.
//! *Canvas* coordinates are what [`CardState`] stores. The only legal way
//! between them is [`Viewport::canvas_to_screen`] and its exact inverse —
//! dividing a pointer delta by zoom without also accounting for pan is
//! how drag math drifts at any zoom other than 1.0.
//!
//! [`CardState`]: crate::canvas::CardState

use kurbo::{Point, Rect, Vec2};

/// Pan, zoom and scroll state of the canvas surface.
///
/// `canvas_to_screen(p) = p * zoom + pan - scroll`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub pan: Vec2,
    pub zoom: f64,
    pub scroll: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.,
            scroll: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn canvas_to_screen(&self, p: Point) -> Point {
        Point::new(
            p.x * self.zoom + self.pan.x - self.scroll.x,
            p.y * self.zoom + self.pan.y - self.scroll.y,
        )
    }

    pub fn screen_to_canvas(&self, p: Point) -> Point {
        Point::new(
            (p.x + self.scroll.x - self.pan.x) / self.zoom,
            (p.y + self.scroll.y - self.pan.y) / self.zoom,
        )
    }

    /// Converts a screen-space movement into a canvas-space movement.
    ///
    /// Deltas are unaffected by pan and scroll; only zoom applies.
    pub fn screen_delta_to_canvas(&self, d: Vec2) -> Vec2 {
        d / self.zoom
    }

    pub fn canvas_rect_to_screen(&self, r: Rect) -> Rect {
        let origin = self.canvas_to_screen(r.origin());
        Rect::from_origin_size(origin, r.size() * self.zoom)
    }
}

/// Number of masonry columns that fit the container at the effective
/// scale. Never less than one.
pub fn auto_column_count(
    container_width: f64,
    card_width: f64,
    gap: f64,
    effective_scale: f64,
) -> usize {
    let scale = effective_scale.max(0.01);
    let fit = ((container_width / scale) / (card_width + gap)).floor();
    if fit.is_finite() && fit >= 1. {
        fit as usize
    } else {
        1
    }
}

/// Greedy shortest-column packing.
///
/// Places each height, in input order, into the column with the smallest
/// accumulated height; ties go to the smallest column index. Returns one
/// top-left position per input, in input order. Pure: the same heights
/// and column count always produce the same assignment, so callers must
/// sort their cards before packing.
pub fn pack_columns(
    heights: &[f64],
    columns: usize,
    card_width: f64,
    gap_x: f64,
    gap_y: f64,
) -> Vec<Point> {
    let columns = columns.max(1);
    let mut tops = vec![0.; columns];

    heights
        .iter()
        .map(|&height| {
            let mut shortest = 0;
            for (idx, &top) in tops.iter().enumerate().skip(1) {
                if top < tops[shortest] {
                    shortest = idx;
                }
            }

            let pos = Point::new(shortest as f64 * (card_width + gap_x), tops[shortest]);
            tops[shortest] += height + gap_y;
            pos
        })
        .collect()
}

/// One edge of a card rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Result of a nearest-edge query: which candidate, which of its edges,
/// and how far away in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHit {
    pub index: usize,
    pub edge: Edge,
    pub distance: f64,
}

/// Finds the candidate edge closest to `point`, if any is within
/// `threshold`.
///
/// `point` is the dragged card's canvas-space position. `threshold` is a
/// screen-space distance and is divided by `zoom` so that the snap radius
/// stays constant on screen regardless of magnification. Ties keep the
/// earliest candidate.
pub fn nearest_edge(
    point: Point,
    candidates: impl IntoIterator<Item = Rect>,
    threshold: f64,
    zoom: f64,
) -> Option<EdgeHit> {
    let limit = threshold / zoom.max(f64::EPSILON);
    let mut best: Option<EdgeHit> = None;

    for (index, rect) in candidates.into_iter().enumerate() {
        let edges = [
            (Edge::Top, (point.y - rect.y0).abs()),
            (Edge::Bottom, (point.y - rect.y1).abs()),
            (Edge::Left, (point.x - rect.x0).abs()),
            (Edge::Right, (point.x - rect.x1).abs()),
        ];

        for (edge, distance) in edges {
            if distance > limit {
                continue;
            }
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(EdgeHit {
                    index,
                    edge,
                    distance,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn screen_canvas_round_trip() {
        let viewport = Viewport {
            pan: Vec2::new(120., -45.),
            zoom: 0.75,
            scroll: Vec2::new(30., 300.),
        };
        let p = Point::new(512., 81.5);

        let back = viewport.canvas_to_screen(viewport.screen_to_canvas(p));
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-9);
    }

    #[test]
    fn delta_divides_by_zoom() {
        let viewport = Viewport {
            pan: Vec2::new(999., 999.),
            zoom: 0.5,
            scroll: Vec2::ZERO,
        };

        // A 100 px pointer movement covers 200 canvas units at half zoom.
        let delta = viewport.screen_delta_to_canvas(Vec2::new(100., 0.));
        assert_abs_diff_eq!(delta.x, 200., epsilon = 1e-9);
    }

    #[test]
    fn pack_two_columns_shortest_first() {
        // Third card goes below the second: column one is still shorter
        // (150 < 300) when it is placed.
        let positions = pack_columns(&[300., 150., 400.], 2, 250., 10., 10.);

        assert_eq!(positions[0], Point::new(0., 0.));
        assert_eq!(positions[1], Point::new(260., 0.));
        assert_eq!(positions[2], Point::new(260., 160.));
    }

    #[test]
    fn pack_ties_go_left() {
        let positions = pack_columns(&[100., 100., 100.], 3, 200., 0., 0.);
        assert_eq!(positions[0].x, 0.);
        assert_eq!(positions[1].x, 200.);
        assert_eq!(positions[2].x, 400.);
    }

    #[test]
    fn auto_columns_floor_and_clamp() {
        assert_eq!(auto_column_count(1000., 250., 50., 1.), 3);
        assert_eq!(auto_column_count(1000., 250., 50., 0.5), 6);
        assert_eq!(auto_column_count(100., 250., 50., 1.), 1);
        assert_eq!(auto_column_count(0., 250., 50., 1.), 1);
    }

    #[test]
    fn nearest_edge_compensates_for_zoom() {
        let candidates = [Rect::new(100., 100., 300., 200.)];

        // 10 canvas units off the top edge. At zoom 1 a 8 px threshold
        // misses; at zoom 0.5 the same screen threshold covers 16 canvas
        // units and hits.
        let point = Point::new(150., 90.);
        assert_eq!(nearest_edge(point, candidates, 8., 1.), None);

        let hit = nearest_edge(point, candidates, 8., 0.5).unwrap();
        assert_eq!(hit.edge, Edge::Top);
        assert_abs_diff_eq!(hit.distance, 10., epsilon = 1e-9);
    }

    #[test]
    fn nearest_edge_picks_global_minimum() {
        let candidates = [
            Rect::new(0., 0., 100., 100.),
            Rect::new(104., 0., 200., 100.),
        ];

        let hit = nearest_edge(Point::new(102., 50.), candidates, 20., 1.).unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.edge, Edge::Right);
    }

    proptest! {
        #[test]
        fn round_trip_any_viewport(
            px in -1e5f64..1e5,
            py in -1e5f64..1e5,
            pan_x in -1e4f64..1e4,
            pan_y in -1e4f64..1e4,
            zoom in 0.05f64..10.,
            scroll_x in -1e4f64..1e4,
            scroll_y in -1e4f64..1e4,
        ) {
            let viewport = Viewport {
                pan: Vec2::new(pan_x, pan_y),
                zoom,
                scroll: Vec2::new(scroll_x, scroll_y),
            };
            let p = Point::new(px, py);
            let back = viewport.screen_to_canvas(viewport.canvas_to_screen(p));
            prop_assert!((back.x - p.x).abs() < 1e-6);
            prop_assert!((back.y - p.y).abs() < 1e-6);
        }

        #[test]
        fn packing_is_deterministic(
            heights in proptest::collection::vec(10f64..500., 0..40),
            columns in 1usize..8,
        ) {
            let a = pack_columns(&heights, columns, 250., 10., 10.);
            let b = pack_columns(&heights, columns, 250., 10., 10.);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn packing_never_overlaps_within_column(
            heights in proptest::collection::vec(10f64..500., 1..40),
            columns in 1usize..8,
        ) {
            let positions = pack_columns(&heights, columns, 250., 10., 10.);

            // Cards sharing a column must be stacked with a gap.
            for i in 0..positions.len() {
                for j in (i + 1)..positions.len() {
                    if positions[i].x == positions[j].x {
                        let (top, top_h, bottom) = if positions[i].y < positions[j].y {
                            (positions[i].y, heights[i], positions[j].y)
                        } else {
                            (positions[j].y, heights[j], positions[i].y)
                        };
                        prop_assert!(top + top_h <= bottom);
                    }
                }
            }
        }
    }
}
