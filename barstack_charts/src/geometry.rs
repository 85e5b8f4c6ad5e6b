// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bar rectangles from scales.

use kurbo::Rect;

use crate::config::Layout;
use crate::scale::Scales;

/// Value-space span of a plain (unstacked) bar.
///
/// Bars grow from 0; when the value domain is centred on the baseline they grow symmetrically
/// around it instead.
pub fn plain_span(value: f64, centered: bool) -> (f64, f64) {
    if centered {
        (-value / 2.0, value / 2.0)
    } else {
        (0.0, value)
    }
}

/// The rectangle for a bar in `category` spanning `span` in value space.
///
/// Span ends are clamped into the value domain. A span with a non-finite end collapses to a
/// zero-size bar at the baseline, and an unknown category yields a zero-width bar at the start of
/// the band range.
pub fn bar_rect(scales: &Scales, category: &str, span: (f64, f64)) -> Rect {
    let band = &scales.band;
    let (start, width) = match band.map(category) {
        Some(start) => (start, band.band_width()),
        None => (band.range().0, 0.0),
    };

    let value = &scales.value;
    let (lo, hi) = if span.0.is_finite() && span.1.is_finite() {
        (value.clamp(span.0.min(span.1)), value.clamp(span.0.max(span.1)))
    } else {
        let b = value.baseline();
        (b, b)
    };
    let (a, b) = (value.map(lo), value.map(hi));
    let (v0, v1) = (a.min(b), a.max(b));

    match scales.layout {
        Layout::Vertical => Rect::new(start, v0, start + width, v1),
        Layout::Horizontal => Rect::new(v0, start, v1, start + width),
    }
}

/// Collapses `rect` to zero width along the category axis, shifted outward in proportion to its
/// distance from the plot centre.
///
/// This is the geometry plain bars enter from and exit to. `extent` is the length of the category
/// axis.
pub fn collapse_ordinal(rect: Rect, layout: Layout, extent: f64) -> Rect {
    let (start, width) = match layout {
        Layout::Vertical => (rect.x0, rect.width()),
        Layout::Horizontal => (rect.y0, rect.height()),
    };
    let half = width / 2.0;
    let at = if extent > 0.0 {
        start + half * ((start + half) / (extent / 2.0))
    } else {
        start + half
    };
    match layout {
        Layout::Vertical => Rect::new(at, rect.y0, at, rect.y1),
        Layout::Horizontal => Rect::new(rect.x0, at, rect.x1, at),
    }
}

/// Collapses `rect` to zero length along the value axis at `position` (a range coordinate).
pub fn collapse_value(rect: Rect, layout: Layout, position: f64) -> Rect {
    match layout {
        Layout::Vertical => Rect::new(rect.x0, position, rect.x1, position),
        Layout::Horizontal => Rect::new(position, rect.y0, position, rect.y1),
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::sync::Arc;

    use super::*;
    use crate::scale::{ScaleBand, ScaleLinear};

    fn scales(layout: Layout) -> Scales {
        let keys = ["a", "b"].map(Arc::<str>::from);
        match layout {
            Layout::Vertical => Scales {
                layout,
                band: ScaleBand::new(keys, (0.0, 100.0)),
                value: ScaleLinear::new((-10.0, 10.0), (200.0, 0.0)),
            },
            Layout::Horizontal => Scales {
                layout,
                band: ScaleBand::new(keys, (0.0, 200.0)),
                value: ScaleLinear::new((-10.0, 10.0), (0.0, 100.0)),
            },
        }
    }

    #[test]
    fn vertical_bars_grow_up_from_zero() {
        let s = scales(Layout::Vertical);
        assert_eq!(bar_rect(&s, "b", (0.0, 5.0)), Rect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(bar_rect(&s, "a", (0.0, -5.0)), Rect::new(0.0, 100.0, 50.0, 150.0));
    }

    #[test]
    fn horizontal_bars_grow_right() {
        let s = scales(Layout::Horizontal);
        assert_eq!(bar_rect(&s, "a", (0.0, 5.0)), Rect::new(50.0, 0.0, 75.0, 100.0));
    }

    #[test]
    fn spans_are_clamped_and_nan_collapses() {
        let s = scales(Layout::Vertical);
        assert_eq!(bar_rect(&s, "a", (0.0, 50.0)).y0, 0.0);
        let nan = bar_rect(&s, "a", (0.0, f64::NAN));
        assert_eq!(nan.height(), 0.0);
        assert_eq!(nan.y0, 100.0);
        assert_eq!(bar_rect(&s, "zz", (0.0, 5.0)).width(), 0.0);
    }

    #[test]
    fn collapse_shifts_outward() {
        let left = collapse_ordinal(Rect::new(0.0, 10.0, 20.0, 50.0), Layout::Vertical, 100.0);
        assert_eq!(left.width(), 0.0);
        assert_eq!(left.x0, 2.0);
        let right = collapse_ordinal(Rect::new(80.0, 10.0, 100.0, 50.0), Layout::Vertical, 100.0);
        assert_eq!(right.x0, 98.0);
        let flat = collapse_value(Rect::new(0.0, 10.0, 20.0, 50.0), Layout::Vertical, 60.0);
        assert_eq!((flat.y0, flat.y1), (60.0, 60.0));
    }

    #[test]
    fn centered_span_is_symmetric() {
        assert_eq!(plain_span(8.0, true), (-4.0, 4.0));
        assert_eq!(plain_span(8.0, false), (0.0, 8.0));
    }
}
