// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text measurement hooks for label placement.
//!
//! Shaping is out of scope, so placement asks a measurer for rough label bounds. Callers can plug
//! in a real text measurement backend, or use [`HeuristicTextMeasurer`].

use crate::config::Size;

/// A minimal text measurement interface used by label placement.
pub trait TextMeasurer {
    /// Returns the label's extent in chart coordinate units.
    fn measure(&self, text: &str, font_size: f64) -> Size;
}

/// Height of a single-line label: one unit under the font size, never below 1.
pub fn label_height(font_size: f64) -> f64 {
    (font_size - 1.0).max(1.0)
}

/// Headroom applied to text before a fit test.
pub const FIT_PADDING: f64 = 1.1;

/// Returns `true` if a label fits in a `width` by `height` room.
///
/// The padded measured width is compared to `width`; the padded font size (not the measured
/// height) is compared to `height`. A `None` side is not tested.
pub fn text_fits(text: Size, font_size: f64, width: Option<f64>, height: Option<f64>) -> bool {
    width.is_none_or(|w| text.width * FIT_PADDING <= w)
        && height.is_none_or(|h| font_size * FIT_PADDING <= h)
}

/// A tiny heuristic text measurer.
///
/// It assumes an average glyph width of ~0.6em and a height of [`label_height`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> Size {
        let width = 0.6 * font_size * text.chars().count() as f64;
        Size::new(width, label_height(font_size))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn heuristic_scales_with_length() {
        let m = HeuristicTextMeasurer;
        let short = m.measure("12", 10.0);
        let long = m.measure("1234", 10.0);
        assert_eq!(short.width * 2.0, long.width);
        assert_eq!(short.height, 9.0);
        assert_eq!(label_height(0.5), 1.0);
    }

    #[test]
    fn fit_test_pads_width_and_font_size() {
        let text = Size::new(20.0, 11.0);
        assert!(text_fits(text, 10.0, Some(22.5), Some(11.5)));
        assert!(!text_fits(text, 10.0, Some(21.9), None));
        assert!(!text_fits(text, 10.0, None, Some(10.9)));
        assert!(text_fits(text, 10.0, None, None));
    }
}
