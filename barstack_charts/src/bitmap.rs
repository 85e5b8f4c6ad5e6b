// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bit-packed occupancy grid used for label collision tests.
//!
//! The grid covers the plot box plus `padding` on every side. Large plots are downsampled so the
//! grid stays around a million cells: one cell spans `ratio = max(1, sqrt(w * h / 1e6))` units.
//! Rectangles are converted to inclusive cell ranges by truncating `(x + padding) / ratio`.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Rect;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

/// Padding (in chart units) added around the plot box.
pub const DEFAULT_PADDING: f64 = 1.0;

const CELLS_PER_WORD: usize = 32;

/// How an obstacle is written into the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StampStyle {
    /// Only the rectangle's edges are occupied, so labels may sit inside it.
    #[default]
    Outline,
    /// Every cell of the rectangle is occupied.
    Filled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cells {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

/// A bit-packed occupancy grid over a plot box.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyBitmap {
    words: Vec<u32>,
    width: usize,
    height: usize,
    ratio: f64,
    padding: f64,
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "inputs are finite, non-negative and bounded by the plot size"
)]
fn to_cells(v: f64) -> usize {
    v.trunc() as usize
}

/// Bits `bit..32` of a word.
fn from_bit(bit: usize) -> u32 {
    u32::MAX << bit
}

/// Bits `0..=bit` of a word.
fn through_bit(bit: usize) -> u32 {
    if bit >= 31 {
        u32::MAX
    } else {
        (1_u32 << (bit + 1)) - 1
    }
}

impl OccupancyBitmap {
    /// Creates an empty grid for a `width` x `height` plot with [`DEFAULT_PADDING`].
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_padding(width, height, DEFAULT_PADDING)
    }

    /// Creates an empty grid with explicit padding.
    pub fn with_padding(width: f64, height: f64, padding: f64) -> Self {
        let w = non_negative(width);
        let h = non_negative(height);
        let padding = non_negative(padding);
        let ratio = (w * h / 1e6).sqrt().max(1.0);
        let cols = to_cells((w + 2.0 * padding + ratio) / ratio);
        let rows = to_cells((h + 2.0 * padding + ratio) / ratio);
        Self {
            words: vec![0; (cols * rows + CELLS_PER_WORD) / CELLS_PER_WORD],
            width: cols,
            height: rows,
            ratio,
            padding,
        }
    }

    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Chart units per cell.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Padding in chart units.
    pub fn padding(&self) -> f64 {
        self.padding
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "truncation towards zero is the cell mapping"
    )]
    fn scale(&self, v: f64) -> i64 {
        ((v + self.padding) / self.ratio) as i64
    }

    fn raw_cells(&self, rect: Rect) -> (i64, i64, i64, i64) {
        let r = rect.abs();
        (
            self.scale(r.x0),
            self.scale(r.y0),
            self.scale(r.x1),
            self.scale(r.y1),
        )
    }

    fn limits(&self) -> (i64, i64) {
        (
            i64::try_from(self.width).unwrap_or(i64::MAX),
            i64::try_from(self.height).unwrap_or(i64::MAX),
        )
    }

    /// Returns `true` if any part of `rect` falls outside the grid.
    pub fn out_of_bounds(&self, rect: Rect) -> bool {
        if !rect_is_finite(rect) {
            return true;
        }
        let (x0, y0, x1, y1) = self.raw_cells(rect);
        let (w, h) = self.limits();
        x0 < 0 || y0 < 0 || x1 >= w || y1 >= h
    }

    /// Returns `true` if any part of `rect` falls inside the grid.
    pub fn overlaps_bounds(&self, rect: Rect) -> bool {
        self.clip(rect).is_some()
    }

    fn clip(&self, rect: Rect) -> Option<Cells> {
        if !rect_is_finite(rect) || self.width == 0 || self.height == 0 {
            return None;
        }
        let (x0, y0, x1, y1) = self.raw_cells(rect);
        let (w, h) = self.limits();
        if x1 < 0 || y1 < 0 || x0 >= w || y0 >= h {
            return None;
        }
        let clamp = |v: i64, limit: i64| usize::try_from(v.clamp(0, limit - 1)).unwrap_or(0);
        Some(Cells {
            x0: clamp(x0, w),
            y0: clamp(y0, h),
            x1: clamp(x1, w),
            y1: clamp(y1, h),
        })
    }

    /// Returns `true` if any occupied cell lies under `rect`.
    pub fn collides(&self, rect: Rect) -> bool {
        self.clip(rect).is_some_and(|c| self.any_in(c))
    }

    /// Marks `rect` as occupied.
    pub fn stamp(&mut self, rect: Rect, style: StampStyle) {
        let Some(c) = self.clip(rect) else {
            return;
        };
        match style {
            StampStyle::Filled => self.write(c, true),
            StampStyle::Outline => {
                self.write(Cells { y1: c.y0, ..c }, true);
                self.write(Cells { y0: c.y1, ..c }, true);
                self.write(Cells { x1: c.x0, ..c }, true);
                self.write(Cells { x0: c.x1, ..c }, true);
            }
        }
    }

    /// Clears every cell under `rect`.
    pub fn unstamp(&mut self, rect: Rect) {
        if let Some(c) = self.clip(rect) {
            self.write(c, false);
        }
    }

    /// Returns `true` if the cell at `(x, y)` is occupied. Out-of-range cells read as free.
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        self.words[index / CELLS_PER_WORD] & (1 << (index % CELLS_PER_WORD)) != 0
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clears the whole grid.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    fn any_in(&self, c: Cells) -> bool {
        for y in c.y0..=c.y1 {
            let start = y * self.width + c.x0;
            let end = y * self.width + c.x1;
            let (first, last) = (start / CELLS_PER_WORD, end / CELLS_PER_WORD);
            let head = from_bit(start % CELLS_PER_WORD);
            let tail = through_bit(end % CELLS_PER_WORD);
            if first == last {
                if self.words[first] & head & tail != 0 {
                    return true;
                }
                continue;
            }
            if self.words[first] & head != 0 || self.words[last] & tail != 0 {
                return true;
            }
            if self.words[first + 1..last].iter().any(|&w| w != 0) {
                return true;
            }
        }
        false
    }

    fn write(&mut self, c: Cells, set: bool) {
        for y in c.y0..=c.y1 {
            let start = y * self.width + c.x0;
            let end = y * self.width + c.x1;
            let (first, last) = (start / CELLS_PER_WORD, end / CELLS_PER_WORD);
            let head = from_bit(start % CELLS_PER_WORD);
            let tail = through_bit(end % CELLS_PER_WORD);
            if first == last {
                self.apply(first, head & tail, set);
                continue;
            }
            self.apply(first, head, set);
            self.apply(last, tail, set);
            for i in first + 1..last {
                self.apply(i, u32::MAX, set);
            }
        }
    }

    fn apply(&mut self, word: usize, mask: u32, set: bool) {
        if set {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }
}

fn rect_is_finite(r: Rect) -> bool {
    r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()
}
