// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Band and linear scales, and the policy that builds them from rows.

use alloc::sync::Arc;
use alloc::vec::Vec;

use barstack_core::{Accessors, Row};
use hashbrown::HashMap;

use crate::config::{Layout, Size};
use crate::error::ConfigError;
use crate::log::debug;

/// A linear mapping from a continuous domain to a continuous range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleLinear {
    domain: (f64, f64),
    range: (f64, f64),
}

impl ScaleLinear {
    /// Creates a new scale mapping `domain` values to `range` values.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Maps a value from domain space into range space.
    ///
    /// A degenerate domain, or a non-finite input, maps to the range start.
    pub fn map(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let denom = d1 - d0;
        if denom == 0.0 || !x.is_finite() {
            return r0;
        }
        let t = (x - d0) / denom;
        r0 + t * (r1 - r0)
    }

    /// Returns the domain as authored.
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Returns the range.
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Clamps `x` into the domain.
    pub fn clamp(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        x.clamp(d0.min(d1), d0.max(d1))
    }

    /// The value bars grow from: 0 clamped into the domain.
    pub fn baseline(&self) -> f64 {
        self.clamp(0.0)
    }
}

/// A discrete band scale keyed by category.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleBand {
    keys: Vec<Arc<str>>,
    index: HashMap<Arc<str>, usize>,
    range: (f64, f64),
    padding_inner: f64,
    padding_outer: f64,
    align: f64,
}

impl ScaleBand {
    /// Creates a band scale over `range` with one band per distinct key, in first-seen order.
    pub fn new(keys: impl IntoIterator<Item = Arc<str>>, range: (f64, f64)) -> Self {
        let mut index = HashMap::new();
        let mut ordered = Vec::new();
        for key in keys {
            if !index.contains_key(&key) {
                index.insert(key.clone(), ordered.len());
                ordered.push(key);
            }
        }
        Self {
            keys: ordered,
            index,
            range,
            padding_inner: 0.0,
            padding_outer: 0.0,
            align: 0.5,
        }
    }

    /// Sets inner and outer padding to the same ratio.
    pub fn with_padding(self, padding: f64) -> Self {
        self.with_padding_inner_outer(padding, padding)
    }

    /// Sets inner padding (in `[0, 1]`) and outer padding (non-negative), as step ratios.
    pub fn with_padding_inner_outer(mut self, inner: f64, outer: f64) -> Self {
        self.padding_inner = inner.clamp(0.0, 1.0);
        self.padding_outer = outer.max(0.0);
        self
    }

    fn span(&self) -> (f64, f64) {
        let (r0, r1) = self.range;
        if r1 < r0 { (r1, r0) } else { (r0, r1) }
    }

    /// Distance between the starts of adjacent bands.
    pub fn step(&self) -> f64 {
        let (lo, hi) = self.span();
        let n = self.keys.len() as f64;
        (hi - lo) / (n - self.padding_inner + 2.0 * self.padding_outer).max(1.0)
    }

    /// Returns the computed band width.
    pub fn band_width(&self) -> f64 {
        self.step() * (1.0 - self.padding_inner)
    }

    /// Returns the start of the band at `index`.
    pub fn position(&self, index: usize) -> f64 {
        let (lo, hi) = self.span();
        let n = self.keys.len() as f64;
        let step = self.step();
        let start = lo + (hi - lo - step * (n - self.padding_inner)) * self.align;
        let slot = if self.range.1 < self.range.0 {
            self.keys.len().saturating_sub(index + 1)
        } else {
            index
        };
        start + step * slot as f64
    }

    /// Returns the start of the band for `key`, or `None` if the key is not in the domain.
    pub fn map(&self, key: &str) -> Option<f64> {
        self.index.get(key).map(|&i| self.position(i))
    }

    /// Returns the domain index of `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Returns the domain keys in order.
    pub fn keys(&self) -> &[Arc<str>] {
        &self.keys
    }

    /// Returns the number of bands.
    pub fn count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the range.
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Absolute length of the range.
    pub fn extent(&self) -> f64 {
        let (lo, hi) = self.span();
        hi - lo
    }
}

/// Domain policy for [`ScaleManager`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleOptions {
    /// Band padding ratio in `[0, 1)`, applied inside and outside.
    pub band_padding: f64,
    /// Lower bound that only applies if it extends the natural domain.
    pub min_override: Option<f64>,
    /// Upper bound that only applies if it extends the natural domain.
    pub max_override: Option<f64>,
    /// Center the domain around 0 when the active layout matches and all values are non-negative.
    pub center_baseline: Option<Layout>,
    /// Extend the natural domain to include 0.
    pub include_zero: bool,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            band_padding: 0.2,
            min_override: None,
            max_override: None,
            center_baseline: None,
            include_zero: false,
        }
    }
}

impl ScaleOptions {
    /// Sets the band padding ratio.
    pub fn with_band_padding(mut self, padding: f64) -> Self {
        self.band_padding = padding;
        self
    }

    /// Sets the minimum override.
    pub fn with_min_override(mut self, min: f64) -> Self {
        self.min_override = Some(min);
        self
    }

    /// Sets the maximum override.
    pub fn with_max_override(mut self, max: f64) -> Self {
        self.max_override = Some(max);
        self
    }

    /// Enables baseline centering for `layout`.
    pub fn with_center_baseline(mut self, layout: Layout) -> Self {
        self.center_baseline = Some(layout);
        self
    }

    /// Extends the domain to include 0.
    pub fn with_include_zero(mut self, include_zero: bool) -> Self {
        self.include_zero = include_zero;
        self
    }

    /// Checks padding and overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.band_padding;
        if !(0.0..1.0).contains(&p) {
            return Err(ConfigError::BandPadding(p));
        }
        for (which, value) in [("min", self.min_override), ("max", self.max_override)] {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(ConfigError::Override { which, value });
                }
            }
        }
        Ok(())
    }
}

/// The band and value scales of one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Scales {
    /// Orientation the scales were built for.
    pub layout: Layout,
    /// Category scale.
    pub band: ScaleBand,
    /// Value scale.
    pub value: ScaleLinear,
}

/// Builds [`Scales`] for one orientation and domain policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleManager {
    layout: Layout,
    options: ScaleOptions,
}

impl ScaleManager {
    /// Creates a manager.
    pub fn new(layout: Layout, options: ScaleOptions) -> Self {
        Self { layout, options }
    }

    /// `(band range, value range)` for a plot size.
    ///
    /// Vertical bands run along x and values along y (inverted so larger values sit higher);
    /// horizontal bands run along y and values along x.
    pub fn ranges(&self, size: Size) -> ((f64, f64), (f64, f64)) {
        match self.layout {
            Layout::Vertical => ((0.0, size.width), (size.height, 0.0)),
            Layout::Horizontal => ((0.0, size.height), (0.0, size.width)),
        }
    }

    /// Builds scales from rows: bands from ordinal keys in row order, values from the value
    /// field's natural extent.
    pub fn build(&self, rows: &[Row], accessors: &Accessors, size: Size) -> Scales {
        let keys = rows.iter().filter_map(|r| accessors.ordinal_key(r));
        let domain = self.value_domain(natural_extent(rows.iter().map(|r| accessors.value_of(r))));
        self.assemble(keys, domain, size)
    }

    /// Builds scales from precomputed band keys and a value extent (the stacked case).
    pub fn build_from_extent(
        &self,
        keys: impl IntoIterator<Item = Arc<str>>,
        extent: Option<(f64, f64)>,
        size: Size,
    ) -> Scales {
        self.assemble(keys, self.value_domain(extent), size)
    }

    fn assemble(
        &self,
        keys: impl IntoIterator<Item = Arc<str>>,
        domain: (f64, f64),
        size: Size,
    ) -> Scales {
        let (band_range, value_range) = self.ranges(size);
        Scales {
            layout: self.layout,
            band: ScaleBand::new(keys, band_range).with_padding(self.options.band_padding),
            value: ScaleLinear::new(domain, value_range),
        }
    }

    /// Applies the domain policy to a natural extent (`None` when there were no finite values).
    pub fn value_domain(&self, natural: Option<(f64, f64)>) -> (f64, f64) {
        let (mut lo, mut hi) = natural.unwrap_or((0.0, 0.0));
        if self.options.include_zero {
            lo = lo.min(0.0);
            hi = hi.max(0.0);
        }
        if let Some(min) = self.options.min_override.filter(|v| v.is_finite()) {
            if min < lo {
                lo = min;
            } else {
                debug!(min, natural = lo, "min override would shrink the domain; ignored");
            }
        }
        if let Some(max) = self.options.max_override.filter(|v| v.is_finite()) {
            if max > hi {
                hi = max;
            } else {
                debug!(max, natural = hi, "max override would shrink the domain; ignored");
            }
        }
        if self.options.center_baseline == Some(self.layout) {
            match natural {
                Some((min, _)) if min >= 0.0 => return (-hi / 2.0, hi / 2.0),
                Some(_) => {
                    debug!("baseline centering skipped: negative values present");
                }
                None => {}
            }
        }
        (lo, hi)
    }

    /// Returns the active layout.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the domain policy.
    pub fn options(&self) -> &ScaleOptions {
        &self.options
    }
}

/// `(min, max)` of the finite values, or `None` if there are none.
pub fn natural_extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        if !v.is_finite() {
            continue;
        }
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}
