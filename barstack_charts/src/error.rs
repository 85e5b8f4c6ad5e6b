// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration errors.
//!
//! Data problems (missing values, duplicate keys, labels that do not fit) are never errors; only
//! configuration that cannot produce a layout is rejected.

/// Rejected engine configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Band padding outside `[0, 1)`.
    #[error("band padding must be in [0, 1), got {0}")]
    BandPadding(f64),
    /// Width or height negative or not finite.
    #[error("chart size must be finite and non-negative, got {width}x{height}")]
    Size {
        /// Requested width.
        width: f64,
        /// Requested height.
        height: f64,
    },
    /// A min/max override that is not finite.
    #[error("{which} override must be finite, got {value}")]
    Override {
        /// `"min"` or `"max"`.
        which: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// An accessor with an empty field name.
    #[error("the {0} accessor must name a field")]
    EmptyAccessor(&'static str),
    /// Label font size not finite or not positive.
    #[error("label font size must be finite and positive, got {0}")]
    FontSize(f64),
    /// Animation duration override negative or not finite.
    #[error("animation duration must be finite and non-negative, got {0}")]
    Duration(f64),
}
