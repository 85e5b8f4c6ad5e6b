// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bar layout on top of `barstack_core` and `barstack_transforms`.
//!
//! This crate turns rows into positioned bars and labels:
//! - **Scales** map categories to bands and values to positions.
//! - **Geometry** builds bar rectangles, including the collapsed shapes bars enter from and exit to.
//! - **Labels** are placed with a candidate search over an occupancy bitmap, so visible labels
//!   never overlap each other.
//! - **[`BarLayoutEngine`]** runs the whole pass incrementally and coordinates transitions.
//!
//! Drawing is out of scope: the engine reports where things go, never how they look.

#![no_std]

extern crate alloc;

mod bitmap;
mod config;
mod engine;
#[cfg(test)]
mod engine_tests;
mod error;
#[cfg(not(feature = "std"))]
mod float;
mod geometry;
mod label;
mod log;
mod measure;
mod scale;

pub use bitmap::{DEFAULT_PADDING, OccupancyBitmap, StampStyle};
pub use config::{AnimationConfig, EngineConfig, LabelConfig, LabelFormat, Layout, Size};
pub use engine::{BarLayoutEngine, Datum, DatumLayout, GroupSum, LayoutSnapshot, RenderReport};
pub use error::ConfigError;
pub use geometry::{bar_rect, collapse_ordinal, collapse_value, plain_span};
pub use label::{
    Anchor, AnchorEdge, BOTTOM_INSET, BoundsScope, Candidates, CollisionMode, HAlign,
    LabelCandidate, LabelLayer, LabelPlacement, LabelPosition, LabelRequest, LabelUpdate,
    Obstacle, Placed, PlacementOptions, VAlign, default_candidates, hide_only_candidates,
    place_labels,
};
pub use measure::{HeuristicTextMeasurer, TextMeasurer, label_height};
pub use scale::{ScaleBand, ScaleLinear, ScaleManager, ScaleOptions, Scales, natural_extent};
