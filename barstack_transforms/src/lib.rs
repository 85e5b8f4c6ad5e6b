// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Row transforms for stacked bar layouts.
//!
//! This crate provides:
//! - grouping: nest rows under their group key, keeping first-appearance order, and
//! - a diverging stack: per-group positive and negative running sums, with an optional snapshot
//!   of the previous pass used to give entering rows a sensible starting offset.

#![no_std]

extern crate alloc;

mod group;
mod log;
mod stack;

pub use group::{GroupedRows, group_rows};
pub use stack::{
    SeriesGroup, SortOrder, StackEntry, StackOffset, StackOptions, StackOutput, StackSnapshot,
    StackedRow, stack,
};
