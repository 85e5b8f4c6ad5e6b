// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity and timing foundations for bar layouts.
//!
//! This crate owns the parts of a render pass that are independent of geometry:
//! - **Rows** and **accessors**: caller-owned records and the field names that pick the
//!   category, value and optional group out of them.
//! - **Reconciliation**: keyed enter/update/exit classification with identities that stay
//!   stable across passes (including while an element is still animating out).
//! - **Transitions**: a frame-driven coordinator that interpolates enter/update/exit targets and
//!   fires a single settled callback per pass.
//! - **Dirty bits**: an ordered recompute table for incremental passes.
//!
//! Time is always supplied by the caller (milliseconds); nothing here reads a clock.

#![no_std]

extern crate alloc;

mod dirty;
#[cfg(not(feature = "std"))]
mod float;
mod key;
mod log;
mod reconcile;
mod row;
mod transition;

pub use dirty::{Dirty, Step, run_steps};
pub use key::{Identity, JoinKey};
pub use reconcile::{Bound, ElementState, Exiting, Reconciler, RenderSet};
pub use row::{Accessors, Row, Value};
pub use transition::{
    AttributeTargets, Easing, FrameStatus, PassId, Phase, SettleHooks, Settled, Timing,
    TransitionCoordinator, Visual,
};
