// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conditional logging macros.
//!
//! With the `tracing` feature these are the `tracing` macros; without it they expand to nothing.
//! The no-op is defined under its own name and re-exported, so `warn` never has to be resolved
//! next to the built-in `#[warn]` attribute.

#[cfg(feature = "tracing")]
#[allow(unused_imports, reason = "not every level is used in every build")]
pub(crate) use tracing::{debug, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_imports, reason = "not every level is used in every build")]
pub(crate) use {discard as debug, discard as warn};
