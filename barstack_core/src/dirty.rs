// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named dirty bits and an ordered recompute table.
//!
//! Setters only mark bits. A render pass walks the table once, in order: a step runs when any of
//! its trigger bits is pending, and marks its downstream bits so later steps see them.

use alloc::vec::Vec;
use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// A set of dirty bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dirty(u32);

impl Dirty {
    /// No bits.
    pub const NONE: Self = Self(0);
    /// Every bit.
    pub const ALL: Self = Self(u32::MAX);

    /// A set containing only bit `n` (`n < 32`).
    pub const fn bit(n: u32) -> Self {
        Self(1 << n)
    }

    /// Union of two sets, usable in constants.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if the sets share a bit.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Adds the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for Dirty {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Dirty {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One recompute step.
pub struct Step<C> {
    /// Name reported by [`run_steps`].
    pub name: &'static str,
    /// Bits that cause this step to run.
    pub triggers: Dirty,
    /// Bits marked for later steps once this step has run.
    pub marks: Dirty,
    /// The recompute function. It must be idempotent.
    pub run: fn(&mut C),
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("triggers", &self.triggers)
            .field("marks", &self.marks)
            .finish_non_exhaustive()
    }
}

/// Runs every step whose triggers intersect the pending bits, in table order.
///
/// Returns the names of the steps that ran.
pub fn run_steps<C>(ctx: &mut C, steps: &[Step<C>], dirty: Dirty) -> Vec<&'static str> {
    let mut pending = dirty;
    let mut ran = Vec::new();
    for step in steps {
        if pending.intersects(step.triggers) {
            (step.run)(ctx);
            pending |= step.marks;
            ran.push(step.name);
        }
    }
    ran
}
