// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Join keys and element identities.

use alloc::string::String;
use alloc::sync::Arc;
use core::borrow::Borrow;
use core::fmt;

/// A key derived from one or more row fields, used to match rows across passes.
///
/// Keys are expected to be unique within one pass; see [`crate::Reconciler::reconcile`] for
/// what happens when they are not.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKey(Arc<str>);

impl JoinKey {
    /// Creates a key from a single part.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Creates a key by joining several parts with `-`.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                joined.push('-');
            }
            joined.push_str(part.as_ref());
        }
        Self(Arc::from(joined))
    }

    /// Returns the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for JoinKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JoinKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque, stable element identity.
///
/// Identities are allocated by [`crate::Reconciler`] and never reused by the same reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(u64);

impl Identity {
    /// Wraps a raw identity value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identity value.
    pub const fn get(self) -> u64 {
        self.0
    }
}
