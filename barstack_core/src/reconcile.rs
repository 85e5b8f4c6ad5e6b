// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed enter/update/exit reconciliation.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::key::{Identity, JoinKey};
use crate::log::{debug, warn};

/// Lifecycle state of a reconciled element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementState {
    /// Bound to a row in the latest pass.
    Live,
    /// Unmatched in the latest pass; still queryable until its exit finishes.
    PendingRemoval,
}

/// A datum bound to an element identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Bound<T> {
    /// Stable element identity.
    pub identity: Identity,
    /// Key the datum was matched on.
    pub key: JoinKey,
    /// The bound datum.
    pub datum: T,
}

/// An element with no matching row in the latest pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exiting {
    /// Stable element identity.
    pub identity: Identity,
    /// Key the element was last bound to.
    pub key: JoinKey,
}

/// The enter/update/exit classification of one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSet<T> {
    /// Rows whose key had no prior identity.
    pub entering: Vec<Bound<T>>,
    /// Rows whose key matched a prior identity, including ones revived from pending removal.
    pub updating: Vec<Bound<T>>,
    /// Prior elements with no matching row, ordered by identity.
    pub exiting: Vec<Exiting>,
    /// Draw order: exiting elements first, then bound elements in input order.
    pub order: Vec<Identity>,
    /// Keys that appeared more than once in the input (one entry per dropped row).
    pub duplicates: Vec<JoinKey>,
}

impl<T> RenderSet<T> {
    /// Returns `true` if the pass bound nothing and removed nothing.
    pub fn is_empty(&self) -> bool {
        self.entering.is_empty() && self.updating.is_empty() && self.exiting.is_empty()
    }

    /// Iterates over all bound data (entering and updating) with their identities.
    pub fn bound(&self) -> impl Iterator<Item = &Bound<T>> {
        self.entering.iter().chain(self.updating.iter())
    }
}

#[derive(Clone, Copy, Debug)]
struct Element {
    identity: Identity,
    state: ElementState,
}

/// Matches each pass's rows against the elements of previous passes.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    elements: HashMap<JoinKey, Element>,
    next_id: u64,
}

impl Reconciler {
    /// Creates an empty reconciler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `items` into entering, updating and exiting sets.
    ///
    /// Duplicate keys resolve last-wins: the later datum replaces the earlier one at the earlier
    /// one's position, and the key is reported in [`RenderSet::duplicates`].
    ///
    /// An element that is still pending removal from an interrupted pass is revived into the
    /// update set if its key reappears; otherwise it is reported as exiting again.
    pub fn reconcile<T, I, F>(&mut self, items: I, key_fn: F) -> RenderSet<T>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> JoinKey,
    {
        let mut index: HashMap<JoinKey, usize> = HashMap::new();
        let mut joined: Vec<(JoinKey, T)> = Vec::new();
        let mut duplicates = Vec::new();
        for item in items {
            let key = key_fn(&item);
            if let Some(&at) = index.get(&key) {
                warn!(key = key.as_str(), "duplicate join key; keeping the last row");
                joined[at].1 = item;
                duplicates.push(key);
            } else {
                index.insert(key.clone(), joined.len());
                joined.push((key, item));
            }
        }

        let mut entering = Vec::new();
        let mut updating = Vec::new();
        let mut bound_order = Vec::with_capacity(joined.len());
        for (key, datum) in joined {
            if let Some(element) = self.elements.get_mut(&key) {
                if element.state == ElementState::PendingRemoval {
                    debug!(key = key.as_str(), "reviving element pending removal");
                }
                element.state = ElementState::Live;
                bound_order.push(element.identity);
                updating.push(Bound {
                    identity: element.identity,
                    key,
                    datum,
                });
            } else {
                let identity = Identity::from_raw(self.next_id);
                self.next_id += 1;
                self.elements.insert(
                    key.clone(),
                    Element {
                        identity,
                        state: ElementState::Live,
                    },
                );
                bound_order.push(identity);
                entering.push(Bound {
                    identity,
                    key,
                    datum,
                });
            }
        }

        let mut exiting: Vec<Exiting> = self
            .elements
            .iter_mut()
            .filter(|(key, _)| !index.contains_key(*key))
            .map(|(key, element)| {
                element.state = ElementState::PendingRemoval;
                Exiting {
                    identity: element.identity,
                    key: key.clone(),
                }
            })
            .collect();
        exiting.sort_by_key(|e| e.identity);

        let mut order: Vec<Identity> = exiting.iter().map(|e| e.identity).collect();
        order.extend(bound_order);

        RenderSet {
            entering,
            updating,
            exiting,
            order,
            duplicates,
        }
    }

    /// Destroys elements whose exit has finished.
    ///
    /// Identities that were revived since they started exiting are left alone. Returns the number
    /// of elements destroyed.
    pub fn finish_exit(&mut self, identities: &[Identity]) -> usize {
        let before = self.elements.len();
        self.elements.retain(|_, element| {
            !(element.state == ElementState::PendingRemoval
                && identities.contains(&element.identity))
        });
        before - self.elements.len()
    }

    /// Returns the identity currently bound to `key`.
    pub fn identity(&self, key: &str) -> Option<Identity> {
        self.elements.get(key).map(|e| e.identity)
    }

    /// Returns the lifecycle state of the element bound to `key`.
    pub fn state(&self, key: &str) -> Option<ElementState> {
        self.elements.get(key).map(|e| e.state)
    }

    /// Number of live elements.
    pub fn live_count(&self) -> usize {
        self.count(ElementState::Live)
    }

    /// Number of elements still pending removal.
    pub fn pending_count(&self) -> usize {
        self.count(ElementState::PendingRemoval)
    }

    fn count(&self, state: ElementState) -> usize {
        self.elements.values().filter(|e| e.state == state).count()
    }

    /// Forgets every element. Identities are not reused afterwards.
    pub fn clear(&mut self) {
        self.elements.clear();
    }
}
