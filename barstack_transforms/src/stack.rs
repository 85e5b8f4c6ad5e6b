// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diverging stack layout.
//!
//! Within a group, non-negative values stack upward from the running positive total and negative
//! values stack downward from the running negative total, so sign (not row order) decides which
//! total a row extends.

use alloc::sync::Arc;
use alloc::vec::Vec;

use barstack_core::{Accessors, Row};
use hashbrown::{HashMap, HashSet};

use crate::group::GroupedRows;
use crate::log::debug;

/// Stack baseline offset mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StackOffset {
    /// Stack positive and negative values around 0.
    #[default]
    Zero,
    /// Divide every position by its group's signed sum, so each group spans `[0, 1]`.
    Normalize,
}

/// Series sort order (by group sum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Options for [`stack`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackOptions {
    /// Baseline offset mode.
    pub offset: StackOffset,
    /// Optional sort of the output groups by their signed sum. Input order otherwise.
    pub sort: Option<SortOrder>,
}

impl StackOptions {
    /// Sets the offset mode.
    pub fn with_offset(mut self, offset: StackOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Sorts groups by sum.
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// One row of a group with its stack span.
#[derive(Clone, Debug, PartialEq)]
pub struct StackedRow {
    /// Ordinal key of the row.
    pub ordinal: Arc<str>,
    /// Ordinal key of the preceding row in the same group.
    pub previous: Option<Arc<str>>,
    /// Coerced value (`NaN` when missing or malformed).
    pub value: f64,
    /// Running total before this row.
    pub stack_start: f64,
    /// Running total after this row.
    pub stack_end: f64,
    /// Where an entering row should grow from, when a previous snapshot was supplied and the row
    /// was not part of it.
    pub entering_offset: Option<f64>,
    /// The source row.
    pub row: Row,
}

impl StackedRow {
    /// Returns `false` for rows whose value did not coerce to a finite number.
    ///
    /// Invalid rows contribute nothing to either running total.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// One group's rows plus its running totals.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesGroup {
    /// Group key.
    pub key: Arc<str>,
    /// Rows in input order.
    pub rows: Vec<StackedRow>,
    /// Final positive running total.
    pub positive_sum: f64,
    /// Final negative running total.
    pub negative_sum: f64,
    /// Signed total.
    pub sum: f64,
    /// Positive total only (where a total label sits).
    pub sum_above_zero: f64,
}

impl SeriesGroup {
    /// Divisor applied to positions under `offset`.
    ///
    /// A zero sum divides by 1.
    pub fn normalizer(&self, offset: StackOffset) -> f64 {
        match offset {
            StackOffset::Zero => 1.0,
            StackOffset::Normalize if self.sum == 0.0 || !self.sum.is_finite() => 1.0,
            StackOffset::Normalize => self.sum,
        }
    }

    /// Returns `(stack_start, stack_end)` of `row` in value-scale input space.
    pub fn span(&self, row: &StackedRow, offset: StackOffset) -> (f64, f64) {
        let d = self.normalizer(offset);
        (row.stack_start / d, row.stack_end / d)
    }

    /// Returns the entering offset of `row` in value-scale input space.
    pub fn entering_position(&self, row: &StackedRow, offset: StackOffset) -> Option<f64> {
        row.entering_offset.map(|o| o / self.normalizer(offset))
    }

    /// Looks up a row by ordinal key.
    pub fn row(&self, ordinal: &str) -> Option<&StackedRow> {
        self.rows.iter().find(|r| r.ordinal.as_ref() == ordinal)
    }
}

/// A row's layout as remembered from a previous pass.
#[derive(Clone, Debug, PartialEq)]
pub struct StackEntry {
    /// Ordinal key of the preceding row in the same group.
    pub previous: Option<Arc<str>>,
    /// Coerced value.
    pub value: f64,
    /// Running total before the row.
    pub stack_start: f64,
    /// Running total after the row.
    pub stack_end: f64,
}

/// Per-group, per-ordinal stack state of one pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackSnapshot {
    groups: HashMap<Arc<str>, HashMap<Arc<str>, StackEntry>>,
}

impl StackSnapshot {
    /// Returns the remembered entry for `ordinal` in `group`.
    pub fn get(&self, group: &str, ordinal: &str) -> Option<&StackEntry> {
        self.groups.get(group).and_then(|g| g.get(ordinal))
    }

    /// Returns `true` if `group` was part of the snapshot.
    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Returns `true` if the snapshot holds no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Output of [`stack`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackOutput {
    /// Stacked groups.
    pub series: Vec<SeriesGroup>,
    /// Distinct ordinal keys in first-seen order.
    pub datakeys: Vec<Arc<str>>,
    /// `(min negative total, max positive total)`, seeded at `(0, 0)`. `(0, 1)` when normalized.
    pub extent: (f64, f64),
    /// State to pass as `previous` on the next call.
    pub snapshot: StackSnapshot,
}

fn same_sign(a: f64, b: f64) -> bool {
    (a >= 0.0 && b >= 0.0) || (a < 0.0 && b < 0.0)
}

/// Computes diverging stack spans for every group.
///
/// With `previous`, rows absent from the previous pass get an [`StackedRow::entering_offset`]:
/// the previous outer edge of the nearest preceding sibling (following `previous` links) whose
/// previous value had the entering row's sign, or 0 if there is none. The sibling's current sign
/// is not consulted.
pub fn stack(
    groups: &[GroupedRows],
    accessors: &Accessors,
    options: &StackOptions,
    previous: Option<&StackSnapshot>,
) -> StackOutput {
    let mut series = Vec::with_capacity(groups.len());
    let mut datakeys = Vec::new();
    let mut seen = HashSet::new();
    let mut extent = (0.0_f64, 0.0_f64);
    let mut snapshot = StackSnapshot::default();

    for group in groups {
        let mut positive = 0.0;
        let mut negative = 0.0;
        let mut last: Option<Arc<str>> = None;
        let mut rows = Vec::with_capacity(group.rows.len());
        for row in &group.rows {
            let ordinal = accessors.ordinal_key(row).unwrap_or_else(|| Arc::from(""));
            if seen.insert(ordinal.clone()) {
                datakeys.push(ordinal.clone());
            }
            let value = accessors.value_of(row);
            let (stack_start, stack_end) = if !value.is_finite() {
                debug!(
                    group = group.key.as_ref(),
                    ordinal = ordinal.as_ref(),
                    "non-numeric value left out of the stack"
                );
                (positive, positive)
            } else if value >= 0.0 {
                let start = positive;
                positive += value;
                (start, positive)
            } else {
                let start = negative;
                negative += value;
                (start, negative)
            };
            rows.push(StackedRow {
                previous: last.replace(ordinal.clone()),
                ordinal,
                value,
                stack_start,
                stack_end,
                entering_offset: None,
                row: row.clone(),
            });
        }

        if let Some(previous) = previous {
            let prior = previous.groups.get(group.key.as_ref());
            let offsets = entering_offsets(&rows, prior);
            for (row, offset) in rows.iter_mut().zip(offsets) {
                row.entering_offset = offset;
            }
        }

        extent.0 = extent.0.min(negative);
        extent.1 = extent.1.max(positive);

        let entries = rows
            .iter()
            .map(|r| {
                (
                    r.ordinal.clone(),
                    StackEntry {
                        previous: r.previous.clone(),
                        value: r.value,
                        stack_start: r.stack_start,
                        stack_end: r.stack_end,
                    },
                )
            })
            .collect();
        snapshot.groups.insert(group.key.clone(), entries);

        series.push(SeriesGroup {
            key: group.key.clone(),
            rows,
            positive_sum: positive,
            negative_sum: negative,
            sum: positive + negative,
            sum_above_zero: positive,
        });
    }

    match options.sort {
        Some(SortOrder::Asc) => series.sort_by(|a, b| a.sum.total_cmp(&b.sum)),
        Some(SortOrder::Desc) => series.sort_by(|a, b| b.sum.total_cmp(&a.sum)),
        None => {}
    }

    if options.offset == StackOffset::Normalize {
        extent = (0.0, 1.0);
    }

    StackOutput {
        series,
        datakeys,
        extent,
        snapshot,
    }
}

/// Entering offsets for the rows of one group.
///
/// Rows present in `prior` get `None`. The sibling walk is bounded by the group size, so repeated
/// ordinals (which make the `previous` links cyclic) still terminate.
fn entering_offsets(
    rows: &[StackedRow],
    prior: Option<&HashMap<Arc<str>, StackEntry>>,
) -> Vec<Option<f64>> {
    let Some(prior) = prior else {
        return rows.iter().map(|_| Some(0.0)).collect();
    };
    let position: HashMap<&str, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (r.ordinal.as_ref(), i))
        .collect();

    rows.iter()
        .map(|row| {
            if prior.contains_key(row.ordinal.as_ref()) {
                return None;
            }
            let mut cursor = row.previous.as_deref();
            for _ in 0..rows.len() {
                let Some(key) = cursor else {
                    break;
                };
                let Some(&at) = position.get(key) else {
                    break;
                };
                let sibling = &rows[at];
                if let Some(entry) = prior.get(key) {
                    if same_sign(entry.value, row.value) {
                        return Some(entry.stack_end);
                    }
                }
                cursor = sibling.previous.as_deref();
            }
            Some(0.0)
        })
        .collect()
}
