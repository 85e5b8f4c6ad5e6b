// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nesting rows by group key.

use alloc::sync::Arc;
use alloc::vec::Vec;

use barstack_core::{Accessors, Row};
use hashbrown::HashMap;

/// Rows sharing one group key, in input order.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupedRows {
    /// Group key (`""` for rows without one).
    pub key: Arc<str>,
    /// Member rows.
    pub rows: Vec<Row>,
}

/// Nests rows by their group key.
///
/// Groups appear in the order their key is first seen. Without a group accessor every row lands
/// in a single `""` group.
pub fn group_rows(rows: &[Row], accessors: &Accessors) -> Vec<GroupedRows> {
    let mut index: HashMap<Arc<str>, usize> = HashMap::new();
    let mut groups: Vec<GroupedRows> = Vec::new();
    for row in rows {
        let key = accessors.group_key(row).unwrap_or_else(|| Arc::from(""));
        let at = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupedRows {
                key,
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[at].rows.push(row.clone());
    }
    groups
}
