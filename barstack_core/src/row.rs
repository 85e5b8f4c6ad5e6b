// Copyright 2025 the Barstack Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Caller-owned records and the accessors that read them.

use alloc::format;
use alloc::sync::Arc;

use smallvec::SmallVec;

use crate::key::JoinKey;

/// A single field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A numeric value.
    Number(f64),
    /// A text value. Text is coerced to a number by parsing when read as a value.
    Text(Arc<str>),
    /// An absent value.
    Missing,
}

impl Value {
    /// Numeric coercion.
    ///
    /// Text is trimmed and parsed as a finite number; anything else (including `"inf"`, and
    /// [`Value::Missing`]) becomes `NaN`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Number(v) => *v,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .unwrap_or(f64::NAN),
            Self::Missing => f64::NAN,
        }
    }

    /// Category coercion.
    ///
    /// Numbers use their shortest display form (`3.0` becomes `"3"`).
    pub fn as_key(&self) -> Option<Arc<str>> {
        match self {
            Self::Number(v) => Some(Arc::from(format!("{v}"))),
            Self::Text(s) => Some(s.clone()),
            Self::Missing => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(Arc::from(value))
    }
}

impl From<Arc<str>> for Value {
    fn from(value: Arc<str>) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// An immutable input record: an ordered list of named fields.
///
/// The engine never mutates rows; it derives working copies from them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    fields: SmallVec<[(Arc<str>, Value); 4]>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any existing field with the same name.
    pub fn with(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
        self
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Reads a field as a number (`NaN` when missing or malformed).
    pub fn number(&self, name: &str) -> f64 {
        self.get(name).map_or(f64::NAN, Value::as_f64)
    }

    /// Reads a field as a category key.
    pub fn key(&self, name: &str) -> Option<Arc<str>> {
        self.get(name).and_then(Value::as_key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Field names that pick the category, value and optional group out of a [`Row`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accessors {
    /// Field used as the banded (categorical) axis key.
    pub ordinal: Arc<str>,
    /// Field used as the numeric axis value.
    pub value: Arc<str>,
    /// Optional field that splits rows into stacked groups.
    pub group: Option<Arc<str>>,
}

impl Accessors {
    /// Creates accessors for an ungrouped layout.
    pub fn new(ordinal: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        Self {
            ordinal: ordinal.into(),
            value: value.into(),
            group: None,
        }
    }

    /// Sets the group field.
    pub fn with_group(mut self, group: impl Into<Arc<str>>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Reads the ordinal key of a row.
    pub fn ordinal_key(&self, row: &Row) -> Option<Arc<str>> {
        row.key(&self.ordinal)
    }

    /// Reads the numeric value of a row.
    pub fn value_of(&self, row: &Row) -> f64 {
        row.number(&self.value)
    }

    /// Reads the group key of a row (`None` when ungrouped or missing).
    pub fn group_key(&self, row: &Row) -> Option<Arc<str>> {
        self.group.as_deref().and_then(|g| row.key(g))
    }

    /// Derives the join key of a row: the ordinal, plus the group when grouped.
    ///
    /// Missing parts join as empty strings.
    pub fn join_key(&self, row: &Row) -> JoinKey {
        let ordinal = self.ordinal_key(row).unwrap_or_else(|| Arc::from(""));
        match &self.group {
            Some(_) => {
                let group = self.group_key(row).unwrap_or_else(|| Arc::from(""));
                JoinKey::from_parts([ordinal.as_ref(), group.as_ref()])
            }
            None => JoinKey::new(ordinal),
        }
    }
}
