//! Selection codec
//!
//! Converts between the model's representation of "selected value(s)" (a
//! scalar or an array of raw values) and the widget's representation (an
//! ordered list of item keys). Scalars normalize to a one-element sequence
//! internally and denormalize on the way out.

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

use crate::options::{find_by_value, OptionEntry};

/// The external model's current selected value(s).
///
/// Single-select mode never holds an array; its canonical empty value is
/// `Value::Null`. Multi-select is ordered and duplicate-free.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Single(Value),
    Multi(Vec<Value>),
}

impl Selection {
    pub fn empty(multiple: bool) -> Self {
        if multiple {
            Selection::Multi(Vec::new())
        } else {
            Selection::Single(Value::Null)
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Selection::Multi(_))
    }

    /// Uniform view: zero or one value for single mode, all values for multi.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Selection::Single(Value::Null) => Vec::new(),
            Selection::Single(v) => vec![v],
            Selection::Multi(vs) => vs.iter().collect(),
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values().iter().any(|v| *v == value)
    }

    /// Merge an added value: single mode replaces, multi mode appends unless
    /// already present.
    pub fn add(&mut self, value: Value) {
        match self {
            Selection::Single(current) => *current = value,
            Selection::Multi(vs) => {
                if !vs.contains(&value) {
                    vs.push(value);
                }
            }
        }
    }

    /// Remove a value: single mode resets to `Null` when it matches, multi
    /// mode deletes the first equal occurrence.
    pub fn remove(&mut self, value: &Value) {
        match self {
            Selection::Single(current) => {
                if current == value {
                    *current = Value::Null;
                }
            }
            Selection::Multi(vs) => {
                if let Some(pos) = vs.iter().position(|v| v == value) {
                    vs.remove(pos);
                }
            }
        }
    }
}

/// Widget-side item identifier: an index into the current entry list, or the
/// raw text of a free-standing created item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Index(usize),
    Text(String),
}

/// Created values not (yet) present in the entry list, keyed by their text
pub type CreatedLookup = HashMap<String, Value>;

/// Resolve each selected value to a widget item key, in selection order.
///
/// Entries resolve to index keys; free-standing created values keep their
/// text as the key, since under a non-identity value expression the raw text
/// appended to the collection never materializes to a matching entry value.
/// Values resolving to neither are hidden from the widget but never removed
/// from the selection itself; the caller keeps the model as-is.
pub fn to_widget_keys(
    selection: &Selection,
    entries: &[OptionEntry],
    created: &CreatedLookup,
) -> Vec<ItemKey> {
    let mut keys = Vec::new();
    for value in selection.values() {
        match find_by_value(entries, value) {
            Some(entry) => keys.push(ItemKey::Index(entry.index)),
            None => match value {
                Value::String(text) if created.contains_key(text) => {
                    keys.push(ItemKey::Text(text.clone()));
                }
                _ => trace!(?value, "selection value has no matching option entry"),
            },
        }
    }
    keys
}

/// Resolve widget item keys back to a selection, in widget display order.
///
/// Index keys go through the entry list; text keys resolve to a created value
/// from `created`, to an entry whose value equals the text, or stand as the
/// raw string itself. Duplicates collapse to the first occurrence.
pub fn from_widget_keys(
    keys: &[ItemKey],
    entries: &[OptionEntry],
    created: &CreatedLookup,
    multiple: bool,
) -> Selection {
    let mut values: Vec<Value> = Vec::new();
    for key in keys {
        let value = match key {
            ItemKey::Index(i) => match entries.get(*i) {
                Some(entry) => entry.value.clone(),
                None => {
                    trace!(index = *i, "widget reported an out-of-range item key");
                    continue;
                }
            },
            ItemKey::Text(text) => match created.get(text) {
                Some(v) => v.clone(),
                None => {
                    let as_value = Value::String(text.clone());
                    match find_by_value(entries, &as_value) {
                        Some(entry) => entry.value.clone(),
                        None => as_value,
                    }
                }
            },
        };
        if !values.contains(&value) {
            values.push(value);
        }
    }

    if multiple {
        Selection::Multi(values)
    } else {
        Selection::Single(values.into_iter().next().unwrap_or(Value::Null))
    }
}
