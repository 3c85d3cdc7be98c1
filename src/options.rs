//! Option entries
//!
//! An [`OptionEntry`] is one element of the backing options collection,
//! materialized through the control's extractors. The entry's index is the
//! identifier the widget uses internally; entries are recomputed whenever
//! the collection's identity or length changes, never diffed in place.

use serde_json::Value;

use crate::binding::compile::Extractors;

/// `(index, raw item, value, label)` materialized from one collection element
#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    /// Position in the collection at materialization time
    pub index: usize,
    /// The collection element itself
    pub raw: Value,
    /// Output of `value_of(raw)`
    pub value: Value,
    /// Output of `label_of(raw)`
    pub label: String,
}

/// Materialize the full entry list for the current options collection.
pub fn materialize(options: &[Value], extractors: &Extractors) -> Vec<OptionEntry> {
    options
        .iter()
        .enumerate()
        .map(|(index, raw)| OptionEntry {
            index,
            raw: raw.clone(),
            value: extractors.value_of(raw),
            label: extractors.label_of(raw),
        })
        .collect()
}

/// First entry whose value deep-equals `value`, if any.
pub fn find_by_value<'a>(entries: &'a [OptionEntry], value: &Value) -> Option<&'a OptionEntry> {
    entries.iter().find(|e| &e.value == value)
}
