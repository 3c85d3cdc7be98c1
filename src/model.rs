//! External model
//!
//! [`SelectModel`] is the host-owned side of the synchronization: the current
//! selection and the backing options collection. The engine never watches it;
//! the host mutates it out-of-band and signals the control, and the engine
//! detects divergence against its last-applied snapshot.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::codec::Selection;

/// Shared single-threaded handle to a control's model
pub type ModelHandle = Rc<RefCell<SelectModel>>;

/// Selection state plus options collection, with an options revision counter
/// for identity-change detection (in-place growth is caught by length).
#[derive(Debug, Clone)]
pub struct SelectModel {
    selection: Selection,
    options: Vec<Value>,
    revision: u64,
}

impl SelectModel {
    pub fn new(multiple: bool) -> Self {
        Self {
            selection: Selection::empty(multiple),
            options: Vec::new(),
            revision: 0,
        }
    }

    pub fn handle(self) -> ModelHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    /// Single-select convenience
    pub fn set_value(&mut self, value: Value) {
        self.selection = Selection::Single(value);
    }

    /// Multi-select convenience
    pub fn set_values(&mut self, values: Vec<Value>) {
        self.selection = Selection::Multi(values);
    }

    pub fn options(&self) -> &[Value] {
        &self.options
    }

    pub fn options_len(&self) -> usize {
        self.options.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// In-place append, as when the user creates a free-standing item or the
    /// host grows the collection
    pub fn push_option(&mut self, option: Value) {
        self.options.push(option);
    }

    /// Swap in a new collection; bumps the revision so the next pass treats
    /// every entry as fresh even if the length happens to match
    pub fn replace_options(&mut self, options: Vec<Value>) {
        self.options = options;
        self.revision += 1;
    }
}
