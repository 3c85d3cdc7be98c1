//! In-memory widget
//!
//! Stands in for a real rich-selection widget in tests and in embedders that
//! drive the engine without a UI. Clones share one underlying state, so a
//! test can keep a handle while the adapter owns the widget, and user actions
//! can be simulated from outside.

use std::cell::RefCell;
use std::rc::Rc;

use crate::codec::ItemKey;
use crate::error::SyncError;
use crate::options::OptionEntry;

use super::{EventSink, SelectWidget, WidgetConfig, WidgetEvent};

#[derive(Debug, Default)]
struct MockState {
    attached: bool,
    attach_count: usize,
    fail_attach: bool,
    config: WidgetConfig,
    options: Vec<OptionEntry>,
    items: Vec<ItemKey>,
    enabled: bool,
    replace_calls: usize,
    select_calls: usize,
}

#[derive(Clone, Default)]
pub struct MockWidget {
    state: Rc<RefCell<MockState>>,
    events: Rc<RefCell<Option<EventSink>>>,
}

impl MockWidget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `attach` fail, simulating a missing host node.
    pub fn fail_next_attach(&self) {
        self.state.borrow_mut().fail_attach = true;
    }

    // ─────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────

    pub fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    pub fn attach_count(&self) -> usize {
        self.state.borrow().attach_count
    }

    pub fn config(&self) -> WidgetConfig {
        self.state.borrow().config.clone()
    }

    pub fn option_count(&self) -> usize {
        self.state.borrow().options.len()
    }

    pub fn option_labels(&self) -> Vec<String> {
        self.state
            .borrow()
            .options
            .iter()
            .map(|e| e.label.clone())
            .collect()
    }

    pub fn items(&self) -> Vec<ItemKey> {
        self.state.borrow().items.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    pub fn replace_calls(&self) -> usize {
        self.state.borrow().replace_calls
    }

    pub fn select_calls(&self) -> usize {
        self.state.borrow().select_calls
    }

    // ─────────────────────────────────────────────────────────────
    // Simulated user actions
    // ─────────────────────────────────────────────────────────────

    /// The user picks an item from the dropdown (or the widget reports a
    /// created item by its text).
    pub fn user_add(&self, key: ItemKey) {
        {
            let mut state = self.state.borrow_mut();
            if !state.items.contains(&key) {
                state.items.push(key.clone());
            }
        }
        self.emit(WidgetEvent::ItemAdded(key));
    }

    /// The user removes a selected item.
    pub fn user_remove(&self, key: ItemKey) {
        {
            let mut state = self.state.borrow_mut();
            state.items.retain(|k| k != &key);
        }
        self.emit(WidgetEvent::ItemRemoved(key));
    }

    /// The user types free text and confirms it (create mode).
    pub fn user_create(&self, text: &str) {
        self.user_add(ItemKey::Text(text.to_string()));
    }

    fn emit(&self, event: WidgetEvent) {
        let sink = self.events.borrow().clone();
        if let Some(sink) = sink {
            sink.push(event);
        }
    }
}

impl SelectWidget for MockWidget {
    fn attach(&mut self, config: &WidgetConfig, events: EventSink) -> Result<(), SyncError> {
        let mut state = self.state.borrow_mut();
        if state.fail_attach {
            state.fail_attach = false;
            return Err(SyncError::AdapterInit {
                details: "mock widget instructed to fail".to_string(),
            });
        }
        state.attached = true;
        state.attach_count += 1;
        state.enabled = true;
        state.config = config.clone();
        drop(state);
        *self.events.borrow_mut() = Some(events);
        Ok(())
    }

    fn detach(&mut self) {
        let mut state = self.state.borrow_mut();
        state.attached = false;
        state.items.clear();
        state.options.clear();
        drop(state);
        *self.events.borrow_mut() = None;
    }

    fn replace_options(&mut self, entries: &[OptionEntry]) {
        let mut state = self.state.borrow_mut();
        state.options = entries.to_vec();
        state.replace_calls += 1;
    }

    fn set_selection(&mut self, keys: &[ItemKey]) {
        let mut state = self.state.borrow_mut();
        state.items = keys.to_vec();
        state.select_calls += 1;
    }

    fn selection(&self) -> Vec<ItemKey> {
        self.state.borrow().items.clone()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.state.borrow_mut().enabled = enabled;
    }
}
