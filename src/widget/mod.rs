//! Widget boundary
//!
//! The external rich-selection widget is an imperative collaborator behind
//! the [`SelectWidget`] trait; [`WidgetAdapter`] owns exactly one widget per
//! control and enforces its lifecycle. User actions cross back over the
//! boundary as discrete [`WidgetEvent`]s through a shared [`EventSink`],
//! never as callbacks holding mutable state.

pub mod mock;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::codec::ItemKey;
use crate::error::SyncError;
use crate::options::OptionEntry;

/// A user-driven selection change reported by the widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// An item was selected, or created as free text
    ItemAdded(ItemKey),
    /// An item was unselected
    ItemRemoved(ItemKey),
}

/// Shared queue through which the widget reports user actions.
///
/// Events are recorded immediately but only consumed when the engine drains
/// the queue, so anything the engine's own writes provoke stays parked until
/// the current pass finishes.
#[derive(Clone, Default)]
pub struct EventSink {
    queue: Rc<RefCell<VecDeque<WidgetEvent>>>,
    notify: Rc<RefCell<Option<Rc<dyn Fn()>>>>,
}

impl EventSink {
    pub fn push(&self, event: WidgetEvent) {
        trace!(?event, "widget event recorded");
        self.queue.borrow_mut().push_back(event);
        // Clone the hook out before invoking so the callback may re-enter.
        let hook = self.notify.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    pub fn drain(&self) -> Vec<WidgetEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub(crate) fn set_notify(&self, hook: impl Fn() + 'static) {
        *self.notify.borrow_mut() = Some(Rc::new(hook));
    }

    pub(crate) fn clear_notify(&self) {
        *self.notify.borrow_mut() = None;
    }
}

/// Widget configuration, passed through to [`SelectWidget::attach`].
///
/// Only `create`, `plugins` and `maxItems` are recognized by the core;
/// everything else is preserved in `extra` and handed over opaquely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Allow free-text item creation
    pub create: bool,
    /// Widget feature names, uninterpreted
    pub plugins: Vec<String>,
    pub max_items: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl WidgetConfig {
    /// Parse from a JSON object string; empty input means defaults.
    pub fn from_json(input: &str) -> Result<Self, SyncError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(input).map_err(|e| SyncError::Config {
            details: e.to_string(),
        })
    }

    /// Parse from an already-evaluated JSON value; `Null` means defaults.
    pub fn from_value(input: Value) -> Result<Self, SyncError> {
        if input.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(input).map_err(|e| SyncError::Config {
            details: e.to_string(),
        })
    }
}

/// Imperative surface of the external widget.
///
/// Mutating operations may trigger the widget's own redraw; callers may only
/// assume the adapter's return, not visual completion.
pub trait SelectWidget {
    /// Bind to the control's host node. Called at most once between
    /// `detach`es; user actions go into `events`.
    fn attach(&mut self, config: &WidgetConfig, events: EventSink) -> Result<(), SyncError>;

    /// Release widget-held resources; must tolerate repeat calls.
    fn detach(&mut self);

    /// Atomically clear and repopulate the known option set. Must not
    /// implicitly clear the current selection.
    fn replace_options(&mut self, entries: &[OptionEntry]);

    /// Replace the selected items, preserving relative order.
    fn set_selection(&mut self, keys: &[ItemKey]);

    /// Current selection in display order.
    fn selection(&self) -> Vec<ItemKey>;

    fn set_enabled(&mut self, enabled: bool);
}

/// Owns the lifecycle of a single widget instance for one control
pub struct WidgetAdapter {
    widget: Box<dyn SelectWidget>,
    events: EventSink,
    attached: bool,
}

impl WidgetAdapter {
    pub fn new(widget: Box<dyn SelectWidget>) -> Self {
        Self {
            widget,
            events: EventSink::default(),
            attached: false,
        }
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Create the widget instance. A second call before [`destroy`] is a
    /// caller error.
    ///
    /// [`destroy`]: WidgetAdapter::destroy
    pub fn initialize(&mut self, config: &WidgetConfig) -> Result<(), SyncError> {
        if self.attached {
            return Err(SyncError::AlreadyInitialized);
        }
        self.widget.attach(config, self.events.clone())?;
        self.attached = true;
        debug!("widget attached");
        Ok(())
    }

    /// Idempotent teardown; safe when never initialized.
    pub fn destroy(&mut self) {
        if self.attached {
            self.widget.detach();
            self.attached = false;
            debug!("widget detached");
        }
        self.events.clear_notify();
        let dropped = self.events.drain();
        if !dropped.is_empty() {
            trace!(count = dropped.len(), "dropped events queued at destroy");
        }
    }

    pub fn replace_options(&mut self, entries: &[OptionEntry]) {
        if self.attached {
            debug!(count = entries.len(), "replacing widget options");
            self.widget.replace_options(entries);
        }
    }

    /// No-op when the requested set already matches the widget, so applying
    /// an unchanged selection cannot re-fire selection-changed events.
    pub fn set_selection(&mut self, keys: &[ItemKey]) {
        if !self.attached {
            return;
        }
        if self.widget.selection() == keys {
            trace!("widget selection already matches; skipping");
            return;
        }
        debug!(?keys, "applying widget selection");
        self.widget.set_selection(keys);
    }

    pub fn selection(&self) -> Vec<ItemKey> {
        if self.attached {
            self.widget.selection()
        } else {
            Vec::new()
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.attached {
            self.widget.set_enabled(enabled);
        }
    }

    pub fn drain_events(&mut self) -> Vec<WidgetEvent> {
        self.events.drain()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockWidget;
    use super::*;
    use serde_json::json;

    #[test]
    fn config_defaults() {
        let config = WidgetConfig::from_json("").unwrap();
        assert!(!config.create);
        assert!(config.plugins.is_empty());
        assert_eq!(config.max_items, None);
    }

    #[test]
    fn config_recognized_and_extra_keys() {
        let config = WidgetConfig::from_json(
            r#"{ "create": true, "plugins": ["remove_button"], "maxItems": 4, "delimiter": "," }"#,
        )
        .unwrap();
        assert!(config.create);
        assert_eq!(config.plugins, vec!["remove_button"]);
        assert_eq!(config.max_items, Some(4));
        assert_eq!(config.extra.get("delimiter"), Some(&json!(",")));
    }

    #[test]
    fn config_rejects_malformed_json() {
        let err = WidgetConfig::from_json("{ create: ").unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
    }

    #[test]
    fn double_initialize_fails() {
        let mock = MockWidget::new();
        let mut adapter = WidgetAdapter::new(Box::new(mock));
        adapter.initialize(&WidgetConfig::default()).unwrap();
        let err = adapter.initialize(&WidgetConfig::default()).unwrap_err();
        assert_eq!(err, SyncError::AlreadyInitialized);
    }

    #[test]
    fn destroy_is_idempotent_and_safe_uninitialized() {
        let mock = MockWidget::new();
        let mut adapter = WidgetAdapter::new(Box::new(mock));
        adapter.destroy();
        adapter.initialize(&WidgetConfig::default()).unwrap();
        adapter.destroy();
        adapter.destroy();
        assert!(!adapter.is_attached());
    }

    #[test]
    fn initialize_after_destroy_is_allowed() {
        let mock = MockWidget::new();
        let mut adapter = WidgetAdapter::new(Box::new(mock));
        adapter.initialize(&WidgetConfig::default()).unwrap();
        adapter.destroy();
        assert!(adapter.initialize(&WidgetConfig::default()).is_ok());
    }

    #[test]
    fn failed_attach_propagates() {
        let mock = MockWidget::new();
        mock.fail_next_attach();
        let mut adapter = WidgetAdapter::new(Box::new(mock));
        let err = adapter.initialize(&WidgetConfig::default()).unwrap_err();
        assert!(matches!(err, SyncError::AdapterInit { .. }));
        assert!(!adapter.is_attached());
    }

    #[test]
    fn set_selection_skips_when_unchanged() {
        let mock = MockWidget::new();
        let mut adapter = WidgetAdapter::new(Box::new(mock.clone()));
        adapter.initialize(&WidgetConfig::default()).unwrap();
        adapter.set_selection(&[ItemKey::Index(1)]);
        adapter.set_selection(&[ItemKey::Index(1)]);
        assert_eq!(mock.select_calls(), 1);
    }

    #[test]
    fn mutations_before_attach_are_noops() {
        let mock = MockWidget::new();
        let mut adapter = WidgetAdapter::new(Box::new(mock.clone()));
        adapter.set_selection(&[ItemKey::Index(0)]);
        adapter.replace_options(&[]);
        adapter.set_enabled(false);
        assert_eq!(mock.select_calls(), 0);
        assert_eq!(mock.replace_calls(), 0);
        assert!(adapter.selection().is_empty());
    }

    #[test]
    fn destroy_drops_queued_events() {
        let mock = MockWidget::new();
        let mut adapter = WidgetAdapter::new(Box::new(mock.clone()));
        adapter.initialize(&WidgetConfig::default()).unwrap();
        mock.user_add(ItemKey::Index(0));
        assert!(adapter.has_pending_events());
        adapter.destroy();
        assert!(!adapter.has_pending_events());
    }
}
