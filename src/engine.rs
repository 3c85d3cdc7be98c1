//! Reconciliation engine
//!
//! One [`Reconciler`] per control owns the synchronization state machine.
//! A single pass coalesces both change sources (external model/options
//! mutations detected against the last-applied snapshot, and widget events
//! drained from the adapter) and applies the result in an order that cannot
//! feed back on itself: external state is the authoritative base, widget
//! deltas merge on top, and events provoked by the pass's own writes stay
//! queued until the next pass.

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::binding::compile::Extractors;
use crate::codec::{from_widget_keys, to_widget_keys, CreatedLookup, ItemKey, Selection};
use crate::model::SelectModel;
use crate::options::{find_by_value, materialize, OptionEntry};
use crate::widget::{WidgetAdapter, WidgetEvent};

/// `Uninitialized → Ready ⇄ Reconciling`; destroy returns any state to
/// `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready,
    Reconciling,
}

/// Last-applied `(selection, options identity/length)` pair. Divergence from
/// the current model means the next change came from outside rather than from
/// the engine's own last write.
#[derive(Debug, Clone)]
struct Snapshot {
    selection: Selection,
    revision: u64,
    options_len: usize,
}

pub struct Reconciler {
    extractors: Extractors,
    entries: Vec<OptionEntry>,
    /// Values minted from free text, kept for the control's lifetime. Under
    /// a non-identity value expression a created raw item never materializes
    /// to a matching entry, so resolution falls through to this lookup.
    created: CreatedLookup,
    snapshot: Option<Snapshot>,
    state: EngineState,
}

impl Reconciler {
    pub fn new(extractors: Extractors) -> Self {
        Self {
            extractors,
            entries: Vec::new(),
            created: CreatedLookup::new(),
            snapshot: None,
            state: EngineState::Uninitialized,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Current materialized entries, for embedders that render labels
    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    /// Transition out of `Uninitialized` once the widget attached.
    pub fn mark_ready(&mut self) {
        self.state = EngineState::Ready;
    }

    /// Return to an `Uninitialized`-equivalent state. Invoked on destroy,
    /// valid from any state.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.created.clear();
        self.snapshot = None;
        self.state = EngineState::Uninitialized;
    }

    /// Run one reconciliation pass.
    ///
    /// A pass that fires after the widget was torn down is stale and no-ops.
    /// After the pass, snapshot == model state exactly; a second pass with no
    /// intervening change issues no widget mutations.
    pub fn reconcile(&mut self, model: &mut SelectModel, adapter: &mut WidgetAdapter) {
        if !adapter.is_attached() {
            trace!("stale reconciliation pass on a detached widget");
            return;
        }
        self.state = EngineState::Reconciling;

        // Drain first: anything recorded after this point was provoked by
        // this pass's own writes and belongs to the next pass.
        let events = adapter.drain_events();

        let (external_changed, mut entries_dirty) = match &self.snapshot {
            None => (true, true),
            Some(snap) => {
                let options_changed = snap.revision != model.revision()
                    || snap.options_len != model.options_len();
                (
                    options_changed || snap.selection != *model.selection(),
                    options_changed,
                )
            }
        };
        if entries_dirty {
            self.entries = materialize(model.options(), &self.extractors);
        }

        debug!(
            external_changed,
            widget_events = events.len(),
            entries = self.entries.len(),
            "reconciliation pass"
        );

        // External state is the authoritative base; widget deltas merge on
        // top, so a removal beats a stale external re-addition of the same
        // value.
        let mut working = model.selection().clone();
        let mut created_any = false;

        for event in events {
            match event {
                WidgetEvent::ItemAdded(key) => {
                    if let ItemKey::Text(text) = &key {
                        let as_value = Value::String(text.clone());
                        if !self.created.contains_key(text)
                            && find_by_value(&self.entries, &as_value).is_none()
                        {
                            // Free-standing created item: the raw text joins
                            // the options collection, and the created lookup
                            // keeps resolving it for value expressions the
                            // raw item cannot satisfy.
                            debug!(%text, "created item appended to options collection");
                            model.push_option(as_value.clone());
                            self.created.insert(text.clone(), as_value.clone());
                            working.add(as_value);
                            created_any = true;
                            continue;
                        }
                    }
                    match self.resolve_key(&key) {
                        Some(value) => working.add(value),
                        None => warn!(?key, "added item does not resolve; ignored"),
                    }
                }
                WidgetEvent::ItemRemoved(key) => match self.resolve_key(&key) {
                    Some(value) => working.remove(&value),
                    None => warn!(?key, "removed item does not resolve; ignored"),
                },
            }
        }

        if created_any {
            self.entries = materialize(model.options(), &self.extractors);
            entries_dirty = true;
        }

        if working != *model.selection() {
            debug!(?working, "writing merged selection back to model");
            model.set_selection(working.clone());
        }

        if entries_dirty {
            adapter.replace_options(&self.entries);
        }
        adapter.set_selection(&to_widget_keys(&working, &self.entries, &self.created));

        self.snapshot = Some(Snapshot {
            selection: working,
            revision: model.revision(),
            options_len: model.options_len(),
        });
        self.state = EngineState::Ready;
    }

    fn resolve_key(&self, key: &ItemKey) -> Option<Value> {
        match from_widget_keys(std::slice::from_ref(key), &self.entries, &self.created, true) {
            Selection::Multi(values) => values.into_iter().next(),
            Selection::Single(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::compile::{Extractors, PathCompiler};
    use crate::binding::parse;
    use crate::widget::mock::MockWidget;
    use crate::widget::WidgetConfig;
    use serde_json::json;

    struct Rig {
        model: SelectModel,
        adapter: WidgetAdapter,
        reconciler: Reconciler,
        widget: MockWidget,
    }

    fn rig(expr: &str, multiple: bool, options: Vec<Value>, selection: Selection) -> Rig {
        let spec = parse(expr, multiple).unwrap();
        let extractors = Extractors::compile(&spec, &PathCompiler).unwrap();
        let widget = MockWidget::new();
        let mut adapter = WidgetAdapter::new(Box::new(widget.clone()));
        adapter.initialize(&WidgetConfig::default()).unwrap();
        let mut model = SelectModel::new(multiple);
        model.replace_options(options);
        model.set_selection(selection);
        let mut reconciler = Reconciler::new(extractors);
        reconciler.mark_ready();
        Rig {
            model,
            adapter,
            reconciler,
            widget,
        }
    }

    fn string_options() -> Vec<Value> {
        vec![json!("foo"), json!("bar"), json!("baz")]
    }

    #[test]
    fn first_pass_applies_options_and_selection() {
        let mut r = rig(
            "option for option in options",
            false,
            string_options(),
            Selection::Single(json!("foo")),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.widget.option_count(), 3);
        assert_eq!(r.widget.items(), vec![ItemKey::Index(0)]);
        assert_eq!(r.reconciler.state(), EngineState::Ready);
    }

    #[test]
    fn pass_is_idempotent() {
        let mut r = rig(
            "option for option in options",
            false,
            string_options(),
            Selection::Single(json!("foo")),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        let (replaces, selects) = (r.widget.replace_calls(), r.widget.select_calls());
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.widget.replace_calls(), replaces);
        assert_eq!(r.widget.select_calls(), selects);
    }

    #[test]
    fn materialized_entries_are_inspectable() {
        let options = vec![
            json!({ "value": "guid1", "text": "first" }),
            json!({ "value": "guid2", "text": "second" }),
        ];
        let mut r = rig(
            "option.text as option.value for option in options",
            false,
            options,
            Selection::Single(json!("guid1")),
        );
        assert!(r.reconciler.entries().is_empty());
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        let entries = r.reconciler.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].label, "second");
        assert_eq!(entries[1].value, json!("guid2"));
    }

    #[test]
    fn widget_add_updates_model() {
        let mut r = rig(
            "option for option in options",
            false,
            string_options(),
            Selection::Single(json!("foo")),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.widget.user_add(ItemKey::Index(2));
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.model.selection(), &Selection::Single(json!("baz")));
        assert_eq!(r.widget.items(), vec![ItemKey::Index(2)]);
    }

    #[test]
    fn selecting_an_existing_option_does_not_touch_options() {
        let mut r = rig(
            "option for option in options",
            true,
            string_options(),
            Selection::Multi(vec![json!("foo")]),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.widget.user_add(ItemKey::Index(2));
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.model.options(), &string_options()[..]);
        assert_eq!(
            r.model.selection(),
            &Selection::Multi(vec![json!("foo"), json!("baz")])
        );
    }

    #[test]
    fn created_item_becomes_an_option_and_selects() {
        let mut r = rig(
            "option for option in options",
            true,
            string_options(),
            Selection::Multi(vec![json!("foo")]),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.widget.user_create("foobar");
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(
            r.model.selection(),
            &Selection::Multi(vec![json!("foo"), json!("foobar")])
        );
        assert_eq!(r.model.options().last(), Some(&json!("foobar")));
        // Created entry resolves by index once materialized.
        assert_eq!(r.widget.items(), vec![ItemKey::Index(0), ItemKey::Index(3)]);
    }

    #[test]
    fn removing_a_created_item_restores_selection() {
        let mut r = rig(
            "option for option in options",
            true,
            string_options(),
            Selection::Multi(vec![json!("foo")]),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.widget.user_create("foobar");
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.widget.user_remove(ItemKey::Index(3));
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.model.selection(), &Selection::Multi(vec![json!("foo")]));
        // The created option stays in the collection; only the selection shrank.
        assert_eq!(r.model.options_len(), 4);
    }

    #[test]
    fn external_options_growth_keeps_selection() {
        let mut r = rig(
            "option for option in options",
            false,
            string_options(),
            Selection::Single(json!("foo")),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.model.push_option(json!("qux"));
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.widget.option_count(), 4);
        assert_eq!(r.model.selection(), &Selection::Single(json!("foo")));
        assert_eq!(r.widget.items(), vec![ItemKey::Index(0)]);
    }

    #[test]
    fn unresolvable_value_is_hidden_but_retained() {
        let mut r = rig(
            "option for option in options",
            false,
            string_options(),
            Selection::Single(json!("nope")),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert!(r.widget.items().is_empty());
        assert_eq!(r.model.selection(), &Selection::Single(json!("nope")));
    }

    #[test]
    fn external_and_widget_changes_in_one_pass() {
        let mut r = rig(
            "option for option in options",
            true,
            string_options(),
            Selection::Multi(vec![json!("foo")]),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        // External mutation and a widget removal of the same value land in
        // the same tick: the removal wins.
        r.model
            .set_selection(Selection::Multi(vec![json!("foo"), json!("bar")]));
        r.widget.user_remove(ItemKey::Index(0));
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.model.selection(), &Selection::Multi(vec![json!("bar")]));
        assert_eq!(r.widget.items(), vec![ItemKey::Index(1)]);
    }

    #[test]
    fn object_valued_options_resolve_through_value_expression() {
        let options = vec![
            json!({ "value": "guid1", "text": "first" }),
            json!({ "value": "guid2", "text": "second" }),
            json!({ "value": "guid3", "text": "third" }),
        ];
        let mut r = rig(
            "option.text as option.value for option in options",
            false,
            options,
            Selection::Single(json!("guid1")),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.widget.option_labels(), vec!["first", "second", "third"]);
        r.widget.user_add(ItemKey::Index(2));
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.model.selection(), &Selection::Single(json!("guid3")));
    }

    #[test]
    fn created_item_keeps_text_identity_under_a_value_expression() {
        let options = vec![
            json!({ "value": "guid1", "text": "first" }),
            json!({ "value": "guid2", "text": "second" }),
        ];
        let mut r = rig(
            "option.text as option.value for option in options",
            true,
            options,
            Selection::Multi(vec![json!("guid1")]),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.widget.user_create("third");
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(
            r.model.selection(),
            &Selection::Multi(vec![json!("guid1"), json!("third")])
        );
        // The appended raw string yields no matching entry value, so the
        // widget key stays the created text.
        assert_eq!(
            r.widget.items(),
            vec![ItemKey::Index(0), ItemKey::Text("third".to_string())]
        );
        r.widget.user_remove(ItemKey::Text("third".to_string()));
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.model.selection(), &Selection::Multi(vec![json!("guid1")]));
    }

    #[test]
    fn stale_pass_after_destroy_is_a_noop() {
        let mut r = rig(
            "option for option in options",
            false,
            string_options(),
            Selection::Single(json!("foo")),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.adapter.destroy();
        r.reconciler.reset();
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.reconciler.state(), EngineState::Uninitialized);
    }

    #[test]
    fn single_select_create_mode() {
        let mut r = rig(
            "option for option in options",
            false,
            string_options(),
            Selection::Single(json!("foo")),
        );
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        r.widget.user_create("foobar");
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.model.selection(), &Selection::Single(json!("foobar")));
        assert_eq!(r.model.options_len(), 4);
        r.widget.user_remove(ItemKey::Index(3));
        r.reconciler.reconcile(&mut r.model, &mut r.adapter);
        assert_eq!(r.model.selection(), &Selection::Single(Value::Null));
    }
}
