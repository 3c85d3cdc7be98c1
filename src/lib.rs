//! selectsync - bidirectional synchronization between a selection model and a
//! rich-selection widget
//!
//! The crate binds a declarative option-iteration expression (`label [as
//! value] for item in items`) to an external widget behind the
//! [`SelectWidget`] trait and keeps both sides agreeing: host mutations flow
//! into the widget, user actions flow back into the model, and everything is
//! coalesced into at most one reconciliation pass per scheduler tick.
//!
//! ```
//! use std::rc::Rc;
//! use selectsync::{MockWidget, SelectControl, SelectModel, Selection, TickScheduler};
//! use serde_json::json;
//!
//! let scheduler = TickScheduler::new();
//! let widget = MockWidget::new();
//! let mut model = SelectModel::new(false);
//! model.replace_options(vec![json!("foo"), json!("bar"), json!("baz")]);
//! model.set_value(json!("foo"));
//! let model = model.handle();
//!
//! let control = SelectControl::builder()
//!     .expression("option for option in options")
//!     .bind(Box::new(widget.clone()), Rc::clone(&model), scheduler.clone())
//!     .unwrap();
//!
//! scheduler.run_until_idle();
//! assert_eq!(widget.option_count(), 3);
//!
//! // The user picks the third option; the model follows.
//! widget.user_add(selectsync::ItemKey::Index(2));
//! scheduler.run_until_idle();
//! assert_eq!(model.borrow().selection(), &Selection::Single(json!("baz")));
//! # control.destroy();
//! ```

pub mod binding;
pub mod codec;
pub mod control;
pub mod engine;
pub mod error;
pub mod model;
pub mod options;
pub mod schedule;
pub mod widget;

pub use binding::compile::{ExprCompiler, ExprFn, Extractors, PathCompiler};
pub use binding::{parse, BindingSpec};
pub use codec::{from_widget_keys, to_widget_keys, CreatedLookup, ItemKey, Selection};
pub use control::{ControlBuilder, SelectControl};
pub use engine::{EngineState, Reconciler};
pub use error::{FixSuggestion, SyncError};
pub use model::{ModelHandle, SelectModel};
pub use options::OptionEntry;
pub use schedule::{Scheduler, TickScheduler};
pub use widget::mock::MockWidget;
pub use widget::{EventSink, SelectWidget, WidgetAdapter, WidgetConfig, WidgetEvent};
