//! Select control
//!
//! [`SelectControl`] is the public entry point: it parses the declarative
//! expression, compiles extractors, owns the widget adapter and the
//! reconciler, and wires widget events and host refreshes into coalesced
//! reconciliation passes on the host's scheduler.
//!
//! Widget attachment is deferred by one tick after [`ControlBuilder::bind`]
//! so the host node exists and any externally-driven first paint has
//! happened; the first reconciliation pass runs right after the attach.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{error, trace};

use crate::binding::compile::{ExprCompiler, Extractors, PathCompiler};
use crate::binding::{parse, BindingSpec};
use crate::engine::{EngineState, Reconciler};
use crate::error::SyncError;
use crate::model::ModelHandle;
use crate::schedule::Scheduler;
use crate::widget::{SelectWidget, WidgetAdapter, WidgetConfig};

struct ControlFlags {
    /// One pending pass per control; repeated triggers coalesce into it
    pending: Cell<bool>,
    /// Set by destroy; cancels pending work before it runs
    destroyed: Cell<bool>,
}

struct ControlInner {
    spec: BindingSpec,
    config: WidgetConfig,
    reconciler: Reconciler,
    adapter: WidgetAdapter,
    disabled: bool,
    init_error: Option<SyncError>,
}

/// Builder for a [`SelectControl`]
pub struct ControlBuilder {
    expression: Option<String>,
    multiple: bool,
    disabled: bool,
    config: Option<WidgetConfig>,
    config_json: Option<String>,
    compiler: Box<dyn ExprCompiler>,
}

impl Default for ControlBuilder {
    fn default() -> Self {
        Self {
            expression: None,
            multiple: false,
            disabled: false,
            config: None,
            config_json: None,
            compiler: Box::new(PathCompiler),
        }
    }
}

impl ControlBuilder {
    /// Option-iteration expression; omit it for a positional binding where
    /// each option's value is the raw item itself.
    pub fn expression(mut self, expr: impl Into<String>) -> Self {
        self.expression = Some(expr.into());
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn config(mut self, config: WidgetConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Widget configuration as a JSON object string; parsed (and rejected)
    /// at bind time.
    pub fn config_json(mut self, json: impl Into<String>) -> Self {
        self.config_json = Some(json.into());
        self
    }

    /// Replace the default path-expression compiler with a host capability.
    pub fn compiler(mut self, compiler: Box<dyn ExprCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Construct the control and schedule the deferred widget attach.
    ///
    /// Parse, expression-compilation and configuration failures surface here,
    /// synchronously, and abort widget initialization for this control.
    pub fn bind(
        self,
        widget: Box<dyn SelectWidget>,
        model: ModelHandle,
        scheduler: Rc<dyn Scheduler>,
    ) -> Result<SelectControl, SyncError> {
        let spec = match &self.expression {
            Some(expr) => parse(expr, self.multiple)?,
            None => BindingSpec::positional(self.multiple),
        };
        let extractors = Extractors::compile(&spec, self.compiler.as_ref())?;
        let config = match (self.config, self.config_json) {
            (Some(config), _) => config,
            (None, Some(json)) => WidgetConfig::from_json(&json)?,
            (None, None) => WidgetConfig::default(),
        };

        let inner = Rc::new(RefCell::new(ControlInner {
            spec,
            config,
            reconciler: Reconciler::new(extractors),
            adapter: WidgetAdapter::new(widget),
            disabled: self.disabled,
            init_error: None,
        }));
        let flags = Rc::new(ControlFlags {
            pending: Cell::new(false),
            destroyed: Cell::new(false),
        });

        let control = SelectControl {
            inner: Rc::clone(&inner),
            model: Rc::clone(&model),
            scheduler: Rc::clone(&scheduler),
            flags: Rc::clone(&flags),
        };

        // Attach one tick later; the host node may not exist yet.
        let weak = Rc::downgrade(&inner);
        let attach_model = Rc::clone(&model);
        let attach_scheduler = Rc::clone(&scheduler);
        scheduler.defer(Box::new(move || {
            deferred_attach(weak, flags, attach_model, attach_scheduler);
        }));

        Ok(control)
    }
}

fn deferred_attach(
    weak: Weak<RefCell<ControlInner>>,
    flags: Rc<ControlFlags>,
    model: ModelHandle,
    scheduler: Rc<dyn Scheduler>,
) {
    if flags.destroyed.get() {
        trace!("control destroyed before widget attach");
        return;
    }
    let Some(inner_rc) = weak.upgrade() else {
        return;
    };
    let mut inner = inner_rc.borrow_mut();

    let config = inner.config.clone();
    if let Err(err) = inner.adapter.initialize(&config) {
        // Terminal for this control instance; no retry.
        error!(%err, "widget initialization failed");
        inner.init_error = Some(err);
        return;
    }
    inner.reconciler.mark_ready();
    let enabled = !inner.disabled;
    inner.adapter.set_enabled(enabled);

    // User actions self-schedule a coalesced pass from here on.
    {
        let weak = weak.clone();
        let flags = Rc::clone(&flags);
        let model = Rc::clone(&model);
        let scheduler = Rc::clone(&scheduler);
        inner.adapter.events().set_notify(move || {
            schedule_pass(
                weak.clone(),
                Rc::clone(&flags),
                Rc::clone(&model),
                Rc::clone(&scheduler),
            );
        });
    }

    // First pass in the same tick as the attach.
    let ControlInner {
        reconciler, adapter, ..
    } = &mut *inner;
    reconciler.reconcile(&mut model.borrow_mut(), adapter);
}

fn schedule_pass(
    weak: Weak<RefCell<ControlInner>>,
    flags: Rc<ControlFlags>,
    model: ModelHandle,
    scheduler: Rc<dyn Scheduler>,
) {
    if flags.destroyed.get() || flags.pending.get() {
        return;
    }
    flags.pending.set(true);

    let task_scheduler = Rc::clone(&scheduler);
    scheduler.defer(Box::new(move || {
        flags.pending.set(false);
        if flags.destroyed.get() {
            trace!("pending reconciliation pass cancelled by destroy");
            return;
        }
        let Some(inner_rc) = weak.upgrade() else {
            return;
        };
        {
            let mut inner = inner_rc.borrow_mut();
            let ControlInner {
                reconciler, adapter, ..
            } = &mut *inner;
            reconciler.reconcile(&mut model.borrow_mut(), adapter);
        }
        // Events recorded while the pass was writing to the widget get one
        // follow-up pass instead of re-entrant processing.
        if inner_rc.borrow().adapter.has_pending_events() {
            schedule_pass(weak.clone(), Rc::clone(&flags), Rc::clone(&model), task_scheduler.clone());
        }
    }));
}

/// One synchronized selection control.
///
/// Dropping the control destroys it.
pub struct SelectControl {
    inner: Rc<RefCell<ControlInner>>,
    model: ModelHandle,
    scheduler: Rc<dyn Scheduler>,
    flags: Rc<ControlFlags>,
}

impl SelectControl {
    pub fn builder() -> ControlBuilder {
        ControlBuilder::default()
    }

    /// The external model this control synchronizes against.
    pub fn model(&self) -> ModelHandle {
        Rc::clone(&self.model)
    }

    /// The parsed binding, for introspection.
    pub fn binding(&self) -> BindingSpec {
        self.inner.borrow().spec.clone()
    }

    pub fn state(&self) -> EngineState {
        self.inner.borrow().reconciler.state()
    }

    /// The deferred attach failure, if initialization went wrong.
    pub fn init_error(&self) -> Option<SyncError> {
        self.inner.borrow().init_error.clone()
    }

    /// Signal that the model's selection or options were mutated out-of-band.
    /// Repeated calls before the pass runs coalesce into one pass.
    pub fn refresh(&self) {
        schedule_pass(
            Rc::downgrade(&self.inner),
            Rc::clone(&self.flags),
            Rc::clone(&self.model),
            Rc::clone(&self.scheduler),
        );
    }

    /// One-way mirror into the widget's enabled/disabled state.
    pub fn set_disabled(&self, disabled: bool) {
        let mut inner = self.inner.borrow_mut();
        inner.disabled = disabled;
        inner.adapter.set_enabled(!disabled);
    }

    /// Tear the control down: cancels any pending pass and releases the
    /// widget. Idempotent; safe before the deferred attach ever ran.
    pub fn destroy(&self) {
        if self.flags.destroyed.replace(true) {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        inner.adapter.destroy();
        inner.reconciler.reset();
    }
}

impl Drop for SelectControl {
    fn drop(&mut self) {
        self.destroy();
    }
}
