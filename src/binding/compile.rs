//! Extractor compilation
//!
//! Turns a [`BindingSpec`](super::BindingSpec) into the two pure functions
//! the rest of the crate consumes: `value_of(item)` and `label_of(item)`.
//! Expression evaluation itself is a host capability behind [`ExprCompiler`];
//! the built-in [`PathCompiler`] covers the common `ident.field.subfield`
//! shape with a cached parse table.

use std::rc::Rc;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use super::BindingSpec;
use crate::error::SyncError;

/// A compiled expression: binds the iteration variable to a candidate item
/// and yields the evaluated value. Pure, and total over `Value` including
/// `Null` (absent fields evaluate to `Null`).
pub type ExprFn = Rc<dyn Fn(&Value) -> Value>;

/// Host capability for compiling extraction expressions.
///
/// The core never interprets expression text itself; it depends only on the
/// resulting function signature, so an embedder with a richer expression
/// language plugs in here.
pub trait ExprCompiler {
    fn compile(&self, expr: &str, ident: &str) -> Result<ExprFn, SyncError>;
}

/// Parsed path expressions, cached per expression string
static PATH_CACHE: Lazy<DashMap<String, Arc<Vec<String>>>> = Lazy::new(DashMap::new);

/// Default [`ExprCompiler`]: supports `ident` (the item itself) and
/// `ident.field.subfield` member access.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathCompiler;

impl PathCompiler {
    fn parse_path(&self, expr: &str, ident: &str) -> Result<Arc<Vec<String>>, SyncError> {
        if let Some(cached) = PATH_CACHE.get(expr) {
            // Cached entries are keyed by the full expression; the leading
            // segment still has to match this control's iteration variable.
            if cached.first().map(String::as_str) == Some(ident) {
                return Ok(Arc::clone(&cached));
            }
        }

        let segments: Vec<String> = expr.split('.').map(|s| s.trim().to_string()).collect();
        if segments.first().map(String::as_str) != Some(ident) {
            return Err(SyncError::Expression {
                expr: expr.to_string(),
                reason: format!("expression must start with the iteration variable '{ident}'"),
            });
        }
        if segments.iter().any(String::is_empty) {
            return Err(SyncError::Expression {
                expr: expr.to_string(),
                reason: "empty path segment".to_string(),
            });
        }

        let segments = Arc::new(segments);
        PATH_CACHE.insert(expr.to_string(), Arc::clone(&segments));
        Ok(segments)
    }
}

impl ExprCompiler for PathCompiler {
    fn compile(&self, expr: &str, ident: &str) -> Result<ExprFn, SyncError> {
        let segments = self.parse_path(expr, ident)?;
        Ok(Rc::new(move |item: &Value| {
            let mut current = item;
            for segment in segments.iter().skip(1) {
                match current.get(segment) {
                    Some(next) => current = next,
                    None => return Value::Null,
                }
            }
            current.clone()
        }))
    }
}

/// The compiled value/label extraction pair for one control
pub struct Extractors {
    value_of: ExprFn,
    label_of: Rc<dyn Fn(&Value) -> String>,
}

impl std::fmt::Debug for Extractors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractors").finish_non_exhaustive()
    }
}

impl Extractors {
    /// Compile a binding spec against a host expression compiler.
    ///
    /// `value_of` evaluates the `as` clause, or yields the item unchanged
    /// when no value expression was given. `label_of` evaluates the display
    /// expression, falls back to the value expression, then to the item's
    /// own display form.
    pub fn compile(spec: &BindingSpec, compiler: &dyn ExprCompiler) -> Result<Self, SyncError> {
        let value_of: ExprFn = match &spec.value_expr {
            Some(expr) => compiler.compile(expr, &spec.ident)?,
            None => Rc::new(|item: &Value| item.clone()),
        };

        let label_of: Rc<dyn Fn(&Value) -> String> = match &spec.label_expr {
            Some(expr) => {
                let label_fn = compiler.compile(expr, &spec.ident)?;
                Rc::new(move |item: &Value| display_form(&label_fn(item)))
            }
            None => {
                let value_fn = Rc::clone(&value_of);
                Rc::new(move |item: &Value| display_form(&value_fn(item)))
            }
        };

        Ok(Self { value_of, label_of })
    }

    pub fn value_of(&self, item: &Value) -> Value {
        (self.value_of)(item)
    }

    pub fn label_of(&self, item: &Value) -> String {
        (self.label_of)(item)
    }
}

/// Human-facing rendering of a value: strings verbatim, `Null` empty,
/// everything else compact JSON.
pub fn display_form(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
