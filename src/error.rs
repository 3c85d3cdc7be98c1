//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Failures surfaced to whoever constructs a control.
///
/// Steady-state reconciliation conditions (a selection value with no matching
/// option, events fired by the engine's own writes) are not represented here:
/// they are recovered internally and traced, never returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    // ─────────────────────────────────────────────────────────────
    // Binding errors (SEL-010 to SEL-012)
    // ─────────────────────────────────────────────────────────────
    #[error("SEL-010: expression '{expr}' does not match '[label [as value]] for ident in collection'")]
    Parse { expr: String },

    #[error("SEL-011: iteration variable '{ident}' is reserved or not a valid identifier")]
    ReservedIdent { ident: String },

    #[error("SEL-012: cannot compile expression '{expr}': {reason}")]
    Expression { expr: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Widget lifecycle errors (SEL-020 to SEL-021)
    // ─────────────────────────────────────────────────────────────
    #[error("SEL-020: widget already initialized for this control")]
    AlreadyInitialized,

    #[error("SEL-021: widget failed to attach: {details}")]
    AdapterInit { details: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration errors (SEL-030)
    // ─────────────────────────────────────────────────────────────
    #[error("SEL-030: invalid widget configuration: {details}")]
    Config { details: String },
}

impl FixSuggestion for SyncError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            SyncError::Parse { .. } => {
                Some("Use the form 'label for item in items' or 'label as value for item in items'")
            }
            SyncError::ReservedIdent { .. } => {
                Some("Pick an iteration variable that is not a keyword and does not start with a digit")
            }
            SyncError::Expression { .. } => {
                Some("The default compiler only supports 'ident' and 'ident.field.subfield' paths; supply a custom ExprCompiler for anything richer")
            }
            SyncError::AlreadyInitialized => {
                Some("Call destroy() before binding the control to another widget")
            }
            SyncError::AdapterInit { .. } => {
                Some("The control is unusable; construct a new one once the widget's host node exists")
            }
            SyncError::Config { .. } => {
                Some("Widget configuration must be a JSON object, e.g. {\"create\": true}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_contains_code() {
        let err = SyncError::Parse {
            expr: "bogus".into(),
        };
        assert!(err.to_string().contains("SEL-010"));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let variants = [
            SyncError::Parse { expr: "x".into() },
            SyncError::ReservedIdent { ident: "in".into() },
            SyncError::Expression {
                expr: "a[0]".into(),
                reason: "indexing".into(),
            },
            SyncError::AlreadyInitialized,
            SyncError::AdapterInit {
                details: "no node".into(),
            },
            SyncError::Config {
                details: "not an object".into(),
            },
        ];
        for v in variants {
            assert!(v.fix_suggestion().is_some(), "{v} has no suggestion");
        }
    }
}
