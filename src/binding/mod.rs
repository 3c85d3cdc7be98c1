//! Option-iteration expressions
//!
//! A control's option list is declared with a comprehension of the form
//! `label [as value] [group by g] for ident in collection [track by t]`,
//! for example `color.name as color.hex for color in palette`. This module
//! parses that string into a [`BindingSpec`]; [`compile`] turns the spec
//! into value/label extraction functions.

pub mod compile;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SyncError;

/// `group by` and `track by` are captured so otherwise-valid expressions are
/// not rejected, but nothing downstream consumes them.
static ITERATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^\s*
        (?:(?P<label>[\s\S]+?)\s+)??
        (?:as\s+(?P<value>[\s\S]+?)\s+)?
        (?:group\s+by\s+(?P<group>[\s\S]+?)\s+)?
        for\s+
        (?:
            (?P<ident>[$\w][$\w]*)
            |
            \(\s*(?P<key>[$\w][$\w]*)\s*,\s*(?P<vident>[$\w][$\w]*)\s*\)
        )
        \s+in\s+
        (?P<coll>[\s\S]+?)
        (?:\s+track\s+by\s+(?P<track>[\s\S]+?))?
        \s*$",
    )
    .expect("iteration grammar regex is valid")
});

/// Words that cannot serve as the iteration variable
const RESERVED: &[&str] = &[
    "for", "in", "as", "by", "group", "track", "true", "false", "null", "undefined",
];

/// Immutable description of one control's option binding, derived once from
/// its declarative expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSpec {
    /// Display expression; `None` falls back to the value expression, then to
    /// the item itself
    pub label_expr: Option<String>,
    /// Value expression from the `as` clause; `None` selects by whole item
    pub value_expr: Option<String>,
    /// Accepted syntactically, unused
    pub group_expr: Option<String>,
    /// Accepted syntactically, unused
    pub track_expr: Option<String>,
    /// Key member of the `(key, value)` pair form, when used
    pub key_ident: Option<String>,
    /// Iteration variable the extraction expressions are evaluated against
    pub ident: String,
    /// Reference to the backing options collection, as written
    pub collection: String,
    /// Scalar vs. array selection state
    pub multiple: bool,
}

impl BindingSpec {
    /// Spec for a control declared without an iteration expression: options
    /// are taken as given and each option's value is the raw item itself.
    pub fn positional(multiple: bool) -> Self {
        Self {
            label_expr: None,
            value_expr: None,
            group_expr: None,
            track_expr: None,
            key_ident: None,
            ident: "option".to_string(),
            collection: String::new(),
            multiple,
        }
    }
}

/// Parse an option-iteration expression.
///
/// Fails hard: a control with an expression that does not match the grammar
/// must not initialize its widget, since every downstream component depends
/// on a valid spec.
pub fn parse(expr: &str, multiple: bool) -> Result<BindingSpec, SyncError> {
    let caps = ITERATION_RE.captures(expr).ok_or_else(|| SyncError::Parse {
        expr: expr.to_string(),
    })?;

    let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

    // In the destructured-pair form the iteration variable is the value member.
    let ident = group("ident")
        .or_else(|| group("vident"))
        .ok_or_else(|| SyncError::Parse {
            expr: expr.to_string(),
        })?;
    let key_ident = group("key");

    validate_ident(&ident)?;
    if let Some(key) = &key_ident {
        validate_ident(key)?;
    }

    Ok(BindingSpec {
        label_expr: group("label"),
        value_expr: group("value"),
        group_expr: group("group"),
        track_expr: group("track"),
        key_ident,
        ident,
        collection: group("coll").unwrap_or_default(),
        multiple,
    })
}

fn validate_ident(ident: &str) -> Result<(), SyncError> {
    let reserved = RESERVED.contains(&ident);
    let starts_with_digit = ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());
    if reserved || starts_with_digit {
        return Err(SyncError::ReservedIdent {
            ident: ident.to_string(),
        });
    }
    Ok(())
}
