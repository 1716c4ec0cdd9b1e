//! The interpreter's view of the variable store.
//!
//! The interpreter never reaches into a store directly. It goes through the
//! [`Scope`] trait: parse, evaluate, subscribe, unsubscribe, fork, and the
//! single write path used by form fields. [`VarStore`] is the reference
//! implementation; hosts with their own state container implement the trait
//! instead.

mod varstore;

use std::fmt;
use std::rc::Rc;

use brickie_expr::{EvalError, Expr, ParseError, Parsed};
use serde_json::{Map, Value};

pub use varstore::VarStore;

/// Shared handle to a scope.
pub type ScopeRef = Rc<dyn Scope>;

// ── Subscriber ────────────────────────────────────────────────────────────

/// A change callback. Subscriptions are matched by callback identity, so
/// unsubscribing requires the same `Subscriber` (or a clone of it).
#[derive(Clone)]
pub struct Subscriber(Rc<dyn Fn(&str, &Value)>);

impl Subscriber {
    pub fn new(f: impl Fn(&str, &Value) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn notify(&self, name: &str, value: &Value) {
        (self.0)(name, value)
    }

    pub fn same(&self, other: &Subscriber) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscriber(..)")
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

/// Parsing or evaluation failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    Parse(ParseError),
    Eval(EvalError),
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::Parse(e) => e.fmt(f),
            ExpressionError::Eval(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ExpressionError {}

impl From<ParseError> for ExpressionError {
    fn from(e: ParseError) -> Self {
        ExpressionError::Parse(e)
    }
}

impl From<EvalError> for ExpressionError {
    fn from(e: EvalError) -> Self {
        ExpressionError::Eval(e)
    }
}

// ── Scope ─────────────────────────────────────────────────────────────────

/// A hierarchical variable-binding context.
///
/// Only [`Scope::lookup`], the subscription pair, [`Scope::fork`] and
/// [`Scope::set_value`] are required; parsing and evaluation default to the
/// `brickie-expr` language.
pub trait Scope {
    /// Current value of a root variable, `None` when unbound.
    fn lookup(&self, name: &str) -> Option<Value>;

    fn subscribe(&self, name: &str, subscriber: &Subscriber);

    fn unsubscribe(&self, name: &str, subscriber: &Subscriber);

    /// Child scope with `bindings` layered over this one.
    fn fork(&self, label: &str, bindings: Map<String, Value>) -> ScopeRef;

    /// Write `value` at a dotted `path` (`"login.username"`).
    fn set_value(&self, path: &str, value: Value);

    fn parse_expression(&self, text: &str) -> Result<Parsed, ExpressionError> {
        Ok(brickie_expr::parse(text)?)
    }

    fn evaluate_node(&self, node: &Expr) -> Result<Value, ExpressionError> {
        Ok(brickie_expr::evaluate(node, &|name| self.lookup(name))?)
    }

    fn evaluate(&self, text: &str) -> Result<Value, ExpressionError> {
        let parsed = self.parse_expression(text)?;
        self.evaluate_node(&parsed.expr)
    }
}

/// Split a dotted path into its non-empty segments.
pub(crate) fn path_segments(path: &str) -> Vec<&str> {
    path.split('.').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Read a dotted path out of a value; missing segments yield `None`.
pub fn read_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path_segments(path).into_iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn read_path_walks_objects_and_arrays() {
        let v = json!({ "target": { "value": "hello", "files": ["a.txt"] } });
        assert_eq!(read_path(&v, "target.value"), Some(&json!("hello")));
        assert_eq!(read_path(&v, "target.files.0"), Some(&json!("a.txt")));
        assert_eq!(read_path(&v, "target.missing"), None);
        assert_eq!(read_path(&v, ""), Some(&v));
    }
}
