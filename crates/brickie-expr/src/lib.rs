//! Lexer, parser, and evaluator for **brickie binding expressions**.
//!
//! A binding expression is the text between the braces of a dynamic brick
//! property: `"{user.name}"` carries the expression `user.name`. This crate
//! only knows about the expression itself; stripping the braces, scoping and
//! change notification belong to the store that consumes it.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ast`] | `Expr`, `Parsed`, operators |
//! | [`error`] | `ParseError`, `EvalError` |
//! | [`lexer`] | `Lexer`, `Token` |
//! | [`parser`] | `parse` entry point |
//! | [`eval`] | `evaluate`, `truthy` |
//!
//! # Quick start
//!
//! ```rust
//! use serde_json::json;
//!
//! let parsed = brickie_expr::parse("user.age >= 18 ? 'adult' : 'minor'").unwrap();
//! assert_eq!(parsed.identifiers, vec!["user".to_string()]);
//!
//! let user = json!({ "age": 30 });
//! let value = brickie_expr::evaluate(&parsed.expr, &|name| {
//!     (name == "user").then(|| user.clone())
//! }).unwrap();
//! assert_eq!(value, json!("adult"));
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Parsed};
pub use error::{EvalError, ParseError};
pub use eval::{evaluate, truthy};
pub use parser::parse;


#[cfg(test)]
mod eval_tests {
    use serde_json::{Value, json};

    use super::*;

    fn eval_with(src: &str, vars: Value) -> Result<Value, EvalError> {
        let parsed = parse(src).unwrap();
        evaluate(&parsed.expr, &|name| vars.get(name).cloned())
    }

    fn eval(src: &str, vars: Value) -> Value {
        eval_with(src, vars).unwrap()
    }

    #[test]
    fn reads_variable() {
        assert_eq!(eval("greeting", json!({ "greeting": "hi" })), json!("hi"));
    }

    #[test]
    fn unbound_variable_is_null() {
        assert_eq!(eval("missing", json!({})), Value::Null);
    }

    #[test]
    fn nested_member() {
        let vars = json!({ "user": { "address": { "city": "Pune" } } });
        assert_eq!(eval("user.address.city", vars), json!("Pune"));
    }

    #[test]
    fn member_of_null_fails() {
        assert!(eval_with("user.name", json!({})).is_err());
    }

    #[test]
    fn array_index_and_length() {
        let vars = json!({ "items": ["a", "b", "c"] });
        assert_eq!(eval("items[1]", vars.clone()), json!("b"));
        assert_eq!(eval("items.length", vars), json!(3));
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(eval("count + 1", json!({ "count": 41 })), json!(42));
    }

    #[test]
    fn fractional_arithmetic() {
        assert_eq!(eval("1 / 4", json!({})), json!(0.25));
    }

    #[test]
    fn division_by_zero_fails() {
        assert!(eval_with("1 / 0", json!({})).is_err());
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval("'Hello, ' + name", json!({ "name": "Ada" })), json!("Hello, Ada"));
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("3 > 2", json!({})), json!(true));
        assert_eq!(eval("'a' < 'b'", json!({})), json!(true));
        assert_eq!(eval("1 == 1.0", json!({})), json!(true));
        assert_eq!(eval("x != null", json!({ "x": 0 })), json!(true));
    }

    #[test]
    fn logical_operators_short_circuit() {
        // `missing.field` would fail if evaluated.
        assert_eq!(eval("false && missing.field", json!({})), json!(false));
        assert_eq!(eval("'x' || missing.field", json!({})), json!("x"));
    }

    #[test]
    fn ternary_picks_branch() {
        assert_eq!(eval("n > 1 ? 'many' : 'one'", json!({ "n": 5 })), json!("many"));
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&Value::Null));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!("0")));
    }

    #[test]
    fn negation_and_not() {
        assert_eq!(eval("-n", json!({ "n": 3 })), json!(-3));
        assert_eq!(eval("!flag", json!({ "flag": false })), json!(true));
    }
}
