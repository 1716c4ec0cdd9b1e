use serde_json::Value;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::parser::number;

/// Evaluate `expr`, resolving identifiers through `lookup`.
///
/// Unbound identifiers evaluate to `null`. Reading a field of `null` is an
/// error, as is any arithmetic that does not produce a finite number.
pub fn evaluate(expr: &Expr, lookup: &dyn Fn(&str) -> Option<Value>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => Ok(lookup(name).unwrap_or(Value::Null)),
        Expr::Member(object, field) => {
            let object = evaluate(object, lookup)?;
            member(&object, field)
        }
        Expr::Index(object, index) => {
            let object = evaluate(object, lookup)?;
            let index = evaluate(index, lookup)?;
            match &index {
                Value::String(s) => member(&object, s),
                Value::Number(_) => member(&object, &to_display(&index)),
                other => Err(EvalError::new(format!("cannot index with {}", type_name(other)))),
            }
        }
        Expr::Array(items) => items
            .iter()
            .map(|item| evaluate(item, lookup))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Unary(op, operand) => {
            let value = evaluate(operand, lookup)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                UnaryOp::Neg => finite(-to_number(&value)?),
            }
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let left = evaluate(lhs, lookup)?;
            if truthy(&left) { evaluate(rhs, lookup) } else { Ok(left) }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let left = evaluate(lhs, lookup)?;
            if truthy(&left) { Ok(left) } else { evaluate(rhs, lookup) }
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = evaluate(lhs, lookup)?;
            let right = evaluate(rhs, lookup)?;
            binary(*op, &left, &right)
        }
        Expr::Conditional(cond, then, otherwise) => {
            if truthy(&evaluate(cond, lookup)?) {
                evaluate(then, lookup)
            } else {
                evaluate(otherwise, lookup)
            }
        }
    }
}

/// JavaScript-style truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ── helpers ───────────────────────────────────────────────────────────────

fn member(object: &Value, field: &str) -> Result<Value, EvalError> {
    match object {
        Value::Null => Err(EvalError::new(format!("cannot read property '{}' of null", field))),
        Value::Object(map) => Ok(map.get(field).cloned().unwrap_or(Value::Null)),
        Value::Array(items) => {
            if field == "length" {
                return Ok(Value::from(items.len()));
            }
            Ok(field
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null))
        }
        Value::String(s) if field == "length" => Ok(Value::from(s.chars().count())),
        _ => Ok(Value::Null),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => {
            if left.is_string() || right.is_string() {
                Ok(Value::String(format!("{}{}", to_display(left), to_display(right))))
            } else {
                finite(to_number(left)? + to_number(right)?)
            }
        }
        BinaryOp::Sub => finite(to_number(left)? - to_number(right)?),
        BinaryOp::Mul => finite(to_number(left)? * to_number(right)?),
        BinaryOp::Div => finite(to_number(left)? / to_number(right)?),
        BinaryOp::Rem => finite(to_number(left)? % to_number(right)?),
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!loose_eq(left, right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => a.partial_cmp(b),
                _ => to_number(left)?.partial_cmp(&to_number(right)?),
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators are handled in evaluate"),
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn to_number(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| EvalError::new("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| EvalError::new(format!("{:?} is not a number", s))),
        other => Err(EvalError::new(format!("{} is not a number", type_name(other)))),
    }
}

fn finite(n: f64) -> Result<Value, EvalError> {
    if n.is_finite() {
        Ok(number(n))
    } else {
        Err(EvalError::new("arithmetic produced a non-finite number"))
    }
}

fn to_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
