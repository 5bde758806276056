//! Operator semantics shared by expressions, assignments and builtins.

use std::{cmp::Ordering, rc::Rc};

use crate::ast::{BinOp, UnaryOp};
use crate::error::{ScriptError, ScriptResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Int(v) => Some(Num::Int(*v)),
            Value::Bool(flag) => Some(Num::Int(i64::from(*flag))),
            Value::Float(v) => Some(Num::Float(*v)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::Int(v) => v == 0,
            Num::Float(v) => v == 0.0,
        }
    }
}

fn overflow(op: BinOp) -> ScriptError {
    ScriptError::value(format!("integer overflow in `{}`", op.symbol()))
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> ScriptError {
    ScriptError::type_error(format!(
        "unsupported operand types for `{}`: `{}` and `{}`",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

pub fn unary(op: UnaryOp, operand: &Value) -> ScriptResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
        UnaryOp::Neg => match Num::of(operand) {
            Some(Num::Int(v)) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ScriptError::value("integer overflow in unary `-`")),
            Some(Num::Float(v)) => Ok(Value::Float(-v)),
            None => Err(ScriptError::type_error(format!(
                "bad operand type for unary `-`: `{}`",
                operand.type_name()
            ))),
        },
    }
}

/// Apply a binary operator to two evaluated operands. `and`/`or` here do not short-circuit.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> ScriptResult<Value> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(equals(left, right)?)),
        BinOp::NotEq => return Ok(Value::Bool(!equals(left, right)?)),
        BinOp::Less | BinOp::LessEq | BinOp::Greater | BinOp::GreaterEq => {
            let ordering = compare(left, right)?;
            let result = match op {
                BinOp::Less => ordering == Ordering::Less,
                BinOp::LessEq => ordering != Ordering::Greater,
                BinOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            return Ok(Value::Bool(result));
        }
        BinOp::And | BinOp::Or => {
            let result = if op == BinOp::And {
                if left.truthy() { right } else { left }
            } else if left.truthy() {
                left
            } else {
                right
            };
            return Ok(result.clone());
        }
        _ => {}
    }

    match (left, right) {
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            return Ok(Value::str(joined));
        }
        (Value::List(a), Value::List(b)) if op == BinOp::Add => {
            let mut joined = a.borrow().clone();
            joined.extend(b.borrow().iter().cloned());
            return Ok(Value::list(joined));
        }
        (Value::Str(_) | Value::List(_), Value::Int(_))
        | (Value::Int(_), Value::Str(_) | Value::List(_))
            if op == BinOp::Mul =>
        {
            return repeat(left, right);
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (Num::of(left), Num::of(right)) else {
        return Err(unsupported(op, left, right));
    };

    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int_arith(op, x, y),
        _ => float_arith(op, a.as_f64(), b.as_f64(), b.is_zero()),
    }
}

fn int_arith(op: BinOp, x: i64, y: i64) -> ScriptResult<Value> {
    let value = match op {
        BinOp::Add => x.checked_add(y).ok_or_else(|| overflow(op))?,
        BinOp::Sub => x.checked_sub(y).ok_or_else(|| overflow(op))?,
        BinOp::Mul => x.checked_mul(y).ok_or_else(|| overflow(op))?,
        BinOp::Div => {
            if y == 0 {
                return Err(ScriptError::DivisionByZero);
            }
            match x.checked_rem(y) {
                Some(0) => x.checked_div(y).ok_or_else(|| overflow(op))?,
                _ => return Ok(Value::Float(x as f64 / y as f64)),
            }
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(ScriptError::DivisionByZero);
            }
            let rem = x.checked_rem(y).ok_or_else(|| overflow(op))?;
            if rem != 0 && (rem < 0) != (y < 0) {
                rem + y
            } else {
                rem
            }
        }
        _ => unreachable!("non-arithmetic operator {op:?}"),
    };
    Ok(Value::Int(value))
}

fn float_arith(op: BinOp, x: f64, y: f64, divisor_is_zero: bool) -> ScriptResult<Value> {
    let value = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if divisor_is_zero {
                return Err(ScriptError::DivisionByZero);
            }
            x / y
        }
        BinOp::Mod => {
            if divisor_is_zero {
                return Err(ScriptError::DivisionByZero);
            }
            let rem = x % y;
            if rem != 0.0 && (rem < 0.0) != (y < 0.0) {
                rem + y
            } else {
                rem
            }
        }
        _ => unreachable!("non-arithmetic operator {op:?}"),
    };
    Ok(Value::Float(value))
}

fn repeat(left: &Value, right: &Value) -> ScriptResult<Value> {
    let (sequence, count) = match (left, right) {
        (Value::Int(count), sequence) | (sequence, Value::Int(count)) => (sequence, *count),
        _ => return Err(unsupported(BinOp::Mul, left, right)),
    };
    let count = usize::try_from(count).unwrap_or(0);
    match sequence {
        Value::Str(text) => Ok(Value::str(text.repeat(count))),
        Value::List(items) => {
            let items = items.borrow();
            let mut repeated = Vec::with_capacity(items.len().saturating_mul(count));
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::list(repeated))
        }
        _ => Err(unsupported(BinOp::Mul, left, right)),
    }
}

/// Lists and maps nested deeper than this cannot be compared with `==`.
pub const MAX_COMPARE_DEPTH: usize = 64;

/// Structural equality behind `==`, `!=` and the list `contains`/`index`
/// methods. Containers are compared element-wise down to
/// [`MAX_COMPARE_DEPTH`]; anything else compares shallowly.
pub fn equals(left: &Value, right: &Value) -> ScriptResult<bool> {
    equals_within(left, right, MAX_COMPARE_DEPTH)
}

fn equals_within(left: &Value, right: &Value, budget: usize) -> ScriptResult<bool> {
    match (left, right) {
        (Value::List(a), Value::List(b)) => {
            if Rc::ptr_eq(a, b) {
                return Ok(true);
            }
            let budget = nested(budget)?;
            let (a, b) = (a.borrow(), b.borrow());
            if a.len() != b.len() {
                return Ok(false);
            }
            for (x, y) in a.iter().zip(b.iter()) {
                if !equals_within(x, y, budget)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Map(a), Value::Map(b)) => {
            if Rc::ptr_eq(a, b) {
                return Ok(true);
            }
            let budget = nested(budget)?;
            let (a, b) = (a.borrow(), b.borrow());
            if a.len() != b.len() {
                return Ok(false);
            }
            for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                if ka != kb || !equals_within(va, vb, budget)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::BoundMethod(a), Value::BoundMethod(b)) => Ok(Rc::ptr_eq(&a.function, &b.function)
            && equals_within(&a.receiver, &b.receiver, nested(budget)?)?),
        _ => Ok(left.shallow_eq(right)),
    }
}

fn nested(budget: usize) -> ScriptResult<usize> {
    budget
        .checked_sub(1)
        .ok_or_else(|| ScriptError::value("comparison too deeply nested"))
}

/// Ordering for `<`-style comparisons, `sort`, `min` and `max`.
pub fn compare(left: &Value, right: &Value) -> ScriptResult<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (Num::of(left), Num::of(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(a.cmp(&b)),
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()).ok_or_else(|| {
                ScriptError::value("cannot order NaN")
            }),
            _ => Err(ScriptError::type_error(format!(
                "cannot compare `{}` with `{}`",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

/// Resolve a possibly negative index against `len`.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn int_index(index: &Value, container: &str) -> ScriptResult<i64> {
    match index {
        Value::Int(i) => Ok(*i),
        Value::Bool(flag) => Ok(i64::from(*flag)),
        other => Err(ScriptError::type_error(format!(
            "{container} indices must be int, not `{}`",
            other.type_name()
        ))),
    }
}

fn map_key(index: &Value) -> ScriptResult<&str> {
    match index {
        Value::Str(key) => Ok(key.as_ref()),
        other => Err(ScriptError::type_error(format!(
            "map keys must be str, not `{}`",
            other.type_name()
        ))),
    }
}

pub fn index(object: &Value, index: &Value) -> ScriptResult<Value> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let i = int_index(index, "list")?;
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| ScriptError::Index(format!("list index {i} out of range")))
        }
        Value::Str(text) => {
            let i = int_index(index, "str")?;
            let count = text.chars().count();
            normalize_index(i, count)
                .and_then(|i| text.chars().nth(i))
                .map(|ch| Value::str(ch.to_string()))
                .ok_or_else(|| ScriptError::Index(format!("str index {i} out of range")))
        }
        Value::Map(entries) => {
            let key = map_key(index)?;
            entries
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| ScriptError::Key(format!("key \"{key}\" not found")))
        }
        other => Err(ScriptError::type_error(format!(
            "`{}` value is not indexable",
            other.type_name()
        ))),
    }
}

pub fn set_index(object: &Value, index: &Value, value: Value) -> ScriptResult<()> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let i = int_index(index, "list")?;
            let slot = normalize_index(i, items.len())
                .ok_or_else(|| ScriptError::Index(format!("list index {i} out of range")))?;
            items[slot] = value;
            Ok(())
        }
        Value::Map(entries) => {
            let key = map_key(index)?.to_string();
            entries.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(ScriptError::type_error(format!(
            "`{}` value does not support item assignment",
            other.type_name()
        ))),
    }
}

/// Items visited by `for`, `list()` and friends.
pub fn iterate(value: &Value) -> ScriptResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Str(text) => Ok(text.chars().map(|ch| Value::str(ch.to_string())).collect()),
        Value::Map(entries) => Ok(entries.borrow().keys().map(Value::str).collect()),
        other => Err(ScriptError::type_error(format!(
            "`{}` value is not iterable",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Value {
        Value::Int(v)
    }

    #[test]
    fn integer_division_stays_exact_when_possible() {
        assert_eq!(binary(BinOp::Div, &int(6), &int(3)).unwrap(), int(2));
        assert!(matches!(
            binary(BinOp::Div, &int(7), &int(2)).unwrap(),
            Value::Float(v) if v == 3.5
        ));
    }

    #[test]
    fn modulo_is_floored() {
        assert_eq!(binary(BinOp::Mod, &int(-7), &int(3)).unwrap(), int(2));
        assert_eq!(binary(BinOp::Mod, &int(7), &int(-3)).unwrap(), int(-2));
    }

    #[test]
    fn division_by_zero() {
        assert!(matches!(
            binary(BinOp::Div, &int(1), &int(0)),
            Err(ScriptError::DivisionByZero)
        ));
        assert!(matches!(
            binary(BinOp::Mod, &Value::Float(1.0), &int(0)),
            Err(ScriptError::DivisionByZero)
        ));
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(binary(BinOp::Add, &int(i64::MAX), &int(1)).is_err());
    }

    #[test]
    fn mixed_numbers_promote() {
        assert!(matches!(
            binary(BinOp::Add, &int(1), &Value::Float(0.5)).unwrap(),
            Value::Float(v) if v == 1.5
        ));
    }

    #[test]
    fn sequences_concatenate_and_repeat() {
        assert_eq!(
            binary(BinOp::Add, &Value::str("ab"), &Value::str("c")).unwrap(),
            Value::str("abc")
        );
        assert_eq!(
            binary(BinOp::Mul, &int(3), &Value::str("x")).unwrap(),
            Value::str("xxx")
        );
        assert_eq!(
            binary(BinOp::Mul, &Value::list(vec![int(1)]), &int(2)).unwrap(),
            Value::list(vec![int(1), int(1)])
        );
    }

    #[test]
    fn mismatched_operands_are_type_errors() {
        let err = binary(BinOp::Add, &int(1), &Value::str("a")).unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let list = Value::list(vec![int(1), int(2), int(3)]);
        assert_eq!(index(&list, &int(-1)).unwrap(), int(3));
        assert!(matches!(index(&list, &int(3)), Err(ScriptError::Index(_))));
        assert_eq!(index(&Value::str("héllo"), &int(1)).unwrap(), Value::str("é"));
    }

    #[test]
    fn string_comparison_is_lexicographic() {
        assert_eq!(
            binary(BinOp::Less, &Value::str("apple"), &Value::str("banana")).unwrap(),
            Value::Bool(true)
        );
        assert!(compare(&Value::str("a"), &int(1)).is_err());
    }
}
