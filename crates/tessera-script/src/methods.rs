//! Methods on builtin values: `xs.push(1)`, `s.upper()`, `m.get("k")`, `f.plot(ys)`.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::builtins::{arity, integer, number, text};
use crate::error::{ScriptError, ScriptResult};
use crate::figure::{Figure, SeriesKind};
use crate::ops;
use crate::value::Value;

type List = Rc<RefCell<Vec<Value>>>;
type Map = Rc<RefCell<BTreeMap<String, Value>>>;

pub(crate) fn call(receiver: &Value, name: &str, args: Vec<Value>) -> ScriptResult<Value> {
    match receiver {
        Value::List(items) => list_method(items, name, args),
        Value::Str(text) => str_method(text, name, args),
        Value::Map(entries) => map_method(entries, name, args),
        Value::Figure(figure) => figure_method(receiver, figure, name, args),
        other => Err(no_method(other, name)),
    }
}

fn no_method(receiver: &Value, name: &str) -> ScriptError {
    ScriptError::Attribute(format!(
        "`{}` value has no method `{name}`",
        receiver.type_name()
    ))
}

fn first(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Nil)
}

fn list_method(items: &List, name: &str, args: Vec<Value>) -> ScriptResult<Value> {
    match name {
        "push" | "append" => {
            arity(name, &args, 1, 1)?;
            items.borrow_mut().push(first(args));
            Ok(Value::Nil)
        }
        "pop" => {
            arity(name, &args, 0, 1)?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(ScriptError::Index("pop from empty list".into()));
            }
            let requested = match args.first() {
                Some(index) => integer(name, index)?,
                None => -1,
            };
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let resolved = if requested < 0 { requested + len } else { requested };
            match usize::try_from(resolved).ok().filter(|i| *i < items.len()) {
                Some(index) => Ok(items.remove(index)),
                None => Err(ScriptError::Index(format!(
                    "pop index {requested} out of range"
                ))),
            }
        }
        "insert" => {
            arity(name, &args, 2, 2)?;
            let requested = integer(name, &args[0])?;
            let mut items = items.borrow_mut();
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let resolved = if requested < 0 { requested + len } else { requested };
            let index = usize::try_from(resolved.clamp(0, len)).unwrap_or(0);
            items.insert(index, args[1].clone());
            Ok(Value::Nil)
        }
        "contains" => {
            arity(name, &args, 1, 1)?;
            for item in items.borrow().iter() {
                if ops::equals(item, &args[0])? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "index" => {
            arity(name, &args, 1, 1)?;
            for (index, item) in items.borrow().iter().enumerate() {
                if ops::equals(item, &args[0])? {
                    return Ok(Value::Int(i64::try_from(index).unwrap_or(i64::MAX)));
                }
            }
            Err(ScriptError::value("value is not in list"))
        }
        "reverse" => {
            arity(name, &args, 0, 0)?;
            items.borrow_mut().reverse();
            Ok(Value::Nil)
        }
        "sort" => {
            arity(name, &args, 0, 0)?;
            let mut failure = None;
            items.borrow_mut().sort_by(|a, b| {
                ops::compare(a, b).unwrap_or_else(|err| {
                    failure.get_or_insert(err);
                    Ordering::Equal
                })
            });
            match failure {
                Some(err) => Err(err),
                None => Ok(Value::Nil),
            }
        }
        "copy" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(items.borrow().clone()))
        }
        "len" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::Int(i64::try_from(items.borrow().len()).unwrap_or(i64::MAX)))
        }
        _ => Err(no_method(&Value::List(Rc::clone(items)), name)),
    }
}

fn str_method(receiver: &Rc<str>, name: &str, args: Vec<Value>) -> ScriptResult<Value> {
    let receiver: &str = receiver;
    match name {
        "upper" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::str(receiver.to_uppercase()))
        }
        "lower" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::str(receiver.to_lowercase()))
        }
        "strip" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::str(receiver.trim()))
        }
        "split" => {
            arity(name, &args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Nil) => receiver.split_whitespace().map(Value::str).collect(),
                Some(separator) => {
                    let separator = text(name, separator)?;
                    if separator.is_empty() {
                        return Err(ScriptError::value("empty separator"));
                    }
                    receiver.split(separator).map(Value::str).collect()
                }
            };
            Ok(Value::list(parts))
        }
        "join" => {
            arity(name, &args, 1, 1)?;
            let pieces = ops::iterate(&args[0])?;
            let mut parts = Vec::with_capacity(pieces.len());
            for piece in &pieces {
                parts.push(text(name, piece)?);
            }
            Ok(Value::str(parts.join(receiver)))
        }
        "replace" => {
            arity(name, &args, 2, 2)?;
            let from = text(name, &args[0])?;
            let to = text(name, &args[1])?;
            Ok(Value::str(receiver.replace(from, to)))
        }
        "startswith" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Bool(receiver.starts_with(text(name, &args[0])?)))
        }
        "endswith" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Bool(receiver.ends_with(text(name, &args[0])?)))
        }
        "contains" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Bool(receiver.contains(text(name, &args[0])?)))
        }
        "len" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::Int(
                i64::try_from(receiver.chars().count()).unwrap_or(i64::MAX),
            ))
        }
        _ => Err(no_method(&Value::str(receiver), name)),
    }
}

fn map_method(entries: &Map, name: &str, args: Vec<Value>) -> ScriptResult<Value> {
    match name {
        "keys" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(entries.borrow().keys().map(Value::str).collect()))
        }
        "values" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(entries.borrow().values().cloned().collect()))
        }
        "get" => {
            arity(name, &args, 1, 2)?;
            let key = text(name, &args[0])?;
            let found = entries.borrow().get(key).cloned();
            Ok(found.unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::Nil)))
        }
        "contains" => {
            arity(name, &args, 1, 1)?;
            let key = text(name, &args[0])?;
            Ok(Value::Bool(entries.borrow().contains_key(key)))
        }
        "remove" => {
            arity(name, &args, 1, 1)?;
            let key = text(name, &args[0])?;
            entries
                .borrow_mut()
                .remove(key)
                .ok_or_else(|| ScriptError::Key(format!("key \"{key}\" not found")))
        }
        "len" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::Int(i64::try_from(entries.borrow().len()).unwrap_or(i64::MAX)))
        }
        _ => Err(no_method(&Value::Map(Rc::clone(entries)), name)),
    }
}

fn figure_method(
    receiver: &Value,
    figure: &Rc<RefCell<Figure>>,
    name: &str,
    args: Vec<Value>,
) -> ScriptResult<Value> {
    match name {
        "plot" => {
            let points = series_points(name, &args, true)?;
            figure.borrow_mut().add_series(SeriesKind::Line, points);
        }
        "scatter" => {
            let points = series_points(name, &args, false)?;
            figure.borrow_mut().add_series(SeriesKind::Scatter, points);
        }
        "title" => {
            arity(name, &args, 1, 1)?;
            figure.borrow_mut().title = Some(text(name, &args[0])?.to_string());
        }
        "clear" => {
            arity(name, &args, 0, 0)?;
            figure.borrow_mut().clear();
        }
        _ => return Err(no_method(receiver, name)),
    }
    Ok(receiver.clone())
}

/// `(ys)` or `(xs, ys)` as points; a lone `ys` is plotted against `0, 1, 2, ...`.
pub(crate) fn series_points(
    name: &str,
    args: &[Value],
    allow_single: bool,
) -> ScriptResult<Vec<(f64, f64)>> {
    let min = if allow_single { 1 } else { 2 };
    arity(name, args, min, 2)?;

    let numbers = |value: &Value| -> ScriptResult<Vec<f64>> {
        ops::iterate(value)?
            .iter()
            .map(|item| number(name, item))
            .collect()
    };

    match args {
        [ys] => Ok(numbers(ys)?
            .into_iter()
            .enumerate()
            .map(|(i, y)| (i as f64, y))
            .collect()),
        [xs, ys] => {
            let (xs, ys) = (numbers(xs)?, numbers(ys)?);
            if xs.len() != ys.len() {
                return Err(ScriptError::value(format!(
                    "`{name}()` got {} x values but {} y values",
                    xs.len(),
                    ys.len()
                )));
            }
            Ok(xs.into_iter().zip(ys).collect())
        }
        _ => unreachable!("arity checked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_pop_and_insert() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(call(&list, "pop", vec![]).unwrap(), Value::Int(2));
        call(&list, "insert", vec![Value::Int(0), Value::Int(9)]).unwrap();
        assert_eq!(list, Value::list(vec![Value::Int(9), Value::Int(1)]));
    }

    #[test]
    fn sort_reports_incomparable_items() {
        let list = Value::list(vec![Value::Int(1), Value::str("a")]);
        assert!(matches!(call(&list, "sort", vec![]), Err(ScriptError::Type(_))));
    }

    #[test]
    fn string_split_and_join() {
        let parts = call(&Value::str("a b  c"), "split", vec![]).unwrap();
        assert_eq!(
            parts,
            Value::list(vec![Value::str("a"), Value::str("b"), Value::str("c")])
        );
        let joined = call(&Value::str("-"), "join", vec![parts]).unwrap();
        assert_eq!(joined, Value::str("a-b-c"));
    }

    #[test]
    fn map_get_with_default() {
        let map = Value::map(BTreeMap::from([("k".to_string(), Value::Int(1))]));
        assert_eq!(call(&map, "get", vec![Value::str("k")]).unwrap(), Value::Int(1));
        assert_eq!(
            call(&map, "get", vec![Value::str("x"), Value::Int(0)]).unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn unknown_method_is_an_attribute_error() {
        let err = call(&Value::Int(1), "upper", vec![]).unwrap_err();
        assert!(matches!(err, ScriptError::Attribute(_)));
    }

    #[test]
    fn series_lengths_must_match() {
        let xs = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let ys = Value::list(vec![Value::Int(1)]);
        assert!(series_points("plot", &[xs, ys], true).is_err());
    }
}
