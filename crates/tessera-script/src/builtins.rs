//! Global functions and constants available to every snippet.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::ast::BinOp;
use crate::env::Env;
use crate::error::{ScriptError, ScriptResult};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::ops;
use crate::value::{BuiltinFn, BuiltinType, TypeRef, Value, quote};

pub(crate) fn install(globals: &Env) {
    for builtin in BuiltinType::ALL {
        globals.define(builtin.name(), Value::Type(TypeRef::Builtin(builtin)));
    }
    globals.define("pi", Value::Float(PI));
    globals.define("argv", Value::list(Vec::new()));

    let functions: &[(&'static str, BuiltinFn)] = &[
        ("print", print),
        ("len", len),
        ("repr", repr),
        ("isinstance", isinstance),
        ("range", range),
        ("abs", abs),
        ("min", min),
        ("max", max),
        ("sum", sum),
        ("round", round),
        ("sqrt", sqrt),
        ("floor", floor),
        ("ceil", ceil),
        ("sin", sin),
        ("cos", cos),
        ("exp", exp),
        ("log", log),
        ("keys", keys),
        ("values", values),
        ("emit", emit),
        ("renderer", renderer),
    ];
    for (name, func) in functions {
        globals.define(*name, Value::builtin(*name, *func));
    }

    #[cfg(feature = "plot")]
    plotting::install(globals);
}

// ── Argument helpers ──────────────────────────────────────────────────

pub(crate) fn arity(name: &str, args: &[Value], min: usize, max: usize) -> ScriptResult<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("{min}")
    } else {
        format!("{min} to {max}")
    };
    Err(ScriptError::type_error(format!(
        "`{name}()` takes {expected} argument{} but {} given",
        if max == 1 { "" } else { "s" },
        args.len()
    )))
}

pub(crate) fn number(name: &str, value: &Value) -> ScriptResult<f64> {
    value.as_f64().ok_or_else(|| {
        ScriptError::type_error(format!(
            "`{name}()` expects a number, got `{}`",
            value.type_name()
        ))
    })
}

pub(crate) fn integer(name: &str, value: &Value) -> ScriptResult<i64> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Bool(flag) => Ok(i64::from(*flag)),
        other => Err(ScriptError::type_error(format!(
            "`{name}()` expects an int, got `{}`",
            other.type_name()
        ))),
    }
}

pub(crate) fn text<'a>(name: &str, value: &'a Value) -> ScriptResult<&'a str> {
    match value {
        Value::Str(text) => Ok(text.as_ref()),
        other => Err(ScriptError::type_error(format!(
            "`{name}()` expects a str, got `{}`",
            other.type_name()
        ))),
    }
}

fn float_to_int(name: &str, value: f64) -> ScriptResult<Value> {
    if !value.is_finite() || value.abs() >= 9.2e18 {
        return Err(ScriptError::value(format!(
            "`{name}()` cannot convert {value} to int"
        )));
    }
    Ok(Value::Int(value as i64))
}

/// Single list argument or two-plus positional arguments, as `min`/`max` take them.
fn candidates(name: &str, args: Vec<Value>) -> ScriptResult<Vec<Value>> {
    if args.is_empty() {
        return Err(ScriptError::type_error(format!(
            "`{name}()` expects at least 1 argument"
        )));
    }
    let items = if args.len() == 1 {
        ops::iterate(&args[0])?
    } else {
        args
    };
    if items.is_empty() {
        return Err(ScriptError::value(format!("`{name}()` of an empty sequence")));
    }
    Ok(items)
}

// ── Functions ─────────────────────────────────────────────────────────

fn print(interp: &mut Interpreter, host: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in &args {
        parts.push(interp.to_str(arg, host)?);
    }
    host.print(&parts.join(" "));
    Ok(Value::Nil)
}

fn len(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("len", &args, 1, 1)?;
    let count = match &args[0] {
        Value::Str(text) => text.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        other => {
            return Err(ScriptError::type_error(format!(
                "`{}` value has no len()",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
}

fn repr(interp: &mut Interpreter, host: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("repr", &args, 1, 1)?;
    interp.repr(&args[0], host).map(Value::str)
}

fn isinstance(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("isinstance", &args, 2, 2)?;
    match &args[1] {
        Value::Type(ty) => Ok(Value::Bool(args[0].type_ref().is_subtype_of(ty))),
        other => Err(ScriptError::type_error(format!(
            "`isinstance()` expects a type, got `{}`",
            other.type_name()
        ))),
    }
}

fn range(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("range", &args, 1, 3)?;
    let bounds = args
        .iter()
        .map(|arg| integer("range", arg))
        .collect::<ScriptResult<Vec<_>>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => unreachable!("arity checked"),
    };
    if step == 0 {
        return Err(ScriptError::value("`range()` step must not be zero"));
    }
    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::Int(current));
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(Value::list(items))
}

fn abs(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("abs", &args, 1, 1)?;
    match &args[0] {
        Value::Int(v) => v
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| ScriptError::value("integer overflow in `abs()`")),
        Value::Bool(flag) => Ok(Value::Int(i64::from(*flag))),
        other => number("abs", other).map(|v| Value::Float(v.abs())),
    }
}

fn extreme(name: &str, args: Vec<Value>, keep: Ordering) -> ScriptResult<Value> {
    let mut items = candidates(name, args)?.into_iter();
    let mut best = items.next().unwrap_or(Value::Nil);
    for item in items {
        if ops::compare(&item, &best)? == keep {
            best = item;
        }
    }
    Ok(best)
}

fn min(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    extreme("min", args, Ordering::Less)
}

fn max(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    extreme("max", args, Ordering::Greater)
}

fn sum(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("sum", &args, 1, 2)?;
    let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
    for item in ops::iterate(&args[0])? {
        total = ops::binary(BinOp::Add, &total, &item)?;
    }
    Ok(total)
}

fn round(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("round", &args, 1, 2)?;
    let value = number("round", &args[0])?;
    match args.get(1) {
        None => float_to_int("round", value.round()),
        Some(digits) => {
            let digits = integer("round", digits)?.clamp(-300, 300);
            let scale = 10f64.powi(i32::try_from(digits).unwrap_or(0));
            Ok(Value::Float((value * scale).round() / scale))
        }
    }
}

fn unary_math(
    name: &str,
    args: &[Value],
    domain: fn(f64) -> bool,
    apply: fn(f64) -> f64,
) -> ScriptResult<Value> {
    arity(name, args, 1, 1)?;
    let value = number(name, &args[0])?;
    if !domain(value) {
        return Err(ScriptError::value(format!("`{name}()` math domain error")));
    }
    Ok(Value::Float(apply(value)))
}

fn sqrt(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    unary_math("sqrt", &args, |v| v >= 0.0, f64::sqrt)
}

fn sin(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    unary_math("sin", &args, f64::is_finite, f64::sin)
}

fn cos(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    unary_math("cos", &args, f64::is_finite, f64::cos)
}

fn exp(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    unary_math("exp", &args, |_| true, f64::exp)
}

fn floor(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("floor", &args, 1, 1)?;
    float_to_int("floor", number("floor", &args[0])?.floor())
}

fn ceil(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("ceil", &args, 1, 1)?;
    float_to_int("ceil", number("ceil", &args[0])?.ceil())
}

fn log(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("log", &args, 1, 2)?;
    let value = number("log", &args[0])?;
    if value <= 0.0 {
        return Err(ScriptError::value("`log()` math domain error"));
    }
    match args.get(1) {
        None => Ok(Value::Float(value.ln())),
        Some(base) => {
            let base = number("log", base)?;
            if base <= 0.0 || base == 1.0 {
                return Err(ScriptError::value("`log()` math domain error"));
            }
            Ok(Value::Float(value.log(base)))
        }
    }
}

fn keys(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("keys", &args, 1, 1)?;
    match &args[0] {
        Value::Map(entries) => Ok(Value::list(
            entries.borrow().keys().map(Value::str).collect(),
        )),
        other => Err(ScriptError::type_error(format!(
            "`keys()` expects a map, got `{}`",
            other.type_name()
        ))),
    }
}

fn values(_: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("values", &args, 1, 1)?;
    match &args[0] {
        Value::Map(entries) => Ok(Value::list(entries.borrow().values().cloned().collect())),
        other => Err(ScriptError::type_error(format!(
            "`values()` expects a map, got `{}`",
            other.type_name()
        ))),
    }
}

fn emit(interp: &mut Interpreter, host: &mut dyn Host, mut args: Vec<Value>) -> ScriptResult<Value> {
    arity("emit", &args, 1, 2)?;
    let name = if args.len() == 2 { args.pop() } else { None };
    let name = match name {
        None | Some(Value::Nil) => None,
        Some(Value::Str(name)) => Some(name.to_string()),
        Some(other) => {
            return Err(ScriptError::type_error(format!(
                "`emit()` name must be a str, got `{}`",
                other.type_name()
            )));
        }
    };
    let value = args.pop().unwrap_or(Value::Nil);
    host.emit(interp, value, name)?;
    Ok(Value::Nil)
}

fn renderer(_: &mut Interpreter, host: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
    arity("renderer", &args, 2, 2)?;
    let ty = match &args[0] {
        Value::Type(ty) => ty.clone(),
        other => {
            return Err(ScriptError::type_error(format!(
                "`renderer()` expects a type, got `{}`",
                other.type_name()
            )));
        }
    };
    if !args[1].is_callable() {
        return Err(ScriptError::type_error(format!(
            "`renderer()` handler must be callable, got `{}`",
            args[1].type_name()
        )));
    }
    host.register_renderer(ty, args[1].clone())?;
    Ok(Value::Nil)
}

// ── Type conversions ──────────────────────────────────────────────────

/// Calling a builtin type value: `int("3")`, `str(x)`, `type(x)`, `figure()`.
pub(crate) fn convert(
    interp: &mut Interpreter,
    host: &mut dyn Host,
    ty: BuiltinType,
    args: Vec<Value>,
) -> ScriptResult<Value> {
    let name = ty.name();
    match ty {
        BuiltinType::Nil => {
            arity(name, &args, 0, 0)?;
            Ok(Value::Nil)
        }
        BuiltinType::Bool => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
        }
        BuiltinType::Int => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Int(0)),
                Some(Value::Int(v)) => Ok(Value::Int(*v)),
                Some(Value::Bool(flag)) => Ok(Value::Int(i64::from(*flag))),
                Some(Value::Float(v)) => float_to_int(name, v.trunc()),
                Some(Value::Str(text)) => text
                    .trim()
                    .replace('_', "")
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| {
                        ScriptError::value(format!("invalid literal for int: {}", quote(text)))
                    }),
                Some(other) => Err(ScriptError::type_error(format!(
                    "cannot convert `{}` to int",
                    other.type_name()
                ))),
            }
        }
        BuiltinType::Float => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Float(0.0)),
                Some(Value::Str(text)) => {
                    text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                        ScriptError::value(format!("invalid literal for float: {}", quote(text)))
                    })
                }
                Some(other) => number(name, other).map(Value::Float),
            }
        }
        BuiltinType::Str => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::str("")),
                Some(value) => interp.to_str(value, host).map(Value::str),
            }
        }
        BuiltinType::List => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::list(Vec::new())),
                Some(value) => ops::iterate(value).map(Value::list),
            }
        }
        BuiltinType::Map => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::map(BTreeMap::new())),
                Some(Value::Map(entries)) => Ok(Value::map(entries.borrow().clone())),
                Some(Value::List(pairs)) => {
                    let mut map = BTreeMap::new();
                    for pair in pairs.borrow().iter() {
                        let entry = ops::iterate(pair)?;
                        match entry.as_slice() {
                            [Value::Str(key), value] => {
                                map.insert(key.to_string(), value.clone());
                            }
                            _ => {
                                return Err(ScriptError::value(
                                    "`map()` expects [str, value] pairs",
                                ));
                            }
                        }
                    }
                    Ok(Value::map(map))
                }
                Some(other) => Err(ScriptError::type_error(format!(
                    "cannot convert `{}` to map",
                    other.type_name()
                ))),
            }
        }
        BuiltinType::Type => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Type(args[0].type_ref()))
        }
        BuiltinType::Figure => new_figure(interp, &args),
        BuiltinType::Object | BuiltinType::Function => Err(ScriptError::type_error(format!(
            "type `{name}` cannot be called"
        ))),
    }
}

#[cfg(feature = "plot")]
fn new_figure(interp: &mut Interpreter, args: &[Value]) -> ScriptResult<Value> {
    arity("figure", args, 0, 2)?;
    let dimension = |index: usize| -> ScriptResult<Option<u32>> {
        match args.get(index) {
            None | Some(Value::Nil) => Ok(None),
            Some(value) => {
                let raw = integer("figure", value)?;
                u32::try_from(raw)
                    .ok()
                    .filter(|size| (1..=4096).contains(size))
                    .map(Some)
                    .ok_or_else(|| {
                        ScriptError::value(format!("figure dimension {raw} is outside 1..=4096"))
                    })
            }
        }
    };
    let (width, height) = (dimension(0)?, dimension(1)?);
    Ok(Value::Figure(interp.new_figure(width, height)))
}

#[cfg(not(feature = "plot"))]
fn new_figure(_: &mut Interpreter, _: &[Value]) -> ScriptResult<Value> {
    Err(ScriptError::unavailable(
        "plotting support is not compiled in (enable the `plot` feature)",
    ))
}

#[cfg(feature = "plot")]
mod plotting {
    use super::*;
    use crate::figure::SeriesKind;
    use crate::methods;

    pub(super) fn install(globals: &Env) {
        let functions: &[(&'static str, BuiltinFn)] = &[
            ("gcf", gcf),
            ("clf", clf),
            ("plot", plot),
            ("scatter", scatter),
            ("title", title),
        ];
        for (name, func) in functions {
            globals.define(*name, Value::builtin(*name, *func));
        }
    }

    fn gcf(interp: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
        arity("gcf", &args, 0, 0)?;
        interp.current_figure().map(Value::Figure)
    }

    fn clf(interp: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
        arity("clf", &args, 0, 0)?;
        interp.clear_figure();
        Ok(Value::Nil)
    }

    fn plot(interp: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
        let figure = interp.current_figure()?;
        let points = methods::series_points("plot", &args, true)?;
        figure.borrow_mut().add_series(SeriesKind::Line, points);
        Ok(Value::Figure(figure))
    }

    fn scatter(interp: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
        let figure = interp.current_figure()?;
        let points = methods::series_points("scatter", &args, false)?;
        figure.borrow_mut().add_series(SeriesKind::Scatter, points);
        Ok(Value::Figure(figure))
    }

    fn title(interp: &mut Interpreter, _: &mut dyn Host, args: Vec<Value>) -> ScriptResult<Value> {
        arity("title", &args, 1, 1)?;
        let text = text("title", &args[0])?.to_string();
        let figure = interp.current_figure()?;
        figure.borrow_mut().title = Some(text);
        Ok(Value::Figure(figure))
    }
}
