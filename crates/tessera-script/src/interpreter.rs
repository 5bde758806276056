//! Tree-walking evaluation over a persistent global frame.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ast::{BinOp, Expr, ExprKind, FnBody, FnDef, Stmt, StmtKind, Target};
use crate::builtins;
use crate::env::Env;
use crate::error::{ScriptError, ScriptResult};
use crate::figure::{DEFAULT_HEIGHT, DEFAULT_WIDTH, Figure};
use crate::host::Host;
use crate::methods;
use crate::ops;
use crate::parser::{parse_expression, parse_program};
use crate::value::{
    BoundMethod, BuiltinType, Class, ClassId, Function, Instance, TypeRef, Value, format_float,
    quote,
};

/// Script-level call nesting allowed before a recursion error.
pub const MAX_CALL_DEPTH: usize = 200;

/// Nested containers deeper than this print as `...`.
const MAX_REPR_DEPTH: usize = 32;

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// One interpreter owns one global namespace; every [`Interpreter::run`]
/// executes against it, so names defined by earlier sources stay visible.
#[derive(Debug)]
pub struct Interpreter {
    globals: Env,
    depth: usize,
    repr_depth: usize,
    next_class_id: ClassId,
    figure: Option<Rc<RefCell<Figure>>>,
    figure_size: (u32, u32),
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Env::global();
        builtins::install(&globals);
        Self {
            globals,
            depth: 0,
            repr_depth: 0,
            next_class_id: 1,
            figure: None,
            figure_size: (DEFAULT_WIDTH, DEFAULT_HEIGHT),
        }
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.define(name, value);
    }

    /// Expose pass-through command-line arguments as the `argv` list.
    pub fn set_argv<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = args.into_iter().map(Value::str).collect();
        self.set_global("argv", Value::list(items));
    }

    /// Execute a complete source in the global frame.
    pub fn run(&mut self, source: &str, host: &mut dyn Host) -> ScriptResult<()> {
        let program = parse_program(source)?;
        let env = self.globals.clone();
        for stmt in &program.stmts {
            self.exec_stmt(stmt, &env, host)?;
        }
        Ok(())
    }

    /// Evaluate a single expression against the global frame.
    pub fn evaluate(&mut self, source: &str, host: &mut dyn Host) -> ScriptResult<Value> {
        let expr = parse_expression(source)?;
        let env = self.globals.clone();
        self.eval(&expr, &env, host)
            .map_err(|err| err.at_line(expr.span.line))
    }

    // ── Calls ─────────────────────────────────────────────────────────

    pub fn call(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        host: &mut dyn Host,
    ) -> ScriptResult<Value> {
        match callee {
            Value::Function(function) => self.call_function(function, args, host),
            Value::Builtin(builtin) => (builtin.func)(self, host, args),
            Value::BoundMethod(bound) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(bound.receiver.clone());
                full.extend(args);
                self.call_function(&bound.function, full, host)
            }
            Value::Type(TypeRef::Class(class)) => self.instantiate(class, args, host),
            Value::Type(TypeRef::Builtin(builtin)) => builtins::convert(self, host, *builtin, args),
            other => Err(ScriptError::type_error(format!(
                "`{}` value is not callable",
                other.type_name()
            ))),
        }
    }

    /// A callable attribute defined on an instance or its class, bound to it.
    ///
    /// Only instances of script classes carry methods in this sense; builtin
    /// values answer `None`.
    pub fn method(&self, value: &Value, name: &str) -> Option<Value> {
        match value {
            Value::Instance(_) => self
                .get_field(value, name)
                .ok()
                .filter(Value::is_callable),
            _ => None,
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
        host: &mut dyn Host,
    ) -> ScriptResult<Value> {
        let def = &function.def;
        if args.len() != def.params.len() {
            return Err(ScriptError::type_error(format!(
                "`{}()` takes {} argument{} but {} given",
                def.name,
                def.params.len(),
                if def.params.len() == 1 { "" } else { "s" },
                args.len()
            )));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ScriptError::Recursion(MAX_CALL_DEPTH));
        }

        let frame = function.closure.child();
        for (param, arg) in def.params.iter().zip(args) {
            frame.define(param.clone(), arg);
        }

        self.depth += 1;
        let result = match &def.body {
            FnBody::Block(body) => self.exec_block(body, &frame, host).map(|flow| match flow {
                Flow::Return(value) => value,
                _ => Value::Nil,
            }),
            FnBody::Expr(expr) => self
                .eval(expr, &frame, host)
                .map_err(|err| err.at_line(expr.span.line)),
        };
        self.depth -= 1;
        result
    }

    fn instantiate(
        &mut self,
        class: &Rc<Class>,
        args: Vec<Value>,
        host: &mut dyn Host,
    ) -> ScriptResult<Value> {
        let instance = Value::Instance(Rc::new(Instance::new(Rc::clone(class))));
        match class.find_method("__init__") {
            Some(init) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(instance.clone());
                full.extend(args);
                self.call_function(&init, full, host)?;
            }
            None if !args.is_empty() => {
                return Err(ScriptError::type_error(format!(
                    "`{}()` takes no arguments",
                    class.name
                )));
            }
            None => {}
        }
        Ok(instance)
    }

    fn call_method(
        &mut self,
        object: &Value,
        name: &str,
        args: Vec<Value>,
        host: &mut dyn Host,
    ) -> ScriptResult<Value> {
        match object {
            Value::Instance(_) | Value::Type(TypeRef::Class(_)) => {
                let callee = self.get_field(object, name)?;
                self.call(&callee, args, host)
            }
            _ => methods::call(object, name, args),
        }
    }

    fn make_function(&self, def: &Rc<FnDef>, env: &Env) -> Value {
        Value::Function(Rc::new(Function {
            def: Rc::clone(def),
            closure: env.clone(),
        }))
    }

    // ── Statements ────────────────────────────────────────────────────

    fn exec_block(&mut self, body: &[Stmt], env: &Env, host: &mut dyn Host) -> ScriptResult<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt, env, host)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Env, host: &mut dyn Host) -> ScriptResult<Flow> {
        self.exec_stmt_kind(&stmt.kind, env, host)
            .map_err(|err| err.at_line(stmt.span.line))
    }

    fn exec_stmt_kind(
        &mut self,
        kind: &StmtKind,
        env: &Env,
        host: &mut dyn Host,
    ) -> ScriptResult<Flow> {
        match kind {
            StmtKind::Let { name, value } => {
                let value = self.eval(value, env, host)?;
                env.define(name.clone(), value);
            }
            StmtKind::Assign { target, op, value } => {
                self.exec_assign(target, *op, value, env, host)?;
            }
            StmtKind::FnDecl(def) => {
                env.define(def.name.clone(), self.make_function(def, env));
            }
            StmtKind::ClassDecl {
                name,
                base,
                methods,
            } => {
                let class = self.declare_class(name, base.as_ref(), methods, env, host)?;
                env.define(name.clone(), Value::Type(TypeRef::Class(class)));
            }
            StmtKind::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if self.eval(condition, env, host)?.truthy() {
                        return self.exec_block(body, env, host);
                    }
                }
                if let Some(body) = otherwise {
                    return self.exec_block(body, env, host);
                }
            }
            StmtKind::While { condition, body } => {
                while self.eval(condition, env, host)?.truthy() {
                    match self.exec_block(body, env, host)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            StmtKind::For {
                var,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable, env, host)?;
                for item in ops::iterate(&iterable)? {
                    env.define(var.clone(), item);
                    match self.exec_block(body, env, host)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env, host)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Expr(expr) => {
                self.eval(expr, env, host)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_assign(
        &mut self,
        target: &Target,
        op: Option<BinOp>,
        value: &Expr,
        env: &Env,
        host: &mut dyn Host,
    ) -> ScriptResult<()> {
        match target {
            Target::Name(name) => {
                let current = match op {
                    Some(_) => Some(
                        env.get(name)
                            .ok_or_else(|| ScriptError::UndefinedName(name.clone()))?,
                    ),
                    None => None,
                };
                let rhs = self.eval(value, env, host)?;
                let updated = combine(op, current, rhs)?;
                if !env.assign(name, updated.clone()) {
                    env.define(name.clone(), updated);
                }
            }
            Target::Field { object, field } => {
                let object = self.eval(object, env, host)?;
                let current = match op {
                    Some(_) => Some(self.get_field(&object, field)?),
                    None => None,
                };
                let rhs = self.eval(value, env, host)?;
                let updated = combine(op, current, rhs)?;
                set_field(&object, field, updated)?;
            }
            Target::Index { object, index } => {
                let object = self.eval(object, env, host)?;
                let index = self.eval(index, env, host)?;
                let current = match op {
                    Some(_) => Some(ops::index(&object, &index)?),
                    None => None,
                };
                let rhs = self.eval(value, env, host)?;
                let updated = combine(op, current, rhs)?;
                ops::set_index(&object, &index, updated)?;
            }
        }
        Ok(())
    }

    fn declare_class(
        &mut self,
        name: &str,
        base: Option<&Expr>,
        methods: &[Rc<FnDef>],
        env: &Env,
        host: &mut dyn Host,
    ) -> ScriptResult<Rc<Class>> {
        let base = match base {
            None => None,
            Some(expr) => match self.eval(expr, env, host)? {
                Value::Type(TypeRef::Class(class)) => Some(class),
                Value::Type(TypeRef::Builtin(BuiltinType::Object)) => None,
                Value::Type(ty) => {
                    return Err(ScriptError::type_error(format!(
                        "class `{name}` cannot derive from builtin type `{}`",
                        ty.name()
                    )));
                }
                other => {
                    return Err(ScriptError::type_error(format!(
                        "class `{name}` must derive from a class, not a `{}` value",
                        other.type_name()
                    )));
                }
            },
        };

        let methods = methods
            .iter()
            .map(|def| {
                let function = Rc::new(Function {
                    def: Rc::clone(def),
                    closure: env.clone(),
                });
                (def.name.clone(), function)
            })
            .collect::<BTreeMap<_, _>>();

        let id = self.next_class_id;
        self.next_class_id += 1;
        Ok(Rc::new(Class {
            id,
            name: name.to_string(),
            base,
            methods,
        }))
    }

    // ── Expressions ───────────────────────────────────────────────────

    fn eval(&mut self, expr: &Expr, env: &Env, host: &mut dyn Host) -> ScriptResult<Value> {
        match &expr.kind {
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Float(value) => Ok(Value::Float(*value)),
            ExprKind::Str(text) => Ok(Value::Str(Rc::clone(text))),
            ExprKind::Bool(flag) => Ok(Value::Bool(*flag)),
            ExprKind::Nil => Ok(Value::Nil),
            ExprKind::Ident(name) => env
                .get(name)
                .ok_or_else(|| ScriptError::UndefinedName(name.clone())),
            ExprKind::List(items) => {
                let values = self.eval_all(items, env, host)?;
                Ok(Value::list(values))
            }
            ExprKind::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let value = self.eval(value, env, host)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::map(map))
            }
            ExprKind::Lambda(def) => Ok(self.make_function(def, env)),
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand, env, host)?;
                ops::unary(*op, &operand)
            }
            ExprKind::Binary {
                left,
                op: BinOp::And,
                right,
            } => {
                let left = self.eval(left, env, host)?;
                if left.truthy() {
                    self.eval(right, env, host)
                } else {
                    Ok(left)
                }
            }
            ExprKind::Binary {
                left,
                op: BinOp::Or,
                right,
            } => {
                let left = self.eval(left, env, host)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    self.eval(right, env, host)
                }
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.eval(left, env, host)?;
                let right = self.eval(right, env, host)?;
                ops::binary(*op, &left, &right)
            }
            ExprKind::Call { callee, args } => {
                let callee = self.eval(callee, env, host)?;
                let args = self.eval_all(args, env, host)?;
                self.call(&callee, args, host)
            }
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => {
                let object = self.eval(object, env, host)?;
                let args = self.eval_all(args, env, host)?;
                self.call_method(&object, method, args, host)
            }
            ExprKind::Field { object, field } => {
                let object = self.eval(object, env, host)?;
                self.get_field(&object, field)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object, env, host)?;
                let index = self.eval(index, env, host)?;
                ops::index(&object, &index)
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr], env: &Env, host: &mut dyn Host) -> ScriptResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval(expr, env, host)?);
        }
        Ok(values)
    }

    fn get_field(&self, object: &Value, name: &str) -> ScriptResult<Value> {
        match object {
            Value::Instance(instance) => {
                if let Some(value) = instance.fields.borrow().get(name) {
                    return Ok(value.clone());
                }
                instance
                    .class
                    .find_method(name)
                    .map(|function| {
                        Value::BoundMethod(Rc::new(BoundMethod {
                            receiver: object.clone(),
                            function,
                        }))
                    })
                    .ok_or_else(|| {
                        ScriptError::Attribute(format!(
                            "`{}` object has no attribute `{name}`",
                            instance.class.name
                        ))
                    })
            }
            Value::Type(ty) => {
                if name == "__name__" {
                    return Ok(Value::str(ty.name()));
                }
                if let TypeRef::Class(class) = ty {
                    if let Some(function) = class.find_method(name) {
                        return Ok(Value::Function(function));
                    }
                }
                Err(ScriptError::Attribute(format!(
                    "type `{}` has no attribute `{name}`",
                    ty.name()
                )))
            }
            Value::Figure(figure) => {
                let figure = figure.borrow();
                match name {
                    "width" => Ok(Value::Int(i64::from(figure.width))),
                    "height" => Ok(Value::Int(i64::from(figure.height))),
                    "title" => Ok(figure.title.as_deref().map(Value::str).unwrap_or(Value::Nil)),
                    _ => Err(ScriptError::Attribute(format!(
                        "`figure` value has no attribute `{name}`"
                    ))),
                }
            }
            other => Err(ScriptError::Attribute(format!(
                "`{}` value has no attribute `{name}`",
                other.type_name()
            ))),
        }
    }

    // ── Text forms ────────────────────────────────────────────────────

    /// The `str()` form: strings are themselves, instances consult `__str__`
    /// then `__repr__`, everything else is its repr.
    pub fn to_str(&mut self, value: &Value, host: &mut dyn Host) -> ScriptResult<String> {
        match value {
            Value::Str(text) => Ok(text.to_string()),
            Value::Instance(instance) => match instance.class.find_method("__str__") {
                Some(method) => self.call_text_hook(value, &method, "__str__", host),
                None => self.repr(value, host),
            },
            _ => self.repr(value, host),
        }
    }

    /// The `repr()` form: strings quoted, containers recursive, instances via `__repr__`.
    pub fn repr(&mut self, value: &Value, host: &mut dyn Host) -> ScriptResult<String> {
        if self.repr_depth >= MAX_REPR_DEPTH {
            return Ok("...".to_string());
        }
        self.repr_depth += 1;
        let result = self.repr_value(value, host);
        self.repr_depth -= 1;
        result
    }

    fn repr_value(&mut self, value: &Value, host: &mut dyn Host) -> ScriptResult<String> {
        let text = match value {
            Value::Nil => "nil".to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => format_float(*v),
            Value::Str(text) => quote(text),
            Value::List(items) => {
                let items = items.borrow().clone();
                let mut parts = Vec::with_capacity(items.len());
                for item in &items {
                    parts.push(self.repr(item, host)?);
                }
                format!("[{}]", parts.join(", "))
            }
            Value::Map(entries) => {
                let entries = entries.borrow().clone();
                let mut parts = Vec::with_capacity(entries.len());
                for (key, item) in &entries {
                    parts.push(format!("{}: {}", quote(key), self.repr(item, host)?));
                }
                format!("{{{}}}", parts.join(", "))
            }
            Value::Function(function) => format!("<function {}>", function.def.name),
            Value::Builtin(builtin) => format!("<builtin {}>", builtin.name),
            Value::BoundMethod(bound) => format!(
                "<bound method {}.{}>",
                bound.receiver.type_name(),
                bound.function.def.name
            ),
            Value::Type(ty) => format!("<type {}>", ty.name()),
            Value::Figure(figure) => {
                let figure = figure.borrow();
                format!("<figure {}x{}>", figure.width, figure.height)
            }
            Value::Instance(instance) => match instance.class.find_method("__repr__") {
                Some(method) => self.call_text_hook(value, &method, "__repr__", host)?,
                None => format!("<{} object>", instance.class.name),
            },
        };
        Ok(text)
    }

    fn call_text_hook(
        &mut self,
        receiver: &Value,
        method: &Rc<Function>,
        hook: &str,
        host: &mut dyn Host,
    ) -> ScriptResult<String> {
        match self.call_function(method, vec![receiver.clone()], host)? {
            Value::Str(text) => Ok(text.to_string()),
            other => Err(ScriptError::type_error(format!(
                "`{hook}` must return a str, not `{}`",
                other.type_name()
            ))),
        }
    }

    // ── Figures ───────────────────────────────────────────────────────

    /// Size given to figures created without explicit dimensions.
    pub fn set_figure_size(&mut self, width: u32, height: u32) {
        self.figure_size = (width, height);
    }

    pub fn figure_size(&self) -> (u32, u32) {
        self.figure_size
    }

    /// Start a new figure and make it current.
    pub fn new_figure(&mut self, width: Option<u32>, height: Option<u32>) -> Rc<RefCell<Figure>> {
        let (default_width, default_height) = self.figure_size;
        let figure = Rc::new(RefCell::new(Figure::new(
            width.unwrap_or(default_width),
            height.unwrap_or(default_height),
        )));
        self.figure = Some(Rc::clone(&figure));
        figure
    }

    /// The current figure, created on first use. Fails when plotting is not compiled in.
    pub fn current_figure(&mut self) -> ScriptResult<Rc<RefCell<Figure>>> {
        if !cfg!(feature = "plot") {
            return Err(ScriptError::unavailable(
                "plotting support is not compiled in (enable the `plot` feature)",
            ));
        }
        if let Some(figure) = &self.figure {
            return Ok(Rc::clone(figure));
        }
        Ok(self.new_figure(None, None))
    }

    /// Clear the current figure in place, if there is one.
    pub fn clear_figure(&mut self) {
        if let Some(figure) = &self.figure {
            figure.borrow_mut().clear();
        }
    }
}

fn combine(op: Option<BinOp>, current: Option<Value>, rhs: Value) -> ScriptResult<Value> {
    match (op, current) {
        (Some(op), Some(current)) => ops::binary(op, &current, &rhs),
        _ => Ok(rhs),
    }
}

fn set_field(object: &Value, name: &str, value: Value) -> ScriptResult<()> {
    match object {
        Value::Instance(instance) => {
            instance.fields.borrow_mut().insert(name.to_string(), value);
            Ok(())
        }
        Value::Figure(figure) if name == "title" => {
            figure.borrow_mut().title = match value {
                Value::Nil => None,
                Value::Str(text) => Some(text.to_string()),
                other => {
                    return Err(ScriptError::type_error(format!(
                        "figure title must be a str, not `{}`",
                        other.type_name()
                    )));
                }
            };
            Ok(())
        }
        other => Err(ScriptError::Attribute(format!(
            "cannot set attribute `{name}` on a `{}` value",
            other.type_name()
        ))),
    }
}
