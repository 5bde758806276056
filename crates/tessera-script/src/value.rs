//! Runtime values and the type hierarchy they belong to.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FnDef;
use crate::env::Env;
use crate::error::ScriptResult;
use crate::figure::Figure;
use crate::host::Host;
use crate::interpreter::Interpreter;

/// Types every interpreter knows about without a class declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinType {
    Object,
    Nil,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Function,
    Type,
    Figure,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 11] = [
        BuiltinType::Object,
        BuiltinType::Nil,
        BuiltinType::Bool,
        BuiltinType::Int,
        BuiltinType::Float,
        BuiltinType::Str,
        BuiltinType::List,
        BuiltinType::Map,
        BuiltinType::Function,
        BuiltinType::Type,
        BuiltinType::Figure,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Object => "object",
            BuiltinType::Nil => "nil",
            BuiltinType::Bool => "bool",
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Str => "str",
            BuiltinType::List => "list",
            BuiltinType::Map => "map",
            BuiltinType::Function => "function",
            BuiltinType::Type => "type",
            BuiltinType::Figure => "figure",
        }
    }

    /// `object` is the root; `bool` narrows `int`; everything else sits directly under `object`.
    pub fn parent(self) -> Option<BuiltinType> {
        match self {
            BuiltinType::Object => None,
            BuiltinType::Bool => Some(BuiltinType::Int),
            _ => Some(BuiltinType::Object),
        }
    }
}

pub type ClassId = u64;

/// A user-declared class.
pub struct Class {
    pub id: ClassId,
    pub name: String,
    /// `None` means the class derives directly from `object`.
    pub base: Option<Rc<Class>>,
    pub methods: BTreeMap<String, Rc<Function>>,
}

impl Class {
    /// Look a method up along the base chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.base.as_ref().and_then(|base| base.find_method(name))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Identity of a type, suitable as a registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Builtin(BuiltinType),
    Class(ClassId),
}

/// A first-class reference to a runtime type.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Builtin(BuiltinType),
    Class(Rc<Class>),
}

impl TypeRef {
    pub const OBJECT: TypeRef = TypeRef::Builtin(BuiltinType::Object);

    pub fn tag(&self) -> TypeTag {
        match self {
            TypeRef::Builtin(builtin) => TypeTag::Builtin(*builtin),
            TypeRef::Class(class) => TypeTag::Class(class.id),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeRef::Builtin(builtin) => builtin.name(),
            TypeRef::Class(class) => &class.name,
        }
    }

    pub fn parent(&self) -> Option<TypeRef> {
        match self {
            TypeRef::Builtin(builtin) => builtin.parent().map(TypeRef::Builtin),
            TypeRef::Class(class) => Some(
                class
                    .base
                    .clone()
                    .map(TypeRef::Class)
                    .unwrap_or(TypeRef::OBJECT),
            ),
        }
    }

    /// The type itself followed by each ancestor; always ends at `object`.
    pub fn ancestry(&self) -> Vec<TypeRef> {
        let mut chain = vec![self.clone()];
        while let Some(parent) = chain.last().and_then(TypeRef::parent) {
            chain.push(parent);
        }
        chain
    }

    pub fn is_subtype_of(&self, other: &TypeRef) -> bool {
        let target = other.tag();
        self.ancestry().iter().any(|ty| ty.tag() == target)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }
}

/// A script function closed over its defining frame.
pub struct Function {
    pub def: Rc<FnDef>,
    pub closure: Env,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.def.name)
    }
}

/// A method already bound to its receiver.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub function: Rc<Function>,
}

pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<BTreeMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(BTreeMap::new()),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object>", self.class.name)
    }
}

pub type BuiltinFn = fn(&mut Interpreter, &mut dyn Host, Vec<Value>) -> ScriptResult<Value>;

/// A function implemented in Rust.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    Function(Rc<Function>),
    Builtin(Builtin),
    BoundMethod(Rc<BoundMethod>),
    Type(TypeRef),
    Instance(Rc<Instance>),
    Figure(Rc<RefCell<Figure>>),
}

impl Value {
    pub fn str(text: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn builtin(name: &'static str, func: BuiltinFn) -> Self {
        Value::Builtin(Builtin { name, func })
    }

    pub fn type_ref(&self) -> TypeRef {
        let builtin = match self {
            Value::Nil => BuiltinType::Nil,
            Value::Bool(_) => BuiltinType::Bool,
            Value::Int(_) => BuiltinType::Int,
            Value::Float(_) => BuiltinType::Float,
            Value::Str(_) => BuiltinType::Str,
            Value::List(_) => BuiltinType::List,
            Value::Map(_) => BuiltinType::Map,
            Value::Function(_) | Value::Builtin(_) | Value::BoundMethod(_) => {
                BuiltinType::Function
            }
            Value::Type(_) => BuiltinType::Type,
            Value::Figure(_) => BuiltinType::Figure,
            Value::Instance(instance) => return TypeRef::Class(Rc::clone(&instance.class)),
        };
        TypeRef::Builtin(builtin)
    }

    pub fn type_name(&self) -> String {
        self.type_ref().name().to_string()
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(flag) => *flag,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Str(text) => !text.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Map(entries) => !entries.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Bool(flag) => Some(f64::from(u8::from(*flag))),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Builtin(_) | Value::BoundMethod(_) | Value::Type(_)
        )
    }
}

impl Value {
    /// Equality without descending into containers: lists and maps are equal
    /// only when they are the same object.
    pub(crate) fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::BoundMethod(a), Value::BoundMethod(b)) => {
                Rc::ptr_eq(&a.function, &b.function) && a.receiver.shallow_eq(&b.receiver)
            }
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Figure(a), Value::Figure(b)) => Rc::ptr_eq(a, b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

/// Structural equality, as `==` in a snippet. Containers nested past
/// [`MAX_COMPARE_DEPTH`](crate::MAX_COMPARE_DEPTH) compare unequal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::ops::equals(self, other).unwrap_or(false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => f.write_str(&format_float(*value)),
            Value::Str(text) => f.write_str(&quote(text)),
            Value::List(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Map(entries) => f.debug_map().entries(entries.borrow().iter()).finish(),
            Value::Function(function) => write!(f, "{function:?}"),
            Value::Builtin(builtin) => write!(f, "{builtin:?}"),
            Value::BoundMethod(bound) => write!(f, "<bound method {}>", bound.function.def.name),
            Value::Type(ty) => write!(f, "<type {}>", ty.name()),
            Value::Instance(instance) => write!(f, "{instance:?}"),
            Value::Figure(figure) => write!(f, "{:?}", figure.borrow()),
        }
    }
}

/// Floats always show a fractional part: `2.0`, `0.5`, `inf`.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Double-quoted form of a string with the lexer's escapes applied in reverse.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_descends_from_int() {
        let names: Vec<_> = TypeRef::Builtin(BuiltinType::Bool)
            .ancestry()
            .iter()
            .map(|ty| ty.name().to_string())
            .collect();
        assert_eq!(names, ["bool", "int", "object"]);
    }

    #[test]
    fn numbers_compare_across_int_and_float() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::str("2"));
    }

    #[test]
    fn lists_compare_structurally() {
        let a = Value::list(vec![Value::Int(1), Value::str("x")]);
        let b = Value::list(vec![Value::Int(1), Value::str("x")]);
        assert_eq!(a, b);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::str("").truthy());
        assert!(!Value::list(Vec::new()).truthy());
        assert!(Value::Int(-1).truthy());
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(-3.0), "-3.0");
    }

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quote("a\"b\n"), "\"a\\\"b\\n\"");
    }
}
