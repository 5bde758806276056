//! Lexically scoped variable frames.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// A shared handle to one frame in the scope chain.
///
/// Closures keep their defining frame alive, so frames are reference counted
/// rather than kept on a stack.
#[derive(Clone)]
pub struct Env(Rc<Frame>);

struct Frame {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

impl Env {
    /// A root frame with no parent.
    pub fn global() -> Self {
        Env(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(&self) -> Self {
        Env(Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.0.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Bind `name` in this frame, shadowing outer bindings.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.vars.borrow_mut().insert(name.into(), value);
    }

    /// Update the nearest existing binding. Returns `false` when none exists.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.0.vars.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.0.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// Names bound directly in this frame, sorted.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.0.vars.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("names", &self.local_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_frames_see_and_update_parents() {
        let global = Env::global();
        global.define("x", Value::Int(1));
        let inner = global.child();
        assert_eq!(inner.get("x"), Some(Value::Int(1)));
        assert!(inner.assign("x", Value::Int(2)));
        assert_eq!(global.get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn define_shadows_without_touching_parent() {
        let global = Env::global();
        global.define("x", Value::Int(1));
        let inner = global.child();
        inner.define("x", Value::Int(5));
        assert_eq!(inner.get("x"), Some(Value::Int(5)));
        assert_eq!(global.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn assign_to_unknown_name_reports_false() {
        assert!(!Env::global().assign("missing", Value::Nil));
    }
}
