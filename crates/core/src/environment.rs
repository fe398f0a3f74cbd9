//! Lexical environment (§4.2).
//!
//! An ordered sequence of `(name, Value, is_const)` triples plus a parent
//! link, reference-counted so closures can retain their defining scope
//! (§3 "function": "a **strong** reference to the enclosing environment").

use crate::error::{EvalResult, HemlockException};
use crate::value::Value;
use std::sync::{Arc, Mutex};

struct Binding {
    name: String,
    value: Value,
    is_const: bool,
}

struct EnvironmentData {
    bindings: Vec<Binding>,
    parent: Option<Environment>,
}

/// A scope frame. Cloning is cheap (Arc bump) and all clones observe the
/// same mutable bindings, matching the spec's "ordered sequence ... plus
/// a parent link and ref-count".
#[derive(Clone)]
pub struct Environment(Arc<Mutex<EnvironmentData>>);

impl Environment {
    pub fn new(parent: Option<Environment>) -> Self {
        Self(Arc::new(Mutex::new(EnvironmentData {
            bindings: Vec::new(),
            parent,
        })))
    }

    pub fn root() -> Self {
        Self::new(None)
    }

    pub fn child(&self) -> Self {
        Self::new(Some(self.clone()))
    }

    pub fn parent(&self) -> Option<Environment> {
        self.0.lock().expect("env lock poisoned").parent.clone()
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Define a new binding in *this* frame. Throws on duplicate (§4.2).
    pub fn define(&self, name: &str, value: Value, is_const: bool) -> EvalResult<()> {
        let mut data = self.0.lock().expect("env lock poisoned");
        if data.bindings.iter().any(|b| b.name == name) {
            return Err(HemlockException::msg(format!(
                "Duplicate definition of '{name}' in this scope"
            )));
        }
        data.bindings.push(Binding {
            name: name.to_string(),
            value,
            is_const,
        });
        Ok(())
    }

    /// Look up a name, walking ancestors. Returns a retained (cloned)
    /// Value on every hit, per the spec's resolved Open Question:
    /// "consistent retain-on-return is specified here" (§9).
    pub fn get(&self, name: &str) -> EvalResult<Value> {
        let data = self.0.lock().expect("env lock poisoned");
        if let Some(b) = data.bindings.iter().find(|b| b.name == name) {
            return Ok(b.value.clone());
        }
        match &data.parent {
            Some(parent) => {
                let parent = parent.clone();
                drop(data);
                parent.get(name)
            }
            None => Err(HemlockException::msg(format!("Undefined variable '{name}'"))),
        }
    }

    /// Assign to an existing name, walking ancestors. If no binding is
    /// found anywhere, a new mutable binding is created in *this* scope
    /// (§3 Environment, §4.2).
    pub fn set(&self, name: &str, value: Value) -> EvalResult<()> {
        if self.set_existing(name, &value)? {
            return Ok(());
        }
        let mut data = self.0.lock().expect("env lock poisoned");
        data.bindings.push(Binding {
            name: name.to_string(),
            value,
            is_const: false,
        });
        Ok(())
    }

    /// Returns Ok(true) if an existing binding was updated, Ok(false) if
    /// no binding with this name exists anywhere in the chain, or Err if
    /// the binding found is const.
    fn set_existing(&self, name: &str, value: &Value) -> EvalResult<bool> {
        let mut data = self.0.lock().expect("env lock poisoned");
        if let Some(b) = data.bindings.iter_mut().find(|b| b.name == name) {
            if b.is_const {
                return Err(HemlockException::msg(format!(
                    "Cannot assign to const binding '{name}'"
                )));
            }
            b.value = value.clone();
            return Ok(true);
        }
        match data.parent.clone() {
            Some(parent) => {
                drop(data);
                parent.set_existing(name, value)
            }
            None => Ok(false),
        }
    }

    /// Whether `name` is bound in this frame specifically (not ancestors).
    pub fn is_defined_locally(&self, name: &str) -> bool {
        self.0
            .lock()
            .expect("env lock poisoned")
            .bindings
            .iter()
            .any(|b| b.name == name)
    }

    /// Break top-level closure cycles at program teardown (§9 Design
    /// Notes, strategy (a)): drop every binding in this frame, releasing
    /// this environment's strong references to any functions that in
    /// turn capture this same environment as their closure.
    pub fn teardown(&self) {
        self.0.lock().expect("env lock poisoned").bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_get_round_trips() {
        let env = Environment::root();
        env.define("x", Value::I32(1), false).unwrap();
        assert_eq!(env.get("x").unwrap(), Value::I32(1));
    }

    #[test]
    fn duplicate_define_in_same_scope_throws() {
        let env = Environment::root();
        env.define("x", Value::I32(1), false).unwrap();
        assert!(env.define("x", Value::I32(2), false).is_err());
    }

    #[test]
    fn set_on_const_throws() {
        let env = Environment::root();
        env.define("x", Value::I32(1), true).unwrap();
        assert!(env.set("x", Value::I32(2)).is_err());
    }

    #[test]
    fn set_walks_ancestors_before_shadowing() {
        let parent = Environment::root();
        parent.define("x", Value::I32(1), false).unwrap();
        let child = parent.child();
        child.set("x", Value::I32(9)).unwrap();
        assert_eq!(parent.get("x").unwrap(), Value::I32(9));
        assert!(!child.is_defined_locally("x"));
    }

    #[test]
    fn set_with_no_existing_binding_defines_in_current_scope() {
        let parent = Environment::root();
        let child = parent.child();
        child.set("y", Value::I32(5)).unwrap();
        assert!(child.is_defined_locally("y"));
        assert!(parent.get("y").is_err());
    }

    #[test]
    fn get_miss_reports_name() {
        let env = Environment::root();
        let err = env.get("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
