//! Duck-typed object storage (§3 "object") and shape descriptors for
//! `define Name { fields… }` (§4.3).

use crate::ast::Expr;
use crate::value::{TypeDescriptor, Value};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
pub struct ObjectData {
    pub type_name: Option<String>,
    fields: Vec<(String, Value)>,
}

impl ObjectData {
    pub fn new(type_name: Option<String>, fields: Vec<(String, Value)>) -> Self {
        Self { type_name, fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Set a field, creating it if absent (§4.4 property-access assignment).
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(entry) = self.fields.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Heap handle for an object.
#[derive(Debug, Clone)]
pub struct HObject(pub Arc<RwLock<ObjectData>>);

impl HObject {
    pub fn new(data: ObjectData) -> Self {
        Self(Arc::new(RwLock::new(data)))
    }

    pub fn read(&self) -> std::sync::RwLockReadGuard<'_, ObjectData> {
        self.0.read().expect("object lock poisoned")
    }

    pub fn write(&self) -> std::sync::RwLockWriteGuard<'_, ObjectData> {
        self.0.write().expect("object lock poisoned")
    }

    pub fn ptr_addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &HObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A single field in a declared object shape (`define Name { ... }`).
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_desc: Option<TypeDescriptor>,
    pub required: bool,
    /// Default-value expression, evaluated in the validation environment
    /// when the field is optional and absent (§4.3).
    pub default: Option<Expr>,
}

/// A named object shape registered via `define Name { fields… }` (§4.3,
/// Design Notes: "Duck typing and optional/default fields map naturally
/// to a shape descriptor `(name, ordered [field-descriptor])`").
#[derive(Debug, Clone)]
pub struct ObjectShape {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ObjectShape {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_updates_existing_field_in_place() {
        let mut obj = ObjectData::new(None, vec![("x".into(), Value::I32(1))]);
        obj.set("x", Value::I32(2));
        obj.set("y", Value::I32(3));
        assert_eq!(obj.get("x"), Some(&Value::I32(2)));
        assert_eq!(obj.get("y"), Some(&Value::I32(3)));
        assert_eq!(obj.len(), 2);
    }
}
