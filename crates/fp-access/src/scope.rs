//! Variable scopes consulted for the first segment of a path.

use crate::collections::ConcurrentMap;
use crate::error::{AccessError, Result};
use crate::value::Value;
use std::sync::{Arc, Mutex};

/// Read/write handle on one bound variable.
pub trait VariableResolver: Send + Sync {
    fn value(&self) -> Value;
    fn set_value(&self, value: Value) -> Result<()>;
}

/// A chainable provider of named variables.
pub trait VariableScope: Send + Sync {
    fn is_resolvable(&self, name: &str) -> bool;

    fn resolver_for(&self, name: &str) -> Option<Arc<dyn VariableResolver>>;

    fn create_variable(&self, name: &str, value: Value) -> Result<()>;

    /// The scope consulted when this one does not know a name.
    fn next(&self) -> Option<&dyn VariableScope> {
        None
    }
}

/// Resolves nothing and refuses new variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyScope;

impl VariableScope for EmptyScope {
    fn is_resolvable(&self, _name: &str) -> bool {
        false
    }

    fn resolver_for(&self, _name: &str) -> Option<Arc<dyn VariableResolver>> {
        None
    }

    fn create_variable(&self, name: &str, _value: Value) -> Result<()> {
        Err(AccessError::not_writable(name, "empty scope"))
    }
}

#[derive(Clone, Default)]
pub struct SharedSlot {
    storage: Arc<Mutex<Value>>,
}

impl SharedSlot {
    pub fn new(value: Value) -> Self {
        Self {
            storage: Arc::new(Mutex::new(value)),
        }
    }

    pub fn with_storage<R>(&self, func: impl FnOnce(&mut Value) -> R) -> R {
        match self.storage.lock() {
            Ok(mut storage) => func(&mut storage),
            Err(poison) => {
                // Recover from a poisoned lock by taking the inner value
                let mut storage = poison.into_inner();
                func(&mut storage)
            }
        }
    }
}

impl VariableResolver for SharedSlot {
    fn value(&self) -> Value {
        self.with_storage(|v| v.clone())
    }

    fn set_value(&self, value: Value) -> Result<()> {
        self.with_storage(|v| *v = value);
        Ok(())
    }
}

/// Variables held in a concurrent map, falling back to a parent scope.
///
/// New variables are always created in the innermost scope.
#[derive(Default)]
pub struct MapVariableScope {
    parent: Option<Arc<dyn VariableScope>>,
    slots: ConcurrentMap<Arc<str>, SharedSlot>,
}

impl MapVariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Arc<dyn VariableScope>) -> Self {
        Self {
            parent: Some(parent),
            slots: ConcurrentMap::new(),
        }
    }

    /// Binds `name` in this scope, replacing the value if it is already bound here.
    pub fn insert(&self, name: &str, value: impl Into<Value>) {
        let slot = self
            .slots
            .get_or_insert_with(name.into(), || SharedSlot::new(Value::Null));
        slot.with_storage(|v| *v = value.into());
    }

    /// Value of `name` in this scope or a parent.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.resolver_for(name).map(|resolver| resolver.value())
    }

    pub fn local_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.slots.for_each(|name, _| names.push(name.to_string()));
        names.sort();
        names
    }
}

impl VariableScope for MapVariableScope {
    fn is_resolvable(&self, name: &str) -> bool {
        self.slots.contains_key(&Arc::from(name))
            || self.next().is_some_and(|parent| parent.is_resolvable(name))
    }

    fn resolver_for(&self, name: &str) -> Option<Arc<dyn VariableResolver>> {
        match self.slots.get_cloned(&Arc::from(name)) {
            Some(slot) => Some(Arc::new(slot)),
            None => self.next()?.resolver_for(name),
        }
    }

    fn create_variable(&self, name: &str, value: Value) -> Result<()> {
        tracing::trace!(name, "creating variable");
        self.insert(name, value);
        Ok(())
    }

    fn next(&self) -> Option<&dyn VariableScope> {
        self.parent.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn child_scope_reads_and_writes_through_parent() {
        let parent = Arc::new(MapVariableScope::new());
        parent.insert("x", 1);
        let child = MapVariableScope::with_parent(parent.clone());
        assert!(child.is_resolvable("x"));
        child.resolver_for("x").unwrap().set_value(Value::Int(2)).unwrap();
        assert_eq!(parent.get("x"), Some(Value::Int(2)));

        child.create_variable("y", Value::Int(3)).unwrap();
        assert!(!parent.is_resolvable("y"));
        assert_eq!(child.local_names(), vec!["y".to_string()]);
    }
}
