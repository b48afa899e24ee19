//! Extension handlers for types the engine cannot otherwise introspect.

use crate::collections::ConcurrentMap;
use crate::error::Result;
use crate::scope::VariableScope;
use crate::types::{TypeInfo, TypeKey};
use crate::value::Value;
use std::sync::Arc;

/// Property access supplied by the host for a type.
pub trait PropertyHandler: Send + Sync {
    fn get_property(&self, name: &str, target: &Value, scope: &dyn VariableScope) -> Result<Value>;

    fn set_property(
        &self,
        name: &str,
        target: &Value,
        scope: &dyn VariableScope,
        value: Value,
    ) -> Result<()>;
}

/// Handlers keyed by the type they claim.
///
/// A handler registered for a class also claims its subclasses, and one
/// registered for an interface claims every implementor.
#[derive(Default)]
pub struct PropertyHandlerRegistry {
    handlers: ConcurrentMap<TypeKey, Arc<dyn PropertyHandler>>,
}

impl PropertyHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, ty: &TypeInfo, handler: Arc<dyn PropertyHandler>) {
        tracing::debug!(ty = ty.name(), "property handler registered");
        self.handlers.insert(ty.key(), handler);
    }

    pub fn unregister(&self, ty: &TypeInfo) -> bool {
        self.handlers.remove(&ty.key()).is_some()
    }

    pub fn has_handler_for(&self, ty: &TypeInfo) -> bool {
        self.handler_for(ty).is_some()
    }

    pub fn handler_for(&self, ty: &TypeInfo) -> Option<Arc<dyn PropertyHandler>> {
        if self.handlers.is_empty() {
            return None;
        }
        ty.lineage()
            .into_iter()
            .chain(ty.all_interfaces())
            .find_map(|candidate| self.handlers.get_cloned(&candidate.key()))
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
