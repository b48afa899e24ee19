use super::Value;
use crate::types::{FieldStorage, TypeRef};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

pub type ObjectRef = Arc<Object>;

/// An instance of a host type: one slot per instance field of its type lineage.
pub struct Object {
    ty: TypeRef,
    slots: RwLock<Vec<Value>>,
}

impl Object {
    /// Allocates an instance with every slot set to the default of its declared type.
    pub fn new(ty: &TypeRef) -> ObjectRef {
        let mut slots = vec![Value::Null; ty.instance_slots()];
        for field in ty.lineage().into_iter().flat_map(|t| t.fields().iter()) {
            if let FieldStorage::Instance(slot) = field.storage() {
                slots[slot] = field.ty().default_value();
            }
        }
        Arc::new(Object {
            ty: ty.clone(),
            slots: RwLock::new(slots),
        })
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn slot(&self, index: usize) -> Value {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(index).cloned().unwrap_or_default()
    }

    pub fn set_slot(&self, index: usize, value: Value) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(index) {
            *slot = value;
        }
    }

    /// Reads an instance field by name, ignoring visibility. Meant for host code.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.ty.find_field(name)?.storage() {
            FieldStorage::Instance(slot) => Some(self.slot(slot)),
            FieldStorage::Static(_) => None,
        }
    }

    /// Writes an instance field by name, ignoring visibility. Returns false if absent.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> bool {
        match self.ty.find_field(name).map(|field| field.storage()) {
            Some(FieldStorage::Instance(slot)) => {
                self.set_slot(slot, value.into());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn addr(&self) -> usize {
        self as *const Object as usize
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Object")
            .field("ty", &self.ty.name())
            .field("slots", &*slots)
            .finish()
    }
}
