use super::Value;
use crate::types::TypeRef;
use std::collections::{HashMap, VecDeque};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Recover from a poisoned lock by taking the inner value
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered, random-access list shared by every holder.
#[derive(Clone, Default)]
pub struct ListRef(Arc<RwLock<Vec<Value>>>);

impl ListRef {
    pub fn new(values: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(values)))
    }
    pub fn len(&self) -> usize {
        read(&self.0).len()
    }
    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }
    pub fn get(&self, index: usize) -> Option<Value> {
        read(&self.0).get(index).cloned()
    }
    /// Replaces the element at `index`; on failure returns the current length.
    pub fn set(&self, index: usize, value: Value) -> Result<Value, usize> {
        let mut values = write(&self.0);
        let len = values.len();
        match values.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(len),
        }
    }
    pub fn push(&self, value: Value) {
        write(&self.0).push(value);
    }
    pub fn contains(&self, value: &Value) -> bool {
        read(&self.0).contains(value)
    }
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        read(&self.0).iter().position(|v| v == value)
    }
    pub fn snapshot(&self) -> Vec<Value> {
        read(&self.0).clone()
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl Debug for ListRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(read(&self.0).iter()).finish()
    }
}

/// Iterable collection without positional access; reaching the n-th element walks it.
#[derive(Clone, Default)]
pub struct CollectionRef(Arc<RwLock<VecDeque<Value>>>);

impl CollectionRef {
    pub fn new(values: VecDeque<Value>) -> Self {
        Self(Arc::new(RwLock::new(values)))
    }
    pub fn len(&self) -> usize {
        read(&self.0).len()
    }
    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }
    pub fn push(&self, value: Value) {
        write(&self.0).push_back(value);
    }
    pub fn contains(&self, value: &Value) -> bool {
        read(&self.0).iter().any(|v| v == value)
    }
    /// Linear walk to the element at `position`.
    pub fn walk_to(&self, position: usize) -> Option<Value> {
        read(&self.0).iter().nth(position).cloned()
    }
    pub fn snapshot(&self) -> Vec<Value> {
        read(&self.0).iter().cloned().collect()
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl Debug for CollectionRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(read(&self.0).iter()).finish()
    }
}

/// Key/value mapping shared by every holder.
#[derive(Clone, Default)]
pub struct MapRef(Arc<RwLock<HashMap<Value, Value>>>);

impl MapRef {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self(Arc::new(RwLock::new(pairs.into_iter().collect())))
    }
    pub fn len(&self) -> usize {
        read(&self.0).len()
    }
    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }
    pub fn get(&self, key: &Value) -> Option<Value> {
        read(&self.0).get(key).cloned()
    }
    pub fn contains_key(&self, key: &Value) -> bool {
        read(&self.0).contains_key(key)
    }
    pub fn insert(&self, key: Value, value: Value) -> Option<Value> {
        write(&self.0).insert(key, value)
    }
    pub fn remove(&self, key: &Value) -> Option<Value> {
        write(&self.0).remove(key)
    }
    pub fn entries(&self) -> Vec<(Value, Value)> {
        read(&self.0)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl Debug for MapRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(read(&self.0).iter()).finish()
    }
}

struct ArrayData {
    ty: TypeRef,
    slots: RwLock<Box<[Value]>>,
}

/// Fixed-size array. Its type carries the element type every write must satisfy.
#[derive(Clone)]
pub struct ArrayRef(Arc<ArrayData>);

impl ArrayRef {
    pub fn new(ty: TypeRef, values: Vec<Value>) -> Self {
        Self(Arc::new(ArrayData {
            ty,
            slots: RwLock::new(values.into_boxed_slice()),
        }))
    }
    pub fn ty(&self) -> &TypeRef {
        &self.0.ty
    }
    pub fn element_type(&self) -> Option<&TypeRef> {
        self.0.ty.element_type()
    }
    pub fn len(&self) -> usize {
        read(&self.0.slots).len()
    }
    pub fn is_empty(&self) -> bool {
        read(&self.0.slots).is_empty()
    }
    pub fn get(&self, index: usize) -> Option<Value> {
        read(&self.0.slots).get(index).cloned()
    }
    /// Replaces the element at `index`; on failure returns the array length.
    pub fn set(&self, index: usize, value: Value) -> Result<Value, usize> {
        let mut slots = write(&self.0.slots);
        let len = slots.len();
        match slots.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(len),
        }
    }
    pub fn snapshot(&self) -> Vec<Value> {
        read(&self.0.slots).to_vec()
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl Debug for ArrayRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.ty.name())?;
        f.debug_list().entries(read(&self.0.slots).iter()).finish()
    }
}
