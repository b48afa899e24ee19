use super::*;
use crate::collections::ConcurrentMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

/// Named types and literals visible to path resolution.
///
/// Literals (`true`, `false`, `null` plus anything the host adds) win over
/// type names when a first segment is looked up.
pub struct TypeRegistry {
    types: ConcurrentMap<Arc<str>, TypeRef>,
    literals: ConcurrentMap<Arc<str>, Value>,
    arrays: ConcurrentMap<TypeKey, Weak<TypeInfo>>,
    generation: AtomicU64,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let registry = Self {
            types: ConcurrentMap::new(),
            literals: ConcurrentMap::new(),
            arrays: ConcurrentMap::new(),
            generation: AtomicU64::new(0),
        };
        for ty in builtins().all() {
            registry.register(ty);
        }
        registry.literals.insert("true".into(), Value::Bool(true));
        registry.literals.insert("false".into(), Value::Bool(false));
        registry.literals.insert("null".into(), Value::Null);
        registry
    }

    /// Publishes `ty` under its own name, replacing any type of the same name.
    pub fn register(&self, ty: &TypeRef) {
        self.types.insert(ty.name().into(), ty.clone());
        self.bump();
    }

    /// Publishes `ty` under an extra, usually qualified, name such as `java.lang.String`.
    pub fn register_alias(&self, alias: &str, ty: &TypeRef) {
        self.types.insert(alias.into(), ty.clone());
        self.bump();
    }

    /// Removes the registry's hold on a type. Caches keep only weak references,
    /// so the type is released once the host drops its own handles.
    pub fn unregister(&self, name: &str) -> Option<TypeRef> {
        let removed = self.types.remove(&Arc::<str>::from(name));
        if let Some(ty) = &removed {
            let key = ty.key();
            self.types.retain(|_, other| other.key() != key);
            tracing::debug!(name, %key, "type unregistered");
            self.bump();
        }
        removed
    }

    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.types.get_cloned(&Arc::<str>::from(name))
    }

    pub fn add_literal(&self, name: &str, value: Value) {
        self.literals.insert(name.into(), value);
        self.bump();
    }

    pub fn literal(&self, name: &str) -> Option<Value> {
        self.literals.get_cloned(&Arc::<str>::from(name))
    }

    /// Interned array type over `element`. The registry holds arrays weakly:
    /// an array type lives as long as some array value or host handle does.
    pub fn array_type(&self, element: &TypeRef) -> TypeRef {
        let key = element.key();
        if let Some(existing) = self.arrays.get_cloned(&key).and_then(|weak| weak.upgrade()) {
            return existing;
        }
        let created = TypeInfo::array_of(element);
        self.arrays.insert(key, Arc::downgrade(&created));
        created
    }

    /// Changes whenever a name starts or stops resolving to something.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Drops interned array entries whose type is gone.
    pub(crate) fn purge(&self) -> usize {
        let before = self.arrays.len();
        self.arrays.retain(|_, weak| weak.strong_count() > 0);
        before.saturating_sub(self.arrays.len())
    }
}
