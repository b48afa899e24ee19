//! Introspectable host types.
//!
//! Every value the engine navigates has a [`TypeInfo`] describing its fields,
//! methods and constructors. Built-in types live in an immutable table
//! ([`builtins`]); host applications describe their own with [`TypeBuilder`]
//! and publish them through a [`TypeRegistry`].

mod builder;
mod builtins;
mod members;
mod registry;

pub use builder::*;
pub use builtins::*;
pub use members::*;
pub use registry::*;

use crate::value::Value;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

pub type TypeRef = Arc<TypeInfo>;

/// Identity of a type. Keys are never reused, so a key outliving its type can
/// only miss, never alias a newer type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display,
)]
#[display("#{_0}")]
pub struct TypeKey(u64);

impl TypeKey {
    /// Stands for the absent type of `null`.
    pub const NULL: TypeKey = TypeKey(0);

    fn next() -> TypeKey {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TypeKey(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Bool,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Prim {
    pub fn name(self) -> &'static str {
        match self {
            Prim::Bool => "boolean",
            Prim::Char => "char",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
        }
    }

    pub fn boxed_name(self) -> &'static str {
        match self {
            Prim::Bool => "Boolean",
            Prim::Char => "Character",
            Prim::Int => "Integer",
            Prim::Long => "Long",
            Prim::Float => "Float",
            Prim::Double => "Double",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Prim::Int | Prim::Long | Prim::Float | Prim::Double)
    }

    pub fn zero(self) -> Value {
        match self {
            Prim::Bool => Value::Bool(false),
            Prim::Char => Value::Char('\0'),
            Prim::Int => Value::Int(0),
            Prim::Long => Value::Long(0),
            Prim::Float => Value::Float(0.0),
            Prim::Double => Value::Double(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Class,
    Interface,
    Primitive(Prim),
    Boxed(Prim),
    Array(TypeRef),
}

pub struct TypeInfo {
    key: TypeKey,
    name: Arc<str>,
    kind: TypeKind,
    public: bool,
    superclass: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    fields: Vec<Arc<FieldInfo>>,
    methods: Vec<Arc<MethodInfo>>,
    constructors: Vec<Arc<ConstructorInfo>>,
    instance_slots: usize,
    statics: RwLock<Vec<Value>>,
}

impl TypeInfo {
    /// Array type over `element`. Prefer [`TypeRegistry::array_type`], which interns them.
    pub fn array_of(element: &TypeRef) -> TypeRef {
        Arc::new(TypeInfo {
            key: TypeKey::next(),
            name: format!("{}[]", element.name()).into(),
            kind: TypeKind::Array(element.clone()),
            public: true,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            instance_slots: 0,
            statics: RwLock::new(Vec::new()),
        })
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }
    pub fn is_public(&self) -> bool {
        self.public
    }
    pub fn superclass(&self) -> Option<&TypeRef> {
        self.superclass.as_ref()
    }
    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }
    pub fn fields(&self) -> &[Arc<FieldInfo>] {
        &self.fields
    }
    pub fn methods(&self) -> &[Arc<MethodInfo>] {
        &self.methods
    }
    pub fn constructors(&self) -> &[Arc<ConstructorInfo>] {
        &self.constructors
    }
    pub fn instance_slots(&self) -> usize {
        self.instance_slots
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }
    pub fn element_type(&self) -> Option<&TypeRef> {
        match &self.kind {
            TypeKind::Array(element) => Some(element),
            _ => None,
        }
    }

    /// The primitive behind a primitive or boxed type.
    pub fn prim(&self) -> Option<Prim> {
        match self.kind {
            TypeKind::Primitive(p) | TypeKind::Boxed(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.prim().is_some_and(Prim::is_numeric)
    }

    pub fn default_value(&self) -> Value {
        match self.kind {
            TypeKind::Primitive(p) => p.zero(),
            _ => Value::Null,
        }
    }

    /// This type followed by its superclass chain, ending at `Object` for
    /// reference types.
    pub fn lineage(&self) -> Vec<&TypeInfo> {
        let mut out = vec![self];
        let mut current = self;
        while let Some(parent) = &current.superclass {
            current = parent.as_ref();
            out.push(current);
        }
        let object = &builtins().object;
        let implicit_object = !matches!(self.kind, TypeKind::Primitive(_) | TypeKind::Interface);
        if implicit_object && current.key != object.key {
            out.push(object);
        }
        out
    }

    /// Every interface implemented directly or through a superclass or a super-interface.
    pub fn all_interfaces(&self) -> Vec<&TypeInfo> {
        let mut out: Vec<&TypeInfo> = Vec::new();
        let mut pending: Vec<&TypeInfo> = self
            .lineage()
            .into_iter()
            .flat_map(|ty| ty.interfaces.iter().map(|i| &**i))
            .collect();
        while let Some(iface) = pending.pop() {
            if out.iter().any(|seen| seen.key == iface.key) {
                continue;
            }
            pending.extend(iface.interfaces.iter().map(|i| &**i));
            out.push(iface);
        }
        out
    }

    pub fn is_assignable_from(&self, other: &TypeInfo) -> bool {
        if self.key == other.key {
            return true;
        }
        if self.is_primitive() || other.is_primitive() {
            return false;
        }
        if self.key == builtins().object.key {
            return true;
        }
        match &self.kind {
            TypeKind::Interface => other.all_interfaces().iter().any(|i| i.key == self.key),
            TypeKind::Array(element) => match &other.kind {
                TypeKind::Array(other_element) => element.is_assignable_from(other_element),
                _ => false,
            },
            _ => other.lineage().iter().any(|t| t.key == self.key),
        }
    }

    pub fn find_field(&self, name: &str) -> Option<Arc<FieldInfo>> {
        self.lineage()
            .into_iter()
            .flat_map(|ty| ty.fields.iter())
            .find(|field| field.name() == name)
            .cloned()
    }

    /// Methods named `name` in enumeration order: declared, inherited, then
    /// interface members. A member hidden by an equal signature earlier in the
    /// order is skipped.
    pub fn methods_named(&self, name: &str) -> Vec<Arc<MethodInfo>> {
        let mut out: Vec<Arc<MethodInfo>> = Vec::new();
        let lineage = self.lineage();
        let interfaces = self.all_interfaces();
        for ty in lineage.into_iter().chain(interfaces) {
            for method in ty.methods.iter().filter(|m| m.name() == name) {
                if !out.iter().any(|seen| seen.same_signature(method)) {
                    out.push(method.clone());
                }
            }
        }
        out
    }

    /// The concrete method a call through an abstract declaration lands on.
    pub fn find_implementation(&self, abstract_method: &MethodInfo) -> Option<Arc<MethodInfo>> {
        self.lineage()
            .into_iter()
            .flat_map(|ty| ty.methods.iter())
            .find(|m| !m.is_abstract() && m.same_signature(abstract_method))
            .cloned()
    }

    pub(crate) fn static_value(&self, slot: usize) -> Value {
        let statics = self.statics.read().unwrap_or_else(PoisonError::into_inner);
        statics.get(slot).cloned().unwrap_or_default()
    }

    pub(crate) fn set_static_value(&self, slot: usize, value: Value) {
        let mut statics = self.statics.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = statics.get_mut(slot) {
            *current = value;
        }
    }
}

impl Debug for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
