use super::{builtins, TypeInfo, TypeKey, TypeRef};
use crate::error::{AccessError, Result};
use crate::value::Value;
use itertools::Itertools;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Native body of a method: receives the target (`Value::Null` for statics) and the arguments.
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value> + Send + Sync>;

/// Native body of a constructor: receives the type being instantiated and the arguments.
pub type ConstructorFn = Arc<dyn Fn(&TypeRef, &[Value]) -> Result<Value> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStorage {
    Instance(usize),
    Static(usize),
}

#[derive(Debug)]
pub struct FieldInfo {
    pub(super) name: Arc<str>,
    pub(super) ty: TypeRef,
    pub(super) storage: FieldStorage,
    pub(super) public: bool,
    pub(super) is_final: bool,
    pub(super) owner: Arc<str>,
}

impl FieldInfo {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }
    pub fn storage(&self) -> FieldStorage {
        self.storage
    }
    pub fn is_public(&self) -> bool {
        self.public
    }
    pub fn is_final(&self) -> bool {
        self.is_final
    }
    pub fn is_static(&self) -> bool {
        matches!(self.storage, FieldStorage::Static(_))
    }
    pub fn owner_name(&self) -> &str {
        &self.owner
    }
}

pub enum MethodBody {
    Native(NativeFn),
    Abstract,
}

pub struct MethodInfo {
    pub(super) name: Arc<str>,
    pub(super) params: Vec<TypeRef>,
    pub(super) is_static: bool,
    pub(super) public: bool,
    /// Public method on a public type; false raises a visibility failure on invoke.
    pub(super) accessible: bool,
    pub(super) owner: Arc<str>,
    pub(super) owner_key: TypeKey,
    pub(super) body: MethodBody,
}

impl MethodInfo {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }
    pub fn is_static(&self) -> bool {
        self.is_static
    }
    pub fn is_public(&self) -> bool {
        self.public
    }
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }
    pub fn is_abstract(&self) -> bool {
        matches!(self.body, MethodBody::Abstract)
    }
    pub fn owner_name(&self) -> &str {
        &self.owner
    }
    pub fn owner_key(&self) -> TypeKey {
        self.owner_key
    }

    pub fn same_signature(&self, other: &MethodInfo) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.key() == b.key())
    }

    pub fn signature(&self) -> String {
        format!(
            "{}({})",
            self.name,
            self.params.iter().map(|p| p.name()).join(", ")
        )
    }

    /// Invokes the method, enforcing visibility. Abstract methods dispatch to the
    /// implementation found on the target's runtime type.
    pub fn invoke(&self, target: &Value, args: &[Value]) -> Result<Value> {
        if !self.accessible {
            return Err(AccessError::Inaccessible {
                name: self.signature(),
                owner: self.owner.to_string(),
            });
        }
        match &self.body {
            MethodBody::Native(body) => body(target, args),
            MethodBody::Abstract => {
                let implementation = target
                    .type_info()
                    .and_then(|ty| ty.find_implementation(self))
                    .ok_or_else(|| {
                        AccessError::unresolvable_call(
                            self.name.to_string(),
                            target.type_name(),
                            self.params.iter().map(|p| p.name().to_string()).collect(),
                        )
                    })?;
                match &implementation.body {
                    MethodBody::Native(body) => body(target, args),
                    MethodBody::Abstract => Err(AccessError::unresolvable(
                        implementation.signature(),
                        target.type_name(),
                    )),
                }
            }
        }
    }
}

impl Debug for MethodInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodInfo")
            .field("owner", &self.owner)
            .field("signature", &self.signature())
            .field("static", &self.is_static)
            .field("accessible", &self.accessible)
            .finish()
    }
}

pub struct ConstructorInfo {
    pub(super) params: Vec<TypeRef>,
    pub(super) body: ConstructorFn,
}

impl ConstructorInfo {
    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    pub fn invoke(&self, ty: &TypeRef, args: &[Value]) -> Result<Value> {
        (self.body)(ty, args)
    }
}

impl Debug for ConstructorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConstructorInfo({})",
            self.params.iter().map(|p| p.name()).join(", ")
        )
    }
}

/// Anything with a parameter list the overload resolver can score.
pub trait Callable {
    fn params(&self) -> &[TypeRef];
}

impl Callable for MethodInfo {
    fn params(&self) -> &[TypeRef] {
        &self.params
    }
}

impl Callable for ConstructorInfo {
    fn params(&self) -> &[TypeRef] {
        &self.params
    }
}

/// Whether `value` can be stored in a slot of type `target` without conversion.
pub fn satisfies(value: &Value, target: &TypeInfo) -> bool {
    match value.type_info() {
        None => !target.is_primitive(),
        Some(actual) => {
            actual.key() == target.key()
                || matches!((actual.prim(), target.prim()), (Some(a), Some(b)) if a == b)
                || target.is_assignable_from(actual)
        }
    }
}

/// Whether `ty` is the built-in `String` type.
pub fn is_string_type(ty: &TypeInfo) -> bool {
    ty.key() == builtins().string.key()
}
