mod containers;
mod object;

pub use containers::*;
pub use object::*;

use crate::types::{builtins, TypeKey, TypeRef};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A runtime value the engine navigates.
///
/// Scalars are compared by value. Containers, objects and type references are
/// compared by identity, matching how they behave as map keys.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Arc<str>),
    List(ListRef),
    Array(ArrayRef),
    Map(MapRef),
    Collection(CollectionRef),
    Object(ObjectRef),
    Type(TypeRef),
}

impl Value {
    pub const NULL: Value = Value::Null;

    pub fn bool(b: bool) -> Value {
        Value::Bool(b)
    }
    pub fn int(i: i32) -> Value {
        Value::Int(i)
    }
    pub fn long(i: i64) -> Value {
        Value::Long(i)
    }
    pub fn float(f: f32) -> Value {
        Value::Float(f)
    }
    pub fn double(d: f64) -> Value {
        Value::Double(d)
    }
    pub fn char(c: char) -> Value {
        Value::Char(c)
    }
    pub fn string(s: impl Into<Arc<str>>) -> Value {
        Value::String(s.into())
    }
    pub fn list(values: impl IntoIterator<Item = Value>) -> Value {
        Value::List(ListRef::new(values.into_iter().collect()))
    }
    pub fn collection(values: impl IntoIterator<Item = Value>) -> Value {
        Value::Collection(CollectionRef::new(values.into_iter().collect()))
    }
    pub fn map(pairs: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::Map(MapRef::from_pairs(pairs))
    }
    /// `array_type` must be an array type, see [`crate::types::TypeRegistry::array_type`].
    pub fn array(array_type: TypeRef, values: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(ArrayRef::new(array_type, values.into_iter().collect()))
    }
    pub fn object(object: ObjectRef) -> Value {
        Value::Object(object)
    }
    pub fn ty(ty: TypeRef) -> Value {
        Value::Type(ty)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_)
        )
    }

    /// The runtime type of this value; `None` for null.
    pub fn type_info(&self) -> Option<&TypeRef> {
        let b = builtins();
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => &b.boolean,
            Value::Char(_) => &b.character,
            Value::Int(_) => &b.integer,
            Value::Long(_) => &b.long,
            Value::Float(_) => &b.float,
            Value::Double(_) => &b.double,
            Value::String(_) => &b.string,
            Value::List(_) => &b.list,
            Value::Array(array) => array.ty(),
            Value::Map(_) => &b.map,
            Value::Collection(_) => &b.collection,
            Value::Object(object) => object.ty(),
            Value::Type(_) => &b.class,
        })
    }

    /// The type members are resolved against: the referenced type for a type
    /// reference (static access), the runtime type otherwise.
    pub fn owner_type(&self) -> Option<&TypeRef> {
        match self {
            Value::Type(ty) => Some(ty),
            other => other.type_info(),
        }
    }

    pub fn owner_key(&self) -> TypeKey {
        self.owner_type().map(|ty| ty.key()).unwrap_or(TypeKey::NULL)
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Type(ty) => format!("type {}", ty.name()),
            other => other
                .type_info()
                .map(|ty| ty.name().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral view of any numeric or char value. Decimals are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::Long(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Double(d) => Some(*d as i64),
            Value::Char(c) => Some(*c as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Long(i) => Some(*i as f64),
            Value::Float(f) => Some(*f as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b).is_eq(),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b).is_eq(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Collection(a), Value::Collection(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a.key() == b.key(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Char(c) => c.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Long(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::List(list) => list.addr().hash(state),
            Value::Array(array) => array.addr().hash(state),
            Value::Map(map) => map.addr().hash(state),
            Value::Collection(collection) => collection.addr().hash(state),
            Value::Object(object) => (Arc::as_ptr(object) as usize).hash(state),
            Value::Type(ty) => ty.key().hash(state),
        }
    }
}

fn write_sequence(f: &mut Formatter<'_>, values: &[Value]) -> std::fmt::Result {
    write!(f, "[")?;
    let mut first = true;
    for value in values {
        if !first {
            write!(f, ", ")?;
        }
        first = false;
        write!(f, "{}", value)?;
    }
    write!(f, "]")
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::List(list) => write_sequence(f, &list.snapshot()),
            Value::Array(array) => write_sequence(f, &array.snapshot()),
            Value::Collection(collection) => write_sequence(f, &collection.snapshot()),
            Value::Map(map) => {
                write!(f, "{{")?;
                let mut first = true;
                for (key, value) in map.entries() {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}={}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Object(object) => write!(f, "{}@{:x}", object.ty().name(), object.addr()),
            Value::Type(ty) => write!(f, "{}", ty.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}
impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}
impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}
impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}
impl From<TypeRef> for Value {
    fn from(ty: TypeRef) -> Self {
        Value::Type(ty)
    }
}
