use crate::context::ResolutionContext;
use crate::error::{AccessError, Result};
use crate::handler::PropertyHandler;
use crate::scope::VariableScope;
use crate::types::{builtins, satisfies, ConstructorInfo, FieldInfo, FieldStorage, MethodInfo, TypeInfo, TypeKey, TypeRef};
use crate::value::Value;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// A call argument or index: folded to a constant when it is a literal.
#[derive(Debug, Clone)]
pub enum ArgExpr {
    Const(Value),
    Expr(Arc<str>),
}

impl ArgExpr {
    /// Arguments and indexes are always evaluated against the root, not the receiver.
    pub fn eval(&self, cx: &ResolutionContext, root: &Value, scope: &dyn VariableScope) -> Result<Value> {
        match self {
            ArgExpr::Const(value) => Ok(value.clone()),
            ArgExpr::Expr(text) => cx.evaluate(text, root, scope),
        }
    }
}

/// One clause of a nested block.
#[derive(Debug, Clone)]
pub struct Clause {
    /// Left-hand side of `target = expr`; `None` for a bare expression.
    pub target: Option<Arc<str>>,
    pub expr: Arc<str>,
}

#[derive(Debug, Clone)]
pub enum StaticTarget {
    Literal(Value),
    Type(Weak<TypeInfo>),
}

pub enum NodeKind {
    This,
    Variable {
        name: Arc<str>,
        /// Writing creates the variable when the scope does not know it.
        create: bool,
    },
    Field {
        field: Arc<FieldInfo>,
        declaring: Weak<TypeInfo>,
    },
    AccessorMethod {
        method: Arc<MethodInfo>,
        args: Vec<ArgExpr>,
        coercing: AtomicBool,
    },
    WriterField {
        field: Arc<FieldInfo>,
        declaring: Weak<TypeInfo>,
    },
    WriterMethod {
        method: Arc<MethodInfo>,
        coercing: AtomicBool,
    },
    MapEntry {
        key: ArgExpr,
        /// Reached through `map.key` rather than `map[key]`: the key must be present.
        by_name: bool,
    },
    ListIndex(ArgExpr),
    CollectionIndex(ArgExpr),
    ArrayIndex(ArgExpr),
    CharIndex(ArgExpr),
    Constructor {
        ty: Weak<TypeInfo>,
        constructor: Arc<ConstructorInfo>,
        args: Vec<ArgExpr>,
        coercing: AtomicBool,
    },
    Static(StaticTarget),
    NestedBlock(Vec<Clause>),
    /// The rest of the path is compiled against whatever value reaches this node.
    Continuation,
    Length,
    Extension {
        name: Arc<str>,
        handler: Arc<dyn PropertyHandler>,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::This => "This",
            NodeKind::Variable { .. } => "Variable",
            NodeKind::Field { .. } => "Field",
            NodeKind::AccessorMethod { .. } => "AccessorMethod",
            NodeKind::WriterField { .. } => "WriterField",
            NodeKind::WriterMethod { .. } => "WriterMethod",
            NodeKind::MapEntry { .. } => "MapEntry",
            NodeKind::ListIndex(_) => "ListIndex",
            NodeKind::CollectionIndex(_) => "CollectionIndex",
            NodeKind::ArrayIndex(_) => "ArrayIndex",
            NodeKind::CharIndex(_) => "CharIndex",
            NodeKind::Constructor { .. } => "Constructor",
            NodeKind::Static(_) => "Static",
            NodeKind::NestedBlock(_) => "NestedBlock",
            NodeKind::Continuation => "Continuation",
            NodeKind::Length => "Length",
            NodeKind::Extension { .. } => "Extension",
        }
    }

    /// Whether a replay of this node has switched to converting its arguments.
    pub fn is_coercing(&self) -> bool {
        match self {
            NodeKind::AccessorMethod { coercing, .. }
            | NodeKind::WriterMethod { coercing, .. }
            | NodeKind::Constructor { coercing, .. } => coercing.load(Ordering::Relaxed),
            _ => false,
        }
    }
}

/// A resolved step of an accessor chain.
pub struct AccessorNode {
    pub kind: NodeKind,
    pub next: Option<usize>,
    /// A `null` receiver turns the whole path into `null`.
    pub null_safe: bool,
    /// Offset of the segment in the path, where a continuation resumes.
    pub offset: usize,
    /// Owner type of the receiver this node was resolved against.
    pub guard: TypeKey,
}

impl Debug for AccessorNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessorNode")
            .field("kind", &self.kind.label())
            .field("offset", &self.offset)
            .field("null_safe", &self.null_safe)
            .field("guard", &self.guard)
            .field("next", &self.next)
            .finish()
    }
}

impl AccessorNode {
    /// Whether replaying this node against `current` takes the path it was compiled for.
    pub fn accepts(&self, current: &Value) -> bool {
        match &self.kind {
            NodeKind::Continuation => false,
            NodeKind::MapEntry { key: ArgExpr::Const(key), by_name: true } if !self.null_safe => {
                current.owner_key() == self.guard
                    && matches!(current, Value::Map(map) if map.contains_key(key))
            }
            _ => current.owner_key() == self.guard,
        }
    }

    pub fn value(
        &self,
        cx: &ResolutionContext,
        current: &Value,
        root: &Value,
        scope: &dyn VariableScope,
    ) -> Result<Value> {
        match &self.kind {
            NodeKind::This => Ok(root.clone()),
            NodeKind::Variable { name, .. } => scope
                .resolver_for(name)
                .map(|resolver| resolver.value())
                .ok_or_else(|| AccessError::unresolvable(&**name, "variable scope")),
            NodeKind::Field { field, declaring } => read_field(field, declaring, current),
            NodeKind::AccessorMethod { method, args, coercing } => {
                let values = eval_args(cx, args, root, scope)?;
                invoke(cx, method, current, values, coercing)
            }
            NodeKind::MapEntry { key, .. } => {
                let key = key.eval(cx, root, scope)?;
                match current {
                    Value::Map(map) => Ok(map.get(&key).unwrap_or_default()),
                    other => Err(shape_mismatch(other, "Map")),
                }
            }
            NodeKind::ListIndex(index) => {
                let position = position(cx, &index.eval(cx, root, scope)?)?;
                match current {
                    Value::List(list) => checked(position, list.len(), |i| list.get(i)),
                    other => Err(shape_mismatch(other, "List")),
                }
            }
            NodeKind::CollectionIndex(index) => {
                let position = position(cx, &index.eval(cx, root, scope)?)?;
                match current {
                    Value::Collection(collection) => {
                        checked(position, collection.len(), |i| collection.walk_to(i))
                    }
                    other => Err(shape_mismatch(other, "Collection")),
                }
            }
            NodeKind::ArrayIndex(index) => {
                let position = position(cx, &index.eval(cx, root, scope)?)?;
                match current {
                    Value::Array(array) => checked(position, array.len(), |i| array.get(i)),
                    other => Err(shape_mismatch(other, "array")),
                }
            }
            NodeKind::CharIndex(index) => {
                let position = position(cx, &index.eval(cx, root, scope)?)?;
                match current {
                    Value::String(s) => checked(position, s.chars().count(), |i| {
                        s.chars().nth(i).map(Value::Char)
                    }),
                    other => Err(shape_mismatch(other, "String")),
                }
            }
            NodeKind::Constructor {
                ty,
                constructor,
                args,
                coercing,
            } => {
                let ty = upgrade(ty)?;
                let values = eval_args(cx, args, root, scope)?;
                construct(cx, &ty, constructor, values, coercing)
            }
            NodeKind::Static(StaticTarget::Literal(value)) => Ok(value.clone()),
            NodeKind::Static(StaticTarget::Type(ty)) => upgrade(ty).map(Value::Type),
            NodeKind::NestedBlock(clauses) => {
                for clause in clauses {
                    let value = cx.evaluate(&clause.expr, current, scope)?;
                    if let Some(target) = &clause.target {
                        cx.set_member(target, current, scope, value)?;
                    }
                }
                Ok(current.clone())
            }
            NodeKind::Length => match current {
                Value::Array(array) => Ok(Value::Int(array.len() as i32)),
                other => Err(shape_mismatch(other, "array")),
            },
            NodeKind::Extension { name, handler } => handler.get_property(name, current, scope),
            NodeKind::WriterField { field, declaring } => read_field(field, declaring, current),
            NodeKind::WriterMethod { method, .. } => Err(AccessError::unresolvable(
                method.name(),
                current.type_name(),
            )),
            NodeKind::Continuation => Err(AccessError::Generic(format!(
                "continuation at offset {} replayed without compiling",
                self.offset
            ))),
        }
    }

    pub fn assign(
        &self,
        cx: &ResolutionContext,
        current: &Value,
        root: &Value,
        scope: &dyn VariableScope,
        value: Value,
    ) -> Result<()> {
        match &self.kind {
            NodeKind::Variable { name, create } => match scope.resolver_for(name) {
                Some(resolver) => resolver.set_value(value),
                None if *create => scope.create_variable(name, value),
                None => Err(AccessError::unresolvable(&**name, "variable scope")),
            },
            NodeKind::WriterField { field, declaring } | NodeKind::Field { field, declaring } => {
                write_field(cx, field, declaring, current, value)
            }
            NodeKind::WriterMethod { method, coercing } => {
                invoke(cx, method, current, vec![value], coercing).map(|_| ())
            }
            NodeKind::MapEntry { key, .. } => {
                let key = key.eval(cx, root, scope)?;
                match current {
                    Value::Map(map) => {
                        map.insert(key, value);
                        Ok(())
                    }
                    other => Err(shape_mismatch(other, "Map")),
                }
            }
            NodeKind::ListIndex(index) => {
                let position = position(cx, &index.eval(cx, root, scope)?)?;
                match current {
                    Value::List(list) => {
                        let index = to_index(position, list.len())?;
                        list.set(index, value)
                            .map(|_| ())
                            .map_err(|size| out_of_range(position, size))
                    }
                    other => Err(shape_mismatch(other, "List")),
                }
            }
            NodeKind::ArrayIndex(index) => {
                let position = position(cx, &index.eval(cx, root, scope)?)?;
                match current {
                    Value::Array(array) => {
                        let index = to_index(position, array.len())?;
                        let value = match array.element_type() {
                            Some(element) if !satisfies(&value, element) => {
                                cx.coercion().convert(&value, element)?
                            }
                            _ => value,
                        };
                        array
                            .set(index, value)
                            .map(|_| ())
                            .map_err(|size| out_of_range(position, size))
                    }
                    other => Err(shape_mismatch(other, "array")),
                }
            }
            NodeKind::Extension { name, handler } => {
                handler.set_property(name, current, scope, value)
            }
            other => Err(AccessError::not_writable(
                other.label(),
                current.type_name(),
            )),
        }
    }
}

fn upgrade(ty: &Weak<TypeInfo>) -> Result<TypeRef> {
    ty.upgrade()
        .ok_or_else(|| AccessError::Generic("type released while referenced by a chain".into()))
}

fn shape_mismatch(value: &Value, expected: &str) -> AccessError {
    AccessError::conversion(value.type_name(), expected)
}

fn out_of_range(index: i64, size: usize) -> AccessError {
    AccessError::IndexOutOfRange { index, size }
}

fn to_index(position: i64, size: usize) -> Result<usize> {
    usize::try_from(position)
        .ok()
        .filter(|index| *index < size)
        .ok_or_else(|| out_of_range(position, size))
}

fn checked(position: i64, size: usize, fetch: impl FnOnce(usize) -> Option<Value>) -> Result<Value> {
    let index = to_index(position, size)?;
    fetch(index).ok_or_else(|| out_of_range(position, size))
}

/// An index value as a position; text is converted through the coercion facility.
pub(crate) fn position(cx: &ResolutionContext, index: &Value) -> Result<i64> {
    match index {
        Value::Int(i) => Ok(*i as i64),
        Value::Long(i) => Ok(*i),
        Value::Char(c) => Ok(i64::from(u32::from(*c))),
        other => cx
            .coercion()
            .convert(other, &builtins().prim_long)?
            .as_i64()
            .ok_or_else(|| AccessError::conversion(other.type_name(), "long")),
    }
}

pub(crate) fn eval_args(
    cx: &ResolutionContext,
    args: &[ArgExpr],
    root: &Value,
    scope: &dyn VariableScope,
) -> Result<Vec<Value>> {
    args.iter().map(|arg| arg.eval(cx, root, scope)).collect()
}

pub(crate) fn read_field(field: &FieldInfo, declaring: &Weak<TypeInfo>, target: &Value) -> Result<Value> {
    match field.storage() {
        FieldStorage::Static(slot) => Ok(upgrade(declaring)?.static_value(slot)),
        FieldStorage::Instance(slot) => match target {
            Value::Object(object) => Ok(object.slot(slot)),
            other => Err(AccessError::unresolvable(field.name(), other.type_name())),
        },
    }
}

pub(crate) fn write_field(
    cx: &ResolutionContext,
    field: &FieldInfo,
    declaring: &Weak<TypeInfo>,
    target: &Value,
    value: Value,
) -> Result<()> {
    if field.is_final() {
        return Err(AccessError::not_writable(field.name(), field.owner_name()));
    }
    let value = if satisfies(&value, field.ty()) {
        value
    } else {
        cx.coercion().convert(&value, field.ty())?
    };
    match field.storage() {
        FieldStorage::Static(slot) => {
            upgrade(declaring)?.set_static_value(slot, value);
            Ok(())
        }
        FieldStorage::Instance(slot) => match target {
            Value::Object(object) => {
                object.set_slot(slot, value);
                Ok(())
            }
            other => Err(AccessError::unresolvable(field.name(), other.type_name())),
        },
    }
}

/// Arguments ready for `params`. The first mismatch flips `coercing` so later
/// replays convert straight away instead of checking first.
fn prepare_args(
    cx: &ResolutionContext,
    member: &str,
    params: &[TypeRef],
    args: Vec<Value>,
    coercing: &AtomicBool,
) -> Result<Vec<Value>> {
    if !coercing.load(Ordering::Relaxed) {
        if params.iter().zip(&args).all(|(param, arg)| satisfies(arg, param)) {
            return Ok(args);
        }
        coercing.store(true, Ordering::Relaxed);
        tracing::debug!(member, "argument mismatch, switching to coercing invocation");
    }
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            if satisfies(&arg, param) {
                Ok(arg)
            } else {
                cx.coercion().convert(&arg, param)
            }
        })
        .collect()
}

// Failures a host body reports without a category become invocation failures
fn host_failure(name: String) -> impl FnOnce(AccessError) -> AccessError {
    move |err| match err {
        AccessError::Generic(message) => AccessError::Invocation { name, message },
        other => other,
    }
}

pub(crate) fn invoke(
    cx: &ResolutionContext,
    method: &MethodInfo,
    target: &Value,
    args: Vec<Value>,
    coercing: &AtomicBool,
) -> Result<Value> {
    let args = prepare_args(cx, method.name(), method.params(), args, coercing)?;
    method
        .invoke(target, &args)
        .map_err(host_failure(method.signature()))
}

pub(crate) fn construct(
    cx: &ResolutionContext,
    ty: &TypeRef,
    constructor: &ConstructorInfo,
    args: Vec<Value>,
    coercing: &AtomicBool,
) -> Result<Value> {
    let args = prepare_args(cx, ty.name(), constructor.params(), args, coercing)?;
    constructor
        .invoke(ty, &args)
        .map_err(host_failure(format!("new {}", ty.name())))
}
