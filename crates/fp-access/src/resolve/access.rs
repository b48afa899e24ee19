use super::overload::{argument_types, select_best};
use crate::chain::{
    construct, eval_args, invoke, ArgExpr, ChainBuilder, ChainMode, Clause, Compiled, NodeKind,
    ScopeBinding, StaticTarget,
};
use crate::context::ResolutionContext;
use crate::error::{AccessError, Result};
use crate::path::{split_assignment, split_top_level, Segment, SegmentTokenizer, Token};
use crate::scope::VariableScope;
use crate::types::{builtins, capitalize, FieldInfo, MethodInfo, TypeInfo, TypeKey, TypeRef};
use crate::value::Value;
use std::borrow::Cow;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};

/// Where a compilation starts and what it evaluates against.
pub(crate) struct Request<'a> {
    pub path: &'a Arc<str>,
    pub offset: usize,
    /// Receiver of the first segment compiled.
    pub start: &'a Value,
    /// Value arguments, indexes and the self token evaluate against.
    pub root: &'a Value,
    pub scope: &'a dyn VariableScope,
    /// First-segment rules (self token, variables, variable creation) apply.
    pub rooted: bool,
    /// The first segment compiled follows a `.?`.
    pub null_safe: bool,
}

/// Resolves the segments of one path, evaluating them as it goes and
/// recording each decision as an accessor node.
pub struct AccessResolver<'a> {
    cx: &'a ResolutionContext,
    tokens: SegmentTokenizer<'a>,
    builder: ChainBuilder,
    root: &'a Value,
    scope: &'a dyn VariableScope,
    mode: ChainMode,
    rooted: bool,
    null_safe: bool,
}

fn no_coercion() -> AtomicBool {
    AtomicBool::new(false)
}

fn key_of(value: &Value) -> TypeKey {
    value.type_info().map_or(TypeKey::NULL, |ty| ty.key())
}

// Static lookups on a type reference share owner keys with instance lookups
fn member_key(name: &str, statics_only: bool) -> Cow<'_, str> {
    if statics_only {
        Cow::Owned(format!("static {name}"))
    } else {
        Cow::Borrowed(name)
    }
}

/// The type in `owner`'s superclass chain declaring `field`.
fn declaring_type(owner: &TypeRef, field: &Arc<FieldInfo>) -> Weak<TypeInfo> {
    let mut current = Some(owner);
    while let Some(ty) = current {
        if ty.fields().iter().any(|declared| Arc::ptr_eq(declared, field)) {
            return Arc::downgrade(ty);
        }
        current = ty.superclass();
    }
    Arc::downgrade(owner)
}

impl<'a> AccessResolver<'a> {
    pub(crate) fn new(cx: &'a ResolutionContext, request: &Request<'a>, mode: ChainMode) -> Self {
        let path: &'a str = request.path;
        let tokens = if request.offset == 0 {
            SegmentTokenizer::new(path)
        } else {
            SegmentTokenizer::resume(path, request.offset)
        };
        Self {
            cx,
            tokens,
            builder: ChainBuilder::new(
                request.path.clone(),
                request.offset,
                mode,
                request.rooted,
                request.start.owner_key(),
            ),
            root: request.root,
            scope: request.scope,
            mode,
            rooted: request.rooted,
            null_safe: request.null_safe,
        }
    }

    /// Resolves every segment as a read.
    pub(crate) fn read(mut self, start: &Value) -> Result<Compiled> {
        let mut current = start.clone();
        let mut resolved = 0;
        loop {
            let Segment { token, offset } = self.tokens.next_segment()?;
            match token {
                Token::Done => break,
                Token::NullSafe => self.null_safe = true,
                token => {
                    resolved += 1;
                    let null_safe = std::mem::take(&mut self.null_safe);
                    if null_safe && current.is_null() {
                        self.builder.push(NodeKind::Continuation, TypeKey::NULL, offset, true);
                        break;
                    }
                    current = self.read_segment(token, &current, offset, null_safe)?;
                }
            }
        }
        if resolved == 0 {
            return Err(AccessError::syntax(self.tokens.position(), "empty path"));
        }
        Ok(self.finish(current))
    }

    /// Resolves every segment but the last as a read and assigns through the last.
    pub(crate) fn write(mut self, start: &Value, value: Value) -> Result<Compiled> {
        let mut current = start.clone();
        loop {
            let Segment { token, offset } = self.tokens.next_segment()?;
            match token {
                Token::Done => {
                    return Err(AccessError::syntax(offset, "path has no assignable segment"));
                }
                Token::NullSafe => self.null_safe = true,
                token => {
                    let null_safe = std::mem::take(&mut self.null_safe);
                    if null_safe && current.is_null() {
                        self.builder.push(NodeKind::Continuation, TypeKey::NULL, offset, true);
                        return Ok(self.finish(Value::Null));
                    }
                    if self.tokens.is_done() {
                        self.write_segment(token, &current, offset, null_safe, value)?;
                        return Ok(self.finish(Value::Null));
                    }
                    current = self.read_segment(token, &current, offset, null_safe)?;
                }
            }
        }
    }

    fn finish(self, value: Value) -> Compiled {
        let chain = Arc::new(self.builder.finish(value.owner_key()));
        Compiled { chain, value }
    }

    fn is_first(&self) -> bool {
        self.rooted && self.builder.is_empty()
    }

    /// Records a node resolved against `current` and evaluates it.
    fn emit(&mut self, kind: NodeKind, current: &Value, offset: usize, null_safe: bool) -> Result<Value> {
        let node = self.builder.push(kind, current.owner_key(), offset, null_safe);
        node.value(self.cx, current, self.root, self.scope)
    }

    fn assign(
        &mut self,
        kind: NodeKind,
        current: &Value,
        offset: usize,
        null_safe: bool,
        value: Value,
    ) -> Result<()> {
        let node = self.builder.push(kind, current.owner_key(), offset, null_safe);
        node.assign(self.cx, current, self.root, self.scope, value)
    }

    fn read_segment(
        &mut self,
        token: Token<'a>,
        current: &Value,
        offset: usize,
        null_safe: bool,
    ) -> Result<Value> {
        match token {
            Token::Normal { name } => self.property(name, current, offset, null_safe),
            Token::Method { name, args } => self.method(name, &args, current, offset, null_safe),
            Token::Index { expr } => {
                let kind = self.index_kind(expr, current, false)?;
                self.emit(kind, current, offset, null_safe)
            }
            Token::NestedBlock { body } => self.nested_block(body, current, offset, null_safe),
            Token::Constructor { type_name, args } => {
                self.constructor(type_name, &args, current, offset, null_safe)
            }
            Token::NullSafe | Token::Done => Ok(current.clone()),
        }
    }

    /// Whether the first segment names a variable, recording the answer so a
    /// replay under a different scope rebuilds instead of reusing.
    fn binds_variable(&mut self, name: &str) -> bool {
        let bound = self.scope.is_resolvable(name);
        self.builder.bind_scope(if bound {
            ScopeBinding::Bound(name.into())
        } else {
            ScopeBinding::Unbound(name.into())
        });
        bound
    }

    fn property(&mut self, name: &str, current: &Value, offset: usize, null_safe: bool) -> Result<Value> {
        let first = self.is_first();
        if first {
            if name == self.cx.config().self_token {
                return self.emit(NodeKind::This, current, offset, null_safe);
            }
            if self.binds_variable(name) {
                let kind = NodeKind::Variable {
                    name: name.into(),
                    create: false,
                };
                return self.emit(kind, current, offset, null_safe);
            }
        } else if current.is_null() {
            return Err(AccessError::null_target(name));
        }

        if !current.is_null() {
            if let Some(kind) = self.member_reader(name, current)? {
                return self.emit(kind, current, offset, null_safe);
            }
            if let Value::Map(map) = current {
                let key = Value::string(name);
                if null_safe || map.contains_key(&key) {
                    let kind = NodeKind::MapEntry {
                        key: ArgExpr::Const(key),
                        by_name: true,
                    };
                    return self.emit(kind, current, offset, null_safe);
                }
            }
            if matches!(current, Value::Array(_)) && name == self.cx.config().length_token {
                return self.emit(NodeKind::Length, current, offset, null_safe);
            }
        }

        if let Some(kind) = self.static_reference(name) {
            return self.emit(kind, current, offset, null_safe);
        }
        let handler = current
            .owner_type()
            .and_then(|ty| self.cx.handlers().handler_for(ty));
        if let Some(handler) = handler {
            let kind = NodeKind::Extension {
                name: name.into(),
                handler,
            };
            return self.emit(kind, current, offset, null_safe);
        }
        Err(AccessError::unresolvable(name, current.type_name()))
    }

    /// A public field, then a zero-argument accessor. On a type reference only
    /// static members count, then instance members of `Class`.
    fn member_reader(&self, name: &str, current: &Value) -> Result<Option<NodeKind>> {
        let Some(owner) = current.owner_type() else {
            return Ok(None);
        };
        let statics_only = matches!(current, Value::Type(_));
        let field = owner
            .find_field(name)
            .filter(|field| field.is_public() && (!statics_only || field.is_static()));
        if let Some(field) = field {
            let declaring = declaring_type(owner, &field);
            return Ok(Some(NodeKind::Field { field, declaring }));
        }
        let mut getter = self.accessor(owner, name, statics_only)?;
        if getter.is_none() && statics_only {
            getter = self.accessor(&builtins().class, name, false)?;
        }
        Ok(getter.map(|method| NodeKind::AccessorMethod {
            method,
            args: Vec::new(),
            coercing: no_coercion(),
        }))
    }

    /// `getX`, `isX`, then a method named exactly `x` when bare names are enabled.
    fn accessor(&self, owner: &TypeRef, name: &str, statics_only: bool) -> Result<Option<Arc<MethodInfo>>> {
        let capitalized = capitalize(name);
        let mut candidates = vec![format!("get{capitalized}"), format!("is{capitalized}")];
        if self.cx.config().bare_name_accessors {
            candidates.push(name.to_string());
        }
        for candidate in candidates {
            let cache_name = member_key(&candidate, statics_only);
            if let Some(method) = self.cx.cache().methods.lookup(owner, &cache_name, &[]) {
                return Ok(Some(method));
            }
            let found = owner
                .methods_named(&candidate)
                .into_iter()
                .find(|method| method.params().is_empty() && (!statics_only || method.is_static()));
            if let Some(method) = found {
                let method = self.accessible(owner, method)?;
                self.cx
                    .cache()
                    .methods
                    .store(owner, &cache_name, &[], method.clone());
                return Ok(Some(method));
            }
        }
        Ok(None)
    }

    /// `method` itself when callable, otherwise a public declaration of the
    /// same signature on an implemented interface or a superclass.
    fn accessible(&self, owner: &TypeInfo, method: Arc<MethodInfo>) -> Result<Arc<MethodInfo>> {
        if method.is_accessible() {
            return Ok(method);
        }
        let fallback = owner
            .all_interfaces()
            .into_iter()
            .chain(owner.lineage())
            .flat_map(|ty| ty.methods().iter())
            .find(|candidate| candidate.is_accessible() && candidate.same_signature(&method))
            .cloned();
        match fallback {
            Some(found) => {
                tracing::debug!(
                    method = %method.signature(),
                    owner = owner.name(),
                    declared_by = found.owner_name(),
                    "using accessible declaration of inaccessible method"
                );
                Ok(found)
            }
            None => Err(AccessError::Inaccessible {
                name: method.signature(),
                owner: owner.name().to_string(),
            }),
        }
    }

    fn select_method(&self, name: &str, current: &Value, args: &[Value]) -> Result<Arc<MethodInfo>> {
        let owner = current
            .owner_type()
            .ok_or_else(|| AccessError::null_target(name))?;
        let statics_only = matches!(current, Value::Type(_));
        let cache_name = member_key(name, statics_only);
        let keys: Vec<TypeKey> = args.iter().map(key_of).collect();
        if let Some(method) = self.cx.cache().methods.lookup(owner, &cache_name, &keys) {
            return Ok(method);
        }

        let types = argument_types(args);
        let mut candidates = owner.methods_named(name);
        if statics_only {
            candidates.retain(|method| method.is_static());
        }
        let mut chosen = select_best(&candidates, &types, self.cx.coercion()).cloned();
        if chosen.is_none() && statics_only {
            let class_methods = builtins().class.methods_named(name);
            chosen = select_best(&class_methods, &types, self.cx.coercion()).cloned();
        }
        let method = chosen.ok_or_else(|| {
            AccessError::unresolvable_call(
                name,
                current.type_name(),
                args.iter().map(Value::type_name).collect(),
            )
        })?;
        let method = self.accessible(owner, method)?;
        self.cx
            .cache()
            .methods
            .store(owner, &cache_name, &keys, method.clone());
        Ok(method)
    }

    fn method(
        &mut self,
        name: &str,
        args: &[&str],
        current: &Value,
        offset: usize,
        null_safe: bool,
    ) -> Result<Value> {
        if current.is_null() {
            return Err(AccessError::null_target(format!("{name}()")));
        }
        let args: Vec<ArgExpr> = args.iter().map(|text| self.cx.arg_expr(text)).collect();
        let values = eval_args(self.cx, &args, self.root, self.scope)?;
        let method = self.select_method(name, current, &values)?;
        let coercing = no_coercion();
        let value = invoke(self.cx, &method, current, values, &coercing)?;
        let kind = NodeKind::AccessorMethod {
            method,
            args,
            coercing,
        };
        self.builder.push(kind, current.owner_key(), offset, null_safe);
        Ok(value)
    }

    fn constructor(
        &mut self,
        type_name: &str,
        args: &[&str],
        current: &Value,
        offset: usize,
        null_safe: bool,
    ) -> Result<Value> {
        let ty = self
            .cx
            .lookup_type(type_name)
            .ok_or_else(|| AccessError::unresolvable(type_name, "type registry"))?;
        let args: Vec<ArgExpr> = args.iter().map(|text| self.cx.arg_expr(text)).collect();
        let values = eval_args(self.cx, &args, self.root, self.scope)?;
        let keys: Vec<TypeKey> = values.iter().map(key_of).collect();
        let constructors = self.cx.cache().constructors.lookup(&ty, "<init>", &keys);
        let constructor = match constructors {
            Some(found) => found,
            None => {
                let found = select_best(ty.constructors(), &argument_types(&values), self.cx.coercion())
                    .cloned()
                    .ok_or_else(|| {
                        AccessError::unresolvable_call(
                            format!("new {}", ty.name()),
                            ty.name(),
                            values.iter().map(Value::type_name).collect(),
                        )
                    })?;
                self.cx
                    .cache()
                    .constructors
                    .store(&ty, "<init>", &keys, found.clone());
                found
            }
        };
        let coercing = no_coercion();
        let value = construct(self.cx, &ty, &constructor, values, &coercing)?;
        let kind = NodeKind::Constructor {
            ty: Arc::downgrade(&ty),
            constructor,
            args,
            coercing,
        };
        self.builder.push(kind, current.owner_key(), offset, null_safe);
        Ok(value)
    }

    /// Dispatch of `[expr]` by receiver shape.
    fn index_kind(&self, expr: &str, current: &Value, write: bool) -> Result<NodeKind> {
        let segment = || format!("[{expr}]");
        let index = self.cx.arg_expr(expr);
        Ok(match current {
            Value::Null => return Err(AccessError::null_target(segment())),
            Value::Map(_) => NodeKind::MapEntry {
                key: index,
                by_name: false,
            },
            Value::List(_) => NodeKind::ListIndex(index),
            Value::Array(_) => NodeKind::ArrayIndex(index),
            Value::Collection(_) if !write => NodeKind::CollectionIndex(index),
            Value::String(_) if !write => NodeKind::CharIndex(index),
            Value::Collection(_) | Value::String(_) => {
                return Err(AccessError::not_writable(segment(), current.type_name()));
            }
            other => return Err(AccessError::unresolvable(segment(), other.type_name())),
        })
    }

    fn nested_block(&mut self, body: &str, current: &Value, offset: usize, null_safe: bool) -> Result<Value> {
        if current.is_null() {
            return Err(AccessError::null_target(".{"));
        }
        let clauses = split_top_level(body, b',')
            .map_err(|err| err.at_offset(offset))?
            .into_iter()
            .map(|clause| {
                Ok(match split_assignment(clause)? {
                    Some((target, expr)) => Clause {
                        target: Some(target.into()),
                        expr: expr.into(),
                    },
                    None => Clause {
                        target: None,
                        expr: clause.into(),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.emit(NodeKind::NestedBlock(clauses), current, offset, null_safe)
    }

    /// A literal or type name, then the longest dotted run of the following
    /// plain segments that names a registered type.
    fn static_reference(&mut self, name: &str) -> Option<NodeKind> {
        if let Some(literal) = self.cx.types().literal(name) {
            return Some(NodeKind::Static(StaticTarget::Literal(literal)));
        }
        if let Some(ty) = self.cx.lookup_type(name) {
            return Some(NodeKind::Static(StaticTarget::Type(Arc::downgrade(&ty))));
        }

        let mut qualified = name.to_string();
        let mut prefixes = Vec::new();
        let mut lookahead = self.tokens.clone();
        loop {
            let mut probe = lookahead.clone();
            match probe.next_segment() {
                Ok(Segment {
                    token: Token::Normal { name: part },
                    ..
                }) => {
                    qualified.push('.');
                    qualified.push_str(part);
                    prefixes.push((qualified.clone(), probe.clone()));
                    lookahead = probe;
                }
                _ => break,
            }
        }
        // A write keeps its last segment as the assignment target
        if self.mode == ChainMode::Write && lookahead.is_done() {
            prefixes.pop();
        }
        for (prefix, after) in prefixes.into_iter().rev() {
            if let Some(ty) = self.cx.lookup_type(&prefix) {
                tracing::trace!(prefix = %prefix, "dotted prefix names a type");
                self.tokens = after;
                return Some(NodeKind::Static(StaticTarget::Type(Arc::downgrade(&ty))));
            }
        }
        None
    }

    fn write_segment(
        &mut self,
        token: Token<'a>,
        current: &Value,
        offset: usize,
        null_safe: bool,
        value: Value,
    ) -> Result<()> {
        match token {
            Token::Normal { name } => self.assign_property(name, current, offset, null_safe, value),
            Token::Index { expr } => {
                let kind = self.index_kind(expr, current, true)?;
                self.assign(kind, current, offset, null_safe, value)
            }
            Token::Method { name, .. } => {
                Err(AccessError::not_writable(format!("{name}()"), current.type_name()))
            }
            Token::Constructor { type_name, .. } => {
                Err(AccessError::not_writable(format!("new {type_name}()"), current.type_name()))
            }
            Token::NestedBlock { .. } => Err(AccessError::not_writable(".{}", current.type_name())),
            Token::NullSafe | Token::Done => Err(AccessError::syntax(offset, "nothing to assign")),
        }
    }

    fn assign_property(
        &mut self,
        name: &str,
        current: &Value,
        offset: usize,
        null_safe: bool,
        value: Value,
    ) -> Result<()> {
        let first = self.is_first();
        if first {
            if name == self.cx.config().self_token {
                return Err(AccessError::not_writable(name, "root"));
            }
            if self.binds_variable(name) {
                let kind = NodeKind::Variable {
                    name: name.into(),
                    create: false,
                };
                return self.assign(kind, current, offset, null_safe, value);
            }
        } else if current.is_null() {
            return Err(AccessError::null_target(name));
        }

        if !current.is_null() {
            if let Some(kind) = self.member_writer(name, current, &value)? {
                return self.assign(kind, current, offset, null_safe, value);
            }
            if let Value::Map(_) = current {
                let kind = NodeKind::MapEntry {
                    key: ArgExpr::Const(Value::string(name)),
                    by_name: false,
                };
                return self.assign(kind, current, offset, null_safe, value);
            }
            let handler = current
                .owner_type()
                .and_then(|ty| self.cx.handlers().handler_for(ty));
            if let Some(handler) = handler {
                let kind = NodeKind::Extension {
                    name: name.into(),
                    handler,
                };
                return self.assign(kind, current, offset, null_safe, value);
            }
        }

        if first && self.cx.config().create_missing_variables {
            let kind = NodeKind::Variable {
                name: name.into(),
                create: true,
            };
            return self.assign(kind, current, offset, null_safe, value);
        }
        if current.is_null() {
            return Err(AccessError::null_target(name));
        }
        Err(AccessError::unresolvable(name, current.type_name()))
    }

    /// A public non-final field, then a one-argument `setX` chosen for the
    /// value's type. A property with a getter and no setter is read-only.
    fn member_writer(&self, name: &str, current: &Value, value: &Value) -> Result<Option<NodeKind>> {
        let Some(owner) = current.owner_type() else {
            return Ok(None);
        };
        let statics_only = matches!(current, Value::Type(_));
        let field = owner
            .find_field(name)
            .filter(|field| field.is_public() && (!statics_only || field.is_static()));
        if let Some(field) = field {
            if field.is_final() {
                return Err(AccessError::not_writable(name, owner.name()));
            }
            let declaring = declaring_type(owner, &field);
            return Ok(Some(NodeKind::WriterField { field, declaring }));
        }

        let setter = format!("set{}", capitalize(name));
        let cache_name = member_key(&setter, statics_only);
        let keys = [key_of(value)];
        let method = match self.cx.cache().methods.lookup(owner, &cache_name, &keys) {
            Some(method) => Some(method),
            None => {
                let mut candidates = owner.methods_named(&setter);
                candidates.retain(|method| !statics_only || method.is_static());
                let types = argument_types(std::slice::from_ref(value));
                match select_best(&candidates, &types, self.cx.coercion()).cloned() {
                    Some(found) => {
                        let found = self.accessible(owner, found)?;
                        self.cx
                            .cache()
                            .methods
                            .store(owner, &cache_name, &keys, found.clone());
                        Some(found)
                    }
                    None => None,
                }
            }
        };
        if let Some(method) = method {
            return Ok(Some(NodeKind::WriterMethod {
                method,
                coercing: no_coercion(),
            }));
        }
        if self.accessor(owner, name, statics_only)?.is_some() {
            return Err(AccessError::not_writable(name, owner.name()));
        }
        Ok(None)
    }
}
