use super::*;
use crate::error::Result;
use crate::value::Object;

struct PendingField {
    name: Arc<str>,
    ty: TypeRef,
    is_static: bool,
    public: bool,
    is_final: bool,
    initial: Value,
}

struct PendingMethod {
    name: Arc<str>,
    params: Vec<TypeRef>,
    is_static: bool,
    public: bool,
    body: MethodBody,
}

/// Fluent description of a host type.
///
/// ```
/// use fp_access::types::{builtins, TypeBuilder};
///
/// let point = TypeBuilder::class("Point")
///     .field("x", &builtins().prim_int)
///     .field("y", &builtins().prim_int)
///     .default_constructor()
///     .build();
/// assert_eq!(point.find_field("y").unwrap().name(), "y");
/// ```
pub struct TypeBuilder {
    name: Arc<str>,
    kind: TypeKind,
    public: bool,
    superclass: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    fields: Vec<PendingField>,
    methods: Vec<PendingMethod>,
    constructors: Vec<ConstructorInfo>,
}

impl TypeBuilder {
    fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            public: true,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn class(name: &str) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn interface(name: &str) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub(super) fn primitive(prim: Prim) -> Self {
        Self::new(prim.name(), TypeKind::Primitive(prim))
    }

    pub(super) fn boxed(prim: Prim) -> Self {
        Self::new(prim.boxed_name(), TypeKind::Boxed(prim))
    }

    /// Marks the type non-public: its own methods fail with a visibility error
    /// unless reached through a public interface.
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn extends(mut self, superclass: &TypeRef) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    pub fn implements(mut self, interface: &TypeRef) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    fn push_field(mut self, name: &str, ty: &TypeRef, is_static: bool, public: bool) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            ty: ty.clone(),
            is_static,
            public,
            is_final: false,
            initial: ty.default_value(),
        });
        self
    }

    /// Public instance field.
    pub fn field(self, name: &str, ty: &TypeRef) -> Self {
        self.push_field(name, ty, false, true)
    }

    /// Instance field that path access can only reach through accessors.
    pub fn private_field(self, name: &str, ty: &TypeRef) -> Self {
        self.push_field(name, ty, false, false)
    }

    /// Public static field with an initial value.
    pub fn static_field(self, name: &str, ty: &TypeRef, initial: Value) -> Self {
        let mut this = self.push_field(name, ty, true, true);
        if let Some(field) = this.fields.last_mut() {
            field.initial = initial;
        }
        this
    }

    /// Public static final field.
    pub fn constant(self, name: &str, ty: &TypeRef, value: Value) -> Self {
        let mut this = self.static_field(name, ty, value);
        if let Some(field) = this.fields.last_mut() {
            field.is_final = true;
        }
        this
    }

    /// Marks the most recently declared field final.
    pub fn final_field(mut self) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.is_final = true;
        }
        self
    }

    fn push_method(
        mut self,
        name: &str,
        params: &[&TypeRef],
        is_static: bool,
        public: bool,
        body: MethodBody,
    ) -> Self {
        self.methods.push(PendingMethod {
            name: name.into(),
            params: params.iter().map(|p| (*p).clone()).collect(),
            is_static,
            public,
            body,
        });
        self
    }

    pub fn method<F>(self, name: &str, params: &[&TypeRef], body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.push_method(name, params, false, true, MethodBody::Native(Arc::new(body)))
    }

    pub fn private_method<F>(self, name: &str, params: &[&TypeRef], body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.push_method(name, params, false, false, MethodBody::Native(Arc::new(body)))
    }

    pub fn static_method<F>(self, name: &str, params: &[&TypeRef], body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let body: NativeFn = Arc::new(move |_: &Value, args: &[Value]| body(args));
        self.push_method(name, params, true, true, MethodBody::Native(body))
    }

    pub fn abstract_method(self, name: &str, params: &[&TypeRef]) -> Self {
        self.push_method(name, params, false, true, MethodBody::Abstract)
    }

    /// Bean property: a private slot with a `getX` accessor and a `setX` writer.
    pub fn property(self, name: &str, ty: &TypeRef) -> Self {
        let slot = self.next_instance_slot();
        let suffix = capitalize(name);
        let getter = if matches!(ty.prim(), Some(Prim::Bool)) {
            format!("is{suffix}")
        } else {
            format!("get{suffix}")
        };
        self.private_field(name, ty)
            .method(&getter, &[], move |this, _| Ok(slot_of(this, slot)))
            .method(&format!("set{suffix}"), &[ty], move |this, args| {
                if let (Value::Object(object), Some(value)) = (this, args.first()) {
                    object.set_slot(slot, value.clone());
                }
                Ok(Value::Null)
            })
    }

    /// Read-only bean property.
    pub fn read_only_property(self, name: &str, ty: &TypeRef) -> Self {
        let slot = self.next_instance_slot();
        let getter = format!("get{}", capitalize(name));
        self.private_field(name, ty)
            .method(&getter, &[], move |this, _| Ok(slot_of(this, slot)))
    }

    pub fn constructor<F>(mut self, params: &[&TypeRef], body: F) -> Self
    where
        F: Fn(&TypeRef, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorInfo {
            params: params.iter().map(|p| (*p).clone()).collect(),
            body: Arc::new(body),
        });
        self
    }

    /// Zero-argument constructor allocating default slots.
    pub fn default_constructor(self) -> Self {
        self.constructor(&[], |ty, _| Ok(Value::Object(Object::new(ty))))
    }

    /// Constructor assigning its arguments to the named instance fields, in order.
    pub fn field_constructor(self, fields: &[&str]) -> Self {
        let names: Vec<Arc<str>> = fields.iter().map(|name| Arc::from(*name)).collect();
        let params: Vec<TypeRef> = names
            .iter()
            .filter_map(|name| {
                self.fields
                    .iter()
                    .find(|field| field.name == *name)
                    .map(|field| field.ty.clone())
            })
            .collect();
        let param_refs: Vec<&TypeRef> = params.iter().collect();
        self.constructor(&param_refs, move |ty, args| {
            let object = Object::new(ty);
            for (name, value) in names.iter().zip(args) {
                object.set(name, value.clone());
            }
            Ok(Value::Object(object))
        })
    }

    fn inherited_slots(&self) -> usize {
        self.superclass
            .as_ref()
            .map(|parent| parent.instance_slots)
            .unwrap_or(0)
    }

    fn next_instance_slot(&self) -> usize {
        self.inherited_slots() + self.fields.iter().filter(|f| !f.is_static).count()
    }

    pub fn build(self) -> TypeRef {
        let key = TypeKey::next();
        let accessible_type = self.public;
        let mut instance = self.inherited_slots();
        let mut statics = Vec::new();
        let fields = self
            .fields
            .into_iter()
            .map(|field| {
                let storage = if field.is_static {
                    statics.push(field.initial);
                    FieldStorage::Static(statics.len() - 1)
                } else {
                    instance += 1;
                    FieldStorage::Instance(instance - 1)
                };
                Arc::new(FieldInfo {
                    name: field.name,
                    ty: field.ty,
                    storage,
                    public: field.public,
                    is_final: field.is_final,
                    owner: self.name.clone(),
                })
            })
            .collect();
        let methods = self
            .methods
            .into_iter()
            .map(|method| {
                Arc::new(MethodInfo {
                    name: method.name,
                    params: method.params,
                    is_static: method.is_static,
                    public: method.public,
                    accessible: accessible_type && method.public,
                    owner: self.name.clone(),
                    owner_key: key,
                    body: method.body,
                })
            })
            .collect();
        Arc::new(TypeInfo {
            key,
            name: self.name,
            kind: self.kind,
            public: self.public,
            superclass: self.superclass,
            interfaces: self.interfaces,
            fields,
            methods,
            constructors: self.constructors.into_iter().map(Arc::new).collect(),
            instance_slots: instance,
            statics: RwLock::new(statics),
        })
    }
}

fn slot_of(this: &Value, slot: usize) -> Value {
    match this {
        Value::Object(object) => object.slot(slot),
        _ => Value::Null,
    }
}

pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
