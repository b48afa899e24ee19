#![allow(dead_code)]
use fp_access::scope::MapVariableScope;
use fp_access::types::{builtins, TypeBuilder};
use fp_access::{AccessError, Object, ResolutionContext, TypeRef, Value};

/// A context with a small host model registered:
///
/// - `Bar { name: String }` as a bean property
/// - `Foo` with a `bar` property, public fields, statics and an overloaded `describe`
/// - `Named`, a public interface, and `Hidden`, a non-public class implementing it
pub struct Fixture {
    pub cx: ResolutionContext,
    pub bar: TypeRef,
    pub foo: TypeRef,
    pub named: TypeRef,
    pub hidden: TypeRef,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_context(ResolutionContext::default())
    }

    pub fn with_context(cx: ResolutionContext) -> Self {
        let b = builtins();
        let bar = TypeBuilder::class("Bar")
            .property("name", &b.string)
            .default_constructor()
            .field_constructor(&["name"])
            .build();
        let named = TypeBuilder::interface("Named")
            .abstract_method("getName", &[])
            .build();
        let hidden = TypeBuilder::class("Hidden")
            .private()
            .implements(&named)
            .method("getName", &[], |_, _| Ok(Value::string("hidden")))
            .method("reveal", &[], |_, _| Ok(Value::string("revealed")))
            .default_constructor()
            .build();
        let foo = TypeBuilder::class("Foo")
            .property("bar", &bar)
            .property("active", &b.prim_boolean)
            .read_only_property("code", &b.string)
            .field("count", &b.prim_int)
            .field("ratio", &b.prim_double)
            .field("id", &b.prim_long)
            .final_field()
            .static_field("instances", &b.prim_int, Value::Int(0))
            .constant("VERSION", &b.string, Value::string("1.0"))
            .method("describe", &[&b.string], |_, args| {
                Ok(Value::string(format!("string:{}", args[0])))
            })
            .method("describe", &[&b.prim_int], |_, args| {
                Ok(Value::string(format!("int:{}", args[0])))
            })
            .method("describe", &[&b.object], |_, args| {
                Ok(Value::string(format!("object:{}", args[0])))
            })
            .method("half", &[&b.prim_double], |_, args| match &args[0] {
                Value::Double(d) => Ok(Value::Double(d / 2.0)),
                other => Err(AccessError::Generic(format!(
                    "expected double, got {}",
                    other.type_name()
                ))),
            })
            .method("fail", &[], |_, _| Err(AccessError::Generic("boom".into())))
            .static_method("twice", &[&b.prim_int], |args| match &args[0] {
                Value::Int(i) => Ok(Value::Int(i * 2)),
                other => Err(AccessError::conversion(other.type_name(), "int")),
            })
            .default_constructor()
            .build();

        for ty in [&bar, &foo, &named, &hidden] {
            cx.types().register(ty);
        }
        Self {
            cx,
            bar,
            foo,
            named,
            hidden,
        }
    }

    pub fn bar(&self, name: &str) -> Value {
        let object = Object::new(&self.bar);
        object.set("name", name);
        Value::Object(object)
    }

    /// A `Foo` whose bar is named `bar_name` and whose count is 3.
    pub fn foo(&self, bar_name: &str) -> Value {
        let object = Object::new(&self.foo);
        object.set("bar", self.bar(bar_name));
        object.set("count", 3);
        Value::Object(object)
    }

    pub fn hidden(&self) -> Value {
        Value::Object(Object::new(&self.hidden))
    }

    pub fn get(&self, path: &str, root: &Value, scope: &MapVariableScope) -> Value {
        self.cx
            .get(path, root, scope)
            .unwrap_or_else(|err| panic!("get '{}' failed: {}", path, err))
    }

    pub fn get_err(&self, path: &str, root: &Value, scope: &MapVariableScope) -> AccessError {
        match self.cx.get(path, root, scope) {
            Ok(value) => panic!("get '{}' should fail, got {}", path, value),
            Err(err) => err,
        }
    }
}

/// A scope binding `foo` to a fresh `Foo` whose bar is named "dog".
pub fn scope_with_foo(fixture: &Fixture) -> MapVariableScope {
    let scope = MapVariableScope::new();
    scope.insert("foo", fixture.foo("dog"));
    scope
}
