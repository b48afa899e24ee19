mod support;

use fp_access::handler::PropertyHandler;
use fp_access::scope::{EmptyScope, MapVariableScope, VariableScope};
use fp_access::types::builtins;
use fp_access::{AccessError, Object, TypeBuilder, Value};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use support::{scope_with_foo, Fixture};

#[derive(Default)]
struct Echo {
    written: Mutex<Vec<(String, Value)>>,
}

impl PropertyHandler for Echo {
    fn get_property(&self, name: &str, _target: &Value, _scope: &dyn VariableScope) -> fp_access::Result<Value> {
        Ok(Value::string(format!("echo:{name}")))
    }

    fn set_property(
        &self,
        name: &str,
        _target: &Value,
        _scope: &dyn VariableScope,
        value: Value,
    ) -> fp_access::Result<()> {
        self.written.lock().unwrap().push((name.to_string(), value));
        Ok(())
    }
}

#[test]
fn resolves_properties_and_methods_through_a_path() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    scope.insert("list", Value::list([Value::Int(1), Value::Int(2), Value::Int(3)]));
    scope.insert("map", Value::map([]));

    assert_eq!(fx.get("foo.bar.name", &Value::Null, &scope), Value::string("dog"));
    assert_eq!(
        fx.get("foo.bar.name.toUpperCase()", &Value::Null, &scope),
        Value::string("DOG")
    );
    assert_eq!(fx.get("list[2]", &Value::Null, &scope), Value::Int(3));

    fx.cx
        .set("map['k']", &Value::Null, &scope, Value::Int(5))
        .unwrap();
    assert_eq!(fx.get("map['k']", &Value::Null, &scope), Value::Int(5));
}

#[test]
fn first_segment_reads_the_root_or_self_token() {
    let fx = Fixture::new();
    let root = fx.foo("cat");
    let scope = MapVariableScope::new();

    assert_eq!(fx.get("count", &root, &scope), Value::Int(3));
    assert_eq!(fx.get("bar.name", &root, &scope), Value::string("cat"));
    assert_eq!(fx.get("this", &root, &scope), root);
    assert_eq!(fx.get("this.bar.name", &root, &scope), Value::string("cat"));
}

#[test]
fn accessors_prefer_fields_then_getters_then_bare_names() {
    let fx = Fixture::new();
    let root = fx.foo("cat");
    let scope = MapVariableScope::new();

    assert_eq!(fx.get("active", &root, &scope), Value::Bool(false));
    assert_eq!(fx.get("code", &root, &scope), Value::Null);
    assert_eq!(fx.get("bar.name.length", &root, &scope), Value::Int(3));
    assert_eq!(fx.get("bar.name.empty", &root, &scope), Value::Bool(false));
}

#[test]
fn overloads_pick_the_best_scoring_candidate() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);

    assert_eq!(fx.get("foo.describe('x')", &Value::Null, &scope), Value::string("string:x"));
    assert_eq!(fx.get("foo.describe(5)", &Value::Null, &scope), Value::string("int:5"));
    assert_eq!(fx.get("foo.describe(null)", &Value::Null, &scope), Value::string("string:null"));
    // any numeric argument prefers a numeric parameter over text conversion
    assert_eq!(fx.get("foo.describe(5L)", &Value::Null, &scope), Value::string("int:5"));
    assert_eq!(fx.get("foo.describe(2.5)", &Value::Null, &scope), Value::string("int:2"));

    let object = fx.get("foo.describe(foo.bar)", &Value::Null, &scope);
    assert!(object.to_string().starts_with("object:Bar@"), "{object}");

    assert_eq!(fx.get("Math.max(2, 7)", &Value::Null, &scope), Value::Int(7));
    assert_eq!(fx.get("Math.max(2L, 7)", &Value::Null, &scope), Value::Long(7));
    assert_eq!(fx.get("Math.max(2.5, 1)", &Value::Null, &scope), Value::Double(2.5));
}

#[test]
fn unresolvable_call_reports_argument_types() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    let err = fx.get_err("foo.describe(1, 2)", &Value::Null, &scope);
    assert_eq!(
        err,
        AccessError::Unresolvable {
            name: "describe".into(),
            owner: "Foo".into(),
            args: Some(vec!["Integer".into(), "Integer".into()]),
        }
    );
    assert_eq!(
        err.to_string(),
        "unable to resolve method describe(Integer, Integer) on Foo"
    );
}

#[test]
fn unknown_property_is_unresolvable() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    assert_eq!(
        fx.get_err("foo.missing", &Value::Null, &scope),
        AccessError::unresolvable("missing", "Foo")
    );
}

#[test]
fn host_failures_become_invocation_errors() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    assert_eq!(
        fx.get_err("foo.fail()", &Value::Null, &scope),
        AccessError::Invocation {
            name: "fail()".into(),
            message: "boom".into(),
        }
    );
}

#[test]
fn indexes_dispatch_by_shape() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("s", "hello");
    scope.insert("c", Value::collection(["a", "b", "c"].map(Value::string)));
    scope.insert("m", Value::map([(Value::string("k"), Value::Int(1))]));
    scope.insert("i", 1);
    let ints = fx.cx.types().array_type(&builtins().prim_int);
    scope.insert("nums", Value::array(ints, [Value::Int(4), Value::Int(5)]));

    assert_eq!(fx.get("s[1]", &Value::Null, &scope), Value::Char('e'));
    assert_eq!(fx.get("c[i]", &Value::Null, &scope), Value::string("b"));
    assert_eq!(fx.get("m['k']", &Value::Null, &scope), Value::Int(1));
    assert_eq!(fx.get("m['absent']", &Value::Null, &scope), Value::Null);
    assert_eq!(fx.get("nums[1]", &Value::Null, &scope), Value::Int(5));
    assert_eq!(fx.get("nums.length", &Value::Null, &scope), Value::Int(2));
}

#[test]
fn out_of_range_indexes_fail() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("list", Value::list([Value::Int(1), Value::Int(2), Value::Int(3)]));
    scope.insert("c", Value::collection([Value::Int(1)]));

    assert_eq!(
        fx.get_err("list[3]", &Value::Null, &scope),
        AccessError::IndexOutOfRange { index: 3, size: 3 }
    );
    assert_eq!(
        fx.get_err("list[-1]", &Value::Null, &scope),
        AccessError::IndexOutOfRange { index: -1, size: 3 }
    );
    assert_eq!(
        fx.get_err("c[1]", &Value::Null, &scope),
        AccessError::IndexOutOfRange { index: 1, size: 1 }
    );
}

#[test]
fn map_keys_read_by_name_after_members() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("m", Value::map([(Value::string("k"), Value::Int(1))]));

    assert_eq!(fx.get("m.k", &Value::Null, &scope), Value::Int(1));
    assert_eq!(fx.get("m.size", &Value::Null, &scope), Value::Int(1));
    assert_eq!(fx.get("m.?missing", &Value::Null, &scope), Value::Null);
    assert_eq!(
        fx.get_err("m.missing", &Value::Null, &scope),
        AccessError::unresolvable("missing", "Map")
    );
}

#[test]
fn null_safe_navigation_short_circuits() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("a", Value::Null);

    assert_eq!(fx.get("a.?b.c", &Value::Null, &scope), Value::Null);
    assert_eq!(fx.get("a.?bar.name.nothing()", &Value::Null, &scope), Value::Null);
    assert_eq!(
        fx.get_err("a.bar", &Value::Null, &scope),
        AccessError::null_target("bar")
    );

    scope.insert("a", fx.foo("owl"));
    assert_eq!(fx.get("a.?bar.name", &Value::Null, &scope), Value::string("owl"));
}

#[test]
fn null_intermediate_without_null_safe_fails() {
    let fx = Fixture::new();
    let root = fx.foo("cat");
    let scope = MapVariableScope::new();
    fx.cx.set("bar", &root, &scope, Value::Null).unwrap();

    assert_eq!(
        fx.get_err("bar.name", &root, &scope),
        AccessError::null_target("name")
    );
    assert_eq!(fx.get("bar.?name", &root, &scope), Value::Null);
}

#[test]
fn static_members_and_literals() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();

    assert_eq!(fx.get("Foo.VERSION", &Value::Null, &scope), Value::string("1.0"));
    assert_eq!(fx.get("Foo.twice(21)", &Value::Null, &scope), Value::Int(42));
    assert_eq!(fx.get("Foo.name", &Value::Null, &scope), Value::string("Foo"));
    assert_eq!(fx.get("Foo.getName()", &Value::Null, &scope), Value::string("Foo"));
    assert_eq!(fx.get("Integer.MAX_VALUE", &Value::Null, &scope), Value::Int(i32::MAX));
    assert_eq!(fx.get("Integer.parseInt('42')", &Value::Null, &scope), Value::Int(42));
    assert_eq!(fx.get("Math.PI", &Value::Null, &scope), Value::Double(std::f64::consts::PI));
    assert_eq!(fx.get("true", &Value::Null, &scope), Value::Bool(true));
    assert_eq!(fx.get("null", &Value::Null, &scope), Value::Null);

    fx.cx
        .set("Foo.instances", &Value::Null, &scope, Value::Int(5))
        .unwrap();
    assert_eq!(fx.get("Foo.instances", &Value::Null, &scope), Value::Int(5));
    assert_eq!(
        fx.cx
            .set("Foo.VERSION", &Value::Null, &scope, Value::string("2.0"))
            .unwrap_err(),
        AccessError::not_writable("VERSION", "Foo")
    );
}

#[test]
fn qualified_type_names_use_the_longest_prefix() {
    let fx = Fixture::new();
    fx.cx.types().register_alias("com.acme.Foo", &fx.foo);
    let scope = MapVariableScope::new();

    assert_eq!(
        fx.get("com.acme.Foo.VERSION", &Value::Null, &scope),
        Value::string("1.0")
    );
    assert_eq!(
        fx.get("com.acme.Foo", &Value::Null, &scope),
        Value::Type(fx.foo.clone())
    );
    fx.cx
        .set("com.acme.Foo.instances", &Value::Null, &scope, Value::Int(9))
        .unwrap();
    assert_eq!(fx.get("Foo.instances", &Value::Null, &scope), Value::Int(9));
}

#[test]
fn constructors_resolve_by_arguments() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();

    assert_eq!(fx.get("new Bar('cat').name", &Value::Null, &scope), Value::string("cat"));
    assert_eq!(fx.get("new Foo().count", &Value::Null, &scope), Value::Int(0));
    assert_eq!(fx.get("new List().size()", &Value::Null, &scope), Value::Int(0));
    assert!(matches!(
        fx.get_err("new Bar(1, 2)", &Value::Null, &scope),
        AccessError::Unresolvable { args: Some(_), .. }
    ));
    assert_eq!(
        fx.get_err("new Missing()", &Value::Null, &scope),
        AccessError::unresolvable("Missing", "type registry")
    );
}

#[test]
fn nested_block_applies_clauses_to_the_receiver() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);

    let count = fx.get(
        "foo.{ count = 10, bar.name = 'cat', ratio = count }.count",
        &Value::Null,
        &scope,
    );
    assert_eq!(count, Value::Int(10));
    assert_eq!(fx.get("foo.bar.name", &Value::Null, &scope), Value::string("cat"));
    // right-hand sides see the receiver's members as clauses assign them
    assert_eq!(fx.get("foo.ratio", &Value::Null, &scope), Value::Double(10.0));
}

#[test]
fn writes_coerce_to_the_slot_type() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    let ints = fx.cx.types().array_type(&builtins().prim_int);
    scope.insert("nums", Value::array(ints, [Value::Int(1)]));

    fx.cx
        .set("foo.count", &Value::Null, &scope, Value::string("12"))
        .unwrap();
    assert_eq!(fx.get("foo.count", &Value::Null, &scope), Value::Int(12));

    fx.cx
        .set("foo.bar.name", &Value::Null, &scope, Value::Int(42))
        .unwrap();
    assert_eq!(fx.get("foo.bar.name", &Value::Null, &scope), Value::string("42"));

    fx.cx
        .set("nums[0]", &Value::Null, &scope, Value::string("7"))
        .unwrap();
    assert_eq!(fx.get("nums[0]", &Value::Null, &scope), Value::Int(7));

    let err = fx
        .cx
        .set("foo.count", &Value::Null, &scope, Value::string("many"))
        .unwrap_err();
    assert!(matches!(err, AccessError::Conversion { .. }), "{err}");
}

#[test]
fn read_only_segments_refuse_writes() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    scope.insert("s", "text");
    let set = |path: &str| {
        fx.cx
            .set(path, &Value::Null, &scope, Value::Int(1))
            .unwrap_err()
    };

    assert_eq!(set("foo.id"), AccessError::not_writable("id", "Foo"));
    assert_eq!(set("foo.code"), AccessError::not_writable("code", "Foo"));
    assert!(matches!(set("foo.describe(1)"), AccessError::NotWritable { .. }));
    assert!(matches!(set("s[0]"), AccessError::NotWritable { .. }));
    assert!(matches!(set("this"), AccessError::NotWritable { .. }));
}

#[test]
fn writes_create_missing_variables() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    fx.cx.set("fresh", &Value::Null, &scope, Value::Int(3)).unwrap();
    assert_eq!(scope.get("fresh"), Some(Value::Int(3)));
    assert!(scope.is_resolvable("fresh"));

    let err = fx
        .cx
        .set("fresh", &Value::Null, &EmptyScope, Value::Int(3))
        .unwrap_err();
    assert!(matches!(err, AccessError::NotWritable { .. }));
}

#[test]
fn inaccessible_methods_fall_back_to_interfaces() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("h", fx.hidden());

    assert_eq!(fx.get("h.name", &Value::Null, &scope), Value::string("hidden"));
    assert_eq!(fx.get("h.getName()", &Value::Null, &scope), Value::string("hidden"));
    assert_eq!(
        fx.get_err("h.reveal()", &Value::Null, &scope),
        AccessError::Inaccessible {
            name: "reveal()".into(),
            owner: "Hidden".into(),
        }
    );
}

#[test]
fn extension_handlers_claim_opaque_types() {
    let fx = Fixture::new();
    let bag = TypeBuilder::class("Bag").build();
    fx.cx.types().register(&bag);
    let echo = Arc::new(Echo::default());
    fx.cx.handlers().register(&bag, echo.clone());
    let scope = MapVariableScope::new();
    scope.insert("b", Object::new(&bag));

    assert_eq!(fx.get("b.anything", &Value::Null, &scope), Value::string("echo:anything"));
    // members still win over the handler
    assert_eq!(fx.get("b.toString().length()", &Value::Null, &scope).as_i64().map(|n| n > 4), Some(true));

    fx.cx.set("b.slot", &Value::Null, &scope, Value::Int(1)).unwrap();
    assert_eq!(
        *echo.written.lock().unwrap(),
        vec![("slot".to_string(), Value::Int(1))]
    );
}

#[test]
fn typed_reads_convert_the_result() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    let b = builtins();

    assert_eq!(
        fx.cx.get_as("foo.count", &Value::Null, &scope, &b.string).unwrap(),
        Value::string("3")
    );
    assert_eq!(
        fx.cx.get_as("foo.count", &Value::Null, &scope, &b.prim_long).unwrap(),
        Value::Long(3)
    );
}

#[test]
fn malformed_paths_are_syntax_errors() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);

    assert!(matches!(
        fx.get_err("foo.bar[0", &Value::Null, &scope),
        AccessError::UnterminatedDelimiter { delimiter: '[', offset: 7 }
    ));
    assert!(matches!(
        fx.get_err("foo.describe('x)", &Value::Null, &scope),
        AccessError::UnterminatedDelimiter { .. }
    ));
    assert!(matches!(
        fx.get_err("foo..bar", &Value::Null, &scope),
        AccessError::Syntax { .. }
    ));
    assert!(matches!(fx.get_err("", &Value::Null, &scope), AccessError::Syntax { .. }));
}
