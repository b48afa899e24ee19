mod support;

use fp_access::scope::MapVariableScope;
use fp_access::{AccessConfig, AccessError, ChainMode, ResolutionContext, Value};
use pretty_assertions::assert_eq;
use support::{scope_with_foo, Fixture};

#[test]
fn replay_matches_fresh_resolution() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);

    assert_eq!(fx.get("foo.bar.name", &Value::Null, &scope), Value::string("dog"));
    assert_eq!(fx.get("foo.bar.name", &Value::Null, &scope), Value::string("dog"));

    let stats = fx.cx.stats();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.chains.hits, 1);
    assert_eq!(stats.chains.misses, 1);

    fx.cx
        .set("foo.bar.name", &Value::Null, &scope, Value::string("owl"))
        .unwrap();
    assert_eq!(fx.get("foo.bar.name", &Value::Null, &scope), Value::string("owl"));
}

#[test]
fn compiled_chain_records_each_decision() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);

    let compiled = fx.cx.compile_get("foo.bar.name", &Value::Null, &scope).unwrap();
    assert_eq!(compiled.value, Value::string("dog"));
    let chain = &compiled.chain;
    assert_eq!(chain.labels(), vec!["Variable", "AccessorMethod", "AccessorMethod"]);
    assert_eq!(chain.mode(), ChainMode::Read);
    assert!(chain.is_rooted());
    assert_eq!(chain.offset(), 0);
    assert_eq!(chain.result_type(), compiled.value.owner_key());

    let offsets: Vec<_> = chain.nodes().iter().map(|node| node.offset).collect();
    assert_eq!(offsets, vec![0, 3, 7]);

    let compiled = fx
        .cx
        .compile_set("foo.count", &Value::Null, &scope, Value::Int(5))
        .unwrap();
    assert_eq!(compiled.chain.labels(), vec!["Variable", "WriterField"]);
    assert_eq!(compiled.chain.mode(), ChainMode::Write);
}

#[test]
fn chains_replay_through_their_public_api() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    let first = fx.foo("a");
    let compiled = fx.cx.compile_get("count", &first, &scope).unwrap();
    assert_eq!(compiled.chain.labels(), vec!["Field"]);

    let second = fx.foo("b");
    fx.cx.set("count", &second, &scope, Value::Int(7)).unwrap();
    assert_eq!(compiled.chain.get(&fx.cx, &second, &scope).unwrap(), Value::Int(7));

    // a root of another type resolves from scratch
    let map = Value::map([(Value::string("count"), Value::Int(1))]);
    assert_eq!(compiled.chain.get(&fx.cx, &map, &scope).unwrap(), Value::Int(1));

    let err = compiled
        .chain
        .set(&fx.cx, &first, &scope, Value::Int(1))
        .unwrap_err();
    assert!(matches!(err, AccessError::Generic(_)), "{err}");

    let writer = fx
        .cx
        .compile_set("count", &first, &scope, Value::Int(4))
        .unwrap();
    writer.chain.set(&fx.cx, &second, &scope, Value::Int(6)).unwrap();
    assert_eq!(fx.get("count", &first, &scope), Value::Int(4));
    assert_eq!(fx.get("count", &second, &scope), Value::Int(6));
}

#[test]
fn variables_shadow_root_members_after_rebuild() {
    let fx = Fixture::new();
    let root = fx.foo("cat");
    let empty = MapVariableScope::new();
    let shadowing = MapVariableScope::new();
    shadowing.insert("count", 99);

    assert_eq!(fx.get("count", &root, &empty), Value::Int(3));
    assert_eq!(fx.get("count", &root, &shadowing), Value::Int(99));
    assert_eq!(fx.get("count", &root, &empty), Value::Int(3));
    assert_eq!(fx.cx.stats().compilations, 3);

    // a scope that agrees with the cached chain replays it
    assert_eq!(fx.get("count", &root, &MapVariableScope::new()), Value::Int(3));
    assert_eq!(fx.cx.stats().compilations, 3);
}

#[test]
fn shape_change_mid_chain_continues_from_that_segment() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("x", fx.bar("dog"));
    assert_eq!(fx.get("x.name", &Value::Null, &scope), Value::string("dog"));

    scope.insert("x", Value::map([(Value::string("name"), Value::string("cat"))]));
    assert_eq!(fx.get("x.name", &Value::Null, &scope), Value::string("cat"));
    assert_eq!(fx.cx.stats().compilations, 2);

    // the continuation is cached as well
    assert_eq!(fx.get("x.name", &Value::Null, &scope), Value::string("cat"));
    assert_eq!(fx.cx.stats().compilations, 2);

    scope.insert("x", fx.bar("owl"));
    assert_eq!(fx.get("x.name", &Value::Null, &scope), Value::string("owl"));
}

#[test]
fn writes_continue_on_shape_change() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("x", fx.bar("dog"));
    fx.cx
        .set("x.name", &Value::Null, &scope, Value::string("a"))
        .unwrap();
    assert_eq!(fx.get("x.name", &Value::Null, &scope), Value::string("a"));

    let map = Value::map([]);
    scope.insert("x", map.clone());
    fx.cx
        .set("x.name", &Value::Null, &scope, Value::string("b"))
        .unwrap();
    assert_eq!(fx.get("x['name']", &Value::Null, &scope), Value::string("b"));
}

#[test]
fn map_key_read_by_name_must_stay_present() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("m", Value::map([(Value::string("k"), Value::Int(1))]));
    assert_eq!(fx.get("m.k", &Value::Null, &scope), Value::Int(1));

    scope.insert("m", Value::map([]));
    assert_eq!(
        fx.get_err("m.k", &Value::Null, &scope),
        AccessError::unresolvable("k", "Map")
    );
}

#[test]
fn arguments_switch_to_coercion_on_first_mismatch() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    scope.insert("x", 4.0);

    let compiled = fx.cx.compile_get("foo.half(x)", &Value::Null, &scope).unwrap();
    assert_eq!(compiled.value, Value::Double(2.0));
    let call = compiled.chain.nodes().last().unwrap();
    assert!(!call.kind.is_coercing());

    scope.insert("x", 8);
    assert_eq!(
        compiled.chain.get(&fx.cx, &Value::Null, &scope).unwrap(),
        Value::Double(4.0)
    );
    assert!(call.kind.is_coercing());

    // once switched, exact arguments still work
    scope.insert("x", 3.0);
    assert_eq!(
        compiled.chain.get(&fx.cx, &Value::Null, &scope).unwrap(),
        Value::Double(1.5)
    );
}

#[test]
fn null_safe_segment_resolves_once_non_null() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("a", Value::Null);

    let compiled = fx.cx.compile_get("a.?bar.name", &Value::Null, &scope).unwrap();
    assert_eq!(compiled.value, Value::Null);
    assert_eq!(compiled.chain.labels(), vec!["Variable", "Continuation"]);

    scope.insert("a", fx.foo("owl"));
    assert_eq!(
        compiled.chain.get(&fx.cx, &Value::Null, &scope).unwrap(),
        Value::string("owl")
    );

    scope.insert("a", Value::Null);
    assert_eq!(compiled.chain.get(&fx.cx, &Value::Null, &scope).unwrap(), Value::Null);
}

#[test]
fn null_safe_write_is_skipped() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    scope.insert("a", Value::Null);
    fx.cx
        .set("a.?bar.name", &Value::Null, &scope, Value::string("x"))
        .unwrap();

    scope.insert("a", fx.foo("dog"));
    fx.cx
        .set("a.?bar.name", &Value::Null, &scope, Value::string("x"))
        .unwrap();
    assert_eq!(fx.get("a.bar.name", &Value::Null, &scope), Value::string("x"));
}

#[test]
fn disabled_cache_compiles_every_access() {
    let config = AccessConfig {
        cache_enabled: false,
        ..AccessConfig::default()
    };
    let fx = Fixture::with_context(ResolutionContext::new(config));
    let scope = scope_with_foo(&fx);

    for _ in 0..3 {
        assert_eq!(fx.get("foo.bar.name", &Value::Null, &scope), Value::string("dog"));
    }
    let stats = fx.cx.stats();
    assert_eq!(stats.compilations, 3);
    assert_eq!(stats.chains.hits, 0);
    assert_eq!(stats.chains.size, 0);
    assert_eq!(stats.methods.size, 0);
}
