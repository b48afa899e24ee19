mod support;

use fp_access::scope::MapVariableScope;
use fp_access::types::builtins;
use fp_access::{AccessConfig, AccessError, Object, ResolutionContext, TypeBuilder, Value};
use pretty_assertions::assert_eq;
use support::{scope_with_foo, Fixture};

#[test]
fn cached_entries_do_not_keep_types_alive() {
    let cx = ResolutionContext::default();
    let scope = MapVariableScope::new();
    let temp = TypeBuilder::class("Temp")
        .property("value", &builtins().string)
        .default_constructor()
        .build();
    let root = Value::Object(Object::new(&temp));
    cx.set("value", &root, &scope, Value::string("v")).unwrap();
    assert_eq!(cx.get("value", &root, &scope).unwrap(), Value::string("v"));

    let stats = cx.stats();
    assert_eq!(stats.chains.size, 2);
    assert_eq!(stats.methods.size, 2);

    drop(root);
    drop(temp);
    assert_eq!(cx.purge(), 4);
    let stats = cx.stats();
    assert_eq!(stats.chains.size, 0);
    assert_eq!(stats.methods.size, 0);
}

#[test]
fn clear_caches_resets_everything() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    fx.get("foo.bar.name", &Value::Null, &scope);
    fx.get("Foo.VERSION", &Value::Null, &scope);
    assert!(fx.cx.stats().chains.size > 0);

    fx.cx.clear_caches();
    let stats = fx.cx.stats();
    assert_eq!(stats.chains.size, 0);
    assert_eq!(stats.methods.size, 0);
    assert_eq!(stats.type_names.size, 0);
    assert_eq!(stats.compilations, 0);

    assert_eq!(fx.get("foo.bar.name", &Value::Null, &scope), Value::string("dog"));
    assert_eq!(fx.cx.stats().compilations, 1);
}

#[test]
fn registering_a_type_invalidates_remembered_misses() {
    let cx = ResolutionContext::default();
    let scope = MapVariableScope::new();
    assert_eq!(
        cx.get("Widget.ping()", &Value::Null, &scope).unwrap_err(),
        AccessError::unresolvable("Widget", "null")
    );
    assert!(cx.lookup_type("Widget").is_none());

    let widget = TypeBuilder::class("Widget")
        .static_method("ping", &[], |_| Ok(Value::string("pong")))
        .build();
    cx.types().register(&widget);
    assert_eq!(
        cx.get("Widget.ping()", &Value::Null, &scope).unwrap(),
        Value::string("pong")
    );
}

#[test]
fn purge_drops_entries_from_older_generations() {
    let fx = Fixture::new();
    let scope = MapVariableScope::new();
    assert_eq!(fx.get("Foo.VERSION", &Value::Null, &scope), Value::string("1.0"));
    assert_eq!(fx.cx.stats().chains.size, 1);

    fx.cx.types().add_literal("answer", Value::Int(42));
    assert!(fx.cx.purge() >= 1);
    assert_eq!(fx.cx.stats().chains.size, 0);
    assert_eq!(fx.get("answer", &Value::Null, &scope), Value::Int(42));
}

#[test]
fn bounded_chain_cache_evicts() {
    let config = AccessConfig {
        chain_cache_capacity: 4,
        ..AccessConfig::default()
    };
    let fx = Fixture::with_context(ResolutionContext::new(config));
    let scope = MapVariableScope::new();
    for i in 0..10 {
        scope.insert(&format!("v{i}"), i);
        assert_eq!(fx.get(&format!("v{i}"), &Value::Null, &scope), Value::Int(i));
    }
    let stats = fx.cx.stats();
    assert!(stats.chains.size <= 4);
    assert!(stats.chains.evictions > 0);
}

#[test]
fn shared_context_resolves_across_threads() {
    let fx = Fixture::new();
    let scope = scope_with_foo(&fx);
    std::thread::scope(|s| {
        for t in 0..8 {
            let fx = &fx;
            let scope = &scope;
            s.spawn(move || {
                let name = format!("t{t}");
                for i in 0..50 {
                    assert_eq!(fx.get("foo.bar.name", &Value::Null, scope), Value::string("dog"));
                    fx.cx
                        .set(&name, &Value::Null, scope, Value::Int(i))
                        .unwrap();
                    assert_eq!(fx.get(&name, &Value::Null, scope), Value::Int(i));
                }
            });
        }
    });
    let stats = fx.cx.stats();
    assert!(stats.chains.hits > 0);
    assert!(stats.compilations < 8 * 50);
    assert!(stats.to_string().contains("Chains:"));
}
