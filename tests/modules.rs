//! Loading, overriding and unloading modules.

use ferrous_locator::{Container, DiError, Module, ModuleOptions, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Config {
    name: &'static str,
}

fn config_module(name: &'static str) -> Module {
    let mut module = Module::new();
    module.single(move |_| Ok(Config { name }));
    module
}

#[test]
fn test_override_replaces_definition() {
    let mut second = Module::new();
    second
        .single(|_| Ok(Config { name: "second" }))
        .allow_override(true);

    let container = Container::builder()
        .modules([config_module("first"), second])
        .build()
        .unwrap();

    assert_eq!(container.get::<Config>().unwrap().name, "second");
    assert_eq!(container.scope_registry_size(), 1);
}

#[test]
fn test_override_rejected_without_flag() {
    let result = Container::builder()
        .modules([config_module("first"), config_module("second")])
        .build();

    match result {
        Err(DiError::DefinitionOverride { key, scope }) => {
            assert!(key.to_string().ends_with("Config"));
            assert_eq!(scope, "-Root-");
        }
        other => panic!("expected DefinitionOverride, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_module_options_allow_override() {
    let mut second = Module::with_options(ModuleOptions {
        allow_override: true,
        ..ModuleOptions::default()
    });
    second.single(|_| Ok(Config { name: "lenient" }));

    let container = Container::builder()
        .modules([config_module("first"), second])
        .build()
        .unwrap();
    assert_eq!(container.get::<Config>().unwrap().name, "lenient");
}

#[test]
fn test_failed_load_changes_nothing() {
    let container = Container::builder()
        .modules([config_module("first")])
        .build()
        .unwrap();

    let mut bad = Module::new();
    bad.single(|_| Ok(7u8));
    bad.scope_named("S", |scope| {
        scope.scoped(|_| Ok(1u16));
    });
    bad.single(|_| Ok(Config { name: "conflict" }));

    assert!(matches!(
        container.load_modules(&[bad]),
        Err(DiError::DefinitionOverride { .. })
    ));
    assert_eq!(container.scope_registry_size(), 1);
    assert!(container.get_or_null::<u8>().unwrap().is_none());
    assert!(matches!(
        container.create_scope("s", "S"),
        Err(DiError::NoScopeDefFound { .. })
    ));
    assert_eq!(container.get::<Config>().unwrap().name, "first");
}

#[test]
fn test_override_disposes_replaced_instance() {
    let closed = Arc::new(Mutex::new(Vec::new()));
    let log = closed.clone();

    let mut first = Module::new();
    first.single(|_| Ok(Config { name: "first" })).on_close(move |c| {
        log.lock().unwrap().push(c.name);
    });
    let container = Container::builder().modules([first]).build().unwrap();
    let old = container.get::<Config>().unwrap();

    let mut second = Module::new();
    second
        .single(|_| Ok(Config { name: "second" }))
        .allow_override(true);
    container.load_modules(&[second]).unwrap();

    assert_eq!(*closed.lock().unwrap(), vec!["first"]);
    let new = container.get::<Config>().unwrap();
    assert_eq!(new.name, "second");
    assert!(!Arc::ptr_eq(&old, &new));
}

#[test]
fn test_load_then_unload_restores_size() {
    let container = Container::builder()
        .modules([config_module("base")])
        .build()
        .unwrap();
    assert_eq!(container.scope_registry_size(), 1);

    let mut extra = Module::new();
    extra.single(|_| Ok(1u32));
    extra.factory(|_| Ok(2u64)).named("two");
    extra.scope_named("S", |scope| {
        scope.scoped(|_| Ok(3u8));
    });

    container.load_modules(&[extra.clone()]).unwrap();
    assert_eq!(container.scope_registry_size(), 4);

    container.unload_modules(&[extra]);
    assert_eq!(container.scope_registry_size(), 1);
    assert!(container.get_or_null::<u32>().unwrap().is_none());
    assert!(container.get::<Config>().is_ok());
}

#[test]
fn test_unload_disposes_in_every_live_scope() {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();

    let mut module = Module::new();
    module.scope_named("S", move |scope| {
        let counter = counter.clone();
        scope.scoped(|_| Ok(String::from("scoped"))).on_close(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    });
    let container = Container::builder().modules([module.clone()]).build().unwrap();

    let s1 = container.create_scope("s1", "S").unwrap();
    let s2 = container.create_scope("s2", "S").unwrap();
    let _s3 = container.create_scope("s3", "S").unwrap();
    s1.get::<String>().unwrap();
    s2.get::<String>().unwrap();

    container.unload_modules(&[module]);
    // Only built instances have something to dispose
    assert_eq!(closes.load(Ordering::SeqCst), 2);
    assert!(s1.get_or_null::<String>().unwrap().is_none());
    assert_eq!(s1.instance_count(), 0);

    // Closing the scopes afterwards does not run the hooks again
    container.close();
    assert_eq!(closes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unloading_unknown_definitions_is_ignored() {
    let container = Container::builder()
        .modules([config_module("base")])
        .build()
        .unwrap();
    let mut unknown = Module::new();
    unknown.single(|_| Ok(0u8));
    unknown.scope_named("Nowhere", |scope| {
        scope.scoped(|_| Ok(0u16));
    });

    container.unload_modules(&[unknown]);
    assert_eq!(container.scope_registry_size(), 1);
}

#[test]
fn test_eager_instances_built_once() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let mut module = Module::new();
    module
        .single(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Config { name: "eager" })
        })
        .create_at_start();
    module.single(|_| Ok(0u8));

    let container = Container::builder().modules([module]).build().unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 0);

    container.create_eager_instances().unwrap();
    container.create_eager_instances().unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);

    container.get::<Config>().unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn test_eager_failure_aborts_build() {
    let mut module = Module::new();
    module
        .single::<Config, _>(|_| Err("no config file".into()))
        .create_at_start();

    let result = Container::builder()
        .modules([module])
        .create_eager_instances(true)
        .build();
    assert!(matches!(result, Err(DiError::InstanceCreation { .. })));
}

#[test]
fn test_include_merges_definitions() {
    let mut base = config_module("base");
    let mut extra = Module::new();
    extra.single(|_| Ok(5u16));
    base.include(&extra);
    assert_eq!(base.len(), 2);

    let container = Container::builder().modules([base]).build().unwrap();
    assert_eq!(*container.get::<u16>().unwrap(), 5);
}
