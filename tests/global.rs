use ferrous_locator::{global, Container, DiError, Module, Resolver};
use serial_test::serial;

fn greeting_module(text: &'static str) -> Module {
    let mut module = Module::new();
    module.single(move |_| Ok(text.to_string()));
    module
}

#[test]
#[serial]
fn test_start_and_stop() {
    assert!(global::global().is_none());

    let started = global::start(Container::builder().modules([greeting_module("hi")])).unwrap();
    let current = global::global().unwrap();
    assert!(current.ptr_eq(&started));
    assert_eq!(*current.get::<String>().unwrap(), "hi");

    global::stop();
    assert!(global::global().is_none());
    assert!(started.is_closed());
    // Stopping twice is a no-op
    global::stop();
}

#[test]
#[serial]
fn test_second_start_is_rejected() {
    global::start(Container::builder()).unwrap();

    assert!(matches!(
        global::start(Container::builder().modules([greeting_module("again")])),
        Err(DiError::AlreadyStarted)
    ));
    let standalone = Container::new();
    assert!(matches!(
        global::start_container(standalone.clone()),
        Err(DiError::AlreadyStarted)
    ));
    assert!(!standalone.is_closed());

    global::stop();
}

#[test]
#[serial]
fn test_load_and_unload_through_global() {
    let module = greeting_module("loaded");
    assert!(matches!(
        global::load_modules(&[module.clone()]),
        Err(DiError::ScopeNotCreated { .. })
    ));

    global::start_container(Container::new()).unwrap();
    global::load_modules(&[module.clone()]).unwrap();
    let container = global::global().unwrap();
    assert_eq!(*container.get::<String>().unwrap(), "loaded");

    global::unload_modules(&[module]).unwrap();
    assert!(container.get_or_null::<String>().unwrap().is_none());

    global::stop();
}

#[test]
#[serial]
fn test_failed_build_leaves_holder_empty() {
    let mut module = Module::new();
    module
        .single::<u8, _>(|_| Err("broken".into()))
        .create_at_start();

    let result = global::start(
        Container::builder()
            .modules([module])
            .create_eager_instances(true),
    );
    assert!(matches!(result, Err(DiError::InstanceCreation { .. })));
    assert!(global::global().is_none());
}
