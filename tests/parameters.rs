use ferrous_locator::{parameters_of, CallerThread, Container, DiError, Module, Parameters, Resolver};
use std::sync::Arc;

#[derive(Debug)]
struct Greeting(String);

#[derive(Debug)]
struct Envelope {
    greeting: Arc<Greeting>,
    recipient: String,
}

fn greeting_module() -> Module {
    let mut module = Module::new();
    module.factory(|ctx| Ok(Greeting(format!("hello {}", ctx.param::<String>(0)?))));
    module
}

#[test]
fn test_parameters_reach_builder() {
    let container = Container::builder().modules([greeting_module()]).build().unwrap();
    let greeting = container
        .get_with::<Greeting>(parameters_of!("world".to_string()))
        .unwrap();
    assert_eq!(greeting.0, "hello world");
}

#[test]
fn test_missing_parameter_propagates() {
    let container = Container::builder().modules([greeting_module()]).build().unwrap();

    assert!(matches!(
        container.get::<Greeting>(),
        Err(DiError::MissingParameter { index: 0, supplied: 0, .. })
    ));
    // Wrong type at the right index
    assert!(matches!(
        container.get_with::<Greeting>(parameters_of!(5u8)),
        Err(DiError::MissingParameter { index: 0, supplied: 1, .. })
    ));
}

#[test]
fn test_nested_resolution_inherits_parameters() {
    let mut module = greeting_module();
    module.factory(|ctx| {
        Ok(Envelope {
            greeting: ctx.get::<Greeting>()?,
            recipient: ctx.param(0)?,
        })
    });
    let container = Container::builder().modules([module]).build().unwrap();

    let envelope = container
        .get_with::<Envelope>(parameters_of!("bob".to_string()))
        .unwrap();
    assert_eq!(envelope.greeting.0, "hello bob");
    assert_eq!(envelope.recipient, "bob");
}

#[test]
fn test_nested_parameters_shadow_then_restore() {
    let mut module = greeting_module();
    module.factory(|ctx| {
        let greeting = ctx.get_with::<Greeting>(parameters_of!("alice".to_string()))?;
        // The inner tuple is gone once the nested call returns
        let recipient: String = ctx.param(0)?;
        Ok(Envelope { greeting, recipient })
    });
    let container = Container::builder().modules([module]).build().unwrap();

    let envelope = container
        .get_with::<Envelope>(parameters_of!("bob".to_string()))
        .unwrap();
    assert_eq!(envelope.greeting.0, "hello alice");
    assert_eq!(envelope.recipient, "bob");
}

#[test]
fn test_single_ignores_later_parameters() {
    let mut module = Module::new();
    module.single(|ctx| Ok(Greeting(ctx.param(0)?)));
    let container = Container::builder().modules([module]).build().unwrap();

    let first = container
        .get_with::<Greeting>(parameters_of!("first".to_string()))
        .unwrap();
    let second = container
        .get_with::<Greeting>(parameters_of!("second".to_string()))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.0, "first");
}

#[test]
fn test_parameters_by_type_and_position() {
    let mut module = Module::new();
    module.factory(|ctx| {
        let params = ctx.parameters();
        let port = params.find::<u16>().unwrap_or(80);
        let host = params.get_or_none::<String>(0).unwrap_or_else(|| "localhost".to_string());
        Ok(format!("{host}:{port}"))
    });
    let container = Container::builder().modules([module]).build().unwrap();

    assert_eq!(*container.get::<String>().unwrap(), "localhost:80");
    assert_eq!(
        *container
            .get_with::<String>(parameters_of!("db".to_string(), 5432u16))
            .unwrap(),
        "db:5432"
    );
    let params = Parameters::new().with(8080u16);
    assert_eq!(*container.get_with::<String>(params).unwrap(), "localhost:8080");
}

#[test]
fn test_failed_nested_call_pops_its_parameters() {
    let mut module = greeting_module();
    module.factory(|ctx| {
        let missing = ctx.get_with::<u64>(parameters_of!("ignored".to_string()));
        assert!(missing.is_err());
        Ok(Envelope {
            greeting: ctx.get()?,
            recipient: ctx.param(0)?,
        })
    });
    let container = Container::builder().modules([module]).build().unwrap();

    let envelope = container
        .get_with::<Envelope>(parameters_of!("carol".to_string()))
        .unwrap();
    assert_eq!(envelope.greeting.0, "hello carol");
}

#[test]
fn test_caller_thread_is_reported() {
    let mut module = Module::new();
    module.factory(|ctx| Ok(ctx.thread()));
    let container = Container::builder().modules([module]).build().unwrap();

    let worker = container.clone();
    let on_main = std::thread::Builder::new()
        .name("main".to_string())
        .spawn(move || *worker.get::<CallerThread>().unwrap())
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(on_main, CallerThread::Main);

    let worker = container.clone();
    let elsewhere = std::thread::spawn(move || *worker.get::<CallerThread>().unwrap())
        .join()
        .unwrap();
    assert_eq!(elsewhere, CallerThread::Other);
}
