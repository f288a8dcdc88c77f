use ferrous_locator::{named, Container, DiError, Module, Resolver, Scope, ROOT_SCOPE_ID};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Session;

#[derive(Debug)]
struct Cart {
    id: usize,
}

fn session_container(counter: Arc<AtomicUsize>) -> Container {
    let mut module = Module::new();
    module.single(|_| Ok(String::from("shared")));
    module.scope_named("S", move |scope| {
        let counter = counter.clone();
        scope.scoped(move |_| {
            Ok(Cart {
                id: counter.fetch_add(1, Ordering::SeqCst),
            })
        });
    });
    Container::builder().modules([module]).build().unwrap()
}

#[test]
fn test_named_scope_isolation() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));

    let s1 = container.create_scope("k1", "S").unwrap();
    let s2 = container.create_scope("k2", "S").unwrap();
    let v1 = s1.get::<Cart>().unwrap();
    let v2 = s2.get::<Cart>().unwrap();

    assert!(!Arc::ptr_eq(&v1, &v2));
    assert!(Arc::ptr_eq(&v1, &s1.get::<Cart>().unwrap()));
    assert_ne!(v1.id, v2.id);
}

#[test]
fn test_scope_falls_back_to_root() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    let scope = container.create_scope("k1", "S").unwrap();

    let from_scope = scope.get::<String>().unwrap();
    let from_root = container.get::<String>().unwrap();
    assert!(Arc::ptr_eq(&from_scope, &from_root));

    // Scoped definitions are not visible from the root
    assert!(container.get_or_null::<Cart>().unwrap().is_none());
    assert!(scope.linked_scopes()[0].is_root());
}

#[test]
fn test_type_qualified_scope() {
    let mut module = Module::new();
    module.scope::<Session>(|scope| {
        scope.scoped(|ctx| Ok(format!("scope {}", ctx.scope().id())));
    });
    let container = Container::builder().modules([module]).build().unwrap();

    let scope = container.create_scope_for::<Session>("alpha").unwrap();
    assert_eq!(*scope.get::<String>().unwrap(), "scope alpha");
    assert!(scope.scope_qualifier().value().ends_with("Session"));
}

#[test]
fn test_create_scope_errors() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    container.create_scope("k1", "S").unwrap();

    assert!(matches!(
        container.create_scope("k1", "S"),
        Err(DiError::ScopeAlreadyCreated { ref scope_id }) if scope_id == "k1"
    ));
    assert!(matches!(
        container.create_scope("k2", "Unknown"),
        Err(DiError::NoScopeDefFound { ref qualifier }) if qualifier == "Unknown"
    ));
    // The root scope definition cannot be instantiated again
    assert!(matches!(
        container.create_scope("k3", ROOT_SCOPE_ID),
        Err(DiError::NoScopeDefFound { .. })
    ));
}

#[test]
fn test_get_or_create_scope_is_idempotent() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    let a = container.get_or_create_scope("k1", "S").unwrap();
    let b = container.get_or_create_scope("k1", "S").unwrap();
    assert!(a.ptr_eq(&b));
}

#[test]
fn test_scope_lookup_and_delete() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    let scope = container.create_scope("k1", "S").unwrap();

    assert!(container.get_scope("k1").unwrap().ptr_eq(&scope));
    assert!(scope.get_scope("k1").unwrap().ptr_eq(&scope));
    assert!(matches!(
        container.get_scope("nope"),
        Err(DiError::ScopeNotCreated { .. })
    ));
    assert!(container.get_scope_or_null("nope").is_none());

    container.delete_scope("k1");
    assert!(scope.is_closed());
    assert!(container.get_scope_or_null("k1").is_none());
    // Unknown ids are ignored
    container.delete_scope("k1");

    // The id can be reused once the scope is gone
    let again = container.create_scope("k1", "S").unwrap();
    assert!(!again.ptr_eq(&scope));
}

#[test]
fn test_closed_scope_rejects_everything() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    let scope = container.create_scope("k1", "S").unwrap();
    scope.get::<Cart>().unwrap();
    scope.close();

    assert!(matches!(scope.get::<Cart>(), Err(DiError::ClosedScope { ref scope_id }) if scope_id == "k1"));
    // Even lookups that would fall back to the root
    assert!(matches!(scope.get::<String>(), Err(DiError::ClosedScope { .. })));
    assert!(matches!(scope.get_or_null::<u8>(), Err(DiError::ClosedScope { .. })));
    assert!(matches!(scope.declare(1u8), Err(DiError::ClosedScope { .. })));
    assert!(matches!(
        scope.register_callback(|_: &Scope| {}),
        Err(DiError::ClosedScope { .. })
    ));
    // Closing twice is harmless
    scope.close();
}

#[test]
fn test_linked_scopes_resolve_in_order() {
    let mut module = Module::new();
    module.scope_named("A", |scope| {
        scope.scoped(|_| Ok(String::from("from A")));
    });
    module.scope_named("B", |scope| {
        scope.scoped(|_| Ok(String::from("from B")));
        scope.scoped(|_| Ok(42u32));
    });
    module.scope_named("C", |_| {});
    let container = Container::builder().modules([module]).build().unwrap();

    let a = container.create_scope("a", "A").unwrap();
    let b = container.create_scope("b", "B").unwrap();
    let c = container.create_scope("c", "C").unwrap();

    c.link_to(&b).unwrap();
    c.link_to(&a).unwrap();
    assert_eq!(*c.get::<String>().unwrap(), "from B");

    c.unlink(&b);
    assert_eq!(*c.get::<String>().unwrap(), "from A");
    assert!(c.get_or_null::<u32>().unwrap().is_none());

    // Own registry wins over any link
    a.link_to(&b).unwrap();
    assert_eq!(*a.get::<String>().unwrap(), "from A");
    assert_eq!(*a.get::<u32>().unwrap(), 42);

    // Linking is asymmetric
    assert!(b.get_or_null::<u32>().unwrap().is_some());
    assert_eq!(*b.get::<String>().unwrap(), "from B");
}

#[test]
fn test_invalid_links() {
    let mut module = Module::new();
    module.scope_named("A", |_| {});
    let container = Container::builder().modules([module]).build().unwrap();

    let a = container.create_scope("a", "A").unwrap();
    let b = container.create_scope("b", "A").unwrap();
    let root = container.root_scope().unwrap();

    assert!(matches!(a.link_to(&root), Err(DiError::InvalidLink { .. })));
    assert!(matches!(a.link_to(&a), Err(DiError::InvalidLink { .. })));

    a.link_to(&b).unwrap();
    // Linking twice keeps a single entry
    a.link_to(&b).unwrap();
    assert_eq!(a.linked_scopes().len(), 2);
    assert!(matches!(
        b.link_to(&a),
        Err(DiError::InvalidLink { ref reason, .. }) if reason.contains("cycle")
    ));
}

#[test]
fn test_closed_linked_scope_is_skipped() {
    let mut module = Module::new();
    module.scope_named("A", |scope| {
        scope.scoped(|_| Ok(7u8));
    });
    module.scope_named("B", |_| {});
    let container = Container::builder().modules([module]).build().unwrap();

    let a = container.create_scope("a", "A").unwrap();
    let b = container.create_scope("b", "B").unwrap();
    b.link_to(&a).unwrap();
    assert_eq!(*b.get::<u8>().unwrap(), 7);

    a.close();
    assert!(b.get_or_null::<u8>().unwrap().is_none());
}

#[test]
fn test_scope_callbacks_fire_in_order_once() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    let scope = container.create_scope("k1", "S").unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let log = log.clone();
        scope
            .register_callback(move |s: &Scope| {
                assert!(s.is_closed());
                log.lock().unwrap().push(i);
            })
            .unwrap();
    }
    scope.close();
    scope.close();
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_panicking_callback_does_not_stop_close() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    let scope = container.create_scope("k1", "S").unwrap();
    let fired = Arc::new(AtomicUsize::new(0));

    fn exploding(_: &Scope) {
        panic!("callback failure");
    }

    scope.register_callback(exploding).unwrap();
    let f = fired.clone();
    scope
        .register_callback(move |_: &Scope| {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    scope.close();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(container.get_scope_or_null("k1").is_none());
}

#[test]
fn test_scope_declare_is_local() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    let s1 = container.create_scope("k1", "S").unwrap();
    let s2 = container.create_scope("k2", "S").unwrap();

    let token = Arc::new(String::from("request-token"));
    s1.declare_with(token.clone(), |d| {
        d.named("token");
    })
    .unwrap();

    assert!(Arc::ptr_eq(&s1.get_named::<String>("token").unwrap(), &token));
    assert!(s2.get_or_null::<String>().unwrap().is_some()); // unqualified one from root
    assert!(s2
        .try_resolve::<String>(Some(named("token")), None)
        .unwrap()
        .is_none());
    assert!(container
        .try_resolve::<String>(Some(named("token")), None)
        .unwrap()
        .is_none());
}

#[test]
fn test_scope_reaches_container_properties() {
    let container = session_container(Arc::new(AtomicUsize::new(0)));
    container.set_property("tenant", String::from("acme"));
    let scope = container.create_scope("k1", "S").unwrap();

    assert_eq!(scope.get_property::<String>("tenant").unwrap(), "acme");
    assert_eq!(scope.get_property_or("absent", 3i64), 3);
    assert!(scope.container().unwrap().ptr_eq(&container));
}

#[test]
fn test_scopes_created_before_load_receive_new_definitions() {
    let mut first = Module::new();
    first.scope_named("S", |scope| {
        scope.scoped(|_| Ok(1u8));
    });
    let container = Container::builder().modules([first]).build().unwrap();
    let scope = container.create_scope("k1", "S").unwrap();
    assert!(scope.get_or_null::<u16>().unwrap().is_none());

    let mut second = Module::new();
    second.scope_named("S", |scope| {
        scope.scoped(|_| Ok(2u16));
    });
    container.load_modules(&[second]).unwrap();
    assert_eq!(*scope.get::<u16>().unwrap(), 2);
}

#[test]
fn test_empty_scope_block_defines_scope() {
    let mut module = Module::new();
    module.single(|_| Ok(5u16));
    module.scope_named("Empty", |_| {});
    let container = Container::builder().modules([module]).build().unwrap();

    let scope = container.create_scope("e", "Empty").unwrap();
    assert_eq!(scope.scope_qualifier(), &named("Empty"));
    assert_eq!(*scope.get::<u16>().unwrap(), 5);
    assert_eq!(container.scope_registry_size(), 1);
}

#[test]
fn test_get_all_reads_each_linked_scope_once() {
    #[derive(Debug)]
    struct Shared(&'static str);

    let mut module = Module::new();
    module.single(|_| Ok(Shared("root")));
    module.scope_named("A", |_| {});
    module.scope_named("B", |scope| {
        scope.scoped(|_| Ok(Shared("b")));
    });
    let container = Container::builder().modules([module]).build().unwrap();

    let a = container.create_scope("a", "A").unwrap();
    let b = container.create_scope("b", "B").unwrap();
    container.get::<Shared>().unwrap();
    b.get::<Shared>().unwrap();

    // a -> [root, b] and b -> [root]: root is reachable twice
    a.link_to(&b).unwrap();
    let all = a.get_all::<Shared>().unwrap();
    let names: Vec<&str> = all.iter().map(|s| s.0).collect();
    assert_eq!(names, vec!["root", "b"]);
}

#[test]
fn test_unlink_keeps_root_fallback() {
    let mut module = Module::new();
    module.single(|_| Ok(String::from("shared")));
    module.scope_named("A", |_| {});
    let container = Container::builder().modules([module]).build().unwrap();

    let a = container.create_scope("a", "A").unwrap();
    let root = container.root_scope().unwrap();
    a.unlink(&root);

    assert_eq!(a.linked_scopes().len(), 1);
    assert!(a.linked_scopes()[0].is_root());
    assert_eq!(*a.get::<String>().unwrap(), "shared");
}
