/// Property-based tests for resolution
///
/// These tests use proptest to generate random definition sets and verify the
/// sharing and lookup-order invariants that must hold for all of them.
use ferrous_locator::{named, BuildResult, Container, Module, ResolutionContext, Resolver};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Instance {
    serial: usize,
}

fn counting(
    counter: Arc<AtomicUsize>,
) -> impl Fn(&ResolutionContext<'_>) -> BuildResult<Instance> + Send + Sync + 'static {
    move |_| {
        Ok(Instance {
            serial: counter.fetch_add(1, Ordering::SeqCst),
        })
    }
}

// Property: repeated gets share an instance iff the definition is a Single
proptest! {
    #[test]
    fn sharing_follows_kind(kinds in prop::collection::vec(any::<bool>(), 1..12), repeats in 2usize..6) {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut module = Module::new();
        for (i, single) in kinds.iter().enumerate() {
            let build = counting(counter.clone());
            if *single {
                module.single(build).named(format!("def{i}"));
            } else {
                module.factory(build).named(format!("def{i}"));
            }
        }
        let container = Container::builder().modules([module]).build().unwrap();

        for (i, single) in kinds.iter().enumerate() {
            let name = format!("def{i}");
            let values: Vec<Arc<Instance>> = (0..repeats)
                .map(|_| container.get_named::<Instance>(&name).unwrap())
                .collect();
            for pair in values.windows(2) {
                prop_assert_eq!(Arc::ptr_eq(&pair[0], &pair[1]), *single);
            }
            if !*single {
                // N factory gets, N distinct instances
                let mut serials: Vec<usize> = values.iter().map(|v| v.serial).collect();
                serials.sort_unstable();
                serials.dedup();
                prop_assert_eq!(serials.len(), repeats);
            }
        }
    }
}

// Property: a declared instance comes back by reference, whatever its qualifier
proptest! {
    #[test]
    fn declare_then_get_is_identity(value in any::<u64>(), name in "[a-z]{1,8}") {
        let container = Container::new();
        let instance = Arc::new(value);
        container.declare_with(instance.clone(), |d| { d.named(&name); }).unwrap();

        let resolved = container.get_named::<u64>(&name).unwrap();
        prop_assert!(Arc::ptr_eq(&resolved, &instance));
        prop_assert!(container.get_or_null::<u64>().unwrap().is_none());
    }
}

// Property: the first linked scope defining a type wins, own registry first
proptest! {
    #[test]
    fn link_order_decides(defines in prop::collection::vec(any::<bool>(), 1..6), own in any::<bool>()) {
        let mut module = Module::new();
        for (i, defined) in defines.iter().enumerate() {
            let label = format!("linked{i}");
            module.scope_named(&label, |scope| {
                if *defined {
                    let value = label.clone();
                    scope.scoped(move |_| Ok(value.clone()));
                }
            });
        }
        module.scope_named("Main", |scope| {
            if own {
                scope.scoped(|_| Ok(String::from("own")));
            }
        });
        let container = Container::builder().modules([module]).build().unwrap();

        let main = container.create_scope("main", "Main").unwrap();
        for i in 0..defines.len() {
            let label = format!("linked{i}");
            let linked = container.create_scope(&label, label.as_str()).unwrap();
            main.link_to(&linked).unwrap();
        }

        let expected = if own {
            Some("own".to_string())
        } else {
            defines.iter().position(|d| *d).map(|i| format!("linked{i}"))
        };
        let resolved = main.get_or_null::<String>().unwrap().map(|s| (*s).clone());
        prop_assert_eq!(resolved, expected);
    }
}

#[test]
fn named_and_unqualified_definitions_do_not_mix() {
    let mut module = Module::new();
    module.single(|_| Ok(Instance { serial: 0 }));
    module.single(|_| Ok(Instance { serial: 1 })).named("other");
    let container = Container::builder().modules([module]).build().unwrap();

    assert_eq!(container.get::<Instance>().unwrap().serial, 0);
    assert_eq!(container.get_qualified::<Instance>(named("other")).unwrap().serial, 1);
}
