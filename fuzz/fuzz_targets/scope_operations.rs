#![no_main]

use ferrous_locator::{Container, DiError, Module, Resolver};
use libfuzzer_sys::fuzz_target;

const SCOPES: usize = 4;

fn module() -> Module {
    let mut module = Module::new();
    module.single(|_| Ok(0u8));
    module.scope_named("A", |scope| {
        scope.scoped(|ctx| Ok(ctx.scope().id().to_string()));
    });
    module.scope_named("B", |scope| {
        scope.factory(|_| Ok(1u16));
    });
    module
}

// Each byte pair is one operation on a small pool of scope ids. Whatever the
// sequence, operations either succeed or fail with a container error, and
// closing the container at the end always succeeds.
fuzz_target!(|data: &[u8]| {
    let container = match Container::builder().modules([module()]).build() {
        Ok(container) => container,
        Err(_) => return,
    };

    for op in data.chunks_exact(2) {
        let id = format!("s{}", op[1] as usize % SCOPES);
        let other = format!("s{}", (op[1] as usize / SCOPES) % SCOPES);
        let qualifier = if op[1] & 0x80 == 0 { "A" } else { "B" };

        match op[0] % 6 {
            0 => {
                let _ = container.create_scope(&id, qualifier);
            }
            1 => {
                let _ = container.get_or_create_scope(&id, qualifier);
            }
            2 => container.delete_scope(&id),
            3 => {
                if let (Some(a), Some(b)) = (container.get_scope_or_null(&id), container.get_scope_or_null(&other)) {
                    match a.link_to(&b) {
                        Ok(()) | Err(DiError::InvalidLink { .. }) | Err(DiError::ClosedScope { .. }) => {}
                        Err(other) => panic!("unexpected link error: {other}"),
                    }
                }
            }
            4 => {
                if let Some(scope) = container.get_scope_or_null(&id) {
                    match scope.get_or_null::<String>() {
                        Ok(_) | Err(DiError::ClosedScope { .. }) => {}
                        Err(other) => panic!("unexpected resolution error: {other}"),
                    }
                    assert!(scope.get::<u8>().is_ok() || scope.is_closed());
                }
            }
            _ => {
                if let (Some(a), Some(b)) = (container.get_scope_or_null(&id), container.get_scope_or_null(&other)) {
                    a.unlink(&b);
                }
            }
        }
    }

    container.close();
    assert!(container.get_scope_or_null("s0").is_none());
});
