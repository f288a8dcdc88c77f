//! Scope close notifications.

use crate::scope::Scope;

/// Listener notified when a scope closes.
///
/// Callbacks run in registration order, before the scope's instances are
/// disposed, so the scope can still be inspected (but no longer resolved
/// from). Any `Fn(&Scope)` closure is a callback.
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use ferrous_locator::{Container, Module};
///
/// struct Session;
///
/// let mut module = Module::new();
/// module.scope::<Session>(|scope| {
///     scope.scoped(|_| Ok(0u32));
/// });
/// let container = Container::builder().modules([module]).build().unwrap();
///
/// let closed = Arc::new(AtomicUsize::new(0));
/// let scope = container.create_scope_for::<Session>("s1").unwrap();
/// let counter = closed.clone();
/// scope
///     .register_callback(move |s: &ferrous_locator::Scope| {
///         assert_eq!(s.id(), "s1");
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
///
/// scope.close();
/// assert_eq!(closed.load(Ordering::SeqCst), 1);
/// ```
pub trait ScopeCallback: Send + Sync {
    fn on_scope_close(&self, scope: &Scope);
}

impl<F> ScopeCallback for F
where
    F: Fn(&Scope) + Send + Sync,
{
    fn on_scope_close(&self, scope: &Scope) {
        self(scope)
    }
}
