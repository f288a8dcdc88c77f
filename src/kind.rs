//! Definition kinds.

/// Controls whether a definition's instance is cached.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_locator::{Container, Module, Resolver};
///
/// struct Pool;
/// struct Request;
///
/// let mut module = Module::new();
/// module.single(|_| Ok(Pool));
/// module.factory(|_| Ok(Request));
///
/// let container = Container::builder().modules([module]).build().unwrap();
///
/// // Single: one instance per scope
/// let p1 = container.get::<Pool>().unwrap();
/// let p2 = container.get::<Pool>().unwrap();
/// assert!(Arc::ptr_eq(&p1, &p2));
///
/// // Factory: a fresh instance per resolution
/// let r1 = container.get::<Request>().unwrap();
/// let r2 = container.get::<Request>().unwrap();
/// assert!(!Arc::ptr_eq(&r1, &r2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// One instance per scope, created lazily (or eagerly with `create_at_start`)
    /// and disposed when the scope closes.
    Single,
    /// A fresh instance per resolution. Never cached, never disposed by the
    /// container.
    Factory,
}
