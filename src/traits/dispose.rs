//! Disposal trait for resource cleanup.

/// Synchronous teardown for instances owning resources.
///
/// Hook it up with
/// [`DefinitionBuilder::dispose_on_close`](crate::DefinitionBuilder::dispose_on_close):
/// the container then calls `dispose` once, when the scope holding the
/// instance closes or its definition is unloaded.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use ferrous_locator::{Container, Dispose, Module, Resolver};
///
/// struct Cache {
///     flushed: Arc<AtomicBool>,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let flushed = Arc::new(AtomicBool::new(false));
/// let flag = flushed.clone();
///
/// let mut module = Module::new();
/// module
///     .single(move |_| Ok(Cache { flushed: flag.clone() }))
///     .dispose_on_close();
///
/// let container = Container::builder().modules([module]).build().unwrap();
/// container.get::<Cache>().unwrap();
/// container.close();
/// assert!(flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
