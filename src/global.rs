//! The process-wide container and its lifecycle.
//!
//! Code that cannot thread a [`Container`] handle through its call sites can
//! start one globally and reach it with [`global`]. The holder is empty until
//! [`start`] and empty again after [`stop`].

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::info;

use crate::container::{Container, ContainerBuilder};
use crate::definition::ROOT_SCOPE_ID;
use crate::error::{DiError, DiResult};
use crate::module::Module;

static GLOBAL_CONTAINER: Lazy<Mutex<Option<Container>>> = Lazy::new(|| Mutex::new(None));

/// Builds a container from `builder` and makes it the global one.
///
/// Fails with `AlreadyStarted` while a global container is running.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{global, Container, DiError, Module, Resolver};
///
/// let mut module = Module::new();
/// module.single(|_| Ok(String::from("Hello from global!")));
///
/// global::start(Container::builder().modules([module])).unwrap();
/// assert!(matches!(
///     global::start(Container::builder()),
///     Err(DiError::AlreadyStarted)
/// ));
///
/// let greeting = global::global().unwrap().get::<String>().unwrap();
/// assert_eq!(*greeting, "Hello from global!");
///
/// global::stop();
/// assert!(global::global().is_none());
/// ```
pub fn start(builder: ContainerBuilder) -> DiResult<Container> {
    if GLOBAL_CONTAINER.lock().is_some() {
        return Err(DiError::AlreadyStarted);
    }
    // Built unlocked: eager builders may call back into this module.
    let container = builder.build()?;
    if let Err(err) = start_container(container.clone()) {
        container.close();
        return Err(err);
    }
    Ok(container)
}

/// Makes an existing container the global one.
pub fn start_container(container: Container) -> DiResult<()> {
    let mut slot = GLOBAL_CONTAINER.lock();
    if slot.is_some() {
        return Err(DiError::AlreadyStarted);
    }
    *slot = Some(container);
    info!("global container started");
    Ok(())
}

/// Closes the global container and empties the holder. No-op when nothing
/// was started.
pub fn stop() {
    let container = GLOBAL_CONTAINER.lock().take();
    if let Some(container) = container {
        container.close();
        info!("global container stopped");
    }
}

/// The global container, if started.
pub fn global() -> Option<Container> {
    GLOBAL_CONTAINER.lock().clone()
}

fn started() -> DiResult<Container> {
    global().ok_or_else(|| DiError::ScopeNotCreated {
        scope_id: ROOT_SCOPE_ID.to_string(),
    })
}

/// Loads modules into the global container.
pub fn load_modules(modules: &[Module]) -> DiResult<()> {
    started()?.load_modules(modules)
}

/// Unloads modules from the global container.
pub fn unload_modules(modules: &[Module]) -> DiResult<()> {
    started()?.unload_modules(modules);
    Ok(())
}
