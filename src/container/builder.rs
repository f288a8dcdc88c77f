//! Fluent container setup.

use std::collections::HashMap;
use std::time::Instant;

use tracing::info;

use crate::config::{ContainerConfig, LogLevel};
use crate::container::Container;
use crate::error::DiResult;
use crate::module::Module;

/// Collects modules, properties and settings, then builds a [`Container`].
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use ferrous_locator::{Container, LogLevel, Module};
///
/// struct Warmup;
///
/// let built = Arc::new(AtomicUsize::new(0));
/// let counter = built.clone();
///
/// let mut module = Module::new();
/// module
///     .single(move |_| {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(Warmup)
///     })
///     .create_at_start();
///
/// let props = HashMap::from([("workers".to_string(), "4".to_string())]);
/// let container = Container::builder()
///     .log_level(LogLevel::Info)
///     .properties(props)
///     .modules([module])
///     .create_eager_instances(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(built.load(Ordering::SeqCst), 1);
/// assert_eq!(container.get_property::<i64>("workers").unwrap(), 4);
/// ```
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    config: ContainerConfig,
    modules: Vec<Module>,
    properties: HashMap<String, String>,
    environment_properties: bool,
    create_eager_instances: bool,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    pub fn modules(mut self, modules: impl IntoIterator<Item = Module>) -> Self {
        self.modules.extend(modules);
        self
    }

    pub fn module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// String properties, stored with number coercion.
    pub fn properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Loads the process environment as properties.
    pub fn environment_properties(mut self) -> Self {
        self.environment_properties = true;
        self
    }

    /// Builds the `create_at_start` Singles as part of [`build`](Self::build).
    pub fn create_eager_instances(mut self, enabled: bool) -> Self {
        self.create_eager_instances = enabled;
        self
    }

    /// Creates the container, loads properties then modules, and optionally
    /// the eager instances.
    ///
    /// On failure the partially built container is closed.
    pub fn build(self) -> DiResult<Container> {
        let start = Instant::now();
        let container = Container::with_config(self.config);

        if self.environment_properties {
            container.properties().load_environment_properties();
        }
        if !self.properties.is_empty() {
            container.save_properties(&self.properties);
        }

        let result = container.load_modules(&self.modules).and_then(|()| {
            if self.create_eager_instances {
                container.create_eager_instances()
            } else {
                Ok(())
            }
        });
        if let Err(err) = result {
            container.close();
            return Err(err);
        }

        if container.config().log_level.is_at(LogLevel::Info) {
            info!(
                definitions = container.scope_registry_size(),
                elapsed = ?start.elapsed(),
                "container started"
            );
        }
        Ok(container)
    }
}
