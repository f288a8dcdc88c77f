//! The container façade.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::{ContainerConfig, LogLevel};
use crate::definition::{root_qualifier, Definition, DefinitionBuilder, ScopeDefinition, ROOT_SCOPE_ID};
use crate::error::{DiError, DiResult};
use crate::internal::DisposeBag;
use crate::key::{type_qualifier, Qualifier, TypeIdentity, TypeKey};
use crate::module::Module;
use crate::parameters::{ParameterStack, Parameters};
use crate::registry::{AnyArc, PropertyRegistry, ScopeRegistry};
use crate::scope::{ResolutionContext, Scope};
use crate::traits::ResolverCore;

pub mod builder;

pub use builder::ContainerBuilder;

/// Service locator: the scope tree, its definitions and the properties.
///
/// Cloning is cheap and every clone drives the same container. All lookups
/// through the container itself resolve from the root scope.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_locator::{Container, Module, Resolver};
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut module = Module::new();
/// module.single(|_| Ok(Database { url: "postgres://localhost".into() }));
/// module.factory(|ctx| Ok(UserService { db: ctx.get()? }));
///
/// let container = Container::builder().modules([module]).build().unwrap();
/// let service = container.get::<UserService>().unwrap();
/// assert_eq!(service.db.url, "postgres://localhost");
///
/// container.close();
/// assert!(container.get::<Database>().is_err());
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    pub(crate) config: ContainerConfig,
    pub(crate) scopes: RwLock<ScopeRegistry>,
    pub(crate) properties: PropertyRegistry,
    closed: AtomicBool,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Empty container with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        let log_level = config.log_level;
        let inner = Arc::new_cyclic(|weak| ContainerInner {
            config,
            scopes: RwLock::new(ScopeRegistry::new(weak.clone(), log_level)),
            properties: PropertyRegistry::new(),
            closed: AtomicBool::new(false),
        });
        inner.scopes.write().create_root_scope();
        Self { inner }
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    fn log_level(&self) -> LogLevel {
        self.inner.config.log_level
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// True when both handles drive the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn closed_error() -> DiError {
        DiError::ClosedScope {
            scope_id: ROOT_SCOPE_ID.to_string(),
        }
    }

    pub fn root_scope(&self) -> DiResult<Scope> {
        self.inner.scopes.read().root().cloned().ok_or_else(Self::closed_error)
    }

    /// Merges the definitions of `modules`, all or nothing.
    ///
    /// Live scopes gain a factory for every new definition of their scope
    /// definition. Instances displaced by overriding definitions are disposed.
    /// Eager Singles are not created; see
    /// [`create_eager_instances`](Self::create_eager_instances).
    pub fn load_modules(&self, modules: &[Module]) -> DiResult<()> {
        let timed = self.log_level().is_at(LogLevel::Info);
        let start = timed.then(Instant::now);
        let mut displaced = DisposeBag::default();
        let count = {
            let mut scopes = self.inner.scopes.write();
            if self.is_closed() {
                return Err(Self::closed_error());
            }
            scopes.load(modules, &mut displaced)?
        };
        if !displaced.is_empty() && self.log_level().is_at(LogLevel::Debug) {
            debug!("disposing instances of overridden definitions");
        }
        displaced.run_all_reverse();
        if let Some(start) = start {
            info!(
                definitions = count,
                modules = modules.len(),
                elapsed = ?start.elapsed(),
                "loaded definitions"
            );
        }
        Ok(())
    }

    /// Removes the definitions of `modules`, disposing their cached Singles in
    /// every live scope.
    pub fn unload_modules(&self, modules: &[Module]) {
        let mut displaced = DisposeBag::default();
        let count = self.inner.scopes.write().unload(modules, &mut displaced);
        displaced.run_all_reverse();
        if self.log_level().is_at(LogLevel::Info) {
            info!(definitions = count, modules = modules.len(), "unloaded definitions");
        }
    }

    /// Total number of loaded definitions, across all scope definitions.
    pub fn scope_registry_size(&self) -> usize {
        self.inner.scopes.read().size()
    }

    pub fn scope_definition(&self, qualifier: &Qualifier) -> Option<Arc<ScopeDefinition>> {
        self.inner.scopes.read().scope_definition(qualifier.value())
    }

    /// Creates scope `id` from the scope definition named by `qualifier`.
    pub fn create_scope(&self, id: &str, qualifier: impl Into<Qualifier>) -> DiResult<Scope> {
        let qualifier = qualifier.into();
        let mut scopes = self.inner.scopes.write();
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        scopes.create_scope(id, &qualifier)
    }

    /// Creates scope `id` from the scope definition declared with
    /// [`Module::scope::<S>`](crate::Module::scope).
    pub fn create_scope_for<S: ?Sized + 'static>(&self, id: &str) -> DiResult<Scope> {
        self.create_scope(id, type_qualifier::<S>())
    }

    /// Returns live scope `id`, creating it if needed.
    pub fn get_or_create_scope(&self, id: &str, qualifier: impl Into<Qualifier>) -> DiResult<Scope> {
        let qualifier = qualifier.into();
        let mut scopes = self.inner.scopes.write();
        if let Some(scope) = scopes.get_scope(id) {
            return Ok(scope);
        }
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        scopes.create_scope(id, &qualifier)
    }

    pub fn get_scope(&self, id: &str) -> DiResult<Scope> {
        self.get_scope_or_null(id).ok_or_else(|| DiError::ScopeNotCreated {
            scope_id: id.to_string(),
        })
    }

    pub fn get_scope_or_null(&self, id: &str) -> Option<Scope> {
        self.inner.scopes.read().get_scope(id)
    }

    /// Closes live scope `id`. Unknown ids are ignored; the root scope only
    /// closes with the container.
    pub fn delete_scope(&self, id: &str) {
        if id == ROOT_SCOPE_ID {
            warn!("the root scope is only closed with the container");
            return;
        }
        if let Some(scope) = self.get_scope_or_null(id) {
            scope.close();
        }
    }

    /// Installs `instance` as a root Single.
    pub fn declare<T: Send + Sync + 'static>(&self, instance: T) -> DiResult<()> {
        self.declare_with(Arc::new(instance), |_| {})
    }

    /// Installs a shared instance as a root Single, configured by `configure`.
    ///
    /// The definition is recorded in the root scope definition, so it fails
    /// with `DefinitionOverride` when an equivalent definition exists and
    /// `allow_override(false)` was requested.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use ferrous_locator::{Container, Resolver};
    ///
    /// trait Clock: Send + Sync {}
    /// struct Fixed;
    /// impl Clock for Fixed {}
    ///
    /// let container = Container::new();
    /// let clock: Arc<dyn Clock> = Arc::new(Fixed);
    /// container
    ///     .declare_with(clock.clone(), |d| {
    ///         d.named("test");
    ///     })
    ///     .unwrap();
    ///
    /// assert!(Arc::ptr_eq(&container.get_named::<dyn Clock>("test").unwrap(), &clock));
    /// ```
    pub fn declare_with<T, F>(&self, instance: Arc<T>, configure: F) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&mut DefinitionBuilder<'_, T>),
    {
        let (mut definition, value) = Definition::instance(root_qualifier(), instance);
        configure(&mut DefinitionBuilder::new(&mut definition));
        let definition = Arc::new(definition);

        let mut displaced = DisposeBag::default();
        {
            let mut scopes = self.inner.scopes.write();
            let root = scopes.root().cloned().ok_or_else(Self::closed_error)?;
            scopes.save_root_definition(definition.clone())?;
            root.install_declared(definition.clone(), value, &mut displaced);
        }
        displaced.run_all_reverse();
        if self.log_level().is_at(LogLevel::Debug) {
            debug!(definition = %definition, "declared instance");
        }
        Ok(())
    }

    pub fn set_property<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.inner.properties.set(key, value);
    }

    /// Property `key`, failing with `MissingProperty` when absent.
    pub fn get_property<T: Any + Clone>(&self, key: &str) -> DiResult<T> {
        self.inner.properties.get(key)
    }

    pub fn get_property_or<T: Any + Clone>(&self, key: &str, default: T) -> T {
        self.inner.properties.get_or(key, default)
    }

    pub fn get_property_opt<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.inner.properties.get_opt(key)
    }

    pub fn delete_property(&self, key: &str) {
        self.inner.properties.delete(key);
    }

    /// Stores string properties with number coercion; see
    /// [`PropertyRegistry::save_properties`].
    pub fn save_properties(&self, properties: &HashMap<String, String>) {
        self.inner.properties.save_properties(properties);
    }

    pub fn properties(&self) -> &PropertyRegistry {
        &self.inner.properties
    }

    /// Builds every root Single flagged `create_at_start` that is not built
    /// yet. Calling it again builds nothing new.
    pub fn create_eager_instances(&self) -> DiResult<()> {
        let root = self.root_scope()?;
        let eager = root.eager_factories();
        if eager.is_empty() {
            return Ok(());
        }
        let timed = self.log_level().is_at(LogLevel::Info);
        let start = timed.then(Instant::now);
        let stack = ParameterStack::default();
        let ctx = ResolutionContext::new(&root, &stack);
        for factory in &eager {
            factory.get(&ctx)?;
        }
        if let Some(start) = start {
            info!(instances = eager.len(), elapsed = ?start.elapsed(), "created eager instances");
        }
        Ok(())
    }

    /// Shuts the container down. Idempotent and infallible.
    ///
    /// Closes every live scope (newest first), then the root scope, then
    /// clears the properties. Every built Single's close hook has run when
    /// this returns.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let (scopes, root) = self.inner.scopes.write().drain();
        if self.log_level().is_at(LogLevel::Info) {
            info!(scopes = scopes.len(), "closing container");
        }
        for scope in scopes {
            scope.close();
        }
        if let Some(root) = root {
            root.close();
        }
        self.inner.properties.close();
    }
}

impl ResolverCore for Container {
    fn try_resolve_any(&self, key: &TypeKey, parameters: Option<Parameters>) -> DiResult<Option<AnyArc>> {
        self.root_scope()?.try_resolve_any(key, parameters)
    }

    fn resolve_all_any(&self, identity: TypeIdentity) -> DiResult<Vec<AnyArc>> {
        self.root_scope()?.resolve_all_any(identity)
    }

    fn bind_any(
        &self,
        primary: TypeIdentity,
        secondary: TypeIdentity,
        parameters: Option<Parameters>,
    ) -> DiResult<Option<AnyArc>> {
        self.root_scope()?.bind_any(primary, secondary, parameters)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("config", &self.inner.config)
            .field("definitions", &self.scope_registry_size())
            .field("closed", &self.is_closed())
            .finish()
    }
}
