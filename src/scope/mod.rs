//! Live scopes.
//!
//! A [`Scope`] owns the instances of one scope definition. It resolves from
//! its own registry first and then from its linked scopes, in link order.
//! Every non-root scope starts out linked to the root scope.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::config::LogLevel;
use crate::container::{Container, ContainerInner};
use crate::definition::{Definition, DefinitionBuilder};
use crate::error::{DiError, DiResult};
use crate::internal::{panic_message, DisposeBag};
use crate::key::{Qualifier, TypeIdentity, TypeKey};
use crate::parameters::{ParameterStack, Parameters};
use crate::registry::{AnyArc, InstanceFactory, InstanceRegistry, Lookup};
use crate::traits::ResolverCore;

pub mod callback;
pub mod context;

pub use callback::ScopeCallback;
pub use context::{CallerThread, ResolutionContext};

static NEXT_SCOPE_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Handle to a live scope. Clones share the same scope.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_locator::{Container, DiError, Module, Resolver};
///
/// struct Session;
/// struct Cart;
///
/// let mut module = Module::new();
/// module.scope_named("checkout", |scope| {
///     scope.scoped(|_| Ok(Cart));
/// });
/// let container = Container::builder().modules([module]).build().unwrap();
///
/// let a = container.create_scope("a", "checkout").unwrap();
/// let b = container.create_scope("b", "checkout").unwrap();
///
/// let cart_a = a.get::<Cart>().unwrap();
/// assert!(Arc::ptr_eq(&cart_a, &a.get::<Cart>().unwrap()));
/// assert!(!Arc::ptr_eq(&cart_a, &b.get::<Cart>().unwrap()));
///
/// a.close();
/// assert!(matches!(a.get::<Cart>(), Err(DiError::ClosedScope { .. })));
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: Arc<str>,
    qualifier: Qualifier,
    is_root: bool,
    serial: u64,
    log_level: LogLevel,
    closed: AtomicBool,
    state: RwLock<ScopeState>,
    container: Weak<ContainerInner>,
}

struct ScopeState {
    registry: InstanceRegistry,
    linked: Vec<Scope>,
    callbacks: Vec<Arc<dyn ScopeCallback>>,
}

impl Scope {
    pub(crate) fn new(
        id: Arc<str>,
        qualifier: Qualifier,
        is_root: bool,
        log_level: LogLevel,
        container: Weak<ContainerInner>,
    ) -> Self {
        let registry = InstanceRegistry::new(id.clone(), is_root);
        Self {
            inner: Arc::new(ScopeInner {
                id,
                qualifier,
                is_root,
                serial: NEXT_SCOPE_SERIAL.fetch_add(1, Ordering::Relaxed),
                log_level,
                closed: AtomicBool::new(false),
                state: RwLock::new(ScopeState {
                    registry,
                    linked: Vec::new(),
                    callbacks: Vec::new(),
                }),
                container,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Qualifier of the scope definition this scope was created from.
    pub fn scope_qualifier(&self) -> &Qualifier {
        &self.inner.qualifier
    }

    pub fn is_root(&self) -> bool {
        self.inner.is_root
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// True when both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn serial(&self) -> u64 {
        self.inner.serial
    }

    /// Number of factories in this scope's own registry.
    pub fn instance_count(&self) -> usize {
        self.inner.state.read().registry.size()
    }

    /// Scopes consulted after this one, in order.
    pub fn linked_scopes(&self) -> Vec<Scope> {
        self.inner.state.read().linked.clone()
    }

    fn ensure_open(&self) -> DiResult<()> {
        if self.is_closed() {
            return Err(DiError::ClosedScope {
                scope_id: self.id().to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn populate(&self, definitions: &[Arc<Definition>]) {
        let mut displaced = DisposeBag::default();
        self.inner
            .state
            .write()
            .registry
            .create_factories(definitions, &mut displaced);
        displaced.run_all_reverse();
    }

    pub(crate) fn install_factories(&self, definitions: Vec<&Arc<Definition>>, displaced: &mut DisposeBag) {
        self.inner
            .state
            .write()
            .registry
            .create_factories(definitions, displaced);
    }

    pub(crate) fn remove_factory(&self, definition: &Definition) -> Option<Arc<InstanceFactory>> {
        self.inner.state.write().registry.drop_definition(definition)
    }

    pub(crate) fn eager_factories(&self) -> Vec<Arc<InstanceFactory>> {
        self.inner.state.read().registry.eager_factories()
    }

    pub(crate) fn link_root(&self, root: Scope) {
        self.inner.state.write().linked.insert(0, root);
    }

    /// Resolves `key` here, then in the linked scopes.
    ///
    /// `None` means no scope in the chain has a definition for `key`.
    pub(crate) fn resolve_in(
        &self,
        key: &TypeKey,
        parameters: Option<&Parameters>,
        stack: &ParameterStack,
    ) -> DiResult<Option<AnyArc>> {
        self.ensure_open()?;
        let found = self.inner.state.read().registry.lookup(key);
        if let Some(lookup) = found {
            return self.run(&lookup, parameters, stack).map(Some);
        }

        let linked = self.linked_scopes();
        for scope in linked.iter().filter(|s| !s.is_closed()) {
            if let Some(value) = scope.resolve_in(key, parameters, stack)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn run(&self, lookup: &Lookup, parameters: Option<&Parameters>, stack: &ParameterStack) -> DiResult<AnyArc> {
        let _pushed = parameters.map(|p| stack.push(p.clone()));
        let ctx = ResolutionContext::new(self, stack);
        let value = lookup.factory.get(&ctx)?;
        lookup
            .convert(value)
            .ok_or_else(|| DiError::InstanceCreation {
                key: lookup.factory.key().clone(),
                cause: "secondary type cast rejected the stored instance".into(),
            })
    }

    pub(crate) fn bind_in(
        &self,
        primary: TypeIdentity,
        secondary: TypeIdentity,
        parameters: Option<&Parameters>,
        stack: &ParameterStack,
    ) -> DiResult<Option<AnyArc>> {
        self.ensure_open()?;
        let found = self.inner.state.read().registry.bind(primary, secondary);
        if let Some(lookup) = found {
            return self.run(&lookup, parameters, stack).map(Some);
        }
        for scope in self.linked_scopes().iter().filter(|s| !s.is_closed()) {
            if let Some(value) = scope.bind_in(primary, secondary, parameters, stack)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Installs a prebuilt instance in this scope only, replacing any
    /// definition with the same key.
    pub fn declare<T: Send + Sync + 'static>(&self, instance: T) -> DiResult<()> {
        self.declare_with(Arc::new(instance), |_| {})
    }

    /// Like [`declare`](Self::declare), for shared or unsized instances, with
    /// a qualifier or bound types set through `configure`.
    pub fn declare_with<T, F>(&self, instance: Arc<T>, configure: F) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&mut DefinitionBuilder<'_, T>),
    {
        self.ensure_open()?;
        let (mut definition, value) = Definition::instance(self.inner.qualifier.clone(), instance);
        configure(&mut DefinitionBuilder::new(&mut definition));
        let mut displaced = DisposeBag::default();
        self.install_declared(Arc::new(definition), value, &mut displaced);
        displaced.run_all_reverse();
        Ok(())
    }

    pub(crate) fn install_declared(&self, definition: Arc<Definition>, value: AnyArc, displaced: &mut DisposeBag) {
        self.inner
            .state
            .write()
            .registry
            .declare(definition, value, displaced);
    }

    /// Adds `other` as a fallback for lookups missing in this scope.
    ///
    /// Fails with `InvalidLink` for the root scope (already the first
    /// fallback of every scope), for this scope itself, and for a scope that
    /// already falls back to this one.
    pub fn link_to(&self, other: &Scope) -> DiResult<()> {
        self.ensure_open()?;
        other.ensure_open()?;
        let invalid = |reason| DiError::InvalidLink {
            from: self.id().to_string(),
            to: other.id().to_string(),
            reason,
        };
        if other.is_root() {
            return Err(invalid("the root scope cannot be linked to"));
        }
        if self.ptr_eq(other) {
            return Err(invalid("a scope cannot be linked to itself"));
        }

        // The container lock serializes links so two of them cannot race
        // into a cycle.
        let container = self.container_inner()?;
        let _serialized = container.scopes.write();
        if other.reaches(self) {
            return Err(invalid("the link would create a cycle"));
        }
        let mut state = self.inner.state.write();
        if !state.linked.iter().any(|s| s.ptr_eq(other)) {
            state.linked.push(other.clone());
        }
        Ok(())
    }

    /// Links every scope in `others`, stopping at the first failure.
    pub fn link_to_all<'a>(&self, others: impl IntoIterator<Item = &'a Scope>) -> DiResult<()> {
        others.into_iter().try_for_each(|other| self.link_to(other))
    }

    fn reaches(&self, target: &Scope) -> bool {
        let mut pending = vec![self.clone()];
        let mut seen: Vec<Scope> = Vec::new();
        while let Some(scope) = pending.pop() {
            if scope.ptr_eq(target) {
                return true;
            }
            if seen.iter().any(|s| s.ptr_eq(&scope)) {
                continue;
            }
            pending.extend(scope.linked_scopes());
            seen.push(scope);
        }
        false
    }

    /// Removes `other` from the fallbacks. The root scope stays linked.
    pub fn unlink(&self, other: &Scope) {
        if other.is_root() {
            if self.inner.log_level.is_at(LogLevel::Debug) {
                debug!(scope = %self.inner.id, "ignoring unlink from the root scope");
            }
            return;
        }
        self.inner.state.write().linked.retain(|s| !s.ptr_eq(other));
    }

    /// Registers a listener fired when this scope closes.
    pub fn register_callback(&self, callback: impl ScopeCallback + 'static) -> DiResult<()> {
        let mut state = self.inner.state.write();
        // Checked under the lock: close() drains callbacks under it too.
        self.ensure_open()?;
        state.callbacks.push(Arc::new(callback));
        Ok(())
    }

    /// Closes the scope. Idempotent and infallible.
    ///
    /// Marks the scope closed, fires the callbacks in registration order,
    /// disposes every cached Single and finally removes the scope from the
    /// container. Panics raised by callbacks or close hooks are logged.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.inner.log_level.is_at(LogLevel::Debug) {
            debug!(scope = %self.inner.id, "closing scope");
        }

        let callbacks = std::mem::take(&mut self.inner.state.write().callbacks);
        for callback in callbacks {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback.on_scope_close(self))) {
                error!(
                    scope = %self.inner.id,
                    "scope callback panicked: {}",
                    panic_message(&*payload)
                );
            }
        }

        let mut bag = DisposeBag::default();
        {
            let mut state = self.inner.state.write();
            state.registry.close(&mut bag);
            state.linked.clear();
        }
        bag.run_all_reverse();

        if let Some(container) = self.inner.container.upgrade() {
            container.scopes.write().remove_scope(self);
        }
    }

    fn container_inner(&self) -> DiResult<Arc<ContainerInner>> {
        self.inner.container.upgrade().ok_or_else(|| DiError::ClosedScope {
            scope_id: self.id().to_string(),
        })
    }

    /// Container this scope belongs to.
    pub fn container(&self) -> DiResult<Container> {
        self.container_inner().map(Container::from_inner)
    }

    /// Live scope `id` of the same container.
    pub fn get_scope(&self, id: &str) -> DiResult<Scope> {
        self.container()?.get_scope(id)
    }

    pub fn get_property<T: std::any::Any + Clone>(&self, key: &str) -> DiResult<T> {
        self.container_inner()?.properties.get(key)
    }

    pub fn get_property_or<T: std::any::Any + Clone>(&self, key: &str, default: T) -> T {
        match self.container_inner() {
            Ok(container) => container.properties.get_or(key, default),
            Err(_) => default,
        }
    }

    pub fn get_property_opt<T: std::any::Any + Clone>(&self, key: &str) -> Option<T> {
        self.container_inner().ok()?.properties.get_opt(key)
    }
}

impl ResolverCore for Scope {
    fn try_resolve_any(&self, key: &TypeKey, parameters: Option<Parameters>) -> DiResult<Option<AnyArc>> {
        let stack = ParameterStack::default();
        if !self.inner.log_level.is_at(LogLevel::Debug) {
            return self.resolve_in(key, parameters.as_ref(), &stack);
        }
        let start = Instant::now();
        let result = self.resolve_in(key, parameters.as_ref(), &stack);
        debug!(
            scope = %self.inner.id,
            key = %key,
            elapsed = ?start.elapsed(),
            found = matches!(result, Ok(Some(_))),
            "resolved"
        );
        result
    }

    fn resolve_all_any(&self, identity: TypeIdentity) -> DiResult<Vec<AnyArc>> {
        self.ensure_open()?;
        // Depth first in link order; a scope reachable twice is read once.
        let mut all: Vec<AnyArc> = Vec::new();
        let mut visited: Vec<Scope> = Vec::new();
        let mut pending = vec![self.clone()];
        while let Some(scope) = pending.pop() {
            if visited.iter().any(|s| s.ptr_eq(&scope)) {
                continue;
            }
            for value in scope.inner.state.read().registry.get_all(identity) {
                if !all.iter().any(|seen| Arc::ptr_eq(seen, &value)) {
                    all.push(value);
                }
            }
            pending.extend(scope.linked_scopes().into_iter().filter(|s| !s.is_closed()).rev());
            visited.push(scope);
        }
        Ok(all)
    }

    fn bind_any(
        &self,
        primary: TypeIdentity,
        secondary: TypeIdentity,
        parameters: Option<Parameters>,
    ) -> DiResult<Option<AnyArc>> {
        let stack = ParameterStack::default();
        self.bind_in(primary, secondary, parameters.as_ref(), &stack)
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("qualifier", &self.inner.qualifier)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "['{}']", self.inner.id)
    }
}
