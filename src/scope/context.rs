//! Context handed to definition builders.

use crate::error::DiResult;
use crate::key::{TypeIdentity, TypeKey};
use crate::parameters::{ParameterStack, Parameters};
use crate::registry::AnyArc;
use crate::scope::Scope;
use crate::traits::ResolverCore;

/// Which thread a resolution was issued from.
///
/// Purely informational: resolution works the same from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerThread {
    Main,
    Other,
}

impl CallerThread {
    pub fn current() -> Self {
        match std::thread::current().name() {
            Some("main") => CallerThread::Main,
            _ => CallerThread::Other,
        }
    }
}

/// Everything a builder can reach while it runs.
///
/// Resolving through the context keeps the parameter stack of the enclosing
/// resolution, and looks definitions up starting from the scope that owns
/// the definition being built.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_locator::{parameters_of, Container, Module, Resolver};
///
/// struct Database { url: String }
/// struct Repository { db: Arc<Database>, table: String }
///
/// let mut module = Module::new();
/// module.single(|_| Ok(Database { url: "postgres://localhost".into() }));
/// module.factory(|ctx| {
///     Ok(Repository {
///         db: ctx.get::<Database>()?,
///         table: ctx.param::<String>(0)?,
///     })
/// });
///
/// let container = Container::builder().modules([module]).build().unwrap();
/// let repo = container
///     .get_with::<Repository>(parameters_of!("users".to_string()))
///     .unwrap();
/// assert_eq!(repo.table, "users");
/// assert_eq!(repo.db.url, "postgres://localhost");
/// ```
pub struct ResolutionContext<'a> {
    scope: &'a Scope,
    stack: &'a ParameterStack,
    thread: CallerThread,
}

impl<'a> ResolutionContext<'a> {
    pub(crate) fn new(scope: &'a Scope, stack: &'a ParameterStack) -> Self {
        Self {
            scope,
            stack,
            thread: CallerThread::current(),
        }
    }

    /// Scope owning the definition being built.
    pub fn scope(&self) -> &Scope {
        self.scope
    }

    /// Parameters of the closest enclosing resolution that supplied some.
    pub fn parameters(&self) -> Parameters {
        self.stack.current()
    }

    /// Positional parameter, failing with `MissingParameter`.
    pub fn param<T: std::any::Any + Clone>(&self, index: usize) -> DiResult<T> {
        self.stack.current().get(index)
    }

    pub fn thread(&self) -> CallerThread {
        self.thread
    }
}

impl ResolverCore for ResolutionContext<'_> {
    fn try_resolve_any(&self, key: &TypeKey, parameters: Option<Parameters>) -> DiResult<Option<AnyArc>> {
        self.scope.resolve_in(key, parameters.as_ref(), self.stack)
    }

    fn resolve_all_any(&self, identity: TypeIdentity) -> DiResult<Vec<AnyArc>> {
        self.scope.resolve_all_any(identity)
    }

    fn bind_any(
        &self,
        primary: TypeIdentity,
        secondary: TypeIdentity,
        parameters: Option<Parameters>,
    ) -> DiResult<Option<AnyArc>> {
        self.scope.bind_in(primary, secondary, parameters.as_ref(), self.stack)
    }
}
