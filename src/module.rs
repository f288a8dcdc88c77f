//! Modules: groups of definitions loaded together.

use std::sync::Arc;

use crate::definition::{builder_fn, erase, root_qualifier, Definition, DefinitionBuilder, Options};
use crate::error::BuildResult;
use crate::key::{named, type_qualifier, Qualifier, TypeIdentity};
use crate::kind::Kind;
use crate::scope::ResolutionContext;

/// Defaults applied to every definition of a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleOptions {
    pub create_at_start: bool,
    pub allow_override: bool,
}

/// A set of definitions, loaded and unloaded as a unit.
///
/// Root definitions are added with `single`/`factory`; definitions owned by a
/// named scope go inside a [`scope`](Module::scope) block.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_locator::{Container, Module, Resolver};
///
/// struct Config { url: String }
/// struct Client { config: Arc<Config> }
/// struct Request;
///
/// let mut module = Module::new();
/// module.single(|_| Ok(Config { url: "https://example.org".into() }));
/// module.single(|ctx| Ok(Client { config: ctx.get()? }));
/// module.scope::<Request>(|scope| {
///     scope.scoped(|_| Ok(String::from("per-request")));
/// });
///
/// let container = Container::builder().modules([module]).build().unwrap();
/// let client = container.get::<Client>().unwrap();
/// assert_eq!(client.config.url, "https://example.org");
///
/// let request = container.create_scope_for::<Request>("r1").unwrap();
/// assert_eq!(*request.get::<String>().unwrap(), "per-request");
/// assert!(container.get_or_null::<String>().unwrap().is_none());
/// ```
#[derive(Clone, Default)]
pub struct Module {
    options: ModuleOptions,
    definitions: Vec<Definition>,
    scopes: Vec<Qualifier>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ModuleOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Qualifiers of every scope block, including blocks with no definitions.
    pub fn scopes(&self) -> &[Qualifier] {
        &self.scopes
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Appends every definition of `other`, keeping this module's options
    /// for later additions.
    pub fn include(&mut self, other: &Module) -> &mut Self {
        self.definitions.extend(other.definitions.iter().cloned());
        for qualifier in &other.scopes {
            self.declare_scope(qualifier.clone());
        }
        self
    }

    /// Root Single of a sized type.
    pub fn single<T, F>(&mut self, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<T> + Send + Sync + 'static,
    {
        self.add_sized(root_qualifier(), Kind::Single, builder)
    }

    /// Root Single of a trait object (or any shared value).
    pub fn single_trait<T, F>(&mut self, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add_shared(root_qualifier(), Kind::Single, builder)
    }

    /// Root Factory of a sized type.
    pub fn factory<T, F>(&mut self, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<T> + Send + Sync + 'static,
    {
        self.add_sized(root_qualifier(), Kind::Factory, builder)
    }

    pub fn factory_trait<T, F>(&mut self, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add_shared(root_qualifier(), Kind::Factory, builder)
    }

    /// Definitions of the scope definition named by the type `S`.
    pub fn scope<S: ?Sized + 'static>(&mut self, block: impl FnOnce(&mut ScopeDsl<'_>)) -> &mut Self {
        self.scope_qualified(type_qualifier::<S>(), block)
    }

    /// Definitions of the scope definition named `name`.
    pub fn scope_named(&mut self, name: &str, block: impl FnOnce(&mut ScopeDsl<'_>)) -> &mut Self {
        self.scope_qualified(named(name), block)
    }

    pub fn scope_qualified(&mut self, qualifier: Qualifier, block: impl FnOnce(&mut ScopeDsl<'_>)) -> &mut Self {
        self.declare_scope(qualifier.clone());
        block(&mut ScopeDsl {
            module: self,
            qualifier,
        });
        self
    }

    fn declare_scope(&mut self, qualifier: Qualifier) {
        if !self.scopes.contains(&qualifier) {
            self.scopes.push(qualifier);
        }
    }

    fn add_sized<T, F>(&mut self, scope: Qualifier, kind: Kind, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<T> + Send + Sync + 'static,
    {
        self.add_shared(scope, kind, move |ctx| builder(ctx).map(Arc::new))
    }

    fn add_shared<T, F>(&mut self, scope: Qualifier, kind: Kind, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<Arc<T>> + Send + Sync + 'static,
    {
        let options = Options {
            create_at_start: self.options.create_at_start,
            allow_override: self.options.allow_override,
        };
        let builder = builder_fn(move |ctx| builder(ctx).map(erase));
        self.definitions
            .push(Definition::new(scope, TypeIdentity::of::<T>(), kind, builder, options));
        let index = self.definitions.len() - 1;
        DefinitionBuilder::new(&mut self.definitions[index])
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("options", &self.options)
            .field("definitions", &self.definitions)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Body of a [`Module::scope`] block.
pub struct ScopeDsl<'m> {
    module: &'m mut Module,
    qualifier: Qualifier,
}

impl ScopeDsl<'_> {
    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    /// Single cached once per live scope.
    pub fn scoped<T, F>(&mut self, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<T> + Send + Sync + 'static,
    {
        self.module.add_sized(self.qualifier.clone(), Kind::Single, builder)
    }

    pub fn scoped_trait<T, F>(&mut self, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<Arc<T>> + Send + Sync + 'static,
    {
        self.module.add_shared(self.qualifier.clone(), Kind::Single, builder)
    }

    pub fn factory<T, F>(&mut self, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<T> + Send + Sync + 'static,
    {
        self.module.add_sized(self.qualifier.clone(), Kind::Factory, builder)
    }

    pub fn factory_trait<T, F>(&mut self, builder: F) -> DefinitionBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> BuildResult<Arc<T>> + Send + Sync + 'static,
    {
        self.module.add_shared(self.qualifier.clone(), Kind::Factory, builder)
    }
}
