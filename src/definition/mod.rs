//! Definitions: immutable recipes for building instances.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::BuildResult;
use crate::key::{named, Qualifier, TypeIdentity, TypeKey};
use crate::kind::Kind;
use crate::registry::AnyArc;
use crate::scope::ResolutionContext;
use crate::traits::Dispose;

pub mod scope_definition;

pub use scope_definition::ScopeDefinition;

/// Id of the root scope, and name of the root scope definition.
pub const ROOT_SCOPE_ID: &str = "-Root-";

/// Qualifier naming the root scope definition.
pub fn root_qualifier() -> Qualifier {
    named(ROOT_SCOPE_ID)
}

/// Type-erased builder closure.
pub(crate) type Builder =
    Arc<dyn for<'a> Fn(&ResolutionContext<'a>) -> BuildResult<AnyArc> + Send + Sync>;

/// Converts a stored primary value into a stored secondary value.
pub(crate) type Caster = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;

pub(crate) type OnClose = Arc<dyn Fn(&AnyArc) + Send + Sync>;

/// Boxes a closure as a [`Builder`], pinning down its higher-ranked signature.
pub(crate) fn builder_fn<F>(f: F) -> Builder
where
    F: for<'a> Fn(&ResolutionContext<'a>) -> BuildResult<AnyArc> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a typed value the way every instance is stored.
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}

/// Recovers a typed value from its stored form.
pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(value: &AnyArc) -> Option<Arc<T>> {
    value.downcast_ref::<Arc<T>>().cloned()
}

/// Extra type a definition can be looked up under.
///
/// The instance is converted with a cast closure, typically an unsizing
/// coercion to a trait object.
#[derive(Clone)]
pub struct SecondaryType {
    identity: TypeIdentity,
    cast: Caster,
}

impl SecondaryType {
    /// Secondary type `S` for a definition whose primary type is `T`.
    pub fn of<T, S, F>(cast: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        S: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            identity: TypeIdentity::of::<S>(),
            cast: Arc::new(move |value: &AnyArc| unerase::<T>(value).map(|v| erase(cast(v)))),
        }
    }

    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    pub(crate) fn caster(&self) -> &Caster {
        &self.cast
    }
}

impl fmt::Debug for SecondaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.identity, f)
    }
}

/// Per-definition flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Build at container start. Only honoured for Singles of the root scope.
    pub create_at_start: bool,
    /// Replace an equivalent definition instead of failing.
    pub allow_override: bool,
}

/// Recipe for one component.
///
/// Definitions are immutable once loaded. Two definitions are equivalent when
/// their primary type, qualifier and scope definition match.
#[derive(Clone)]
pub struct Definition {
    scope_qualifier: Qualifier,
    primary: TypeIdentity,
    qualifier: Option<Qualifier>,
    kind: Kind,
    builder: Builder,
    options: Options,
    secondary: Vec<SecondaryType>,
    on_close: Option<OnClose>,
}

impl Definition {
    pub(crate) fn new(
        scope_qualifier: Qualifier,
        primary: TypeIdentity,
        kind: Kind,
        builder: Builder,
        options: Options,
    ) -> Self {
        Self {
            scope_qualifier,
            primary,
            qualifier: None,
            kind,
            builder,
            options,
            secondary: Vec::new(),
            on_close: None,
        }
    }

    /// Single definition whose builder hands out an existing instance.
    pub(crate) fn instance<T: ?Sized + Send + Sync + 'static>(
        scope_qualifier: Qualifier,
        value: Arc<T>,
    ) -> (Self, AnyArc) {
        let stored = erase(value);
        let shared = stored.clone();
        let builder = builder_fn(move |_| Ok(shared.clone()));
        let definition = Self::new(
            scope_qualifier,
            TypeIdentity::of::<T>(),
            Kind::Single,
            builder,
            Options {
                create_at_start: false,
                allow_override: true,
            },
        );
        (definition, stored)
    }

    pub fn scope_qualifier(&self) -> &Qualifier {
        &self.scope_qualifier
    }

    pub fn primary_type(&self) -> TypeIdentity {
        self.primary
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn secondary_types(&self) -> impl Iterator<Item = TypeIdentity> + '_ {
        self.secondary.iter().map(SecondaryType::identity)
    }

    pub fn primary_key(&self) -> TypeKey {
        TypeKey::new(self.primary, self.qualifier.clone())
    }

    /// Keys of the secondary types, sharing the definition's qualifier.
    pub fn secondary_keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.secondary
            .iter()
            .map(move |s| TypeKey::new(s.identity, self.qualifier.clone()))
    }

    pub fn is_equivalent(&self, other: &Definition) -> bool {
        self.primary == other.primary
            && self.qualifier == other.qualifier
            && self.scope_qualifier == other.scope_qualifier
    }

    pub(crate) fn is_root(&self) -> bool {
        self.scope_qualifier.value() == ROOT_SCOPE_ID
    }

    pub(crate) fn builder(&self) -> &Builder {
        &self.builder
    }

    pub(crate) fn on_close(&self) -> Option<&OnClose> {
        self.on_close.as_ref()
    }

    pub(crate) fn push_secondary(&mut self, secondary: SecondaryType) {
        self.secondary.retain(|s| s.identity != secondary.identity);
        self.secondary.push(secondary);
    }

    pub(crate) fn set_qualifier(&mut self, qualifier: Option<Qualifier>) {
        self.qualifier = qualifier;
    }

    pub(crate) fn secondary(&self) -> &[SecondaryType] {
        &self.secondary
    }

    pub(crate) fn caster_for(&self, identity: TypeIdentity) -> Option<&Caster> {
        self.secondary
            .iter()
            .find(|s| s.identity == identity)
            .map(SecondaryType::caster)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("scope", &self.scope_qualifier)
            .field("primary", &self.primary)
            .field("qualifier", &self.qualifier)
            .field("kind", &self.kind)
            .field("secondary", &self.secondary)
            .field("options", &self.options)
            .finish()
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}: {}", self.kind, self.primary_key())?;
        if !self.is_root() {
            write!(f, ", scope:{}", self.scope_qualifier)?;
        }
        if !self.secondary.is_empty() {
            let names: Vec<&str> = self.secondary.iter().map(|s| s.identity.name()).collect();
            write!(f, ", binds:{}", names.join(","))?;
        }
        f.write_str("]")
    }
}

/// Fluent configuration of a definition that was just added.
///
/// Returned by the [`Module`](crate::Module) registration methods and handed
/// to the `declare_with` closures.
pub struct DefinitionBuilder<'d, T: ?Sized> {
    definition: &'d mut Definition,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<'d, T: ?Sized + Send + Sync + 'static> DefinitionBuilder<'d, T> {
    pub(crate) fn new(definition: &'d mut Definition) -> Self {
        Self {
            definition,
            _marker: PhantomData,
        }
    }

    /// Qualifies the definition with a string label.
    pub fn named(&mut self, name: impl AsRef<str>) -> &mut Self {
        self.definition.qualifier = Some(named(name));
        self
    }

    pub fn qualifier(&mut self, qualifier: impl Into<Qualifier>) -> &mut Self {
        self.definition.qualifier = Some(qualifier.into());
        self
    }

    /// Makes the instance resolvable as `S` as well.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use ferrous_locator::{Container, Module, Resolver};
    ///
    /// trait Greeter: Send + Sync {
    ///     fn greet(&self) -> String;
    /// }
    ///
    /// struct English;
    /// impl Greeter for English {
    ///     fn greet(&self) -> String { "hello".into() }
    /// }
    ///
    /// let mut module = Module::new();
    /// module.single(|_| Ok(English)).bind(|e| e as Arc<dyn Greeter>);
    ///
    /// let container = Container::builder().modules([module]).build().unwrap();
    /// let greeter = container.get::<dyn Greeter>().unwrap();
    /// assert_eq!(greeter.greet(), "hello");
    /// ```
    pub fn bind<S, F>(&mut self, cast: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<S> + Send + Sync + 'static,
    {
        self.definition.push_secondary(SecondaryType::of::<T, S, F>(cast));
        self
    }

    /// Hook run with the cached instance when it is disposed.
    ///
    /// Only Singles are disposed; the hook is ignored for Factory definitions.
    pub fn on_close<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        self.definition.on_close = Some(Arc::new(move |value: &AnyArc| {
            if let Some(typed) = unerase::<T>(value) {
                hook(&typed);
            }
        }));
        self
    }

    /// Uses [`Dispose::dispose`] as the close hook.
    pub fn dispose_on_close(&mut self) -> &mut Self
    where
        T: Dispose,
    {
        self.on_close(|value: &Arc<T>| value.dispose())
    }

    pub fn create_at_start(&mut self) -> &mut Self {
        self.definition.options.create_at_start = true;
        self
    }

    pub fn allow_override(&mut self, allow: bool) -> &mut Self {
        self.definition.options.allow_override = allow;
        self
    }
}
