//! Resolver traits for instance lookup.

use std::sync::Arc;

use crate::definition::unerase;
use crate::error::{DiError, DiResult};
use crate::key::{named, Qualifier, TypeIdentity, TypeKey};
use crate::parameters::Parameters;
use crate::registry::AnyArc;

/// Object-safe resolution over explicit type tokens.
///
/// Implemented by [`Container`](crate::Container), [`Scope`](crate::Scope)
/// and [`ResolutionContext`](crate::ResolutionContext). Most code uses the
/// generic methods of [`Resolver`] instead.
pub trait ResolverCore {
    /// Resolves `key` through the scope chain.
    ///
    /// `Ok(None)` means no definition matches `key` anywhere in the chain.
    /// A definition that exists but fails to build is an error.
    fn try_resolve_any(&self, key: &TypeKey, parameters: Option<Parameters>) -> DiResult<Option<AnyArc>>;

    /// Like [`try_resolve_any`](Self::try_resolve_any), failing with
    /// `NoDefinitionFound` on a miss.
    fn resolve_any(&self, key: &TypeKey, parameters: Option<Parameters>) -> DiResult<AnyArc> {
        self.try_resolve_any(key, parameters)?
            .ok_or_else(|| DiError::NoDefinitionFound { key: key.clone() })
    }

    /// Already-built Single instances of `identity`, through the scope chain.
    fn resolve_all_any(&self, identity: TypeIdentity) -> DiResult<Vec<AnyArc>>;

    /// Resolves the first definition with primary type `primary` that also
    /// binds `secondary`, converted to `secondary`.
    fn bind_any(
        &self,
        primary: TypeIdentity,
        secondary: TypeIdentity,
        parameters: Option<Parameters>,
    ) -> DiResult<Option<AnyArc>>;
}

fn downcast<T: ?Sized + Send + Sync + 'static>(key: &TypeKey, value: AnyArc) -> DiResult<Arc<T>> {
    unerase::<T>(&value).ok_or_else(|| DiError::InstanceCreation {
        key: key.clone(),
        cause: format!("stored instance is not a {}", std::any::type_name::<T>()).into(),
    })
}

/// Typed resolution methods.
///
/// `T` may be a sized type or a trait object: both come back as `Arc<T>`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ferrous_locator::{Container, Module, Resolver};
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String { format!("LOG: {msg}") }
/// }
///
/// let mut module = Module::new();
/// module.single(|_| Ok(42usize));
/// module.single(|_| Ok(8080u16)).named("port");
/// module.single_trait(|_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>));
///
/// let container = Container::builder().modules([module]).build().unwrap();
///
/// assert_eq!(*container.get::<usize>().unwrap(), 42);
/// assert_eq!(*container.get_named::<u16>("port").unwrap(), 8080);
/// assert_eq!(container.get::<dyn Logger>().unwrap().log("hi"), "LOG: hi");
/// assert!(container.get_or_null::<u16>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the unqualified definition of `T`.
    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.resolve::<T>(None, None)
    }

    /// Resolves the definition of `T` qualified with `name`.
    fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.resolve::<T>(Some(named(name)), None)
    }

    fn get_qualified<T: ?Sized + Send + Sync + 'static>(&self, qualifier: impl Into<Qualifier>) -> DiResult<Arc<T>> {
        self.resolve::<T>(Some(qualifier.into()), None)
    }

    /// Resolves `T`, handing `parameters` to its builder.
    fn get_with<T: ?Sized + Send + Sync + 'static>(&self, parameters: Parameters) -> DiResult<Arc<T>> {
        self.resolve::<T>(None, Some(parameters))
    }

    /// Full form of the `get` family.
    fn resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<Qualifier>,
        parameters: Option<Parameters>,
    ) -> DiResult<Arc<T>> {
        let key = TypeKey::of::<T>(qualifier);
        let value = self.resolve_any(&key, parameters)?;
        downcast(&key, value)
    }

    /// Resolves `T`, or `None` when no definition exists for it.
    ///
    /// Only the miss on `T` itself becomes `None`. Errors raised while
    /// building `T`, including missing dependencies, still propagate.
    fn get_or_null<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        self.try_resolve::<T>(None, None)
    }

    fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<Qualifier>,
        parameters: Option<Parameters>,
    ) -> DiResult<Option<Arc<T>>> {
        let key = TypeKey::of::<T>(qualifier);
        match self.try_resolve_any(&key, parameters)? {
            Some(value) => downcast(&key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves `T`, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics with the resolution error.
    fn get_required<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        match self.get::<T>() {
            Ok(value) => value,
            Err(err) => panic!("failed to resolve {}: {}", std::any::type_name::<T>(), err),
        }
    }

    /// Every already-built Single that is, or binds, `T`.
    fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        let key = TypeKey::of::<T>(None);
        self.resolve_all_any(key.identity())?
            .into_iter()
            .map(|value| downcast(&key, value))
            .collect()
    }

    /// Resolves the definition of `P` that binds `S`, as `S`.
    fn bind<S, P>(&self) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        P: ?Sized + 'static,
    {
        let key = TypeKey::of::<S>(None);
        let value = self
            .bind_any(TypeIdentity::of::<P>(), key.identity(), None)?
            .ok_or_else(|| DiError::NoDefinitionFound { key: key.clone() })?;
        downcast(&key, value)
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
