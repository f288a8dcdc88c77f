//! Type identities, qualifiers and index keys.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable handle for a user type.
///
/// Wraps the `TypeId` together with the type name for diagnostics. Equality and
/// hashing only look at the `TypeId`, so two identities built for the same type
/// are always equal. Works for trait objects as well as sized types.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::TypeIdentity;
///
/// trait Greeter: Send + Sync {}
///
/// let a = TypeIdentity::of::<String>();
/// let b = TypeIdentity::of::<String>();
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "alloc::string::String");
/// assert_ne!(a, TypeIdentity::of::<dyn Greeter>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeIdentity {
    id: TypeId,
    name: &'static str,
}

impl TypeIdentity {
    /// Identity of `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Hot path: TypeId-only comparison (the name is for display)
impl PartialEq for TypeIdentity {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeIdentity {}

impl Hash for TypeIdentity {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Optional discriminator between definitions of the same type.
///
/// A qualifier is either a string label or a type used as a name. Scope
/// definitions are keyed by [`Qualifier::value`].
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{named, type_qualifier, Qualifier};
///
/// struct Session;
///
/// assert_eq!(named("db"), Qualifier::from("db"));
/// assert_eq!(named("db").value(), "db");
/// assert!(type_qualifier::<Session>().value().ends_with("Session"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// String label
    Named(Arc<str>),
    /// Type token used as a name
    Type(TypeIdentity),
}

impl Qualifier {
    /// The string this qualifier stands for.
    pub fn value(&self) -> &str {
        match self {
            Qualifier::Named(name) => name,
            Qualifier::Type(identity) => identity.name(),
        }
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.value())
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.value())
    }
}

impl From<&str> for Qualifier {
    fn from(name: &str) -> Self {
        Qualifier::Named(Arc::from(name))
    }
}

impl From<String> for Qualifier {
    fn from(name: String) -> Self {
        Qualifier::Named(Arc::from(name))
    }
}

impl From<&Qualifier> for Qualifier {
    fn from(qualifier: &Qualifier) -> Self {
        qualifier.clone()
    }
}

/// String-named qualifier.
pub fn named(name: impl AsRef<str>) -> Qualifier {
    Qualifier::Named(Arc::from(name.as_ref()))
}

/// Qualifier backed by the identity of `T`.
pub fn type_qualifier<T: ?Sized + 'static>() -> Qualifier {
    Qualifier::Type(TypeIdentity::of::<T>())
}

/// Index key: a type identity plus an optional qualifier.
///
/// Two keys are equal iff both components are equal.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{named, TypeKey};
///
/// let plain = TypeKey::of::<u32>(None);
/// let port = TypeKey::of::<u32>(Some(named("port")));
///
/// assert_ne!(plain, port);
/// assert_eq!(port, TypeKey::of::<u32>(Some(named("port"))));
/// assert_eq!(port.to_string(), "[q:'port'] u32");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    identity: TypeIdentity,
    qualifier: Option<Qualifier>,
}

impl TypeKey {
    pub fn new(identity: TypeIdentity, qualifier: Option<Qualifier>) -> Self {
        Self { identity, qualifier }
    }

    #[inline(always)]
    pub fn of<T: ?Sized + 'static>(qualifier: Option<Qualifier>) -> Self {
        Self::new(TypeIdentity::of::<T>(), qualifier)
    }

    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    /// Type name for display.
    pub fn display_name(&self) -> &'static str {
        self.identity.name()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "[q:{}] {}", q, self.identity),
            None => write!(f, "{}", self.identity),
        }
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Marker {}

    #[test]
    fn identity_ignores_name_for_equality() {
        let a = TypeIdentity::of::<u8>();
        let b = TypeIdentity { id: TypeId::of::<u8>(), name: "renamed" };
        assert_eq!(a, b);
    }

    #[test]
    fn qualifier_kinds_do_not_collide() {
        let by_name = named(std::any::type_name::<u8>());
        let by_type = type_qualifier::<u8>();
        assert_eq!(by_name.value(), by_type.value());
        assert_ne!(by_name, by_type);
    }

    #[test]
    fn keys_hash_by_both_parts() {
        let mut set = HashSet::new();
        set.insert(TypeKey::of::<dyn Marker>(None));
        set.insert(TypeKey::of::<dyn Marker>(Some(named("x"))));
        set.insert(TypeKey::of::<dyn Marker>(Some(named("x"))));
        assert_eq!(set.len(), 2);
    }
}
