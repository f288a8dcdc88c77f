//! Error types for the service locator.

use thiserror::Error;

use crate::key::TypeKey;

/// Boxed error returned by definition builders.
///
/// Builders may fail with their own error types or with a [`DiError`] raised by
/// a nested resolution; both convert into `BoxError` through `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by definition builders.
pub type BuildResult<T> = Result<T, BoxError>;

/// Service locator errors
///
/// Every failing operation of the container surfaces exactly one of these
/// kinds, so callers can match on the variant instead of parsing messages.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{Container, DiError, Resolver};
///
/// struct Unregistered;
///
/// let container = Container::builder().build().unwrap();
/// match container.get::<Unregistered>() {
///     Err(DiError::NoDefinitionFound { key }) => {
///         assert!(key.to_string().contains("Unregistered"));
///     }
///     _ => unreachable!(),
/// }
/// assert!(container.get_or_null::<Unregistered>().unwrap().is_none());
/// ```
#[derive(Debug, Error)]
pub enum DiError {
    /// No definition matches the key anywhere in the scope chain
    #[error("No definition found for {key}. Check your definitions!")]
    NoDefinitionFound { key: TypeKey },

    /// `create_scope` named a scope definition that was never loaded
    #[error("No scope definition found for qualifier '{qualifier}'")]
    NoScopeDefFound { qualifier: String },

    /// A live scope already uses this id
    #[error("A scope with id '{scope_id}' is already created")]
    ScopeAlreadyCreated { scope_id: String },

    /// No live scope uses this id
    #[error("No scope found for id '{scope_id}'")]
    ScopeNotCreated { scope_id: String },

    /// The scope was closed, or the container was shut down
    #[error("Scope '{scope_id}' is closed")]
    ClosedScope { scope_id: String },

    /// A definition with the same key already exists and override was not allowed
    #[error("Definition for {key} already exists in scope '{scope}' (override not allowed)")]
    DefinitionOverride { key: TypeKey, scope: String },

    /// No property stored under this key (or stored with another type)
    #[error("Property '{key}' not found")]
    MissingProperty { key: String },

    /// A builder asked for a parameter that was not supplied
    #[error("No parameter of type '{type_name}' at index {index} ({supplied} supplied)")]
    MissingParameter {
        index: usize,
        type_name: &'static str,
        supplied: usize,
    },

    /// A builder failed with a foreign error
    #[error("Could not create instance for {key}")]
    InstanceCreation {
        key: TypeKey,
        #[source]
        cause: BoxError,
    },

    /// Construction of a definition re-entered itself
    #[error("Circular dependency on {key}: {}", .path.join(" -> "))]
    CircularDependency { key: TypeKey, path: Vec<String> },

    /// Linking into the root scope, to itself, or into a cycle
    #[error("Invalid link from scope '{from}' to scope '{to}': {reason}")]
    InvalidLink {
        from: String,
        to: String,
        reason: &'static str,
    },

    /// The process-wide container was already started
    #[error("A global container is already started")]
    AlreadyStarted,
}

impl DiError {
    /// Returns true for the only kind the `*_or_null` entry points swallow.
    pub fn is_no_definition_found(&self) -> bool {
        matches!(self, DiError::NoDefinitionFound { .. })
    }

    /// Converts a builder failure into the error reported for `key`.
    ///
    /// Container errors raised inside the builder travel unchanged; anything
    /// else becomes [`DiError::InstanceCreation`].
    pub(crate) fn from_build_error(key: &TypeKey, error: BoxError) -> Self {
        match error.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(cause) => DiError::InstanceCreation {
                key: key.clone(),
                cause,
            },
        }
    }
}

/// Result type for locator operations
///
/// A convenience alias for `Result<T, DiError>` used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;

/// Cause attached to an [`DiError::InstanceCreation`] seen by a thread that
/// waited on another thread's construction attempt which then failed.
#[derive(Debug, Error)]
#[error("concurrent construction attempt #{attempt} failed: {message}")]
pub struct ConcurrentCreationFailed {
    pub attempt: u64,
    pub message: String,
}
