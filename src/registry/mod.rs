//! Registries: instance factories, live scopes and properties.

use std::any::Any;
use std::sync::Arc;

pub(crate) mod instance_factory;
pub(crate) mod instance_registry;
pub(crate) mod property_registry;
pub(crate) mod scope_registry;

pub use instance_factory::InstanceFactory;
pub(crate) use instance_registry::{InstanceRegistry, Lookup};
pub use property_registry::PropertyRegistry;
pub(crate) use scope_registry::ScopeRegistry;

/// Type-erased stored instance.
///
/// Every instance of type `T` is stored as an `Arc<T>` inside this `Arc`, so
/// sized types and trait objects share one representation.
pub type AnyArc = Arc<dyn Any + Send + Sync>;
