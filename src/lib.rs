//! # ferrous-locator
//!
//! Scope-aware service locator for Rust, in the style of Koin.
//!
//! ## Features
//!
//! - **Explicit wiring**: every definition is a closure; nothing is inferred
//! - **Two kinds**: `Single` (cached per scope) and `Factory` (fresh per call)
//! - **Named scopes**: scope definitions instantiated on demand, each live
//!   scope owning its own Singles and falling back to linked scopes
//! - **Orderly teardown**: close hooks and scope callbacks run exactly once
//! - **Thread-safe**: at most one concurrent construction per Single, with
//!   reentrant construction reported as a circular dependency
//! - **Runtime parameters**: positional values handed to builders
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ferrous_locator::{Container, Module, Resolver};
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut module = Module::new();
//! module.single(|_| {
//!     Ok(Database {
//!         connection_string: "postgres://localhost".to_string(),
//!     })
//! });
//! module.factory(|ctx| Ok(UserService { db: ctx.get()? }));
//!
//! let container = Container::builder().modules([module]).build().unwrap();
//! let user_service = container.get::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use std::sync::Arc;
//! use ferrous_locator::{Container, Module, Resolver};
//!
//! struct Session;
//! struct RequestId(u32);
//!
//! let mut module = Module::new();
//! module.scope::<Session>(|scope| {
//!     scope.scoped(|ctx| Ok(RequestId(ctx.param(0)?)));
//! });
//! let container = Container::builder().modules([module]).build().unwrap();
//!
//! let s1 = container.create_scope_for::<Session>("s1").unwrap();
//! let s2 = container.create_scope_for::<Session>("s2").unwrap();
//!
//! let r1 = s1.get_with::<RequestId>(ferrous_locator::parameters_of!(1u32)).unwrap();
//! let r2 = s2.get_with::<RequestId>(ferrous_locator::parameters_of!(2u32)).unwrap();
//! assert_eq!((r1.0, r2.0), (1, 2));
//! // Cached per scope: later parameters are ignored
//! assert!(Arc::ptr_eq(&r1, &s1.get::<RequestId>().unwrap()));
//! ```

pub mod config;
pub mod container;
pub mod definition;
pub mod error;
pub mod global;
pub mod key;
pub mod kind;
pub mod module;
pub mod parameters;
pub mod registry;
pub mod scope;
pub mod traits;

mod internal;

pub use config::{ContainerConfig, LogLevel, ParseLogLevelError};
pub use container::{Container, ContainerBuilder};
pub use definition::{Definition, DefinitionBuilder, Options, ScopeDefinition, SecondaryType, ROOT_SCOPE_ID};
pub use error::{BoxError, BuildResult, ConcurrentCreationFailed, DiError, DiResult};
pub use key::{named, type_qualifier, Qualifier, TypeIdentity, TypeKey};
pub use kind::Kind;
pub use module::{Module, ModuleOptions, ScopeDsl};
pub use parameters::Parameters;
pub use registry::{AnyArc, InstanceFactory, PropertyRegistry};
pub use scope::{CallerThread, ResolutionContext, Scope, ScopeCallback};
pub use traits::{Dispose, Resolver, ResolverCore};
