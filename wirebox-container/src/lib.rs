//! Core container implementation for Wirebox.

pub mod callbacks;
pub mod config;
pub mod container;
pub mod detection;
pub mod error;
pub mod introspect;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use container::{Container, ContainerBuilder, prelude};
pub use error::{ResolveError, Result};
pub use introspect::{ClassDescriptor, ClassRegistration, Instance, Introspector, TypeTable};
pub use scope::Scope;
