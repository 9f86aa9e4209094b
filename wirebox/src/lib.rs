//! # Wirebox — string-keyed IoC container for Rust
//!
//! Binds identifiers to factories or class names, wires constructor
//! dependencies through class descriptors, caches singletons, and can
//! call `set*` injector methods on freshly resolved objects.
//!
//! ```rust
//! use wirebox::prelude::*;
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! let mut container = Container::new(TypeTable::new().with(ClassDescriptor::of::<Clock>("Clock")));
//! container.singleton("clock", "Clock");
//!
//! let clock = container.resolve_as::<Clock>("clock").expect("Failed to resolve");
//! let again = container.resolve_as::<Clock>("clock").expect("Failed to resolve");
//! assert!(std::sync::Arc::ptr_eq(&clock, &again));
//! ```

pub use wirebox_container::*;
pub use wirebox_support::*;
