//! Binding registry: identifiers, construction strategies and the
//! singleton cache.
//!
//! Every binding is stored as a factory. Class-name concretes are turned
//! into factories at bind time: a binding whose identifier equals its
//! target builds the class directly, any other target is an alias and
//! resolves the target again.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::container::Container;
use crate::error::Result;
use crate::introspect::Instance;
use crate::scope::Scope;

/// Type alias for factory functions.
///
/// A factory receives the container (to resolve its own dependencies)
/// and the parameters passed to [`Container::resolve_with`].
pub type FactoryFn = Arc<dyn Fn(&Container, &[Instance]) -> Result<Instance> + Send + Sync>;

/// How an identifier is turned into an instance.
#[derive(Clone)]
pub enum ConstructionStrategy {
    /// Called verbatim; no introspection, no constructor injection.
    Factory(FactoryFn),
    /// Built through the introspector and constructor injection.
    ClassName(String),
}

impl ConstructionStrategy {
    pub fn class(name: impl Into<String>) -> Self {
        Self::ClassName(name.into())
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Container, &[Instance]) -> Result<Instance> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }
}

impl fmt::Debug for ConstructionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => write!(f, "Factory(..)"),
            Self::ClassName(name) => write!(f, "ClassName({name:?})"),
        }
    }
}

/// What a caller hands to [`Container::bind`].
///
/// `&str` and `String` convert into [`Concrete::Class`].
pub enum Concrete {
    /// The identifier itself is the class to build.
    Itself,
    /// A class name: the same identifier builds it, another one aliases it.
    Class(String),
    /// A user factory.
    Factory(FactoryFn),
}

impl Concrete {
    /// A factory returning an already type-erased instance.
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Container, &[Instance]) -> Result<Instance> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }

    /// A factory returning a plain value, wrapped into an [`Instance`].
    ///
    /// ```rust,ignore
    /// container.singleton("config", Concrete::value(|_, _| Ok(Config::load())));
    /// ```
    pub fn value<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container, &[Instance]) -> Result<T> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(
            move |container: &Container, parameters: &[Instance]| -> Result<Instance> {
                Ok(Arc::new(factory(container, parameters)?))
            },
        ))
    }
}

impl From<&str> for Concrete {
    fn from(class: &str) -> Self {
        Self::Class(class.to_string())
    }
}

impl From<String> for Concrete {
    fn from(class: String) -> Self {
        Self::Class(class)
    }
}

impl<T: Into<Concrete>> From<Option<T>> for Concrete {
    /// `None` means the concrete was omitted.
    fn from(concrete: Option<T>) -> Self {
        concrete.map_or(Self::Itself, Into::into)
    }
}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Itself => write!(f, "Itself"),
            Self::Class(name) => write!(f, "Class({name:?})"),
            Self::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// A normalized binding.
#[derive(Clone)]
pub(crate) struct Binding {
    pub factory: FactoryFn,
    pub scope: Scope,
}

impl Binding {
    pub fn new(id: &str, concrete: Concrete, scope: Scope) -> Self {
        let factory = match concrete {
            Concrete::Factory(factory) => factory,
            Concrete::Itself => class_factory(id, id.to_string()),
            Concrete::Class(target) => class_factory(id, target),
        };
        Self { factory, scope }
    }
}

fn class_factory(id: &str, target: String) -> FactoryFn {
    if id == target {
        Arc::new(move |container: &Container, _: &[Instance]| container.build_class(&target))
    } else {
        Arc::new(move |container: &Container, _: &[Instance]| container.resolve(&target))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Stores bindings and materialized singletons.
///
/// The binding table only changes through `&mut` calls. The singleton
/// cache fills up during `&self` resolves, hence the concurrent map.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    bindings: HashMap<String, Binding>,
    instances: DashMap<String, Instance>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a binding, replacing any previous one for `id`.
    pub fn bind(&mut self, id: String, binding: Binding) {
        debug!(id = %id, scope = %binding.scope, "Registered binding");
        self.bindings.insert(id, binding);
    }

    /// Drops the binding for `id`. A cached instance stays cached.
    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.bindings.remove(id).is_some();
        if removed {
            debug!(id, "Removed binding");
        }
        removed
    }

    pub fn is_bound(&self, id: &str) -> bool {
        self.bindings.contains_key(id)
    }

    /// The strategy for `id`: its binding, or `id` taken as a class name.
    pub fn strategy(&self, id: &str) -> ConstructionStrategy {
        match self.bindings.get(id) {
            Some(binding) => ConstructionStrategy::Factory(Arc::clone(&binding.factory)),
            None => {
                trace!(id, "No binding, treating as class name");
                ConstructionStrategy::ClassName(id.to_string())
            }
        }
    }

    pub fn is_singleton(&self, id: &str) -> bool {
        self.bindings
            .get(id)
            .is_some_and(|binding| binding.scope.is_singleton())
    }

    pub fn instance(&self, id: &str) -> Option<Instance> {
        self.instances.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn has_instance(&self, id: &str) -> bool {
        self.instances.contains_key(id)
    }

    pub fn store_instance(&self, id: &str, instance: Instance) {
        trace!(id, "Cached instance");
        self.instances.insert(id.to_string(), instance);
    }

    pub fn forget_instance(&self, id: &str) -> Option<Instance> {
        self.instances.remove(id).map(|(_, instance)| instance)
    }

    /// Bound identifiers; used for "did you mean?" hints.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn cached(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_factory() -> Concrete {
        Concrete::value(|_, _| Ok(42i32))
    }

    #[test]
    fn bind_and_lookup() {
        let mut reg = Registry::new();
        reg.bind("answer".into(), Binding::new("answer", dummy_factory(), Scope::Transient));
        assert!(reg.is_bound("answer"));
        assert!(!reg.is_singleton("answer"));
        assert!(matches!(reg.strategy("answer"), ConstructionStrategy::Factory(_)));
    }

    #[test]
    fn unbound_ids_are_class_names() {
        let reg = Registry::new();
        match reg.strategy("app::Mailer") {
            ConstructionStrategy::ClassName(name) => assert_eq!(name, "app::Mailer"),
            other => panic!("Expected ClassName, got: {other:?}"),
        }
    }

    #[test]
    fn rebinding_overwrites() {
        let mut reg = Registry::new();
        reg.bind("answer".into(), Binding::new("answer", dummy_factory(), Scope::Transient));
        reg.bind("answer".into(), Binding::new("answer", dummy_factory(), Scope::Singleton));
        assert_eq!(reg.len(), 1);
        assert!(reg.is_singleton("answer"));
    }

    #[test]
    fn remove_keeps_cached_instance() {
        let mut reg = Registry::new();
        reg.bind("answer".into(), Binding::new("answer", dummy_factory(), Scope::Singleton));
        reg.store_instance("answer", Arc::new(42i32));

        assert!(reg.remove("answer"));
        assert!(!reg.remove("answer"));
        assert!(!reg.is_bound("answer"));
        assert!(reg.has_instance("answer"));

        assert!(reg.forget_instance("answer").is_some());
        assert!(!reg.has_instance("answer"));
    }

    #[test]
    fn concrete_conversions() {
        assert!(matches!(Concrete::from("Foo"), Concrete::Class(name) if name == "Foo"));
        assert!(matches!(Concrete::from(None::<&str>), Concrete::Itself));
        assert!(matches!(Concrete::from(Some("Foo")), Concrete::Class(_)));
    }
}
