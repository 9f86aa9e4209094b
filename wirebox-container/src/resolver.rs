//! Dependency resolver: turns declared parameters into argument values.
//!
//! Class-typed parameters are resolved through the container (this is
//! where object graphs recurse). With the default resolver, scalar
//! parameters can only use their default value.

use tracing::trace;

use crate::container::Container;
use crate::error::{ParameterResolveError, ResolveError};
use crate::introspect::{Instance, ParameterDescriptor};

/// Why a parameter list could not be resolved.
///
/// Constructors treat both as fatal. Injector detection skips the method
/// on an [`Unresolvable`] scalar, on the method itself or anywhere in the
/// graph built for it.
///
/// [`Unresolvable`]: DependencyError::Unresolvable
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    /// A scalar parameter in this list has no default.
    #[error(transparent)]
    Unresolvable(#[from] ParameterResolveError),

    /// Resolving a class-typed parameter failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl From<DependencyError> for ResolveError {
    fn from(err: DependencyError) -> Self {
        match err {
            DependencyError::Unresolvable(err) => ResolveError::UnresolvableParameter(err),
            DependencyError::Resolve(err) => err,
        }
    }
}

/// Turns parameter lists into argument values.
///
/// Every method has a default; [`DefaultDependencyResolver`] uses all of
/// them. Install a replacement with
/// [`Container::set_dependency_resolver`] or
/// [`ContainerBuilder::dependency_resolver`](crate::container::ContainerBuilder::dependency_resolver),
/// e.g. to feed scalar parameters from configuration.
pub trait DependencyResolver: Send + Sync {
    /// Resolves every parameter, in order.
    ///
    /// `owner` names the class or method declaring the parameters and
    /// only appears in errors.
    fn get_dependencies(
        &self,
        container: &Container,
        owner: &str,
        parameters: &[ParameterDescriptor],
    ) -> Result<Vec<Instance>, DependencyError> {
        let mut dependencies = Vec::with_capacity(parameters.len());

        for parameter in parameters {
            let dependency = match parameter.declared_type()? {
                None => self.resolve_argument(container, owner, parameter)?,
                Some(class) => self.resolve_class(container, class)?,
            };
            dependencies.push(dependency);
        }

        Ok(dependencies)
    }

    /// A scalar parameter: its default, or an error.
    fn resolve_argument(
        &self,
        _container: &Container,
        owner: &str,
        parameter: &ParameterDescriptor,
    ) -> Result<Instance, ParameterResolveError> {
        parameter.default_value().ok_or_else(|| ParameterResolveError {
            owner: owner.to_string(),
            parameter: parameter.name().to_string(),
        })
    }

    /// A class-typed parameter: a nested resolve.
    fn resolve_class(&self, container: &Container, class: &str) -> Result<Instance, ResolveError> {
        trace!(class, "Resolving class dependency");
        container.resolve(class)
    }
}

/// The stock resolver: class types through the container, scalars from
/// their defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDependencyResolver;

impl DependencyResolver for DefaultDependencyResolver {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{ClassDescriptor, TypeTable};
    use std::sync::Arc;

    #[derive(Default)]
    struct Engine;

    fn container() -> Container {
        Container::new(TypeTable::new().with(ClassDescriptor::of::<Engine>("Engine")))
    }

    /// Scalars named `wheels` come from "configuration".
    struct ConfiguredWheels;

    impl DependencyResolver for ConfiguredWheels {
        fn resolve_argument(
            &self,
            container: &Container,
            owner: &str,
            parameter: &ParameterDescriptor,
        ) -> Result<Instance, ParameterResolveError> {
            match parameter.name() {
                "wheels" => Ok(Arc::new(6u8)),
                _ => DefaultDependencyResolver.resolve_argument(container, owner, parameter),
            }
        }
    }

    #[test]
    fn resolves_in_declared_order() {
        let container = container();
        let resolver = DefaultDependencyResolver;

        let deps = resolver
            .get_dependencies(
                &container,
                "Car",
                &[
                    ParameterDescriptor::scalar("wheels").with_default(4u8),
                    ParameterDescriptor::class("engine", "Engine"),
                    ParameterDescriptor::scalar("name").with_default(String::from("beetle")),
                ],
            )
            .unwrap();

        assert_eq!(deps.len(), 3);
        assert_eq!(*Arc::clone(&deps[0]).downcast::<u8>().unwrap(), 4);
        assert!(deps[1].is::<Engine>());
        assert_eq!(&*Arc::clone(&deps[2]).downcast::<String>().unwrap(), "beetle");
    }

    #[test]
    fn scalar_without_default_is_unresolvable() {
        let container = container();
        let resolver = DefaultDependencyResolver;

        let err = resolver
            .get_dependencies(
                &container,
                "Car::set_wheels",
                &[ParameterDescriptor::scalar("wheels")],
            )
            .unwrap_err();

        match err {
            DependencyError::Unresolvable(err) => {
                assert_eq!(err.owner, "Car::set_wheels");
                assert_eq!(err.parameter, "wheels");
            }
            other => panic!("Expected Unresolvable, got: {other:?}"),
        }
    }

    #[test]
    fn unknown_class_is_a_resolve_error() {
        let container = container();
        let resolver = DefaultDependencyResolver;

        let err = resolver
            .get_dependencies(
                &container,
                "Car",
                &[ParameterDescriptor::class("gearbox", "Gearbox")],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DependencyError::Resolve(ResolveError::TargetNotFound(_))
        ));
    }

    #[test]
    fn malformed_type_is_a_resolve_error() {
        let container = container();
        let resolver = DefaultDependencyResolver;

        let err = resolver
            .get_dependencies(&container, "Car", &[ParameterDescriptor::class("gearbox", "")])
            .unwrap_err();
        assert!(matches!(
            ResolveError::from(err),
            ResolveError::InvalidParameterType { .. }
        ));
    }

    #[test]
    fn unresolvable_converts_into_resolve_error() {
        let err = DependencyError::Unresolvable(ParameterResolveError {
            owner: "Car".into(),
            parameter: "wheels".into(),
        });
        assert!(matches!(
            ResolveError::from(err),
            ResolveError::UnresolvableParameter(_)
        ));
    }

    #[test]
    fn custom_resolver_overrides_scalars_only() {
        let container = container();
        let resolver = ConfiguredWheels;

        let deps = resolver
            .get_dependencies(
                &container,
                "Car",
                &[
                    ParameterDescriptor::scalar("wheels"),
                    ParameterDescriptor::class("engine", "Engine"),
                ],
            )
            .unwrap();
        assert_eq!(*Arc::clone(&deps[0]).downcast::<u8>().unwrap(), 6);
        assert!(deps[1].is::<Engine>());

        let err = resolver
            .get_dependencies(&container, "Car", &[ParameterDescriptor::scalar("doors")])
            .unwrap_err();
        assert!(matches!(err, DependencyError::Unresolvable(_)));
    }
}
