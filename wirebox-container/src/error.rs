//! Error types for Wirebox container operations.
//!
//! Resolution failures carry the class or identifier involved and, where
//! it helps, a hint about what to register.

use std::fmt;

use wirebox_support::rendering::{render_chain_tail, suggest_similar};

use crate::introspect::{BoxError, ClassKind};

/// Main error type for resolving and building.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The introspector does not know the requested class.
    #[error("{}", .0)]
    TargetNotFound(TargetNotFoundError),

    /// The class is abstract or an interface and nothing is bound for it.
    #[error("Target <{target}> is not instantiable ({kind})")]
    NotInstantiable { target: String, kind: ClassKind },

    /// A parameter refers to a type with a malformed name.
    #[error("Parameter <{parameter}> declares a malformed type <{type_ref}>")]
    InvalidParameterType { parameter: String, type_ref: String },

    /// A constructor parameter has neither a class type nor a default.
    #[error("{}", .0)]
    UnresolvableParameter(ParameterResolveError),

    /// The constructor itself returned an error.
    #[error("Failed to construct <{target}>: {source}")]
    ConstructionFailed {
        target: String,
        #[source]
        source: BoxError,
    },

    /// A detected injector method returned an error.
    #[error("Injector method <{class}::{method}> failed: {source}")]
    InjectionFailed {
        class: String,
        method: String,
        #[source]
        source: BoxError,
    },

    /// A typed resolve got an instance of another type.
    #[error("<{id}> did not resolve to a {expected}")]
    TypeMismatch { id: String, expected: &'static str },

    /// The resolution chain grew past the configured depth limit.
    #[error("{}", .0)]
    DepthExceeded(DepthExceededError),
}

/// Error when a class name is unknown to the introspector.
#[derive(Debug)]
pub struct TargetNotFoundError {
    /// The class that was requested
    pub target: String,
    /// Known classes and bindings with a similar name
    pub suggestions: Vec<String>,
}

impl TargetNotFoundError {
    /// Builds the error, picking suggestions out of `known`.
    pub fn new<'a>(target: &str, known: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            target: target.to_string(),
            suggestions: suggest_similar(target, known, 3),
        }
    }
}

impl fmt::Display for TargetNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target <{}> could not be found", self.target)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register a class descriptor for <{}> or bind it to a factory",
            self.target
        )
    }
}

/// A parameter without a class type and without a default value.
///
/// Fatal inside constructors. Injector detection treats it as the signal
/// that a method is not really an injector and skips that method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterResolveError {
    /// Class (or `Class::method`) declaring the parameter
    pub owner: String,
    pub parameter: String,
}

impl fmt::Display for ParameterResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unresolvable parameter <{}> of <{}>",
            self.parameter, self.owner
        )?;
        write!(f, "\n  Hint: give it a class type or a default value")
    }
}

impl std::error::Error for ParameterResolveError {}

/// Error when resolution nests deeper than the configured limit.
///
/// Almost always a dependency cycle.
#[derive(Debug)]
pub struct DepthExceededError {
    pub limit: usize,
    /// Identifiers being resolved, outermost first
    pub chain: Vec<String>,
}

impl fmt::Display for DepthExceededError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resolution depth limit of {} exceeded:\n  {}",
            self.limit,
            render_chain_tail(&self.chain, 8)
        )?;
        write!(
            f,
            "\n  Hint: check for a dependency cycle or raise max_depth"
        )
    }
}

/// Invalid container configuration, reported by
/// [`ContainerBuilder::build`](crate::container::ContainerBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_depth must be at least 1 (use no limit to disable the guard)")]
    ZeroDepthLimit,

    #[error("injector detection is enabled with an empty method prefix")]
    EmptyDetectorPrefix,
}

/// Error returned by [`Arguments`](crate::introspect::Arguments) accessors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("argument #{index} is missing")]
    Missing { index: usize },

    #[error("argument #{index} is not a {expected}")]
    TypeMismatch { index: usize, expected: &'static str },
}

/// Convenient Result type for Wirebox operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_not_found_display() {
        let err = ResolveError::TargetNotFound(TargetNotFoundError::new(
            "app::Mialer",
            ["app::Mailer", "app::Database"],
        ));

        let msg = format!("{err}");
        assert!(msg.contains("Target <app::Mialer> could not be found"));
        assert!(msg.contains("Did you mean"));
        assert!(msg.contains("app::Mailer"));
        assert!(!msg.contains("app::Database"));
    }

    #[test]
    fn target_not_found_without_suggestions() {
        let err = TargetNotFoundError::new("Nothing", []);
        let msg = format!("{err}");
        assert!(!msg.contains("Did you mean"));
        assert!(msg.contains("Hint"));
    }

    #[test]
    fn parameter_error_display() {
        let err = ResolveError::UnresolvableParameter(ParameterResolveError {
            owner: "Mailer::set_flag".into(),
            parameter: "enabled".into(),
        });

        let msg = format!("{err}");
        assert!(msg.contains("Unresolvable parameter <enabled>"));
        assert!(msg.contains("Mailer::set_flag"));
    }

    #[test]
    fn depth_exceeded_display_shows_tail() {
        let chain: Vec<String> = (0..20).map(|i| if i % 2 == 0 { "A" } else { "B" }.to_string()).collect();
        let err = ResolveError::DepthExceeded(DepthExceededError { limit: 19, chain });

        let msg = format!("{err}");
        assert!(msg.contains("limit of 19"));
        assert!(msg.contains("… → "));
        assert!(msg.contains("A → B"));
    }

    #[test]
    fn not_instantiable_display() {
        let err = ResolveError::NotInstantiable {
            target: "ILogger".into(),
            kind: ClassKind::Interface,
        };
        assert_eq!(format!("{err}"), "Target <ILogger> is not instantiable (interface)");
    }
}
