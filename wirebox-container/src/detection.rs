//! Injector-method detection.
//!
//! After a top-level resolve, the container can look at the public methods
//! of the new object, pick the ones a [`Detector`] flags as injectors
//! (by default: names starting with `set`), resolve their parameters and
//! call them. Methods whose parameters cannot be satisfied are skipped.
//!
//! ```text
//! resolve("Mailer")
//!   └─ build Mailer
//!   └─ listener @ -255
//!        ├─ set_logger(ILogger)   → Invoked
//!        ├─ set_flag(bool)        → Skipped (no default)
//!        └─ set_transport(..)     → Skipped (blacklisted)
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::callbacks::Listener;
use crate::container::Container;
use crate::error::{ConfigError, ParameterResolveError, ResolveError, Result};
use crate::introspect::{Arguments, ClassDescriptor, Instance, MethodDescriptor};
use crate::resolver::{DependencyError, DependencyResolver};

/// Method-name prefix used by [`PrefixDetector::default`].
pub const DEFAULT_INJECTOR_PREFIX: &str = "set";

/// Decides whether a method is a dependency injector.
pub trait Detector: Send + Sync {
    fn detect(&self, method: &MethodDescriptor) -> bool;

    /// Checked when detection is enabled.
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        Ok(())
    }
}

/// Flags methods whose name starts with a literal prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixDetector {
    prefix: String,
}

impl PrefixDetector {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixDetector {
    fn default() -> Self {
        Self::new(DEFAULT_INJECTOR_PREFIX)
    }
}

impl Detector for PrefixDetector {
    fn detect(&self, method: &MethodDescriptor) -> bool {
        method.name().starts_with(&self.prefix)
    }

    /// An empty prefix would flag every method.
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::EmptyDetectorPrefix);
        }
        Ok(())
    }
}

/// Method names injector detection must never call.
///
/// Global names apply to every class, class entries only to instances of
/// that class.
///
/// ```
/// use wirebox_container::detection::Blacklist;
///
/// let blacklist = Blacklist::new()
///     .global("set_string")
///     .for_class("Mailer", "set_transport");
///
/// assert!(blacklist.is_blocked("Anything", "set_string"));
/// assert!(blacklist.is_blocked("Mailer", "set_transport"));
/// assert!(!blacklist.is_blocked("Other", "set_transport"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blacklist {
    global: BTreeSet<String>,
    classes: BTreeMap<String, BTreeSet<String>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks `method` for every class.
    pub fn global(mut self, method: impl Into<String>) -> Self {
        self.global.insert(method.into());
        self
    }

    /// Blocks `method` for instances of `class` only.
    pub fn for_class(mut self, class: impl Into<String>, method: impl Into<String>) -> Self {
        self.classes
            .entry(class.into())
            .or_default()
            .insert(method.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.classes.values().all(BTreeSet::is_empty)
    }

    pub fn is_blocked(&self, class: &str, method: &str) -> bool {
        self.global.contains(method)
            || self
                .classes
                .get(class)
                .is_some_and(|methods| methods.contains(method))
    }

    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.global.iter().map(String::as_str)
    }

    pub fn class_names(&self, class: &str) -> impl Iterator<Item = &str> {
        self.classes
            .get(class)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

/// Result of one injector-method attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionOutcome {
    Invoked,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Blacklisted,
    /// A scalar without a default, on the method itself or on a class
    /// built for one of its parameters.
    UnresolvableParameter(ParameterResolveError),
}

/// Runs injector detection on resolved objects.
#[derive(Clone)]
pub struct InjectorDetection {
    detector: Arc<dyn Detector>,
    blacklist: Blacklist,
}

impl InjectorDetection {
    pub fn new(detector: Arc<dyn Detector>, blacklist: Blacklist) -> Self {
        Self { detector, blacklist }
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Attempts every detected injector on `instance`.
    ///
    /// Returns one `(method, outcome)` pair per detected method. Objects
    /// whose class the introspector does not know are left alone.
    ///
    /// # Errors
    /// Any [`ResolveError`] other than an unresolvable scalar raised while
    /// resolving a method's class-typed dependencies, or an [`ResolveError::InjectionFailed`] from the
    /// method body.
    pub fn inject(
        &self,
        container: &Container,
        instance: &Instance,
    ) -> Result<Vec<(String, InjectionOutcome)>> {
        let Some(class) = container.introspector().describe_instance(instance) else {
            trace!("Instance has no class descriptor, skipping injector detection");
            return Ok(Vec::new());
        };

        let mut report = Vec::new();
        for method in class.methods() {
            if !self.detector.detect(method) {
                continue;
            }
            let outcome = self.attempt(container, class, method, instance)?;
            report.push((method.name().to_string(), outcome));
        }

        debug!(class = class.name(), attempted = report.len(), "Injector detection done");
        Ok(report)
    }

    fn attempt(
        &self,
        container: &Container,
        class: &ClassDescriptor,
        method: &MethodDescriptor,
        instance: &Instance,
    ) -> Result<InjectionOutcome> {
        if self.blacklist.is_blocked(class.name(), method.name()) {
            trace!(class = class.name(), method = method.name(), "Blacklisted injector");
            return Ok(InjectionOutcome::Skipped(SkipReason::Blacklisted));
        }

        let owner = format!("{}::{}", class.name(), method.name());
        let resolved = container
            .dependency_resolver()
            .get_dependencies(container, &owner, method.parameters());
        let arguments = match resolved {
            Ok(values) => Arguments::new(values),
            Err(
                DependencyError::Unresolvable(err)
                | DependencyError::Resolve(ResolveError::UnresolvableParameter(err)),
            ) => {
                trace!(method = %owner, parameter = %err.parameter, "Not an injector");
                return Ok(InjectionOutcome::Skipped(SkipReason::UnresolvableParameter(err)));
            }
            Err(DependencyError::Resolve(err)) => return Err(err),
        };

        method
            .invoke(instance, &arguments)
            .map_err(|source| ResolveError::InjectionFailed {
                class: class.name().to_string(),
                method: method.name().to_string(),
                source,
            })?;

        trace!(method = %owner, "Invoked injector");
        Ok(InjectionOutcome::Invoked)
    }

    /// Wraps this detection into a resolving listener.
    pub fn into_listener(self) -> Listener {
        Arc::new(move |container: &Container, instance: Instance| -> Result<Instance> {
            self.inject(container, &instance)?;
            Ok(instance)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::ParameterDescriptor;

    struct Mock;

    fn method(name: &str) -> MethodDescriptor {
        MethodDescriptor::new::<Mock, _>(name, vec![ParameterDescriptor::scalar("x")], |_, _| Ok(()))
    }

    #[test]
    fn prefix_detection() {
        let detector = PrefixDetector::default();
        assert!(detector.detect(&method("set_mailer")));
        assert!(detector.detect(&method("setDatabase")));
        assert!(!detector.detect(&method("mailer_set")));
        assert!(!detector.detect(&method("dbset")));
    }

    #[test]
    fn custom_prefix() {
        let detector = PrefixDetector::new("inject_");
        assert_eq!(detector.prefix(), "inject_");
        assert!(detector.detect(&method("inject_logger")));
        assert!(!detector.detect(&method("set_logger")));
    }

    #[test]
    fn empty_prefix_is_rejected() {
        assert_eq!(PrefixDetector::default().validate(), Ok(()));
        assert_eq!(
            PrefixDetector::new("").validate(),
            Err(ConfigError::EmptyDetectorPrefix)
        );
    }

    #[test]
    fn empty_blacklist() {
        assert!(Blacklist::new().is_empty());
        assert!(!Blacklist::new().global("set_x").is_empty());
        assert!(!Blacklist::new().for_class("A", "set_x").is_empty());
    }

    #[test]
    fn blacklist_lookups() {
        let blacklist = Blacklist::new()
            .global("set_string")
            .for_class("Mailer", "set_transport")
            .for_class("Mailer", "set_queue");

        assert_eq!(blacklist.global_names().collect::<Vec<_>>(), vec!["set_string"]);
        assert_eq!(
            blacklist.class_names("Mailer").collect::<Vec<_>>(),
            vec!["set_queue", "set_transport"]
        );
        assert_eq!(blacklist.class_names("Other").count(), 0);
    }

    #[test]
    fn blacklist_deserializes_with_missing_sections() {
        let blacklist: Blacklist =
            serde_json::from_str(r#"{ "global": ["set_string"] }"#).unwrap();
        assert!(blacklist.is_blocked("Any", "set_string"));

        let blacklist: Blacklist =
            serde_json::from_str(r#"{ "classes": { "Mailer": ["set_transport"] } }"#).unwrap();
        assert!(blacklist.is_blocked("Mailer", "set_transport"));
        assert!(!blacklist.is_blocked("Any", "set_transport"));
    }
}
