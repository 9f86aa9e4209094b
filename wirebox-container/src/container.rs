//! # The Container — heart of Wirebox
//!
//! Maps string identifiers to construction strategies and builds wired
//! object graphs on demand.
//!
//! # Architecture
//! ```text
//! resolve(id)
//!   ├─ singleton cache hit? ──────────────> instance
//!   ├─ binding factory, or id as a class name
//!   ├─ build
//!   │    ├─ Factory   → called verbatim
//!   │    └─ ClassName → introspect constructor
//!   │                   └─ dependency resolver ──> resolve(dep) (nested)
//!   ├─ singleton binding? cache it
//!   └─ outermost call only: resolving listeners
//! ```
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use wirebox_container::prelude::*;
//!
//! #[derive(Default)]
//! struct FileLogger;
//!
//! struct Mailer {
//!     logger: Arc<FileLogger>,
//! }
//!
//! let types = TypeTable::new()
//!     .with(ClassDescriptor::interface("ILogger"))
//!     .with(ClassDescriptor::of::<FileLogger>("FileLogger"))
//!     .with(ClassDescriptor::with_constructor::<Mailer, _>(
//!         "Mailer",
//!         vec![ParameterDescriptor::class("logger", "ILogger")],
//!         |args| Ok(Mailer { logger: args.get(0)? }),
//!     ));
//!
//! let mut container = Container::new(types);
//! container.singleton("ILogger", "FileLogger");
//!
//! let first = container.resolve_as::<Mailer>("Mailer").expect("Failed to resolve");
//! let second = container.resolve_as::<Mailer>("Mailer").expect("Failed to resolve");
//! assert!(!Arc::ptr_eq(&first, &second));
//! assert!(Arc::ptr_eq(&first.logger, &second.logger));
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use tracing::{debug, info, instrument, trace};

use crate::callbacks::{CallbackPipeline, Listener};
use crate::config::ContainerConfig;
use crate::detection::{Blacklist, Detector, InjectorDetection, PrefixDetector};
use crate::error::{
    ConfigError, DepthExceededError, ResolveError, Result, TargetNotFoundError,
};
use crate::introspect::{Arguments, Instance, Introspector, TypeTable};
use crate::registry::{Binding, Concrete, ConstructionStrategy, Registry};
use crate::resolver::{DefaultDependencyResolver, DependencyResolver};
use crate::scope::Scope;

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`] from an introspector and configuration.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .introspector(types)
///     .max_depth(Some(64))
///     .build()?;
/// ```
pub struct ContainerBuilder {
    introspector: Option<Arc<dyn Introspector>>,
    detector: Option<Arc<dyn Detector>>,
    resolver: Option<Arc<dyn DependencyResolver>>,
    config: ContainerConfig,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            introspector: None,
            detector: None,
            resolver: None,
            config: ContainerConfig::default(),
        }
    }

    /// Class descriptors to build from. Defaults to [`TypeTable::global`].
    pub fn introspector(mut self, introspector: impl Introspector + 'static) -> Self {
        self.introspector = Some(Arc::new(introspector));
        self
    }

    /// Like [`introspector`](Self::introspector), sharing an existing one.
    pub fn shared_introspector(mut self, introspector: Arc<dyn Introspector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Custom injector detector, replacing the prefix-based default.
    pub fn detector(mut self, detector: impl Detector + 'static) -> Self {
        self.detector = Some(Arc::new(detector));
        self
    }

    /// Custom dependency resolver. Defaults to [`DefaultDependencyResolver`].
    pub fn dependency_resolver(mut self, resolver: impl DependencyResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and creates the container.
    ///
    /// # Errors
    /// [`ConfigError`] for a zero depth limit, or detection enabled with an
    /// empty prefix or an invalid custom detector.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> std::result::Result<Container, ConfigError> {
        self.config.validate()?;

        let introspector = self
            .introspector
            .unwrap_or_else(|| TypeTable::global() as Arc<dyn Introspector>);
        let detection = self.config.injector_detection;

        let mut container = Container {
            registry: Registry::new(),
            introspector,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(DefaultDependencyResolver)),
            detector: self.detector,
            blacklist: Blacklist::default(),
            callbacks: CallbackPipeline::default(),
            stacks: DashMap::new(),
            max_depth: self.config.max_depth,
        };

        if detection.enabled {
            if container.detector.is_none() {
                container.set_detector(PrefixDetector::new(detection.prefix));
            }
            container.enable_injector_detection(detection.blacklist)?;
        }

        info!(
            classes = container.introspector.class_names().len(),
            max_depth = ?container.max_depth,
            "Container built ✓"
        );
        Ok(container)
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// String-keyed IoC container.
///
/// Registration (`bind`, `on_resolving`, detection toggles) takes
/// `&mut self`; resolving takes `&self` so factories and listeners can call
/// back into the container.
///
/// Each thread tracks its own resolution chain, so concurrent top-level
/// resolves all fire listeners. Singletons first built on two threads at
/// once may be built twice; the last one stored wins the cache.
pub struct Container {
    registry: Registry,
    introspector: Arc<dyn Introspector>,
    resolver: Arc<dyn DependencyResolver>,
    detector: Option<Arc<dyn Detector>>,
    blacklist: Blacklist,
    callbacks: CallbackPipeline,
    /// Identifiers currently being resolved per thread, outermost first.
    stacks: DashMap<ThreadId, Vec<String>>,
    max_depth: Option<usize>,
}

impl Container {
    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// A container over `introspector` with the default configuration.
    pub fn new(introspector: impl Introspector + 'static) -> Self {
        Self {
            registry: Registry::new(),
            introspector: Arc::new(introspector),
            resolver: Arc::new(DefaultDependencyResolver),
            detector: None,
            blacklist: Blacklist::default(),
            callbacks: CallbackPipeline::default(),
            stacks: DashMap::new(),
            max_depth: ContainerConfig::default().max_depth,
        }
    }

    pub fn introspector(&self) -> &dyn Introspector {
        &*self.introspector
    }

    /// The resolver used for constructor and injector parameters.
    pub fn dependency_resolver(&self) -> &dyn DependencyResolver {
        &*self.resolver
    }

    /// Replaces the dependency resolver.
    pub fn set_dependency_resolver(&mut self, resolver: impl DependencyResolver + 'static) {
        debug!("Dependency resolver replaced");
        self.resolver = Arc::new(resolver);
    }

    // ── Registry ──

    /// Registers a transient binding.
    ///
    /// `concrete` is a class name (`&str`/`String`), a
    /// [`Concrete::factory`], or [`Concrete::Itself`].
    pub fn bind(&mut self, id: impl Into<String>, concrete: impl Into<Concrete>) {
        self.bind_with(id, concrete, Scope::Transient);
    }

    /// Registers a binding with an explicit scope.
    pub fn bind_with(
        &mut self,
        id: impl Into<String>,
        concrete: impl Into<Concrete>,
        scope: impl Into<Scope>,
    ) {
        let id = id.into();
        let binding = Binding::new(&id, concrete.into(), scope.into());
        self.registry.bind(id, binding);
    }

    /// Registers a singleton binding.
    pub fn singleton(&mut self, id: impl Into<String>, concrete: impl Into<Concrete>) {
        self.bind_with(id, concrete, Scope::Singleton);
    }

    /// Puts a ready-made instance into the singleton cache.
    ///
    /// Resolving `id` then returns exactly this instance, without any
    /// factory call and without firing listeners.
    pub fn register_instance(&mut self, id: impl Into<String>, instance: Instance) {
        let id = id.into();
        debug!(id = %id, "Registered instance");
        self.registry.store_instance(&id, instance);
    }

    /// Removes the binding for `id`. A cached singleton is kept; see
    /// [`forget_instance`](Self::forget_instance).
    pub fn remove(&mut self, id: &str) {
        self.registry.remove(id);
    }

    /// `true` iff a binding exists. The singleton cache is not consulted.
    pub fn is_bound(&self, id: &str) -> bool {
        self.registry.is_bound(id)
    }

    pub fn has_instance(&self, id: &str) -> bool {
        self.registry.has_instance(id)
    }

    /// Evicts a cached singleton, returning it.
    pub fn forget_instance(&mut self, id: &str) -> Option<Instance> {
        let forgotten = self.registry.forget_instance(id);
        if forgotten.is_some() {
            debug!(id, "Forgot cached instance");
        }
        forgotten
    }

    // ── Map-style sugar ──

    /// Same as [`is_bound`](Self::is_bound).
    pub fn exists(&self, id: &str) -> bool {
        self.is_bound(id)
    }

    /// Same as [`resolve`](Self::resolve).
    pub fn get(&self, id: &str) -> Result<Instance> {
        self.resolve(id)
    }

    /// Same as [`bind`](Self::bind).
    pub fn set(&mut self, id: impl Into<String>, concrete: impl Into<Concrete>) {
        self.bind(id, concrete);
    }

    /// Same as [`remove`](Self::remove).
    pub fn unset(&mut self, id: &str) {
        self.remove(id);
    }

    // ── Resolution ──

    /// Resolves `id` without parameters.
    pub fn resolve(&self, id: &str) -> Result<Instance> {
        self.resolve_with(id, &[])
    }

    /// Resolves `id`, handing `parameters` to its factory.
    ///
    /// Class-name strategies ignore `parameters`.
    #[instrument(level = "trace", skip(self, parameters))]
    pub fn resolve_with(&self, id: &str, parameters: &[Instance]) -> Result<Instance> {
        if let Some(instance) = self.registry.instance(id) {
            trace!(id, "Singleton cache hit");
            return Ok(instance);
        }

        let frame = self.enter(id)?;
        let strategy = self.registry.strategy(id);
        let mut instance = self.build_strategy(&strategy, parameters)?;

        if self.registry.is_singleton(id) {
            self.registry.store_instance(id, Arc::clone(&instance));
        }

        if frame.outermost {
            instance = self.fire_callbacks(instance)?;
        }

        Ok(instance)
    }

    /// Resolves `id` and downcasts it to `T`.
    ///
    /// ```rust,ignore
    /// let mailer: Arc<Mailer> = container.resolve_as("Mailer")?;
    /// ```
    pub fn resolve_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
        self.resolve(id)?
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Builds a strategy without consulting bindings or the cache.
    ///
    /// Listeners never fire for a direct build, and nothing resolved
    /// while building counts as top-level.
    pub fn build(
        &self,
        strategy: &ConstructionStrategy,
        parameters: &[Instance],
    ) -> Result<Instance> {
        let label = match strategy {
            ConstructionStrategy::Factory(_) => "<factory>",
            ConstructionStrategy::ClassName(class) => class.as_str(),
        };
        let _frame = self.enter(label)?;
        self.build_strategy(strategy, parameters)
    }

    fn build_strategy(
        &self,
        strategy: &ConstructionStrategy,
        parameters: &[Instance],
    ) -> Result<Instance> {
        match strategy {
            ConstructionStrategy::Factory(factory) => {
                trace!("Invoking factory");
                factory(self, parameters)
            }
            ConstructionStrategy::ClassName(class) => self.build_class(class),
        }
    }

    /// Builds `class` through its descriptor, resolving constructor
    /// parameters.
    pub(crate) fn build_class(&self, class: &str) -> Result<Instance> {
        let descriptor = self.introspector.describe(class).ok_or_else(|| {
            let known = self
                .introspector
                .class_names()
                .into_iter()
                .chain(self.registry.ids());
            ResolveError::TargetNotFound(TargetNotFoundError::new(class, known))
        })?;

        if !descriptor.is_instantiable() {
            return Err(ResolveError::NotInstantiable {
                target: class.to_string(),
                kind: descriptor.kind(),
            });
        }

        let arguments = match descriptor.constructor_parameters() {
            None => Arguments::default(),
            Some(parameters) => {
                trace!(class, parameters = parameters.len(), "Resolving constructor");
                Arguments::new(self.resolver.get_dependencies(self, class, parameters)?)
            }
        };

        trace!(class, "Instantiating");
        descriptor
            .instantiate(&arguments)
            .map_err(|source| ResolveError::ConstructionFailed {
                target: class.to_string(),
                source,
            })
    }

    fn enter(&self, id: &str) -> Result<Frame<'_>> {
        let thread = thread::current().id();
        let mut stack = self.stacks.entry(thread).or_default();

        if let Some(limit) = self.max_depth {
            if stack.len() >= limit {
                let mut chain = stack.to_vec();
                chain.push(id.to_string());
                return Err(ResolveError::DepthExceeded(DepthExceededError { limit, chain }));
            }
        }

        let outermost = stack.is_empty();
        stack.push(id.to_string());
        Ok(Frame {
            stacks: &self.stacks,
            thread,
            outermost,
        })
    }

    fn fire_callbacks(&self, mut instance: Instance) -> Result<Instance> {
        for listener in self.callbacks.iter() {
            instance = listener(self, instance)?;
        }
        Ok(instance)
    }

    // ── Listeners ──

    /// Registers a resolving listener at priority 0.
    pub fn on_resolving<F>(&mut self, listener: F)
    where
        F: Fn(&Container, Instance) -> Result<Instance> + Send + Sync + 'static,
    {
        self.on_resolving_at(0, listener);
    }

    /// Registers a resolving listener.
    ///
    /// Listeners fire only for top-level resolves, lowest priority first,
    /// registration order within a priority. Each may replace the instance.
    pub fn on_resolving_at<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&Container, Instance) -> Result<Instance> + Send + Sync + 'static,
    {
        debug!(priority, "Registered resolving listener");
        self.callbacks.push(priority, Arc::new(listener) as Listener);
    }

    // ── Injector detection ──

    /// Sets the detector used by the next
    /// [`enable_injector_detection`](Self::enable_injector_detection).
    pub fn set_detector(&mut self, detector: impl Detector + 'static) {
        self.detector = Some(Arc::new(detector));
    }

    /// Turns on injector-method detection.
    ///
    /// An empty `blacklist` falls back to the one stored by a previous
    /// call. Enabling again replaces the previous detection listener.
    ///
    /// # Errors
    /// [`ConfigError`] when the detector rejects its own settings, such as
    /// a [`PrefixDetector`] with an empty prefix. Nothing changes then.
    pub fn enable_injector_detection(
        &mut self,
        blacklist: Blacklist,
    ) -> std::result::Result<(), ConfigError> {
        let detector = Arc::clone(
            self.detector
                .get_or_insert_with(|| Arc::new(PrefixDetector::default()) as Arc<dyn Detector>),
        );
        detector.validate()?;

        if !blacklist.is_empty() {
            self.blacklist = blacklist;
        }

        let detection = InjectorDetection::new(detector, self.blacklist.clone());
        self.callbacks.install_reserved(detection.into_listener());
        debug!(blacklist = ?self.blacklist, "Injector detection enabled");
        Ok(())
    }

    /// Turns off injector-method detection. Detector and blacklist are kept.
    pub fn disable_injector_detection(&mut self) {
        if self.callbacks.remove_reserved() {
            debug!("Injector detection disabled");
        }
    }

    pub fn is_injector_detection_enabled(&self) -> bool {
        self.callbacks.has_reserved()
    }

    /// The blacklist stored by the last enable.
    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.registry.len())
            .field("instances", &self.registry.cached())
            .field("listeners", &self.callbacks.len())
            .field("injector_detection", &self.is_injector_detection_enabled())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Frame (resolution stack guard)
// ═══════════════════════════════════════════

/// One entry on the current thread's resolution stack, popped on drop.
struct Frame<'a> {
    stacks: &'a DashMap<ThreadId, Vec<String>>,
    thread: ThreadId,
    outermost: bool,
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let emptied = match self.stacks.get_mut(&self.thread) {
            Some(mut stack) => {
                stack.pop();
                stack.is_empty()
            }
            None => false,
        };
        if emptied {
            self.stacks.remove_if(&self.thread, |_, stack| stack.is_empty());
        }
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::callbacks::INJECTOR_DETECTION_PRIORITY;
    pub use crate::config::ContainerConfig;
    pub use crate::detection::{Blacklist, Detector, PrefixDetector};
    pub use crate::error::{ResolveError, Result};
    pub use crate::introspect::{
        Arguments, ClassDescriptor, Instance, Introspector, ParameterDescriptor, TypeTable,
    };
    pub use crate::registry::{Concrete, ConstructionStrategy};
    pub use crate::resolver::{DefaultDependencyResolver, DependencyResolver};
    pub use crate::scope::Scope;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
