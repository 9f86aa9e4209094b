//! Class introspection: what the container knows about a class.
//!
//! Rust has no runtime reflection, so every class the container is able
//! to build is described up front by a [`ClassDescriptor`]: its kind,
//! its declared constructor parameters, and the public methods injector
//! detection may call. Descriptors live in a [`TypeTable`], the default
//! [`Introspector`].
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use wirebox_container::introspect::{ClassDescriptor, ParameterDescriptor, TypeTable};
//!
//! #[derive(Default)]
//! struct FileLogger;
//!
//! struct Mailer {
//!     logger: Arc<FileLogger>,
//!     retries: u32,
//! }
//!
//! let mut table = TypeTable::new();
//! table
//!     .register(ClassDescriptor::interface("ILogger"))
//!     .register(ClassDescriptor::of::<FileLogger>("FileLogger"))
//!     .register(ClassDescriptor::with_constructor::<Mailer, _>(
//!         "Mailer",
//!         vec![
//!             ParameterDescriptor::class("logger", "ILogger"),
//!             ParameterDescriptor::scalar("retries").with_default(3u32),
//!         ],
//!         |args| {
//!             Ok(Mailer {
//!                 logger: args.get(0)?,
//!                 retries: args.value(1)?,
//!             })
//!         },
//!     ));
//!
//! assert_eq!(table.len(), 3);
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, trace};

use crate::error::{ArgumentError, ResolveError, Result};

/// A type-erased, shared object produced by the container.
///
/// Identity is pointer identity: two resolves return "the same instance"
/// when [`Arc::ptr_eq`] holds.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Error type returned by user constructors and methods.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Instantiator = Arc<dyn Fn(&Arguments) -> std::result::Result<Instance, BoxError> + Send + Sync>;
type Invoker =
    Arc<dyn Fn(&Instance, &Arguments) -> std::result::Result<(), BoxError> + Send + Sync>;

// ═══════════════════════════════════════════
// Arguments
// ═══════════════════════════════════════════

/// Resolved argument values, in declared parameter order.
#[derive(Clone, Default)]
pub struct Arguments {
    values: Vec<Instance>,
}

impl Arguments {
    pub fn new(values: Vec<Instance>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The untyped value at `index`.
    pub fn raw(&self, index: usize) -> std::result::Result<&Instance, ArgumentError> {
        self.values.get(index).ok_or(ArgumentError::Missing { index })
    }

    /// The value at `index` as a shared `T`.
    pub fn get<T: Any + Send + Sync>(
        &self,
        index: usize,
    ) -> std::result::Result<Arc<T>, ArgumentError> {
        Arc::clone(self.raw(index)?)
            .downcast::<T>()
            .map_err(|_| ArgumentError::TypeMismatch {
                index,
                expected: type_name::<T>(),
            })
    }

    /// The value at `index`, cloned out. Meant for scalars.
    pub fn value<T: Any + Send + Sync + Clone>(
        &self,
        index: usize,
    ) -> std::result::Result<T, ArgumentError> {
        self.get::<T>(index).map(|shared| (*shared).clone())
    }

    pub fn into_vec(self) -> Vec<Instance> {
        self.values
    }
}

impl From<Vec<Instance>> for Arguments {
    fn from(values: Vec<Instance>) -> Self {
        Self::new(values)
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.values.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Parameters and methods
// ═══════════════════════════════════════════

/// One declared parameter of a constructor or method.
///
/// A parameter either names a class (resolved through the container) or
/// is a scalar, which can only be satisfied by its default value.
#[derive(Clone)]
pub struct ParameterDescriptor {
    name: String,
    declared_type: Option<String>,
    default: Option<Instance>,
}

impl ParameterDescriptor {
    /// A parameter typed with a class or interface name.
    pub fn class(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(type_name.into()),
            default: None,
        }
    }

    /// A parameter without a class type.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            default: None,
        }
    }

    /// Attaches a default value.
    ///
    /// Only consulted for scalar parameters; a class-typed parameter is
    /// always resolved through the container.
    pub fn with_default<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared class type, or `None` for scalars.
    ///
    /// # Errors
    /// [`ResolveError::InvalidParameterType`] when the type name is not a
    /// well-formed class path.
    pub fn declared_type(&self) -> Result<Option<&str>> {
        match self.declared_type.as_deref() {
            None => Ok(None),
            Some(type_ref) if is_valid_class_path(type_ref) => Ok(Some(type_ref)),
            Some(type_ref) => Err(ResolveError::InvalidParameterType {
                parameter: self.name.clone(),
                type_ref: type_ref.to_string(),
            }),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn default_value(&self) -> Option<Instance> {
        self.default.clone()
    }
}

impl fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// A public method the container may call after construction.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    parameters: Vec<ParameterDescriptor>,
    invoker: Invoker,
}

impl MethodDescriptor {
    /// Describes a method on `T`.
    ///
    /// Setters receive `&T`, so injected state needs interior mutability.
    pub fn new<T, F>(name: impl Into<String>, parameters: Vec<ParameterDescriptor>, body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &Arguments) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let method = name.clone();
        Self {
            name,
            parameters,
            invoker: Arc::new(
                move |target: &Instance, args: &Arguments| -> std::result::Result<(), BoxError> {
                    let this = target.downcast_ref::<T>().ok_or_else(|| {
                        format!("<{method}> called on a value that is not a {}", type_name::<T>())
                    })?;
                    body(this, args)
                },
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn invoke(&self, target: &Instance, args: &Arguments) -> std::result::Result<(), BoxError> {
        (self.invoker)(target, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Classes
// ═══════════════════════════════════════════

/// What sort of class a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Concrete,
    Abstract,
    Interface,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKind::Concrete => write!(f, "concrete"),
            ClassKind::Abstract => write!(f, "abstract"),
            ClassKind::Interface => write!(f, "interface"),
        }
    }
}

/// Everything the container needs to know to build a class.
#[derive(Clone)]
pub struct ClassDescriptor {
    name: String,
    kind: ClassKind,
    type_id: Option<TypeId>,
    constructor: Option<Vec<ParameterDescriptor>>,
    instantiator: Option<Instantiator>,
    methods: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    /// A concrete class without a declared constructor, built with
    /// `T::default()`.
    pub fn of<T>(name: impl Into<String>) -> Self
    where
        T: Default + Any + Send + Sync,
    {
        Self {
            name: name.into(),
            kind: ClassKind::Concrete,
            type_id: Some(TypeId::of::<T>()),
            constructor: None,
            instantiator: Some(Arc::new(
                |_: &Arguments| -> std::result::Result<Instance, BoxError> {
                    Ok(Arc::new(T::default()))
                },
            )),
            methods: Vec::new(),
        }
    }

    /// A concrete class whose constructor declares `parameters`.
    ///
    /// `constructor` receives the resolved arguments in the same order.
    pub fn with_constructor<T, F>(
        name: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        constructor: F,
    ) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: ClassKind::Concrete,
            type_id: Some(TypeId::of::<T>()),
            constructor: Some(parameters),
            instantiator: Some(Arc::new(
                move |args: &Arguments| -> std::result::Result<Instance, BoxError> {
                    Ok(Arc::new(constructor(args)?))
                },
            )),
            methods: Vec::new(),
        }
    }

    /// An interface: resolvable only through a binding.
    pub fn interface(name: impl Into<String>) -> Self {
        Self::uninstantiable(name.into(), ClassKind::Interface)
    }

    /// An abstract class: resolvable only through a binding.
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self::uninstantiable(name.into(), ClassKind::Abstract)
    }

    fn uninstantiable(name: String, kind: ClassKind) -> Self {
        Self {
            name,
            kind,
            type_id: None,
            constructor: None,
            instantiator: None,
            methods: Vec::new(),
        }
    }

    /// Adds a public method on `T`. See [`MethodDescriptor::new`].
    pub fn method<T, F>(
        mut self,
        name: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        body: F,
    ) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &Arguments) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.methods.push(MethodDescriptor::new(name, parameters, body));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// The Rust type built for this class, if it is concrete.
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    pub fn is_instantiable(&self) -> bool {
        self.kind == ClassKind::Concrete && self.instantiator.is_some()
    }

    /// Declared constructor parameters; `None` when no constructor is declared.
    pub fn constructor_parameters(&self) -> Option<&[ParameterDescriptor]> {
        self.constructor.as_deref()
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Runs the constructor with already resolved arguments.
    pub fn instantiate(&self, args: &Arguments) -> std::result::Result<Instance, BoxError> {
        match &self.instantiator {
            Some(instantiate) => instantiate(args),
            None => Err(format!("<{}> is {} and has no constructor", self.name, self.kind).into()),
        }
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("constructor", &self.constructor)
            .field("methods", &self.methods)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Introspector
// ═══════════════════════════════════════════

/// The reflection capability the container calls into.
pub trait Introspector: Send + Sync {
    /// Describes the class registered under `class`.
    fn describe(&self, class: &str) -> Option<&ClassDescriptor>;

    /// Describes the concrete class of an already built instance.
    fn describe_instance(&self, instance: &Instance) -> Option<&ClassDescriptor>;

    /// Every known class name; used for "did you mean?" hints.
    fn class_names(&self) -> Vec<&str>;
}

/// Registration table of class descriptors.
///
/// Registering a name twice replaces the earlier descriptor. When two
/// names describe the same Rust type, instances map back to the most
/// recently registered one.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    classes: HashMap<String, ClassDescriptor>,
    by_type: HashMap<TypeId, String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a class descriptor.
    pub fn register(&mut self, descriptor: ClassDescriptor) -> &mut Self {
        debug!(class = %descriptor.name, kind = %descriptor.kind, "Registered class");
        let replaced = self
            .classes
            .get(&descriptor.name)
            .and_then(|previous| previous.type_id);
        if let Some(old) = replaced
            && self.by_type.get(&old) == Some(&descriptor.name)
        {
            self.by_type.remove(&old);
        }
        if let Some(type_id) = descriptor.type_id {
            self.by_type.insert(type_id, descriptor.name.clone());
        }
        self.classes.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, descriptor: ClassDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Collects every descriptor submitted with [`inventory::submit!`].
    ///
    /// ```rust,ignore
    /// fn describe_logger() -> ClassDescriptor {
    ///     ClassDescriptor::of::<FileLogger>("FileLogger")
    /// }
    ///
    /// inventory::submit! { ClassRegistration::new(describe_logger) }
    /// ```
    pub fn from_inventory() -> Self {
        let mut table = Self::new();
        for registration in inventory::iter::<ClassRegistration> {
            table.register((registration.describe)());
        }
        debug!(classes = table.len(), "Collected class registrations");
        table
    }

    /// Process-wide table built from the inventory on first use.
    pub fn global() -> Arc<TypeTable> {
        Arc::clone(&GLOBAL_TABLE)
    }
}

impl Introspector for TypeTable {
    fn describe(&self, class: &str) -> Option<&ClassDescriptor> {
        self.classes.get(class)
    }

    fn describe_instance(&self, instance: &Instance) -> Option<&ClassDescriptor> {
        let any: &dyn Any = &**instance;
        let class = self.by_type.get(&any.type_id())?;
        trace!(class = %class, "Matched instance to class");
        self.classes.get(class)
    }

    fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }
}

/// A compile-time class registration, collected by
/// [`TypeTable::from_inventory`].
pub struct ClassRegistration {
    describe: fn() -> ClassDescriptor,
}

impl ClassRegistration {
    pub const fn new(describe: fn() -> ClassDescriptor) -> Self {
        Self { describe }
    }
}

inventory::collect!(ClassRegistration);

static GLOBAL_TABLE: Lazy<Arc<TypeTable>> = Lazy::new(|| Arc::new(TypeTable::from_inventory()));

/// `true` for `Name`, `a::b::Name` and `A\B\Name`; each segment must be
/// an identifier.
fn is_valid_class_path(path: &str) -> bool {
    !path.is_empty()
        && path.split("::").flat_map(|part| part.split('\\')).all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Widget;

    #[derive(Default)]
    struct Gauge {
        level: Mutex<u8>,
    }

    fn describe_widget() -> ClassDescriptor {
        ClassDescriptor::of::<Widget>("inventory::Widget")
    }

    inventory::submit! { ClassRegistration::new(describe_widget) }

    #[test]
    fn valid_class_paths() {
        assert!(is_valid_class_path("IFoo"));
        assert!(is_valid_class_path("app::mail::Mailer"));
        assert!(is_valid_class_path("App\\Mail\\Mailer"));
        assert!(is_valid_class_path("_Private"));
    }

    #[test]
    fn malformed_class_paths() {
        assert!(!is_valid_class_path(""));
        assert!(!is_valid_class_path("Foo Bar"));
        assert!(!is_valid_class_path("9Lives"));
        assert!(!is_valid_class_path("app::"));
        assert!(!is_valid_class_path("Vec<u8>"));
    }

    #[test]
    fn declared_type_reports_malformed_reference() {
        let ok = ParameterDescriptor::class("logger", "ILogger");
        assert_eq!(ok.declared_type().unwrap(), Some("ILogger"));

        let scalar = ParameterDescriptor::scalar("retries");
        assert_eq!(scalar.declared_type().unwrap(), None);

        let bad = ParameterDescriptor::class("logger", "not a type");
        match bad.declared_type() {
            Err(ResolveError::InvalidParameterType { parameter, type_ref }) => {
                assert_eq!(parameter, "logger");
                assert_eq!(type_ref, "not a type");
            }
            other => panic!("Expected InvalidParameterType, got: {other:?}"),
        }
    }

    #[test]
    fn defaults_are_exposed() {
        let param = ParameterDescriptor::scalar("answer").with_default(42i32);
        assert!(param.has_default());
        let value = param.default_value().unwrap().downcast::<i32>().unwrap();
        assert_eq!(*value, 42);
        assert!(!ParameterDescriptor::scalar("x").has_default());
    }

    #[test]
    fn arguments_typed_access() {
        let args = Arguments::new(vec![Arc::new(7u32), Arc::new(String::from("hi"))]);
        assert_eq!(args.value::<u32>(0).unwrap(), 7);
        assert_eq!(&*args.get::<String>(1).unwrap(), "hi");
        assert_eq!(
            args.value::<u32>(1),
            Err(ArgumentError::TypeMismatch { index: 1, expected: "u32" })
        );
        assert_eq!(args.value::<u32>(2), Err(ArgumentError::Missing { index: 2 }));
    }

    #[test]
    fn class_without_constructor_uses_default() {
        let descriptor = ClassDescriptor::of::<Widget>("Widget");
        assert!(descriptor.is_instantiable());
        assert!(descriptor.constructor_parameters().is_none());

        let instance = descriptor.instantiate(&Arguments::default()).unwrap();
        assert!(instance.is::<Widget>());
    }

    #[test]
    fn interfaces_are_not_instantiable() {
        let descriptor = ClassDescriptor::interface("ILogger");
        assert!(!descriptor.is_instantiable());
        assert_eq!(descriptor.kind(), ClassKind::Interface);
        assert!(descriptor.instantiate(&Arguments::default()).is_err());

        assert!(!ClassDescriptor::abstract_class("BaseRepo").is_instantiable());
    }

    #[test]
    fn methods_are_invoked_on_the_instance() {
        let descriptor = ClassDescriptor::of::<Gauge>("Gauge").method::<Gauge, _>(
            "set_level",
            vec![ParameterDescriptor::scalar("level").with_default(3u8)],
            |gauge, args| {
                *gauge.level.lock() = args.value(0)?;
                Ok(())
            },
        );

        let instance = descriptor.instantiate(&Arguments::default()).unwrap();
        let method = &descriptor.methods()[0];
        assert_eq!(method.name(), "set_level");
        method
            .invoke(&instance, &Arguments::new(vec![Arc::new(9u8)]))
            .unwrap();

        let gauge = instance.downcast::<Gauge>().unwrap();
        assert_eq!(*gauge.level.lock(), 9);
    }

    #[test]
    fn method_on_wrong_instance_fails() {
        let method = MethodDescriptor::new::<Gauge, _>("set_level", vec![], |_, _| Ok(()));
        let other: Instance = Arc::new(Widget);
        assert!(method.invoke(&other, &Arguments::default()).is_err());
    }

    #[test]
    fn table_maps_instances_back_to_classes() {
        let table = TypeTable::new()
            .with(ClassDescriptor::of::<Widget>("Widget"))
            .with(ClassDescriptor::interface("IWidget"));

        let instance: Instance = Arc::new(Widget);
        let class = table.describe_instance(&instance).unwrap();
        assert_eq!(class.name(), "Widget");

        let unknown: Instance = Arc::new(5i64);
        assert!(table.describe_instance(&unknown).is_none());
        assert!(table.describe("IWidget").is_some());
        assert!(table.describe("Nope").is_none());
    }

    #[test]
    fn reregistering_replaces() {
        let mut table = TypeTable::new();
        table.register(ClassDescriptor::interface("Widget"));
        table.register(ClassDescriptor::of::<Widget>("Widget"));
        assert_eq!(table.len(), 1);
        assert!(table.describe("Widget").unwrap().is_instantiable());
    }

    #[test]
    fn replacing_a_class_forgets_its_old_type() {
        let mut table = TypeTable::new();
        table.register(ClassDescriptor::of::<Widget>("Thing"));
        table.register(ClassDescriptor::of::<Gauge>("Thing"));

        let widget: Instance = Arc::new(Widget);
        assert!(table.describe_instance(&widget).is_none());

        let gauge: Instance = Arc::new(Gauge::default());
        assert_eq!(table.describe_instance(&gauge).unwrap().name(), "Thing");
    }

    #[test]
    fn replacing_keeps_type_claimed_by_another_name() {
        let mut table = TypeTable::new();
        table.register(ClassDescriptor::of::<Widget>("Thing"));
        table.register(ClassDescriptor::of::<Widget>("Widget"));
        table.register(ClassDescriptor::interface("Thing"));

        let widget: Instance = Arc::new(Widget);
        assert_eq!(table.describe_instance(&widget).unwrap().name(), "Widget");
    }

    #[test]
    fn inventory_registrations_are_collected() {
        assert!(TypeTable::from_inventory().contains("inventory::Widget"));
        assert!(TypeTable::global().contains("inventory::Widget"));
    }
}
