//! # The application context
//!
//! Discovers component types, turns them into bean definitions, builds every
//! bean eagerly and wires the members that were not constructor parameters.
//!
//! # Architecture
//! ```text
//! ApplicationContextBuilder ──build()──> ApplicationContext
//!        │                                   │
//!  ComponentScanner                    create beans (configuration first)
//!  DefinitionBuilder                   inject members
//!                                      post-construct callbacks
//! ```
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use sunduq_container::prelude::*;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> &'static str;
//! }
//!
//! struct SystemClock;
//! impl Clock for SystemClock {
//!     fn now(&self) -> &'static str { "12:00" }
//! }
//!
//! struct Greeter {
//!     clock: Arc<dyn Clock>,
//!     greeting: String,
//! }
//!
//! struct App;
//!
//! let catalog = TypeCatalog::new()
//!     .with(
//!         TypeDescriptor::new::<App>("app.App")
//!             .component_scan(Vec::<String>::new())
//!             .import(["app.SystemClock", "app.Greeter"]),
//!     )
//!     .with(
//!         TypeDescriptor::new::<SystemClock>("app.SystemClock")
//!             .component()
//!             .implements::<SystemClock, dyn Clock>(|c| c)
//!             .constructor(ConstructorDescriptor::new::<SystemClock>(vec![], |_| Ok(SystemClock))),
//!     )
//!     .with(
//!         TypeDescriptor::new::<Greeter>("app.Greeter")
//!             .component()
//!             .constructor(ConstructorDescriptor::new::<Greeter>(
//!                 vec![
//!                     InjectionPoint::autowire::<dyn Clock>("clock"),
//!                     InjectionPoint::value::<String>("greeting", "${greeting:Hello}"),
//!                 ],
//!                 |args| Ok(Greeter { clock: args.take(0)?, greeting: args.take(1)? }),
//!             )),
//!     );
//!
//! let context = ApplicationContext::builder()
//!     .catalog(catalog)
//!     .root("app.App")
//!     .build()
//!     .expect("Failed to build context");
//!
//! let greeter: Arc<Greeter> = context.get_bean("greeter").expect("Failed to get greeter");
//! assert_eq!(greeter.greeting, "Hello");
//! assert_eq!(greeter.clock.now(), "12:00");
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use sunduq_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, trace, warn};

use crate::bean::{Args, Bean, Value};
use crate::catalog::TypeCatalog;
use crate::convert::ConverterTable;
use crate::definition::{BeanDefinition, BeanSource, DefinitionBuilder};
use crate::descriptor::{Autowire, InjectionPoint, Tag};
use crate::error::{CircularDependencyError, NotFoundError, Result, SunduqError};
use crate::inject::{DependencySource, MemberInjector};
use crate::key::TypeKey;
use crate::property::PropertyResolver;
use crate::registry::DefinitionRegistry;
use crate::resource::{ResourceResolver, SearchPath};
use crate::scanner::{ComponentScanner, DEFAULT_TYPE_SUFFIX};
use crate::source::PropertyStore;

// ============================================================
// ApplicationContextBuilder
// ============================================================

/// Configures and builds an [`ApplicationContext`].
///
/// # Examples
/// ```rust,ignore
/// let context = ApplicationContext::builder()
///     .catalog(TypeCatalog::from_inventory())
///     .search_path(SearchPath::parse(["file:///srv/shop/types"])?)
///     .properties(PropertyStore::builder().with_environment().build())
///     .root("shop.ShopConfig")
///     .build()?;
/// ```
pub struct ApplicationContextBuilder {
    catalog: TypeCatalog,
    search_path: SearchPath,
    properties: Arc<PropertyStore>,
    converters: ConverterTable,
    type_suffix: String,
    root: Option<String>,
}

impl ApplicationContextBuilder {
    fn new() -> Self {
        Self {
            catalog: TypeCatalog::new(),
            search_path: SearchPath::new(),
            properties: Arc::new(PropertyStore::empty()),
            converters: ConverterTable::standard(),
            type_suffix: DEFAULT_TYPE_SUFFIX.to_string(),
            root: None,
        }
    }

    /// The descriptors of every type the context may wire.
    pub fn catalog(mut self, catalog: TypeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Where component scanning looks for type files.
    pub fn search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn properties(mut self, store: impl Into<Arc<PropertyStore>>) -> Self {
        self.properties = store.into();
        self
    }

    /// Adds a property converter on top of the standard table.
    pub fn register_converter<T, E>(
        mut self,
        parse: impl Fn(&str) -> std::result::Result<T, E> + Send + Sync + 'static,
    ) -> Self
    where
        T: Send + Sync + 'static,
        E: fmt::Display,
    {
        self.converters.register(parse);
        self
    }

    /// File suffix that marks a scanned file as a type (default `.type`).
    pub fn type_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.type_suffix = suffix.into();
        self
    }

    /// Qualified name of the type carrying the component-scan directive.
    pub fn root(mut self, type_name: impl Into<String>) -> Self {
        self.root = Some(type_name.into());
        self
    }

    /// Scans, builds the definitions and creates every bean.
    ///
    /// # Errors
    /// Any configuration, resolution, property or resource error; the first
    /// one aborts the build.
    #[instrument(skip(self), name = "context_build")]
    pub fn build(self) -> Result<ApplicationContext> {
        info!("Building application context");

        let root_name = self.root.ok_or(SunduqError::MissingRoot)?;
        let root = self.catalog.resolve(&root_name)?;

        let scanner =
            ComponentScanner::new(ResourceResolver::new(self.search_path)).with_suffix(self.type_suffix);
        let candidates = scanner.discover_candidates(&root)?;
        debug!(root = %root_name, candidates = candidates.len(), "Candidate types discovered");

        let registry = DefinitionBuilder::new(&self.catalog).build(&candidates)?;
        let properties = PropertyResolver::new(self.properties).with_converters(self.converters);

        let context = ApplicationContext::from_definitions(registry, properties)?;
        info!(beans = context.len(), "Application context ready ✓");
        Ok(context)
    }
}

// ============================================================
// ApplicationContext
// ============================================================

/// Holds every bean definition and its built instance.
///
/// All beans are created while the context is built; lookups never
/// construct anything.
pub struct ApplicationContext {
    registry: DefinitionRegistry,
    properties: PropertyResolver,
    /// Bean names in creation order; emptied by [`close`](Self::close).
    created: Mutex<Vec<String>>,
}

impl ApplicationContext {
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// Creates, injects and initializes the beans of an existing registry.
    ///
    /// Configuration beans are created first, then every other definition in
    /// name order. Dependencies are created on demand along the way.
    #[instrument(skip_all, name = "context_refresh", fields(definitions = registry.len()))]
    pub fn from_definitions(registry: DefinitionRegistry, properties: PropertyResolver) -> Result<Self> {
        let context = Self {
            registry,
            properties,
            created: Mutex::new(Vec::new()),
        };

        context.create_beans()?;
        context.inject_members()?;
        context.initialize_beans()?;
        Ok(context)
    }

    // ── Lookup ──

    /// The bean named `name` as `T`.
    ///
    /// `T` may be the bean's own type or any type it is bound to
    /// (e.g. `dyn Clock`).
    ///
    /// # Errors
    /// [`SunduqError::DependencyNotFound`] for an unknown name,
    /// [`SunduqError::BeanTypeMismatch`] if the bean is not assignable to `T`.
    pub fn get_bean<T: ?Sized + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let requested = TypeKey::of::<T>();
        let definition = self
            .find_bean_definition_as(name, requested)?
            .ok_or_else(|| self.not_found(name, None))?;
        let bean = self.instance_of(definition)?;
        downcast_view::<T>(definition, &bean)
    }

    /// The bean named `name`, type-erased.
    pub fn bean(&self, name: &str) -> Option<&Bean> {
        self.registry.get(name).and_then(BeanDefinition::instance)
    }

    /// The unique primary bean assignable to `T`.
    ///
    /// # Errors
    /// [`SunduqError::DependencyNotFound`] if nothing is assignable,
    /// [`SunduqError::NoPrimaryBean`] / [`SunduqError::AmbiguousPrimaryBean`]
    /// if several are and the primary flag does not single one out.
    pub fn get_bean_by_type<T: ?Sized + 'static>(&self) -> Result<Arc<T>> {
        let requested = TypeKey::of::<T>();
        let definition = self
            .find_primary_bean_definition(requested)?
            .ok_or_else(|| self.not_found(&requested.short_name(), None))?;
        let bean = self.instance_of(definition)?;
        downcast_view::<T>(definition, &bean)
    }

    /// Every bean assignable to `T`, by order then name.
    pub fn get_beans<T: ?Sized + 'static>(&self) -> Vec<Arc<T>> {
        self.registry
            .assignable_to(TypeKey::of::<T>())
            .into_iter()
            .filter_map(|definition| {
                let bean = definition.instance()?;
                downcast_view::<T>(definition, bean).ok()
            })
            .collect()
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// All bean names, sorted.
    pub fn bean_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn properties(&self) -> &PropertyResolver {
        &self.properties
    }

    pub fn find_bean_definition(&self, name: &str) -> Option<&BeanDefinition> {
        self.registry.get(name)
    }

    /// The definition named `name`, which must be assignable to `requested`.
    ///
    /// # Errors
    /// [`SunduqError::BeanTypeMismatch`] if it exists but is not assignable.
    pub fn find_bean_definition_as(&self, name: &str, requested: TypeKey) -> Result<Option<&BeanDefinition>> {
        match self.registry.get(name) {
            Some(definition) if !definition.is_assignable_to(requested) => Err(SunduqError::BeanTypeMismatch {
                name: name.to_string(),
                actual: definition.bean_type(),
                requested,
            }),
            found => Ok(found),
        }
    }

    /// Every definition assignable to `requested`, by order then name.
    pub fn find_bean_definitions(&self, requested: TypeKey) -> Vec<&BeanDefinition> {
        self.registry.assignable_to(requested)
    }

    /// The definition an unnamed autowire of `requested` resolves to.
    ///
    /// No candidate gives `None`; a single candidate is returned as is;
    /// among several, exactly one must be primary.
    pub fn find_primary_bean_definition(&self, requested: TypeKey) -> Result<Option<&BeanDefinition>> {
        let candidates = self.registry.assignable_to(requested);

        match candidates.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            several => {
                let primaries: Vec<&BeanDefinition> =
                    several.iter().copied().filter(|def| def.is_primary()).collect();

                match primaries.as_slice() {
                    [only] => {
                        trace!(requested = %requested, bean = only.name(), "Primary bean selected");
                        Ok(Some(*only))
                    }
                    [] => Err(SunduqError::NoPrimaryBean {
                        requested,
                        candidates: several.iter().map(|def| def.name().to_string()).collect(),
                    }),
                    _ => Err(SunduqError::AmbiguousPrimaryBean {
                        requested,
                        primaries: primaries.iter().map(|def| def.name().to_string()).collect(),
                    }),
                }
            }
        }
    }

    /// Runs the pre-destroy callbacks in reverse creation order.
    ///
    /// Only the first call does anything. Every callback runs even if an
    /// earlier one fails; the first failure is returned.
    pub fn close(&self) -> Result<()> {
        let created = std::mem::take(&mut *self.created.lock());
        if created.is_empty() {
            trace!("Application context already closed");
            return Ok(());
        }

        let mut first_error = None;
        for name in created.iter().rev() {
            let Some(definition) = self.registry.get(name) else {
                continue;
            };
            let (Some(callback), Some(bean)) = (definition.destroy_callback(), definition.instance()) else {
                continue;
            };

            trace!(bean = name.as_str(), callback = callback.name(), "Pre-destroy");
            if let Err(err) = callback.call(&**bean) {
                warn!(bean = name.as_str(), error = %err, "Pre-destroy callback failed");
                first_error.get_or_insert(err);
            }
        }

        info!(beans = created.len(), "Application context closed");
        first_error.map_or(Ok(()), Err)
    }

    // ── Build phases ──

    fn create_beans(&self) -> Result<()> {
        let (configurations, components): (Vec<&BeanDefinition>, Vec<&BeanDefinition>) = self
            .registry
            .definitions()
            .into_iter()
            .partition(|def| def.is_configuration());
        debug!(
            configurations = configurations.len(),
            components = components.len(),
            "Creating beans"
        );

        let mut creating = Vec::new();
        for definition in configurations.into_iter().chain(components) {
            self.create_bean(definition, &mut creating)?;
        }
        Ok(())
    }

    fn inject_members(&self) -> Result<()> {
        let injector = MemberInjector::new(self);
        let mut injected = 0;

        for definition in self.registry.definitions() {
            if let Some(bean) = definition.instance() {
                injected += injector.inject(definition, bean)?;
            }
        }

        debug!(members = injected, "Member injection complete");
        Ok(())
    }

    fn initialize_beans(&self) -> Result<()> {
        let created = self.created.lock().clone();

        for name in &created {
            let Some(definition) = self.registry.get(name) else {
                continue;
            };
            let (Some(callback), Some(bean)) = (definition.init_callback(), definition.instance()) else {
                continue;
            };
            trace!(bean = name.as_str(), callback = callback.name(), "Post-construct");
            callback.call(&**bean)?;
        }
        Ok(())
    }

    // ── Resolution engine ──

    /// Builds `definition` unless it already has an instance.
    ///
    /// `creating` is the path of beans under construction; re-entering one
    /// of them is a cycle.
    fn create_bean(&self, definition: &BeanDefinition, creating: &mut Vec<String>) -> Result<Bean> {
        if let Some(bean) = definition.instance() {
            return Ok(Arc::clone(bean));
        }

        if let Some(entry) = creating.iter().position(|name| name == definition.name()) {
            let mut chain = creating[entry..].to_vec();
            chain.push(definition.name().to_string());
            return Err(SunduqError::CircularDependency(CircularDependencyError { chain }));
        }

        creating.push(definition.name().to_string());
        trace!(bean = definition.name(), depth = creating.len(), "Creating bean");
        let built = self.instantiate(definition, creating);
        creating.pop();
        let bean = built?;

        definition.set_instance(Arc::clone(&bean));
        self.created.lock().push(definition.name().to_string());
        debug!(
            bean = definition.name(),
            declared_by = %definition.declared_by(),
            "Bean created"
        );
        Ok(bean)
    }

    fn instantiate(&self, definition: &BeanDefinition, creating: &mut Vec<String>) -> Result<Bean> {
        let mut values = Vec::with_capacity(definition.params().len());
        for point in definition.params() {
            values.push(self.resolve_param(definition, point, creating)?);
        }
        let mut args = Args::new(definition.name(), values);

        match definition.source() {
            BeanSource::Constructor(constructor) => constructor.construct(&mut args),
            BeanSource::Factory { owner, member } => {
                let owner_definition = self
                    .registry
                    .get(owner)
                    .ok_or_else(|| self.not_found(owner, Some(definition.name())))?;
                let owner_bean = self.create_bean(owner_definition, creating)?;
                member.invoke(&owner_bean, &mut args)
            }
        }
    }

    /// The argument for one constructor or factory parameter.
    fn resolve_param(
        &self,
        definition: &BeanDefinition,
        point: &InjectionPoint,
        creating: &mut Vec<String>,
    ) -> Result<Option<Value>> {
        if definition.is_configuration() && point.autowire_tag().is_some() {
            return Err(SunduqError::AutowireInConfiguration {
                bean: definition.name().to_string(),
                parameter: point.name().to_string(),
            });
        }

        match point.tag(definition.name())? {
            Some(Tag::Value(expression)) => self.properties.resolve_required(expression, point.target()).map(Some),
            Some(Tag::Autowire(autowire)) => {
                let Some(dependency) = self.autowire_candidate(definition.name(), point, autowire)? else {
                    return Ok(None);
                };
                let bean = self.create_bean(dependency, creating)?;
                view(dependency, &bean, point.target()).map(Some)
            }
            None => Err(SunduqError::MissingTag {
                bean: definition.name().to_string(),
                point: point.name().to_string(),
            }),
        }
    }

    /// The definition an autowire point refers to.
    ///
    /// A named autowire is looked up by that name; otherwise the primary
    /// rule applies. `None` only for non-required points.
    fn autowire_candidate(
        &self,
        requester: &str,
        point: &InjectionPoint,
        autowire: &Autowire,
    ) -> Result<Option<&BeanDefinition>> {
        let target = point.target();
        let found = match autowire.name.as_deref() {
            Some(name) => self.find_bean_definition_as(name, target)?,
            None => self.find_primary_bean_definition(target)?,
        };

        if found.is_none() {
            if autowire.required {
                let requested = autowire.name.clone().unwrap_or_else(|| target.short_name());
                return Err(self.not_found(&requested, Some(requester)));
            }
            trace!(bean = requester, point = point.name(), "Optional dependency not found");
        }
        Ok(found)
    }

    fn instance_of(&self, definition: &BeanDefinition) -> Result<Bean> {
        self.create_bean(definition, &mut Vec::new())
    }

    fn not_found(&self, requested: &str, required_by: Option<&str>) -> SunduqError {
        SunduqError::DependencyNotFound(NotFoundError {
            requested: requested.to_string(),
            required_by: required_by.map(str::to_string),
            suggestions: suggest_similar(requested, self.registry.names(), 3),
        })
    }
}

impl DependencySource for ApplicationContext {
    fn value(&self, _requester: &str, point: &InjectionPoint, expression: &str) -> Result<Value> {
        self.properties.resolve_required(expression, point.target())
    }

    fn autowired(&self, requester: &str, point: &InjectionPoint, autowire: &Autowire) -> Result<Option<Value>> {
        let Some(dependency) = self.autowire_candidate(requester, point, autowire)? else {
            return Ok(None);
        };
        let bean = self.instance_of(dependency)?;
        view(dependency, &bean, point.target()).map(Some)
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("beans", &self.registry.names())
            .field("properties", &self.properties.store().len())
            .field("open", &!self.created.lock().is_empty())
            .finish()
    }
}

/// The bean as a boxed `Arc` of the requested type.
fn view(definition: &BeanDefinition, bean: &Bean, requested: TypeKey) -> Result<Value> {
    definition
        .descriptor()
        .view(bean, requested)
        .ok_or_else(|| SunduqError::BeanTypeMismatch {
            name: definition.name().to_string(),
            actual: definition.bean_type(),
            requested,
        })
}

fn downcast_view<T: ?Sized + 'static>(definition: &BeanDefinition, bean: &Bean) -> Result<Arc<T>> {
    view(definition, bean, TypeKey::of::<T>())?
        .downcast::<Arc<T>>()
        .map(|arc| *arc)
        .map_err(|_| SunduqError::TypeMismatch {
            context: format!("bean '{}'", definition.name()),
            expected: std::any::type_name::<T>(),
        })
}

// ============================================================
// Prelude
// ============================================================

/// Everything needed to describe types and build a context.
pub mod prelude {
    pub use super::{ApplicationContext, ApplicationContextBuilder};
    pub use crate::bean::{Args, Bean, Slot, Value};
    pub use crate::catalog::TypeCatalog;
    pub use crate::descriptor::{
        Autowire, CallbackMethod, ConstructorDescriptor, FactoryMember, InjectionPoint, MemberDescriptor,
        ReturnKind, TypeDescriptor, Visibility,
    };
    pub use crate::error::{Result, SunduqError};
    pub use crate::key::TypeKey;
    pub use crate::property::PropertyResolver;
    pub use crate::provider::{DescriptorRegistry, TypeProvider};
    pub use crate::resource::{Root, SearchPath};
    pub use crate::source::PropertyStore;
    pub use crate::submit_type;
}

// ============================================================
// Tests
// ============================================================
