//! Bean definitions and the builder that derives them from candidate types.
//!
//! A [`BeanDefinition`] is produced either from a component type's single
//! public constructor, or from a factory member of a configuration type.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use sunduq_support::naming::{decapitalize, default_bean_name};
use tracing::{debug, instrument, trace};

use crate::bean::Bean;
use crate::catalog::TypeCatalog;
use crate::descriptor::{
    CallbackKind, CallbackMethod, ConstructorDescriptor, FactoryMember, InjectionPoint, ReturnKind,
    TypeDescriptor, Visibility,
};
use crate::error::{Result, SunduqError};
use crate::key::TypeKey;
use crate::registry::DefinitionRegistry;

/// Order of definitions that carry no order tag; they sort last.
pub const DEFAULT_ORDER: i32 = i32::MAX;

/// How a bean is produced.
#[derive(Debug, Clone)]
pub enum BeanSource {
    Constructor(ConstructorDescriptor),
    /// A member invoked on the already-built bean named `owner`.
    Factory { owner: String, member: FactoryMember },
}

/// Metadata describing how to produce and wire one bean.
pub struct BeanDefinition {
    name: String,
    descriptor: Arc<TypeDescriptor>,
    source: BeanSource,
    order: i32,
    primary: bool,
    init: Option<CallbackMethod>,
    destroy: Option<CallbackMethod>,
    configuration: bool,
    instance: OnceCell<Bean>,
}

impl BeanDefinition {
    /// A definition built by calling `constructor`.
    ///
    /// Order, primary flag and configuration flag come from the descriptor's tags.
    pub fn from_constructor(
        name: impl Into<String>,
        descriptor: Arc<TypeDescriptor>,
        constructor: ConstructorDescriptor,
    ) -> Self {
        let tags = descriptor.tags();
        Self {
            name: name.into(),
            order: tags.order.unwrap_or(DEFAULT_ORDER),
            primary: tags.primary,
            configuration: tags.configuration,
            descriptor,
            source: BeanSource::Constructor(constructor),
            init: None,
            destroy: None,
            instance: OnceCell::new(),
        }
    }

    /// A definition built by invoking `member` on the bean named `owner`.
    pub fn from_factory(
        name: impl Into<String>,
        owner: impl Into<String>,
        member: FactoryMember,
        produced: Arc<TypeDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            order: member.order_hint().unwrap_or(DEFAULT_ORDER),
            primary: member.is_primary(),
            configuration: false,
            descriptor: produced,
            source: BeanSource::Factory {
                owner: owner.into(),
                member,
            },
            init: None,
            destroy: None,
            instance: OnceCell::new(),
        }
    }

    pub fn with_callbacks(mut self, init: Option<CallbackMethod>, destroy: Option<CallbackMethod>) -> Self {
        self.init = init;
        self.destroy = destroy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The produced type.
    pub fn bean_type(&self) -> TypeKey {
        self.descriptor.key()
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn source(&self) -> &BeanSource {
        &self.source
    }

    /// Name of the configuration bean owning the factory member, if any.
    pub fn factory_owner(&self) -> Option<&str> {
        match &self.source {
            BeanSource::Factory { owner, .. } => Some(owner),
            BeanSource::Constructor(_) => None,
        }
    }

    /// Parameters of the constructor or factory member.
    pub fn params(&self) -> &[InjectionPoint] {
        match &self.source {
            BeanSource::Constructor(constructor) => constructor.params(),
            BeanSource::Factory { member, .. } => member.params(),
        }
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_configuration(&self) -> bool {
        self.configuration
    }

    pub fn init_callback(&self) -> Option<&CallbackMethod> {
        self.init.as_ref()
    }

    pub fn destroy_callback(&self) -> Option<&CallbackMethod> {
        self.destroy.as_ref()
    }

    pub fn instance(&self) -> Option<&Bean> {
        self.instance.get()
    }

    pub fn is_built(&self) -> bool {
        self.instance.get().is_some()
    }

    pub fn is_assignable_to(&self, requested: TypeKey) -> bool {
        self.descriptor.is_assignable_to(requested)
    }

    /// The type or factory member that declared this bean, for messages.
    pub fn declared_by(&self) -> String {
        match &self.source {
            BeanSource::Constructor(_) => self.descriptor.name().to_string(),
            BeanSource::Factory { owner, member } => format!("{owner}.{}()", member.name()),
        }
    }

    pub(crate) fn sort_key(&self) -> (i32, &str) {
        (self.order, &self.name)
    }

    /// Attaches the built instance; returns `false` if one was already attached.
    pub(crate) fn set_instance(&self, bean: Bean) -> bool {
        self.instance.set(bean).is_ok()
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("type", &self.descriptor.name())
            .field("factory_owner", &self.factory_owner())
            .field("order", &self.order)
            .field("primary", &self.primary)
            .field("configuration", &self.configuration)
            .field("init", &self.init.as_ref().map(CallbackMethod::name))
            .field("destroy", &self.destroy.as_ref().map(CallbackMethod::name))
            .field("built", &self.is_built())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════

/// Turns candidate type names into a registry of bean definitions.
pub struct DefinitionBuilder<'a> {
    catalog: &'a TypeCatalog,
}

impl<'a> DefinitionBuilder<'a> {
    pub fn new(catalog: &'a TypeCatalog) -> Self {
        Self { catalog }
    }

    /// Builds one definition per component type, plus one per factory
    /// member of each configuration type.
    ///
    /// Candidates without the component tag are skipped.
    #[instrument(skip_all)]
    pub fn build<I, S>(&self, candidates: I) -> Result<DefinitionRegistry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = DefinitionRegistry::new();

        for candidate in candidates {
            let descriptor = self.catalog.resolve(candidate.as_ref())?;
            if !descriptor.tags().component {
                trace!(type_name = descriptor.name(), "Not a component, skipped");
                continue;
            }
            self.add_component(&mut registry, descriptor)?;
        }

        debug!(definitions = registry.len(), "Bean definitions built");
        Ok(registry)
    }

    fn add_component(&self, registry: &mut DefinitionRegistry, descriptor: Arc<TypeDescriptor>) -> Result<()> {
        let name = descriptor
            .tags()
            .name
            .clone()
            .unwrap_or_else(|| default_bean_name(descriptor.name()));
        let constructor = single_public_constructor(&descriptor)?;
        let init = tagged_callback(&descriptor, CallbackKind::PostConstruct)?;
        let destroy = tagged_callback(&descriptor, CallbackKind::PreDestroy)?;

        let definition = BeanDefinition::from_constructor(&name, Arc::clone(&descriptor), constructor)
            .with_callbacks(init, destroy);
        let configuration = definition.is_configuration();
        registry.register(definition)?;

        if configuration {
            for member in descriptor.factories() {
                registry.register(factory_definition(&name, &descriptor, member)?)?;
            }
        }
        Ok(())
    }
}

fn single_public_constructor(descriptor: &TypeDescriptor) -> Result<ConstructorDescriptor> {
    let public: Vec<&ConstructorDescriptor> = descriptor
        .constructors()
        .iter()
        .filter(|c| c.visibility() == Visibility::Public)
        .collect();

    match public.as_slice() {
        [only] => Ok((*only).clone()),
        _ => Err(SunduqError::ConstructorCount {
            type_name: descriptor.name().to_string(),
            found: public.len(),
        }),
    }
}

fn check_callback_arity(type_name: &str, callback: &CallbackMethod) -> Result<()> {
    if callback.arity() != 0 {
        return Err(SunduqError::InvalidCallback {
            type_name: type_name.to_string(),
            reason: format!(
                "callback '{}' takes {} parameters, expected none",
                callback.name(),
                callback.arity()
            ),
        });
    }
    Ok(())
}

/// The single callback of `kind` on the type, if any.
fn tagged_callback(descriptor: &TypeDescriptor, kind: CallbackKind) -> Result<Option<CallbackMethod>> {
    let tagged: Vec<&CallbackMethod> = descriptor.callbacks().iter().filter(|c| c.kind() == kind).collect();

    match tagged.as_slice() {
        [] => Ok(None),
        [only] => {
            check_callback_arity(descriptor.name(), only)?;
            Ok(Some((*only).clone()))
        }
        several => Err(SunduqError::InvalidCallback {
            type_name: descriptor.name().to_string(),
            reason: format!(
                "{} {kind:?} callbacks declared: {}",
                several.len(),
                several.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
            ),
        }),
    }
}

/// A callback of the produced type named by a factory member.
fn named_callback(produced: &TypeDescriptor, name: Option<&str>) -> Result<Option<CallbackMethod>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let callback = produced
        .callbacks()
        .iter()
        .find(|c| c.name() == name)
        .ok_or_else(|| SunduqError::InvalidCallback {
            type_name: produced.name().to_string(),
            reason: format!("no callback method named '{name}'"),
        })?;
    check_callback_arity(produced.name(), callback)?;
    Ok(Some(callback.clone()))
}

fn factory_definition(owner: &str, descriptor: &TypeDescriptor, member: &FactoryMember) -> Result<BeanDefinition> {
    let invalid = |reason: String| SunduqError::InvalidFactoryMember {
        owner: descriptor.name().to_string(),
        member: member.name().to_string(),
        reason,
    };

    if member.is_abstract() {
        return Err(invalid("factory members must not be abstract".into()));
    }
    if member.is_final() {
        return Err(invalid("factory members must not be final".into()));
    }
    if member.visibility() != Visibility::Public {
        return Err(invalid("factory members must be public".into()));
    }
    let produced = match member.returns() {
        ReturnKind::Type(produced) => Arc::clone(produced),
        ReturnKind::Void => return Err(invalid("factory members must return a value".into())),
        ReturnKind::Primitive(primitive) => {
            return Err(invalid(format!("factory members must not return primitive {primitive}")));
        }
    };

    let name = member
        .bean_name()
        .map(str::to_string)
        .unwrap_or_else(|| decapitalize(member.name()));
    let init = named_callback(&produced, member.init())?;
    let destroy = named_callback(&produced, member.destroy())?;

    trace!(bean = %name, owner, member = member.name(), "Factory member definition");
    Ok(BeanDefinition::from_factory(name, owner, member.clone(), produced).with_callbacks(init, destroy))
}
