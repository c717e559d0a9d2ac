//! The type catalog, where scanned type names become descriptors.
//!
//! Scanning only yields qualified names. The catalog maps each name to the
//! function that describes the type; the descriptor is built the first time
//! the name is looked up and cached from then on.
//!
//! Types can be registered explicitly, through a
//! [`TypeProvider`](crate::provider::TypeProvider), or at link time with
//! [`submit_type!`](crate::submit_type), collected by
//! [`TypeCatalog::from_inventory`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use sunduq_support::rendering::suggest_similar;
use tracing::{debug, trace, warn};

use crate::descriptor::TypeDescriptor;
use crate::error::{NotFoundError, Result, SunduqError};
use crate::provider::{DescriptorRegistry, TypeProvider};

/// Builds the descriptor of one type.
pub type DescribeFn = fn() -> TypeDescriptor;

/// A link-time registration, submitted with [`submit_type!`](crate::submit_type).
pub struct TypeRegistration {
    name: &'static str,
    describe: DescribeFn,
}

impl TypeRegistration {
    pub const fn new(name: &'static str, describe: DescribeFn) -> Self {
        Self { name, describe }
    }
}

inventory::collect!(TypeRegistration);

/// Registers a type with every catalog built by [`TypeCatalog::from_inventory`].
///
/// ```rust,ignore
/// fn describe_clock() -> TypeDescriptor {
///     TypeDescriptor::new::<SystemClock>("shop.clock.SystemClock").component()
/// }
///
/// sunduq_container::submit_type!("shop.clock.SystemClock", describe_clock);
/// ```
#[macro_export]
macro_rules! submit_type {
    ($name:expr, $describe:path) => {
        $crate::inventory::submit! {
            $crate::catalog::TypeRegistration::new($name, $describe)
        }
    };
}

/// Maps qualified type names to their descriptors.
pub struct TypeCatalog {
    describers: HashMap<String, DescribeFn>,
    resolved: DashMap<String, Arc<TypeDescriptor>>,
}

impl TypeCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            describers: HashMap::new(),
            resolved: DashMap::new(),
        }
    }

    /// A catalog holding every type submitted with [`submit_type!`](crate::submit_type).
    pub fn from_inventory() -> Self {
        let mut catalog = Self::new();
        for registration in inventory::iter::<TypeRegistration> {
            catalog.register_lazy(registration.name, registration.describe);
        }
        debug!(types = catalog.len(), "Collected link-time type registrations");
        catalog
    }

    /// Builder-style [`register_descriptor`](DescriptorRegistry::register_descriptor).
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.register_descriptor(descriptor);
        self
    }

    /// Adds every descriptor of a [`TypeProvider`].
    pub fn add_provider(&mut self, provider: &dyn TypeProvider) -> &mut Self {
        debug!(provider = provider.name(), "Adding type provider");
        provider.register(self);
        self
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.describers.contains_key(qualified_name) || self.resolved.contains_key(qualified_name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .describers
            .keys()
            .cloned()
            .chain(self.resolved.iter().map(|entry| entry.key().clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.describers.is_empty() && self.resolved.is_empty()
    }

    /// Looks up the descriptor for a qualified name, building it on first use.
    ///
    /// # Errors
    /// [`SunduqError::TypeNotFound`] with suggestions if the name is unknown.
    pub fn resolve(&self, qualified_name: &str) -> Result<Arc<TypeDescriptor>> {
        if let Some(found) = self.resolved.get(qualified_name) {
            trace!(type_name = qualified_name, "Descriptor cache hit");
            return Ok(Arc::clone(found.value()));
        }

        let describe = self.describers.get(qualified_name).ok_or_else(|| {
            let names = self.names();
            SunduqError::TypeNotFound(NotFoundError {
                requested: qualified_name.to_string(),
                required_by: None,
                suggestions: suggest_similar(qualified_name, names.iter().map(String::as_str), 3),
            })
        })?;

        let descriptor = self
            .resolved
            .entry(qualified_name.to_string())
            .or_insert_with(|| {
                let descriptor = describe();
                if descriptor.name() != qualified_name {
                    warn!(
                        registered = qualified_name,
                        described = descriptor.name(),
                        "Descriptor name differs from its registration"
                    );
                }
                Arc::new(descriptor)
            })
            .value()
            .clone();

        trace!(type_name = qualified_name, "Descriptor built");
        Ok(descriptor)
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorRegistry for TypeCatalog {
    fn register_descriptor(&mut self, descriptor: TypeDescriptor) {
        let name = descriptor.name().to_string();
        if self.describers.remove(&name).is_some() || self.resolved.contains_key(&name) {
            warn!(type_name = %name, "Replacing registered type");
        }
        debug!(type_name = %name, "Registered type descriptor");
        self.resolved.insert(name, Arc::new(descriptor));
    }

    fn register_lazy(&mut self, qualified_name: &str, describe: DescribeFn) {
        if self.resolved.remove(qualified_name).is_some()
            || self.describers.contains_key(qualified_name)
        {
            warn!(type_name = qualified_name, "Replacing registered type");
        }
        trace!(type_name = qualified_name, "Registered lazy type");
        self.describers.insert(qualified_name.to_string(), describe);
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("registered", &self.len())
            .field("resolved", &self.resolved.len())
            .finish()
    }
}
