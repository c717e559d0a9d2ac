//! Type providers: modules of related type descriptors.
//!
//! Providers group the descriptors of one feature area so an application
//! can hand whole areas to the catalog at once.
//!
//! # Examples
//! ```rust
//! use sunduq_container::catalog::TypeCatalog;
//! use sunduq_container::descriptor::{ConstructorDescriptor, TypeDescriptor};
//! use sunduq_container::provider::{DescriptorRegistry, TypeProvider};
//!
//! struct SystemClock;
//!
//! struct ClockProvider;
//!
//! impl TypeProvider for ClockProvider {
//!     fn register(&self, registry: &mut dyn DescriptorRegistry) {
//!         registry.register_lazy("shop.clock.SystemClock", || {
//!             TypeDescriptor::new::<SystemClock>("shop.clock.SystemClock")
//!                 .component()
//!                 .constructor(ConstructorDescriptor::new::<SystemClock>(vec![], |_| Ok(SystemClock)))
//!         });
//!     }
//! }
//!
//! let mut catalog = TypeCatalog::new();
//! catalog.add_provider(&ClockProvider);
//! assert!(catalog.contains("shop.clock.SystemClock"));
//! ```

use crate::catalog::DescribeFn;
use crate::descriptor::TypeDescriptor;

/// A module that registers related type descriptors.
pub trait TypeProvider: Send + Sync {
    /// Register descriptors into the registry.
    fn register(&self, registry: &mut dyn DescriptorRegistry);

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Interface that providers register through.
///
/// Implemented by [`TypeCatalog`](crate::catalog::TypeCatalog); kept separate
/// so providers can be tested against a mock.
pub trait DescriptorRegistry {
    /// Register an already-built descriptor under its own name.
    fn register_descriptor(&mut self, descriptor: TypeDescriptor);

    /// Register a descriptor built on first lookup.
    fn register_lazy(&mut self, qualified_name: &str, describe: DescribeFn);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockRegistry {
        eager: Vec<String>,
        lazy: Vec<String>,
    }

    impl DescriptorRegistry for MockRegistry {
        fn register_descriptor(&mut self, descriptor: TypeDescriptor) {
            self.eager.push(descriptor.name().to_string());
        }

        fn register_lazy(&mut self, qualified_name: &str, _describe: DescribeFn) {
            self.lazy.push(qualified_name.to_string());
        }
    }

    struct Clock;

    struct TestProvider;

    impl TypeProvider for TestProvider {
        fn register(&self, registry: &mut dyn DescriptorRegistry) {
            registry.register_descriptor(TypeDescriptor::new::<Clock>("shop.Clock").component());
            registry.register_lazy("shop.LazyClock", || TypeDescriptor::new::<Clock>("shop.LazyClock"));
        }
    }

    #[test]
    fn provider_registers_descriptors() {
        let mut registry = MockRegistry {
            eager: vec![],
            lazy: vec![],
        };

        TestProvider.register(&mut registry);

        assert_eq!(registry.eager, vec!["shop.Clock"]);
        assert_eq!(registry.lazy, vec!["shop.LazyClock"]);
    }

    #[test]
    fn provider_has_name() {
        assert!(TestProvider.name().contains("TestProvider"));
    }
}
