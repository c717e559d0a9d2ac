//! Definition registry: all bean definitions of a context, by name.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::definition::BeanDefinition;
use crate::error::{DuplicateBeanError, Result, SunduqError};
use crate::key::TypeKey;

/// Stores bean definitions keyed by bean name.
///
/// Names are unique: a second definition under a taken name is rejected,
/// never overwritten.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, BeanDefinition>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition.
    ///
    /// # Errors
    /// Returns [`SunduqError::DuplicateBeanName`] if the name is taken.
    pub fn register(&mut self, definition: BeanDefinition) -> Result<()> {
        if let Some(existing) = self.definitions.get(definition.name()) {
            return Err(SunduqError::DuplicateBeanName(DuplicateBeanError {
                name: definition.name().to_string(),
                existing: existing.declared_by(),
                duplicate: definition.declared_by(),
            }));
        }

        debug!(
            bean = definition.name(),
            declared_by = %definition.declared_by(),
            "Registered bean definition"
        );
        self.definitions.insert(definition.name().to_string(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&BeanDefinition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// All bean names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All definitions, in name order.
    pub fn definitions(&self) -> Vec<&BeanDefinition> {
        self.names()
            .into_iter()
            .filter_map(|name| self.definitions.get(name))
            .collect()
    }

    /// Definitions whose bean is assignable to `requested`, by order then name.
    pub fn assignable_to(&self, requested: TypeKey) -> Vec<&BeanDefinition> {
        let mut found: Vec<&BeanDefinition> = self
            .definitions
            .values()
            .filter(|def| def.is_assignable_to(requested))
            .collect();
        found.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        trace!(requested = %requested, found = found.len(), "Looked up definitions by type");
        found
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
