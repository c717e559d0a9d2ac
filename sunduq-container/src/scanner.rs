//! Component scanning: from a root descriptor to candidate type names.

use std::collections::BTreeSet;

use sunduq_support::naming::{namespace_of, path_to_type_name};
use tracing::{debug, instrument, trace};

use crate::descriptor::TypeDescriptor;
use crate::error::{Result, SunduqError};
use crate::resource::ResourceResolver;

/// Suffix of the files that name scannable types.
pub const DEFAULT_TYPE_SUFFIX: &str = ".type";

/// Finds the qualified names of candidate component types.
#[derive(Debug, Clone)]
pub struct ComponentScanner {
    resolver: ResourceResolver,
    suffix: String,
}

impl ComponentScanner {
    pub fn new(resolver: ResourceResolver) -> Self {
        Self {
            resolver,
            suffix: DEFAULT_TYPE_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The namespaces the root asks for, or its own namespace when the list is empty.
    ///
    /// # Errors
    /// [`SunduqError::MissingComponentScan`] if the root carries no scan directive.
    pub fn namespaces(root: &TypeDescriptor) -> Result<Vec<String>> {
        let requested = root
            .tags()
            .component_scan
            .as_ref()
            .ok_or_else(|| SunduqError::MissingComponentScan {
                type_name: root.name().to_string(),
            })?;

        if requested.is_empty() {
            Ok(vec![namespace_of(root.name()).to_string()])
        } else {
            Ok(requested.clone())
        }
    }

    /// Scanned type names plus the root's imports.
    #[instrument(skip(self, root), fields(root = root.name()))]
    pub fn discover_candidates(&self, root: &TypeDescriptor) -> Result<BTreeSet<String>> {
        let mut candidates = BTreeSet::new();

        for namespace in Self::namespaces(root)? {
            let found = self
                .resolver
                .scan_with(&namespace, |resource| path_to_type_name(resource.path(), &self.suffix))?;
            trace!(namespace = %namespace, types = found.len(), "Scanned namespace for types");
            candidates.extend(found);
        }

        for import in &root.tags().imports {
            trace!(type_name = %import, "Imported type");
            candidates.insert(import.clone());
        }

        debug!(candidates = candidates.len(), "Discovered candidate types");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::resource::{Root, SearchPath};

    struct AppConfig;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for path in [
            "shop/AppConfig.type",
            "shop/order/OrderService.type",
            "shop/order/README.md",
            "shop/clock/SystemClock.type",
            "billing/Invoice.type",
        ] {
            let file = dir.path().join(path);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(file, "").unwrap();
        }
        dir
    }

    fn scanner(dir: &tempfile::TempDir) -> ComponentScanner {
        ComponentScanner::new(ResourceResolver::new(
            SearchPath::new().with_root(Root::directory(dir.path())),
        ))
    }

    #[test]
    fn scans_own_namespace_by_default() {
        let dir = fixture();
        let root = TypeDescriptor::new::<AppConfig>("shop.AppConfig")
            .configuration()
            .component_scan(Vec::<String>::new());

        let candidates = scanner(&dir).discover_candidates(&root).unwrap();

        assert_eq!(
            candidates.into_iter().collect::<Vec<_>>(),
            vec!["shop.AppConfig", "shop.clock.SystemClock", "shop.order.OrderService"]
        );
    }

    #[test]
    fn explicit_namespaces_and_imports() {
        let dir = fixture();
        let root = TypeDescriptor::new::<AppConfig>("shop.AppConfig")
            .component_scan(["shop.order", "billing"])
            .import(["vendor.Metrics"]);

        let candidates = scanner(&dir).discover_candidates(&root).unwrap();

        assert!(candidates.contains("shop.order.OrderService"));
        assert!(candidates.contains("billing.Invoice"));
        assert!(candidates.contains("vendor.Metrics"));
        assert!(!candidates.contains("shop.clock.SystemClock"));
    }

    #[test]
    fn custom_suffix() {
        let dir = fixture();
        let root = TypeDescriptor::new::<AppConfig>("shop.AppConfig").component_scan(["shop.order"]);

        let candidates = scanner(&dir).with_suffix(".md").discover_candidates(&root).unwrap();
        assert_eq!(candidates.into_iter().collect::<Vec<_>>(), vec!["shop.order.README"]);
    }

    #[test]
    fn missing_scan_directive() {
        let dir = fixture();
        let root = TypeDescriptor::new::<AppConfig>("shop.AppConfig").configuration();

        match scanner(&dir).discover_candidates(&root) {
            Err(SunduqError::MissingComponentScan { type_name }) => assert_eq!(type_name, "shop.AppConfig"),
            other => panic!("Expected MissingComponentScan, got: {other:?}"),
        }
    }

    #[test]
    fn root_without_namespace_scans_everything() {
        let root = TypeDescriptor::new::<AppConfig>("AppConfig").component_scan(Vec::<String>::new());
        assert_eq!(ComponentScanner::namespaces(&root).unwrap(), vec![""]);
    }
}
