//! Name-to-handler registry, populated at startup.

use indexmap::IndexMap;
use sluice_policy::OperationSpec;
use std::sync::Arc;

use crate::trait_::ToolSet;
use crate::validate::{validate_spec, CatalogError};

/// Error from registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two operations share a name
    #[error("Operation already registered: {name}")]
    AlreadyRegistered {
        /// Operation name
        name: String,
    },

    /// Descriptor table is inconsistent
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Entry for a registered operation
#[derive(Clone)]
pub struct ToolEntry {
    /// Static descriptor
    pub spec: &'static OperationSpec,
    /// Family handler
    pub handler: Arc<dyn ToolSet>,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry")
            .field("name", &self.spec.name)
            .field("family", &self.handler.family())
            .finish()
    }
}

/// Registry of operations, in registration order
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: IndexMap<&'static str, ToolEntry>,
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every operation of a family
    ///
    /// # Errors
    ///
    /// Returns error if a name is taken or a descriptor is inconsistent.
    /// Nothing is registered in that case.
    pub fn register(&mut self, handler: Arc<dyn ToolSet>) -> Result<(), RegistryError> {
        let family = handler.family();
        let specs = handler.operations();

        let mut pending = IndexMap::with_capacity(specs.len());
        for spec in specs {
            validate_spec(spec)?;
            if spec.family != family {
                return Err(CatalogError::FamilyMismatch {
                    operation: spec.name.to_string(),
                    declared: spec.family.to_string(),
                    handler: family.to_string(),
                }
                .into());
            }
            if self.tools.contains_key(spec.name) || pending.contains_key(spec.name) {
                return Err(RegistryError::AlreadyRegistered {
                    name: spec.name.to_string(),
                });
            }
            pending.insert(
                spec.name,
                ToolEntry {
                    spec,
                    handler: Arc::clone(&handler),
                },
            );
        }

        tracing::debug!(family, operations = pending.len(), "registered tool family");
        self.tools.extend(pending);
        Ok(())
    }

    /// Look up an operation
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    /// Descriptors, in registration order
    pub fn specs(&self) -> impl Iterator<Item = &'static OperationSpec> + '_ {
        self.tools.values().map(|e| e.spec)
    }

    /// Registered family names, in registration order
    #[must_use]
    pub fn families(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for entry in self.tools.values() {
            if !out.contains(&entry.spec.family) {
                out.push(entry.spec.family);
            }
        }
        out
    }

    /// Check if an operation is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SpyToolSet;
    use sluice_policy::ParamSpec;

    static ALPHA: &[OperationSpec] = &[
        OperationSpec::safe("alpha", "alpha_read", "Read"),
        OperationSpec {
            params: &[ParamSpec::string("target").required()],
            ..OperationSpec::dangerous("alpha", "alpha_write", "Write")
        },
    ];

    static CLASH: &[OperationSpec] = &[OperationSpec::safe("beta", "alpha_read", "Clash")];

    static WRONG_FAMILY: &[OperationSpec] = &[OperationSpec::safe("alpha", "beta_x", "x")];

    #[test]
    fn test_registry_new() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_register() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(SpyToolSet::new("alpha", ALPHA)))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("alpha_write"));
        assert_eq!(registry.families(), vec!["alpha"]);
        let names: Vec<_> = registry.specs().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha_read", "alpha_write"]);
    }

    #[test]
    fn test_registry_register_duplicate() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(SpyToolSet::new("alpha", ALPHA)))
            .unwrap();
        let err = registry
            .register(Arc::new(SpyToolSet::new("beta", CLASH)))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::AlreadyRegistered {
                name: "alpha_read".into()
            }
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_family_mismatch() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .register(Arc::new(SpyToolSet::new("beta", WRONG_FAMILY)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Catalog(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_get_not_found() {
        let registry = ToolRegistry::new();
        assert!(registry.get("nonexistent").is_none());
    }
}
