//! Registry mapping step names to factories.

use super::{Step, StepCopyPackage, StepCreateDirectory, StepRemovePackageFiles};
use crate::errors::InstallflowError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Factory function type for creating steps.
pub type StepFactory = Box<dyn Fn() -> Box<dyn Step> + Send + Sync>;

/// Registry of step factories, keyed by step name.
///
/// Backends register their own steps (unzip, signature checks, database
/// writers, ...) next to the built-in filesystem steps. Each lookup builds a
/// fresh step, so no step instance is ever shared between two runs.
#[derive(Default)]
pub struct StepRegistry {
    factories: RwLock<HashMap<String, StepFactory>>,
}

impl StepRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in filesystem steps.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(StepCreateDirectory::NAME, || {
            Box::new(StepCreateDirectory::new())
        });
        registry.register(StepCopyPackage::NAME, || Box::new(StepCopyPackage::new()));
        registry.register(StepRemovePackageFiles::NAME, || {
            Box::new(StepRemovePackageFiles::new())
        });
        registry
    }

    /// Registers a factory, replacing any factory with the same name.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Step> + Send + Sync + 'static,
    {
        self.factories.write().insert(name.into(), Box::new(factory));
    }

    /// Returns true if a factory is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Builds a fresh step.
    ///
    /// # Errors
    ///
    /// Returns [`InstallflowError::UnknownStep`] if nothing is registered
    /// under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Step>, InstallflowError> {
        let factories = self.factories.read();
        let factory = factories.get(name).ok_or_else(|| InstallflowError::UnknownStep {
            name: name.to_string(),
        })?;
        Ok(factory())
    }

    /// Lists registered step names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("names", &self.names())
            .finish()
    }
}
