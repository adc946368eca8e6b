use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::backend::{DetectorFactory, DetectorOptions};
use super::Detector;

/// Registry of detector factories keyed by backend name.
pub struct DetectorRegistry {
    factories: HashMap<String, Arc<dyn DetectorFactory>>,
    default_name: Option<String>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a factory. The first registered factory becomes the default.
    pub fn register<F: DetectorFactory + 'static>(&mut self, factory: F) {
        let name = factory.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.factories.insert(name, Arc::new(factory));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.factories.contains_key(name) {
            return Err(anyhow!("detector backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DetectorFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn default_factory(&self) -> Option<Arc<dyn DetectorFactory>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends, sorted for stable output.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up a factory by name, or the default when `name` is `None`.
    pub fn select(&self, name: Option<&str>) -> Result<Arc<dyn DetectorFactory>> {
        match name {
            Some(name) => self.get(name).ok_or_else(|| {
                anyhow!(
                    "detector backend '{}' not registered (available: {})",
                    name,
                    self.list().join(", ")
                )
            }),
            None => self
                .default_factory()
                .ok_or_else(|| anyhow!("no detector backend registered")),
        }
    }

    /// Build an instance from the named backend.
    pub fn build(&self, name: Option<&str>, options: &DetectorOptions) -> Result<Box<dyn Detector>> {
        self.select(name)?.build(options)
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::ScriptedFactory;

    #[test]
    fn first_registered_is_default() {
        let mut registry = DetectorRegistry::new();
        registry.register(ScriptedFactory::empty());
        assert_eq!(registry.list(), vec!["stub".to_string()]);
        assert_eq!(registry.select(None).unwrap().name(), "stub");
        assert!(registry.select(Some("tract")).is_err());
        assert!(registry.set_default("tract").is_err());
    }

    #[test]
    fn empty_registry_has_no_default() {
        let registry = DetectorRegistry::default();
        assert!(registry.select(None).is_err());
    }
}
