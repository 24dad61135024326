//! Plugin Service Wrappers
//!
//! Call-scoped query results pairing a resolved instance with the plugin
//! that produced it. Collections are rebuilt fresh on every query; nothing
//! here caches across calls.

use std::any::Any;
use std::sync::Arc;

use super::exports::BoxedService;
use super::instance::Plugin;

/// A resolved service instance and its originating plugin
pub struct PluginService<T> {
    instance: T,
    plugin: Arc<Plugin>,
}

impl<T> PluginService<T> {
    pub fn new(instance: T, plugin: Arc<Plugin>) -> Self {
        Self { instance, plugin }
    }

    pub fn instance(&self) -> &T {
        &self.instance
    }

    pub fn plugin(&self) -> &Arc<Plugin> {
        &self.plugin
    }

    pub fn into_instance(self) -> T {
        self.instance
    }
}

impl<T> std::fmt::Debug for PluginService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginService")
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

impl PluginService<BoxedService> {
    /// Downcast the type-erased instance, preserving the plugin association.
    /// Returns the original service unchanged when the type does not match.
    pub fn downcast<T: Any + Send + Sync>(
        self,
    ) -> Result<PluginService<Box<T>>, PluginService<BoxedService>> {
        match self.instance.downcast::<T>() {
            Ok(instance) => Ok(PluginService { instance, plugin: self.plugin }),
            Err(instance) => Err(PluginService { instance, plugin: self.plugin }),
        }
    }
}

/// Ordered, restartable, finite sequence of resolved services
pub struct PluginServiceCollection<T> {
    services: Vec<PluginService<T>>,
}

impl<T> PluginServiceCollection<T> {
    pub fn new() -> Self {
        Self { services: Vec::new() }
    }

    pub fn push(&mut self, service: PluginService<T>) {
        self.services.push(service);
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PluginService<T>> {
        self.services.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PluginService<T>> {
        self.services.iter()
    }
}

impl<T> Default for PluginServiceCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntoIterator for PluginServiceCollection<T> {
    type Item = PluginService<T>;
    type IntoIter = std::vec::IntoIter<PluginService<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a PluginServiceCollection<T> {
    type Item = &'a PluginService<T>;
    type IntoIter = std::slice::Iter<'a, PluginService<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.iter()
    }
}

impl PluginServiceCollection<BoxedService> {
    /// Downcast every instance to `T`, dropping services of other types and
    /// preserving order
    pub fn downcast<T: Any + Send + Sync>(self) -> PluginServiceCollection<Box<T>> {
        let services = self
            .services
            .into_iter()
            .filter_map(|service| service.downcast::<T>().ok())
            .collect();
        PluginServiceCollection { services }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::activation::DefaultActivator;
    use crate::plugin::exports::{PluginExports, PluginInfo, ServiceRegistration};
    use crate::plugin::loader::PluginLoader;

    fn empty_registrations() -> Vec<ServiceRegistration> {
        Vec::new()
    }

    fn test_plugin(name: &str) -> Arc<Plugin> {
        let exports = PluginExports::new(PluginInfo::new(name, "1.0.0"), empty_registrations);
        Arc::new(Plugin::new(
            Arc::new(PluginLoader::from_static(name, exports)),
            Arc::new(DefaultActivator),
            false,
        ))
    }

    #[test]
    fn test_collection_preserves_order() {
        let plugin = test_plugin("order");
        let mut collection = PluginServiceCollection::new();
        for n in 0..3u32 {
            collection.push(PluginService::new(Box::new(n) as BoxedService, plugin.clone()));
        }

        assert_eq!(collection.len(), 3);
        let values: Vec<u32> = collection
            .into_iter()
            .map(|service| *service.into_instance().downcast::<u32>().unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn test_downcast_keeps_plugin_association() {
        let plugin = test_plugin("assoc");
        let service = PluginService::new(Box::new(11u32) as BoxedService, plugin.clone());

        let typed = service.downcast::<u32>().unwrap();
        assert_eq!(**typed.instance(), 11);
        assert_eq!(typed.plugin().name(), "assoc");
    }

    #[test]
    fn test_downcast_mismatch_returns_original() {
        let plugin = test_plugin("mismatch");
        let service = PluginService::new(Box::new("text".to_string()) as BoxedService, plugin);

        let result = service.downcast::<u32>();
        assert!(result.is_err());
        let original = result.err().unwrap();
        assert!(original.instance().downcast_ref::<String>().is_some());
    }

    #[test]
    fn test_collection_downcast_drops_mismatches() {
        let plugin = test_plugin("filter");
        let mut collection = PluginServiceCollection::new();
        collection.push(PluginService::new(Box::new(1u32) as BoxedService, plugin.clone()));
        collection.push(PluginService::new(
            Box::new("skip".to_string()) as BoxedService,
            plugin.clone(),
        ));
        collection.push(PluginService::new(Box::new(2u32) as BoxedService, plugin));

        let typed = collection.downcast::<u32>();
        assert_eq!(typed.len(), 2);
        assert_eq!(**typed.get(0).unwrap().instance(), 1);
        assert_eq!(**typed.get(1).unwrap().instance(), 2);
    }
}
