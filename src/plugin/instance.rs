//! Plugin
//!
//! Wraps one isolated-loaded plugin and answers service queries against the
//! plugin's own export table, activating matches through the injected
//! activator. Queries never reach across into other plugins; the manager
//! handles aggregation.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::warn;

use super::activation::Activator;
use super::error::PluginResult;
use super::exports::{ActivationArgs, BoxedService, ContractKey, PluginInfo, ServiceRegistration};
use super::loader::{ContextualScope, PluginLoader};
use super::scanner::ExportScanner;

/// Contract names for which a plugin answers provider queries with itself
const PROVIDER_CONTRACTS: &[&str] = &["Plugin", "ServiceProvider"];

/// One loaded, isolated plugin
pub struct Plugin {
    loader: Arc<PluginLoader>,
    activator: Arc<dyn Activator>,
    resolve_private_types: bool,
}

impl Plugin {
    pub fn new(
        loader: Arc<PluginLoader>,
        activator: Arc<dyn Activator>,
        resolve_private_types: bool,
    ) -> Self {
        Self { loader, activator, resolve_private_types }
    }

    /// Rewrap the same loader with a different activator; used when a new
    /// manager generation is built from a parent's already-loaded plugins
    pub(crate) fn rebind(
        &self,
        activator: Arc<dyn Activator>,
        resolve_private_types: bool,
    ) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            activator,
            resolve_private_types,
        }
    }

    pub fn name(&self) -> &str {
        self.loader.name()
    }

    pub fn info(&self) -> &PluginInfo {
        self.loader.exports().info()
    }

    pub fn loader(&self) -> &Arc<PluginLoader> {
        &self.loader
    }

    /// Resolve a single service of `contract` from this plugin.
    ///
    /// All matching registrations are activated; the last successful
    /// activation wins (later discovery order overrides earlier). Individual
    /// activation failures are logged and skipped.
    pub fn get_service(&self, contract: &ContractKey) -> PluginResult<Option<BoxedService>> {
        let mut result = None;
        for registration in self.matching_registrations(contract)? {
            match self.activate(&registration) {
                Some(instance) => result = Some(instance),
                None => continue,
            }
        }
        Ok(result)
    }

    /// Resolve all services of `contract` from this plugin, in discovery
    /// order, skipping registrations that fail to activate
    pub fn get_services(&self, contract: &ContractKey) -> PluginResult<Vec<BoxedService>> {
        let mut services = Vec::new();
        for registration in self.matching_registrations(contract)? {
            if let Some(instance) = self.activate(&registration) {
                services.push(instance);
            }
        }
        Ok(services)
    }

    /// Whether this plugin can provide a service of `contract`. Provider
    /// query contracts always answer true.
    pub fn is_service(&self, contract: &ContractKey) -> PluginResult<bool> {
        if !contract.is_generic() && PROVIDER_CONTRACTS.contains(&contract.name()) {
            return Ok(true);
        }
        Ok(!self.matching_registrations(contract)?.is_empty())
    }

    /// Load a secondary library associated with this plugin through the same
    /// isolated load context
    pub fn load_assembly<P: AsRef<Path>>(&self, file_name: P) -> PluginResult<()> {
        self.loader.load_companion(file_name.as_ref())
    }

    /// Enter this plugin's contextual scope; the returned guard must be held
    /// for the duration and releases the scope on drop
    pub fn enter_contextual_scope(&self) -> ContextualScope {
        self.loader.enter_contextual_scope()
    }

    fn matching_registrations(
        &self,
        contract: &ContractKey,
    ) -> PluginResult<Vec<ServiceRegistration>> {
        let scanner = ExportScanner::new(contract.clone(), vec![self.loader.exports().clone()])?
            .include_private_types(self.resolve_private_types);
        Ok(scanner.scan())
    }

    fn activate(&self, registration: &ServiceRegistration) -> Option<BoxedService> {
        match self
            .activator
            .create_instance(registration, ActivationArgs::none())
        {
            Ok(instance) => Some(instance),
            Err(err) => {
                warn!(
                    "plugin '{}': failed to activate {}: {}",
                    self.name(),
                    registration.impl_name,
                    err
                );
                None
            }
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("version", &self.info().version)
            .field("resolve_private_types", &self.resolve_private_types)
            .finish()
    }
}
