//! Facility Resolver
//!
//! Queries the plugin manager for facility and facility-extension services
//! and lets each contribute container registrations. Also registers scanned
//! contract implementations directly, applying the closed-generic
//! re-derivation policy.

use std::sync::Arc;

use log::{debug, warn};

use crate::plugin::error::PluginResult;
use crate::plugin::exports::ContractKey;
use crate::plugin::manager::PluginManager;
use crate::plugin::scanner::{resolve_contract, ExportScanner};

use super::{
    Facility, FacilityExtension, ServiceDescriptor, ServiceLifetime, ServiceRegistry,
    FACILITY_CONTRACT, FACILITY_EXTENSION_CONTRACT,
};

/// Resolves facilities discovered through the plugin engine into an ordered
/// registration list
pub struct FacilityResolver {
    manager: Arc<PluginManager>,
}

impl FacilityResolver {
    pub fn new(manager: Arc<PluginManager>) -> Self {
        Self { manager }
    }

    /// Apply every discovered facility, then every extension whose facility
    /// was present. Extensions for unknown facilities are skipped with a
    /// warning.
    pub fn resolve(&self) -> PluginResult<ServiceRegistry> {
        let mut registry = ServiceRegistry::new();
        let mut facility_names: Vec<String> = Vec::new();

        let facilities = self
            .manager
            .get_services(&ContractKey::new(FACILITY_CONTRACT))?;
        for service in facilities {
            let plugin_name = service.plugin().name().to_string();
            match service.downcast::<Box<dyn Facility>>() {
                Ok(facility) => {
                    debug!(
                        "applying facility '{}' from plugin '{}'",
                        facility.instance().name(),
                        plugin_name
                    );
                    facility_names.push(facility.instance().name().to_string());
                    facility.instance().register(&mut registry);
                }
                Err(_) => {
                    warn!(
                        "plugin '{}' exported a facility service of an unexpected type",
                        plugin_name
                    );
                }
            }
        }

        let extensions = self
            .manager
            .get_services(&ContractKey::new(FACILITY_EXTENSION_CONTRACT))?;
        for service in extensions {
            let plugin_name = service.plugin().name().to_string();
            match service.downcast::<Box<dyn FacilityExtension>>() {
                Ok(extension) => {
                    let target = extension.instance().facility().to_string();
                    if facility_names.iter().any(|name| *name == target) {
                        extension.instance().register(&mut registry);
                    } else {
                        warn!(
                            "skipping extension for unknown facility '{}' from plugin '{}'",
                            target, plugin_name
                        );
                    }
                }
                Err(_) => {
                    warn!(
                        "plugin '{}' exported a facility extension of an unexpected type",
                        plugin_name
                    );
                }
            }
        }

        Ok(registry)
    }

    /// Scan every loaded plugin for implementations of `contract` and add a
    /// registration per match. An open generic contract matched by a closed
    /// implementation registers under the closed contract the implementation
    /// actually declares. Returns the number of registrations added.
    pub fn register_scanned(
        &self,
        registry: &mut ServiceRegistry,
        contract: &ContractKey,
        lifetime: ServiceLifetime,
    ) -> PluginResult<usize> {
        let mut added = 0;
        for plugin in self.manager.plugins() {
            let scanner =
                ExportScanner::new(contract.clone(), vec![plugin.loader().exports().clone()])?
                    .include_private_types(self.manager.options().resolve_private_types);
            for registration in scanner.scan() {
                if let Some(resolved) = resolve_contract(contract, &registration) {
                    registry.add(ServiceDescriptor {
                        contract: resolved,
                        registration,
                        lifetime,
                    });
                    added += 1;
                }
            }
        }
        Ok(added)
    }
}
