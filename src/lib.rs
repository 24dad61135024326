//! facility-plugins
//!
//! Plugin discovery, activation and service-query engine for
//! dependency-injection hosts. Plugins are isolated dynamic libraries (or
//! in-process export tables for built-ins) that expose service registrations
//! keyed by contract. The host scans those registrations, activates matches
//! through an injected activator, and exposes the results as queryable
//! service collections.

pub mod config;
pub mod facility;
pub mod plugin;

pub use config::PluginOptions;
pub use facility::{Facility, FacilityExtension, FacilityResolver, ServiceLifetime, ServiceRegistry};
pub use plugin::activation::{Activator, ActivatorFn, DefaultActivator};
pub use plugin::error::{PluginError, PluginResult};
pub use plugin::exports::{
    ActivationArgs, BoxedService, ContractKey, PluginExports, PluginInfo, ServiceRegistration,
    Visibility,
};
pub use plugin::loader::{ContextualScope, PluginLoader};
pub use plugin::manager::{PluginHost, PluginManager};
pub use plugin::scanner::ExportScanner;
pub use plugin::service::{PluginService, PluginServiceCollection};
pub use plugin::Plugin;
