//! Plugin Engine
//!
//! Loads isolated plugin libraries, scans their export tables for service
//! registrations matching a contract, and activates instances through an
//! injected activator. The `PluginManager` aggregates service queries across
//! all loaded plugins and supports re-parenting when configuration changes
//! after plugins were already materialized.

pub mod activation;
pub mod error;
pub mod exports;
pub mod loader;
pub mod manager;
pub mod scanner;
pub mod service;

mod instance;

#[cfg(test)]
pub mod tests;

// Re-export core types for easier access
pub use activation::{Activator, ActivatorFn, DefaultActivator};
pub use error::{PluginError, PluginResult};
pub use exports::{
    ActivationArgs, BoxedService, ContractKey, FactoryFn, PluginExports, PluginInfo,
    ServiceRegistration, Visibility,
};
pub use instance::Plugin;
pub use loader::{ContextualScope, PluginLoader};
pub use manager::{PluginHost, PluginManager};
pub use scanner::ExportScanner;
pub use service::{PluginService, PluginServiceCollection};
