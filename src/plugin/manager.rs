//! Plugin Manager
//!
//! Aggregation root for the plugin engine. Owns the lazily-materialized,
//! immutable-once-materialized set of loaded plugins, aggregates service
//! queries across them in load order, and supports construction from a
//! parent manager so a host can swap options without reloading plugins that
//! are already running.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::OnceLock;

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::config::PluginOptions;

use super::activation::Activator;
use super::error::{PluginError, PluginResult};
use super::exports::{BoxedService, ContractKey, PluginExports};
use super::instance::Plugin;
use super::loader::{dylib_file_name, PluginLoader};
use super::service::{PluginService, PluginServiceCollection};

/// Owns the loaded plugin set and aggregates service queries across it.
///
/// State machine per instance: `Unloaded` (plugins lazy, untouched) to
/// `Loaded` (first access to [`plugins`](Self::plugins) or an explicit
/// [`load_plugins`](Self::load_plugins) call). The transition is one-way;
/// reconfiguration requires a new manager, optionally built
/// [`from_parent`](Self::from_parent).
pub struct PluginManager {
    options: PluginOptions,
    activator: Arc<dyn Activator>,
    static_sources: Vec<(String, PluginExports)>,
    inherited: Vec<Arc<Plugin>>,
    plugins: OnceLock<Vec<Arc<Plugin>>>,
}

impl PluginManager {
    pub fn new(options: PluginOptions, activator: Arc<dyn Activator>) -> Self {
        Self {
            options,
            activator,
            static_sources: Vec::new(),
            inherited: Vec::new(),
            plugins: OnceLock::new(),
        }
    }

    /// Build a manager from a parent whose plugins may already be loaded.
    ///
    /// Already-materialized plugins are reused (same loader, new activator);
    /// only plugins newly present in `options` load on materialization. The
    /// parent's static sources carry over so newly-enabled built-ins can
    /// still resolve.
    pub fn from_parent(
        options: PluginOptions,
        activator: Arc<dyn Activator>,
        parent: &PluginManager,
    ) -> Self {
        let inherited = match parent.plugins.get() {
            Some(plugins) => plugins
                .iter()
                .map(|plugin| {
                    Arc::new(plugin.rebind(Arc::clone(&activator), options.resolve_private_types))
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            options,
            activator,
            static_sources: parent.static_sources.clone(),
            inherited,
            plugins: OnceLock::new(),
        }
    }

    /// Register an in-process export table under its declared plugin name.
    /// Configured assembly or directory entries matching that name resolve
    /// to this table instead of a library on disk (built-in plugins).
    ///
    /// Registration after materialization is a precondition violation.
    pub fn register_static_plugin(&mut self, exports: PluginExports) -> PluginResult<()> {
        if self.is_loaded() {
            return Err(PluginError::invalid_argument(
                "static plugins must be registered before plugins are loaded",
            ));
        }
        let name = exports.info().name.clone();
        if name.is_empty() {
            return Err(PluginError::invalid_argument("static plugin name must not be empty"));
        }
        if self.static_sources.iter().any(|(existing, _)| *existing == name) {
            return Err(PluginError::invalid_argument(format!(
                "static plugin '{}' is already registered",
                name
            )));
        }
        self.static_sources.push((name, exports));
        Ok(())
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Whether the plugin set has been materialized
    pub fn is_loaded(&self) -> bool {
        self.plugins.get().is_some()
    }

    /// Force eager materialization of the plugin set
    pub fn load_plugins(&self) -> &[Arc<Plugin>] {
        self.plugins()
    }

    /// The loaded plugin set, materialized exactly once on first access.
    /// Order: inherited plugins, then configured assemblies, then plugin
    /// directories, each in configured order.
    pub fn plugins(&self) -> &[Arc<Plugin>] {
        self.plugins.get_or_init(|| self.materialize())
    }

    /// Query every plugin for services of `contract`, collecting every
    /// successfully activated (plugin, instance) pair in plugin-load order
    pub fn get_services(
        &self,
        contract: &ContractKey,
    ) -> PluginResult<PluginServiceCollection<BoxedService>> {
        let mut collection = PluginServiceCollection::new();
        for plugin in self.plugins() {
            for instance in plugin.get_services(contract)? {
                collection.push(PluginService::new(instance, Arc::clone(plugin)));
            }
        }
        Ok(collection)
    }

    /// Query every plugin for a single service of `contract`; the last
    /// plugin in load order providing a match wins
    pub fn get_service(
        &self,
        contract: &ContractKey,
    ) -> PluginResult<Option<PluginService<BoxedService>>> {
        let mut result = None;
        for plugin in self.plugins() {
            if let Some(instance) = plugin.get_service(contract)? {
                result = Some(PluginService::new(instance, Arc::clone(plugin)));
            }
        }
        Ok(result)
    }

    fn materialize(&self) -> Vec<Arc<Plugin>> {
        let mut loaded_names: HashSet<String> = HashSet::new();
        let mut plugins: Vec<Arc<Plugin>> = Vec::new();

        for plugin in &self.inherited {
            if !self.options.is_enabled(plugin.name()) {
                debug!("plugin '{}' disabled, dropping from this generation", plugin.name());
                continue;
            }
            if !loaded_names.insert(plugin.name().to_string()) {
                continue;
            }
            plugins.push(Arc::clone(plugin));
        }

        for configured in &self.options.assemblies {
            self.load_assembly_entry(configured, &mut loaded_names, &mut plugins);
        }
        for configured in &self.options.directories {
            self.load_directory_entry(configured, &mut loaded_names, &mut plugins);
        }

        info!("plugin manager loaded {} plugins", plugins.len());
        plugins
    }

    fn load_assembly_entry(
        &self,
        configured: &Path,
        loaded_names: &mut HashSet<String>,
        plugins: &mut Vec<Arc<Plugin>>,
    ) {
        let mut path = self.options.resolve_path(configured);
        let stem = match path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => {
                warn!("invalid plugin assembly path: {}", path.display());
                return;
            }
        };
        // Extension-less entries use the platform library name
        if path.extension().is_none() {
            path.set_file_name(dylib_file_name(&stem));
        }
        self.load_one(&stem, &path, loaded_names, plugins);
    }

    fn load_directory_entry(
        &self,
        configured: &Path,
        loaded_names: &mut HashSet<String>,
        plugins: &mut Vec<Arc<Plugin>>,
    ) {
        let dir = self.options.resolve_path(configured);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("cannot read plugin directory {}: {}", dir.display(), err);
                return;
            }
        };

        // One level only; each sub-directory is expected to contain a
        // same-named library. Sorted for deterministic load order.
        let mut subdirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        subdirs.sort();

        for subdir in subdirs {
            let name = match subdir.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            let candidate = subdir.join(dylib_file_name(&name));
            self.load_one(&name, &candidate, loaded_names, plugins);
        }
    }

    fn load_one(
        &self,
        name: &str,
        path: &Path,
        loaded_names: &mut HashSet<String>,
        plugins: &mut Vec<Arc<Plugin>>,
    ) {
        if loaded_names.contains(name) {
            debug!("plugin '{}' already loaded, skipping", name);
            return;
        }
        if !self.options.is_enabled(name) {
            debug!("plugin '{}' is disabled", name);
            return;
        }

        let loader = if let Some(exports) = self.static_source(name) {
            PluginLoader::from_static(name, exports.clone())
        } else {
            if !path.exists() {
                warn!("plugin assembly not found: {}", path.display());
                return;
            }
            match PluginLoader::from_library(path) {
                Ok(loader) => loader,
                Err(err) => {
                    warn!("failed to load plugin {}: {}", path.display(), err);
                    return;
                }
            }
        };

        loaded_names.insert(name.to_string());
        plugins.push(Arc::new(Plugin::new(
            Arc::new(loader),
            Arc::clone(&self.activator),
            self.options.resolve_private_types,
        )));
    }

    fn static_source(&self, name: &str) -> Option<&PluginExports> {
        self.static_sources
            .iter()
            .find(|(source_name, _)| source_name == name)
            .map(|(_, exports)| exports)
    }
}

/// Explicit composition-root replacement for a process-wide manager
/// singleton. Holds the current manager generation behind a lock so
/// reconfiguration never exposes an inconsistent parent/child pair.
pub struct PluginHost {
    manager: RwLock<Arc<PluginManager>>,
}

impl PluginHost {
    pub fn new(manager: PluginManager) -> Self {
        Self { manager: RwLock::new(Arc::new(manager)) }
    }

    /// Snapshot of the current manager generation
    pub fn manager(&self) -> Arc<PluginManager> {
        Arc::clone(&self.manager.read())
    }

    /// Replace the current manager with a generation built from it, reusing
    /// already-loaded plugins and loading only newly-configured ones
    pub fn reconfigure(
        &self,
        options: PluginOptions,
        activator: Arc<dyn Activator>,
    ) -> Arc<PluginManager> {
        let mut slot = self.manager.write();
        let next = Arc::new(PluginManager::from_parent(options, activator, &slot));
        *slot = Arc::clone(&next);
        next
    }
}
