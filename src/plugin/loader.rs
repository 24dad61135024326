//! Plugin Loader
//!
//! Owns the isolated load context for one plugin. The `Library` backend
//! wraps a dynamic library loaded through `libloading`, resolves the
//! well-known entrypoint and keeps the library (plus any companion
//! libraries) alive for its own lifetime; the `Static` backend wraps an
//! in-process export table used for built-in and test plugins.
//!
//! Loaders are never unloaded individually. Dropping the last manager
//! generation referencing a loader releases its libraries.

use std::cell::RefCell;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use libloading::Library;
use log::debug;
use parking_lot::Mutex;

use super::error::{PluginError, PluginResult};
use super::exports::{PluginExports, PluginExportsFn, exports_from_raw, PLUGIN_ENTRYPOINT};

const ENTRYPOINT_SYMBOL: &[u8] = b"facility_plugin_exports\0";

enum LoaderBackend {
    Library {
        // Kept alive for the loader's lifetime; factories in the exports
        // point into this library's code.
        _library: Library,
        companions: Mutex<Vec<Library>>,
    },
    Static,
}

/// Isolated load context for one plugin
pub struct PluginLoader {
    name: String,
    root: Option<PathBuf>,
    exports: PluginExports,
    backend: LoaderBackend,
}

impl PluginLoader {
    /// Load a plugin library from disk and resolve its export table
    pub fn from_library(path: &Path) -> PluginResult<Self> {
        let library = unsafe { Library::new(path) }.map_err(|e| {
            PluginError::loading_failed(format!("loading library {}: {}", path.display(), e))
        })?;

        let exports = {
            let entry: libloading::Symbol<'_, PluginExportsFn> =
                unsafe { library.get(ENTRYPOINT_SYMBOL) }.map_err(|e| {
                    PluginError::entrypoint_failed(format!(
                        "resolving symbol '{}' in {}: {}",
                        PLUGIN_ENTRYPOINT,
                        path.display(),
                        e
                    ))
                })?;
            let ptr = unsafe { entry() };
            if ptr.is_null() {
                return Err(PluginError::entrypoint_failed(format!(
                    "entrypoint '{}' returned null in {}",
                    PLUGIN_ENTRYPOINT,
                    path.display()
                )));
            }
            *unsafe { exports_from_raw(ptr) }
        };

        // Plugin identity follows the file stem, so enablement keys and the
        // manager's dedup set agree with the configured entry; the declared
        // metadata name stays in info()
        let name = file_stem(path);
        debug!("loaded plugin '{}' from {}", name, path.display());

        Ok(Self {
            name,
            root: path.parent().map(Path::to_path_buf),
            exports,
            backend: LoaderBackend::Library {
                _library: library,
                companions: Mutex::new(Vec::new()),
            },
        })
    }

    /// Wrap an in-process export table (built-in and test plugins)
    pub fn from_static<S: Into<String>>(name: S, exports: PluginExports) -> Self {
        Self {
            name: name.into(),
            root: None,
            exports,
            backend: LoaderBackend::Static,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exports(&self) -> &PluginExports {
        &self.exports
    }

    /// Directory the plugin library was loaded from, if any
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Load a secondary library associated with this plugin (e.g. a
    /// companion resources library) into the same load context
    pub fn load_companion(&self, file_name: &Path) -> PluginResult<()> {
        match &self.backend {
            LoaderBackend::Static => Err(PluginError::unsupported_operation(format!(
                "plugin '{}' is in-process and has no companion libraries",
                self.name
            ))),
            LoaderBackend::Library { companions, .. } => {
                let path = self.resolve_companion_path(file_name);
                if !path.exists() {
                    return Err(PluginError::loading_failed(format!(
                        "companion library not found: {}",
                        path.display()
                    )));
                }
                let library = unsafe { Library::new(&path) }.map_err(|e| {
                    PluginError::loading_failed(format!(
                        "loading companion {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                companions.lock().push(library);
                debug!("loaded companion {} for plugin '{}'", path.display(), self.name);
                Ok(())
            }
        }
    }

    fn resolve_companion_path(&self, file_name: &Path) -> PathBuf {
        if file_name.is_absolute() {
            return file_name.to_path_buf();
        }
        if let Some(root) = contextual_root() {
            return root.join(file_name);
        }
        match &self.root {
            Some(root) => root.join(file_name),
            None => file_name.to_path_buf(),
        }
    }

    /// Enter this plugin's contextual scope. While the returned guard is
    /// held, ambient relative library resolution on this thread targets the
    /// plugin's own directory. The guard restores the previous scope on
    /// every exit path.
    pub fn enter_contextual_scope(&self) -> ContextualScope {
        CONTEXTUAL_SCOPES.with(|scopes| {
            scopes.borrow_mut().push(ScopeEntry {
                plugin: self.name.clone(),
                root: self.root.clone(),
            })
        });
        ContextualScope { _not_send: PhantomData }
    }
}

impl fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLoader")
            .field("name", &self.name)
            .field("root", &self.root)
            .field(
                "backend",
                &match self.backend {
                    LoaderBackend::Library { .. } => "library",
                    LoaderBackend::Static => "static",
                },
            )
            .finish()
    }
}

struct ScopeEntry {
    plugin: String,
    root: Option<PathBuf>,
}

thread_local! {
    static CONTEXTUAL_SCOPES: RefCell<Vec<ScopeEntry>> = const { RefCell::new(Vec::new()) };
}

/// Scoped token for contextual resolution; pops its scope on drop
pub struct ContextualScope {
    // Scopes are a per-thread stack; the guard must not cross threads.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextualScope {
    fn drop(&mut self) {
        CONTEXTUAL_SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

/// Name of the plugin whose contextual scope is active on this thread
pub fn contextual_plugin() -> Option<String> {
    CONTEXTUAL_SCOPES.with(|scopes| scopes.borrow().last().map(|entry| entry.plugin.clone()))
}

fn contextual_root() -> Option<PathBuf> {
    CONTEXTUAL_SCOPES.with(|scopes| scopes.borrow().last().and_then(|entry| entry.root.clone()))
}

/// Platform dynamic-library file name for a plugin stem
pub fn dylib_file_name(stem: &str) -> String {
    format!("{}{}{}", DLL_PREFIX, stem, DLL_SUFFIX)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
