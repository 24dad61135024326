//! Plugin Configuration
//!
//! `PluginOptions` is populated once at host configuration time and treated
//! as read-only afterwards; reconfiguring a running host requires building a
//! new manager generation (see `PluginHost::reconfigure`).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::plugin::error::{PluginError, PluginResult};

/// Wildcard entry in `enabled` meaning "all plugins enabled by default"
pub const ENABLE_ALL: &str = "*";

/// Plugin engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PluginOptions {
    /// Include internal (non-public) registrations when scanning
    pub resolve_private_types: bool,

    /// Root for relative assembly and directory paths
    pub base_path: Option<PathBuf>,

    /// Plugin directories; each is expected to contain one sub-directory per
    /// plugin, holding a library named after the sub-directory
    pub directories: Vec<PathBuf>,

    /// Explicit plugin library paths
    pub assemblies: Vec<PathBuf>,

    /// Per-plugin enablement keyed by plugin name (the library file stem);
    /// supports an `ENABLE_ALL` wildcard entry
    pub enabled: HashMap<String, bool>,

    /// Deprecated exclusion list; still authoritative when present
    pub disabled: Vec<String>,
}

impl PluginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from TOML content
    pub fn from_toml_str(content: &str) -> PluginResult<Self> {
        let options: PluginOptions = toml::from_str(content)?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> PluginResult<Self> {
        let path = path.as_ref();
        debug!("loading plugin options from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            PluginError::configuration_error(format!(
                "failed to read options file {}: {}",
                path.display(),
                e
            ))
        })?;
        let options = Self::from_toml_str(&content)?;
        info!("loaded plugin options from {}", path.display());
        Ok(options)
    }

    /// Default per-user plugin directory
    pub fn default_plugin_directory() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("facility-plugins").join("plugins"))
    }

    /// Enablement policy, evaluated at load time:
    /// the deprecated `disabled` list always wins as an exclusion; otherwise
    /// an explicit `enabled` entry decides; otherwise the wildcard entry
    /// decides; with no `enabled` entries at all, everything is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        if self.disabled.iter().any(|disabled| disabled == name) {
            return false;
        }
        if self.enabled.is_empty() {
            return true;
        }
        if let Some(&explicit) = self.enabled.get(name) {
            return explicit;
        }
        self.enabled.get(ENABLE_ALL).copied().unwrap_or(false)
    }

    /// Resolve a configured path: absolute paths pass through, relative
    /// paths join `base_path` when set
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.base_path {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PluginOptions::new();
        assert!(!options.resolve_private_types);
        assert!(options.assemblies.is_empty());
        assert!(options.directories.is_empty());
        assert!(options.is_enabled("anything"));
    }

    #[test]
    fn test_from_toml() {
        let options = PluginOptions::from_toml_str(
            r#"
            resolve-private-types = true
            base-path = "/opt/app"
            assemblies = ["PluginA.dll", "plugins/PluginB.dll"]
            directories = ["plugins"]
            disabled = ["Legacy"]

            [enabled]
            "*" = true
            Experimental = false
            "#,
        )
        .unwrap();

        assert!(options.resolve_private_types);
        assert_eq!(options.base_path.as_deref(), Some(Path::new("/opt/app")));
        assert_eq!(options.assemblies.len(), 2);
        assert_eq!(options.directories.len(), 1);
        assert!(options.is_enabled("PluginA"));
        assert!(!options.is_enabled("Experimental"));
        assert!(!options.is_enabled("Legacy"));
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let result = PluginOptions::from_toml_str("assemblies = 42");
        assert!(matches!(result, Err(PluginError::ConfigurationError { .. })));
    }

    #[test]
    fn test_enablement_explicit_entries_without_wildcard() {
        let mut options = PluginOptions::new();
        options.enabled.insert("PluginA".to_string(), true);

        // Entries exist and neither an explicit entry nor a wildcard applies
        assert!(options.is_enabled("PluginA"));
        assert!(!options.is_enabled("PluginB"));
    }

    #[test]
    fn test_enablement_wildcard_default() {
        let mut options = PluginOptions::new();
        options.enabled.insert(ENABLE_ALL.to_string(), true);
        options.enabled.insert("PluginB".to_string(), false);

        assert!(options.is_enabled("PluginA"));
        assert!(!options.is_enabled("PluginB"));
    }

    #[test]
    fn test_disabled_list_always_wins() {
        let mut options = PluginOptions::new();
        options.enabled.insert("PluginA".to_string(), true);
        options.disabled.push("PluginA".to_string());

        assert!(!options.is_enabled("PluginA"));
    }

    #[test]
    fn test_resolve_path_with_base() {
        let mut options = PluginOptions::new();
        options.base_path = Some(PathBuf::from("/opt/app"));

        assert_eq!(
            options.resolve_path(Path::new("plugins/PluginA.dll")),
            PathBuf::from("/opt/app/plugins/PluginA.dll")
        );
        assert_eq!(
            options.resolve_path(Path::new("/abs/PluginA.dll")),
            PathBuf::from("/abs/PluginA.dll")
        );
    }
}
