//! Plugin Export Surface (SPI)
//!
//! Shared between the host and plugin libraries. A plugin exposes a single
//! well-known entrypoint returning a [`PluginExports`] value: plugin metadata
//! plus a function producing the plugin's service registrations. Each
//! registration stands in for one discoverable concrete type: the contracts
//! it satisfies, its visibility, and an optional factory (absence of a
//! factory models a type without a public constructor).
//!
//! This surface intentionally keeps the ABI small: metadata, contract keys
//! and a registration-producing function pointer.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::PluginResult;

/// A type-erased service instance produced by activation
pub type BoxedService = Box<dyn Any + Send + Sync>;

/// Factory function attached to a constructible registration
pub type FactoryFn = fn(&ActivationArgs) -> PluginResult<BoxedService>;

/// Well-known entrypoint symbol every plugin library exports
pub const PLUGIN_ENTRYPOINT: &str = "facility_plugin_exports";

/// Plugin metadata derived from the library's own declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name (unique identifier, normally the library stem)
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Human-readable description
    pub description: String,

    /// Copyright notice
    pub copyright: Option<String>,

    /// Plugin website or repository URL
    pub url: Option<String>,
}

impl PluginInfo {
    /// Create plugin info with the mandatory fields
    pub fn new<S: Into<String>>(name: S, version: S) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            copyright: None,
            url: None,
        }
    }

    /// Set the description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Set the copyright notice
    pub fn with_copyright<S: Into<String>>(mut self, copyright: S) -> Self {
        self.copyright = Some(copyright.into());
        self
    }

    /// Set the plugin URL
    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Registration visibility, gating discovery of non-public services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Internal,
}

/// Identity of a contract used as the discovery key when scanning.
///
/// Generic contracts distinguish the open definition (`Contract<>`, no type
/// argument) from closed constructions (`Contract<String>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractKey {
    name: String,
    type_arg: Option<String>,
    generic: bool,
}

impl ContractKey {
    /// A non-generic contract
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), type_arg: None, generic: false }
    }

    /// An open generic contract definition
    pub fn open_generic<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), type_arg: None, generic: true }
    }

    /// A closed generic contract construction
    pub fn closed_generic<S: Into<String>>(name: S, type_arg: S) -> Self {
        Self { name: name.into(), type_arg: Some(type_arg.into()), generic: true }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_arg(&self) -> Option<&str> {
        self.type_arg.as_deref()
    }

    pub fn is_generic(&self) -> bool {
        self.generic
    }

    /// True for an open generic definition
    pub fn is_open(&self) -> bool {
        self.generic && self.type_arg.is_none()
    }

    /// True for a closed generic construction
    pub fn is_closed(&self) -> bool {
        self.generic && self.type_arg.is_some()
    }

    /// The open definition of a closed construction
    pub fn open_definition(&self) -> Option<ContractKey> {
        if self.is_closed() {
            Some(ContractKey::open_generic(self.name.clone()))
        } else {
            None
        }
    }

    /// Close an open definition with a concrete type argument
    pub fn close_with<S: Into<String>>(&self, type_arg: S) -> ContractKey {
        ContractKey {
            name: self.name.clone(),
            type_arg: Some(type_arg.into()),
            generic: true,
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.generic, &self.type_arg) {
            (false, _) => write!(f, "{}", self.name),
            (true, None) => write!(f, "{}<>", self.name),
            (true, Some(arg)) => write!(f, "{}<{}>", self.name, arg),
        }
    }
}

/// Positional constructor arguments passed through the activation seam
#[derive(Default)]
pub struct ActivationArgs {
    args: Vec<BoxedService>,
}

impl ActivationArgs {
    /// No constructor arguments
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(args: Vec<BoxedService>) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BoxedService> {
        self.args.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoxedService> {
        self.args.iter()
    }
}

impl fmt::Debug for ActivationArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationArgs").field("len", &self.args.len()).finish()
    }
}

/// One discoverable service implementation exported by a plugin
#[derive(Debug, Clone)]
pub struct ServiceRegistration {
    /// Fully qualified implementation path (e.g. `my_plugin::AlphaTask`)
    pub impl_name: String,

    /// Contracts this implementation satisfies (interfaces + base types)
    pub contracts: Vec<ContractKey>,

    /// Discovery visibility
    pub visibility: Visibility,

    /// Whether the implementation itself is an open generic template
    pub open_generic: bool,

    /// Factory producing instances; `None` models a type that cannot be
    /// constructed (abstract, or no public constructor)
    pub factory: Option<FactoryFn>,
}

impl ServiceRegistration {
    /// A public, concrete, constructible registration
    pub fn new<S: Into<String>>(impl_name: S, contracts: Vec<ContractKey>, factory: FactoryFn) -> Self {
        Self {
            impl_name: impl_name.into(),
            contracts,
            visibility: Visibility::Public,
            open_generic: false,
            factory: Some(factory),
        }
    }

    /// A registration without a usable constructor
    pub fn non_constructible<S: Into<String>>(impl_name: S, contracts: Vec<ContractKey>) -> Self {
        Self {
            impl_name: impl_name.into(),
            contracts,
            visibility: Visibility::Public,
            open_generic: false,
            factory: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark the implementation as an open generic template
    pub fn as_open_generic(mut self) -> Self {
        self.open_generic = true;
        self
    }

    pub fn is_constructible(&self) -> bool {
        self.factory.is_some()
    }

    /// Full assignable-contract set: every closed generic member also
    /// contributes its open definition, so an implementation of
    /// `Contract<String>` is discoverable via a scan for open `Contract<>`.
    pub fn expanded_contracts(&self) -> Vec<ContractKey> {
        let mut expanded = self.contracts.clone();
        for contract in &self.contracts {
            if let Some(open) = contract.open_definition() {
                if !expanded.contains(&open) {
                    expanded.push(open);
                }
            }
        }
        expanded
    }

    /// Whether this registration is assignable to the requested contract
    pub fn satisfies(&self, request: &ContractKey) -> bool {
        self.expanded_contracts().contains(request)
    }
}

/// The export table a plugin library hands to the host
#[derive(Debug, Clone)]
pub struct PluginExports {
    info: PluginInfo,
    registrations: fn() -> Vec<ServiceRegistration>,
}

impl PluginExports {
    pub fn new(info: PluginInfo, registrations: fn() -> Vec<ServiceRegistration>) -> Self {
        Self { info, registrations }
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Produce the plugin's current registration set
    pub fn registrations(&self) -> Vec<ServiceRegistration> {
        (self.registrations)()
    }
}

/// Raw entrypoint signature resolved from a plugin library
#[allow(improper_ctypes_definitions)]
pub type PluginExportsFn = unsafe extern "C" fn() -> *mut PluginExports;

/// Host-side helper: reclaim ownership of the exports handed over by the
/// entrypoint.
///
/// # Safety
/// `ptr` must be a non-null pointer produced by [`leak_exports`] inside the
/// same plugin library, handed over exactly once.
pub unsafe fn exports_from_raw(ptr: *mut PluginExports) -> Box<PluginExports> {
    Box::from_raw(ptr)
}

/// Plugin-side helper: hand exports ownership across the entrypoint
pub fn leak_exports(exports: PluginExports) -> *mut PluginExports {
    Box::into_raw(Box::new(exports))
}

/// Declare the well-known plugin entrypoint for a plugin library.
///
/// The expression is evaluated on every call and must produce a
/// [`PluginExports`] value.
#[macro_export]
macro_rules! declare_plugin {
    ($exports:expr) => {
        #[no_mangle]
        pub unsafe extern "C" fn facility_plugin_exports(
        ) -> *mut $crate::plugin::exports::PluginExports {
            $crate::plugin::exports::leak_exports($exports)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_factory(_args: &ActivationArgs) -> PluginResult<BoxedService> {
        Ok(Box::new(()))
    }

    #[test]
    fn test_contract_key_forms() {
        let plain = ContractKey::new("StartupTask");
        assert!(!plain.is_generic());
        assert_eq!(plain.to_string(), "StartupTask");

        let open = ContractKey::open_generic("Contract");
        assert!(open.is_open());
        assert!(!open.is_closed());
        assert_eq!(open.to_string(), "Contract<>");

        let closed = ContractKey::closed_generic("Contract", "String");
        assert!(closed.is_closed());
        assert_eq!(closed.to_string(), "Contract<String>");
        assert_eq!(closed.open_definition(), Some(open.clone()));
        assert_eq!(open.close_with("String"), closed);
    }

    #[test]
    fn test_expanded_contracts_include_open_definitions() {
        let registration = ServiceRegistration::new(
            "demo::ContractImplString",
            vec![ContractKey::closed_generic("Contract", "String")],
            noop_factory,
        );

        let expanded = registration.expanded_contracts();
        assert!(expanded.contains(&ContractKey::closed_generic("Contract", "String")));
        assert!(expanded.contains(&ContractKey::open_generic("Contract")));
    }

    #[test]
    fn test_satisfies_requested_contract() {
        let registration = ServiceRegistration::new(
            "demo::AlphaTask",
            vec![ContractKey::new("StartupTask")],
            noop_factory,
        );

        assert!(registration.satisfies(&ContractKey::new("StartupTask")));
        assert!(!registration.satisfies(&ContractKey::new("ShutdownTask")));
    }

    #[test]
    fn test_non_constructible_registration() {
        let registration = ServiceRegistration::non_constructible(
            "demo::AbstractTask",
            vec![ContractKey::new("StartupTask")],
        );
        assert!(!registration.is_constructible());
    }

    #[test]
    fn test_exports_round_trip_through_raw() {
        fn registrations() -> Vec<ServiceRegistration> {
            vec![ServiceRegistration::new(
                "demo::AlphaTask",
                vec![ContractKey::new("StartupTask")],
                noop_factory,
            )]
        }

        let exports = PluginExports::new(PluginInfo::new("demo", "1.0.0"), registrations);
        let ptr = leak_exports(exports);
        let exports = unsafe { exports_from_raw(ptr) };
        assert_eq!(exports.info().name, "demo");
        assert_eq!(exports.registrations().len(), 1);
    }
}
