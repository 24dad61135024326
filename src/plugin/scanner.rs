//! Export Scanner
//!
//! Given a contract key and one or more plugin export tables, produces the
//! registrations that are concrete, constructible and assignable to the
//! contract, honoring open/closed generics, visibility and a replaceable
//! chain of type filters.

use log::trace;

use super::error::{PluginError, PluginResult};
use super::exports::{ContractKey, PluginExports, ServiceRegistration, Visibility};

/// Predicate applied to candidate registrations; a candidate is kept only
/// when every filter in the chain accepts it
pub type TypeFilter = Box<dyn Fn(&ServiceRegistration) -> bool + Send + Sync>;

/// Implementation-path prefixes excluded by the default filter chain, so a
/// scan never re-discovers framework-internal implementations
pub const FRAMEWORK_NAMESPACE_PREFIXES: &[&str] = &["std::", "core::", "alloc::"];

/// Scans plugin export tables for implementations of a contract
pub struct ExportScanner {
    contract: ContractKey,
    exports: Vec<PluginExports>,
    include_private_types: bool,
    filters: Vec<TypeFilter>,
}

impl ExportScanner {
    /// Create a scanner for `contract` over the given export tables.
    ///
    /// An empty contract name or an empty export set is a precondition
    /// violation.
    pub fn new(contract: ContractKey, exports: Vec<PluginExports>) -> PluginResult<Self> {
        if contract.name().trim().is_empty() {
            return Err(PluginError::invalid_argument("contract name must not be empty"));
        }
        if exports.is_empty() {
            return Err(PluginError::invalid_argument("at least one export table is required"));
        }

        Ok(Self {
            contract,
            exports,
            include_private_types: false,
            filters: default_filters(),
        })
    }

    /// Include internal (non-public) registrations in the scan
    pub fn include_private_types(mut self, include: bool) -> Self {
        self.include_private_types = include;
        self
    }

    /// Append a filter to the chain
    pub fn add_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ServiceRegistration) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    /// Remove all filters, including the default framework exclusions
    pub fn clear_filters(mut self) -> Self {
        self.filters.clear();
        self
    }

    /// Replace the entire filter chain
    pub fn set_filters(mut self, filters: Vec<TypeFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn contract(&self) -> &ContractKey {
        &self.contract
    }

    /// Scan all export tables, in order, for matching registrations
    pub fn scan(&self) -> Vec<ServiceRegistration> {
        let mut matches = Vec::new();
        for table in &self.exports {
            for registration in table.registrations() {
                if self.is_candidate(&registration) {
                    trace!("scan match: {} for {}", registration.impl_name, self.contract);
                    matches.push(registration);
                }
            }
        }
        matches
    }

    fn is_candidate(&self, registration: &ServiceRegistration) -> bool {
        if !registration.is_constructible() {
            return false;
        }
        if registration.visibility == Visibility::Internal && !self.include_private_types {
            return false;
        }
        // An open generic template cannot be activated for a non-open request
        if registration.open_generic && !self.contract.is_open() {
            return false;
        }
        if !registration.satisfies(&self.contract) {
            return false;
        }
        self.filters.iter().all(|filter| filter(registration))
    }
}

fn default_filters() -> Vec<TypeFilter> {
    vec![Box::new(|registration: &ServiceRegistration| {
        !FRAMEWORK_NAMESPACE_PREFIXES
            .iter()
            .any(|prefix| registration.impl_name.starts_with(prefix))
    })]
}

/// Re-derive the contract a matched registration should be registered under.
///
/// An open generic request matched by a closed implementation registers under
/// the closed contract the implementation actually declares (e.g. an
/// implementation closing `Contract<String>` registers under
/// `Contract<String>`, not `Contract<>`). All other matches register under
/// the requested contract unchanged.
pub fn resolve_contract(
    requested: &ContractKey,
    registration: &ServiceRegistration,
) -> Option<ContractKey> {
    if !registration.satisfies(requested) {
        return None;
    }

    if requested.is_open() && !registration.open_generic {
        if let Some(closed) = registration
            .contracts
            .iter()
            .find(|contract| contract.is_closed() && contract.name() == requested.name())
        {
            return Some(closed.clone());
        }
    }

    Some(requested.clone())
}
