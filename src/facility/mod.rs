//! Facility Layer
//!
//! Turns facilities and facility extensions discovered via plugin scanning
//! into an ordered registration list a DI-container adapter can apply. The
//! container adapters themselves live outside this crate.

pub mod resolver;

pub use resolver::FacilityResolver;

use crate::plugin::exports::{ContractKey, ServiceRegistration};

/// Contract name plugins register facility implementations under
pub const FACILITY_CONTRACT: &str = "Facility";

/// Contract name plugins register facility extensions under
pub const FACILITY_EXTENSION_CONTRACT: &str = "FacilityExtension";

/// A registrar contributing service registrations to the hosting container
pub trait Facility: Send + Sync {
    /// Facility name, used to bind extensions
    fn name(&self) -> &str;

    /// Contribute registrations
    fn register(&self, services: &mut ServiceRegistry);
}

/// Supplementary registration contributor bound to a specific facility
pub trait FacilityExtension: Send + Sync {
    /// Name of the facility this extension supplements
    fn facility(&self) -> &str;

    /// Contribute registrations
    fn register(&self, services: &mut ServiceRegistry);
}

/// Requested lifetime for a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    Singleton,
    Scoped,
    Transient,
}

/// One container registration: contract, backing registration, lifetime
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub contract: ContractKey,
    pub registration: ServiceRegistration,
    pub lifetime: ServiceLifetime,
}

/// Ordered registration list produced by facility resolution
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: ServiceDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn contains_contract(&self, contract: &ContractKey) -> bool {
        self.descriptors
            .iter()
            .any(|descriptor| descriptor.contract == *contract)
    }
}
