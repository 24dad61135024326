//! Service Activation
//!
//! The engine never constructs service instances directly; everything goes
//! through the [`Activator`] seam so hosts can substitute DI-container-backed
//! construction for the default factory invocation.

use super::error::{PluginError, PluginResult};
use super::exports::{ActivationArgs, BoxedService, ServiceRegistration};

/// Indirection seam used to construct instances of discovered registrations
pub trait Activator: Send + Sync {
    fn create_instance(
        &self,
        registration: &ServiceRegistration,
        args: ActivationArgs,
    ) -> PluginResult<BoxedService>;
}

/// Default activator: invokes the registration's own factory
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultActivator;

impl Activator for DefaultActivator {
    fn create_instance(
        &self,
        registration: &ServiceRegistration,
        args: ActivationArgs,
    ) -> PluginResult<BoxedService> {
        let factory = registration.factory.ok_or_else(|| {
            PluginError::activation_failed(format!(
                "{} has no public constructor",
                registration.impl_name
            ))
        })?;
        factory(&args)
    }
}

/// Closure-backed activator for container adapters and tests
pub struct ActivatorFn<F>(F);

impl<F> ActivatorFn<F>
where
    F: Fn(&ServiceRegistration, ActivationArgs) -> PluginResult<BoxedService> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Activator for ActivatorFn<F>
where
    F: Fn(&ServiceRegistration, ActivationArgs) -> PluginResult<BoxedService> + Send + Sync,
{
    fn create_instance(
        &self,
        registration: &ServiceRegistration,
        args: ActivationArgs,
    ) -> PluginResult<BoxedService> {
        (self.0)(registration, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::exports::ContractKey;

    fn answer_factory(_args: &ActivationArgs) -> PluginResult<BoxedService> {
        Ok(Box::new(42u32))
    }

    #[test]
    fn test_default_activator_invokes_factory() {
        let registration = ServiceRegistration::new(
            "demo::Answer",
            vec![ContractKey::new("Answer")],
            answer_factory,
        );

        let instance = DefaultActivator
            .create_instance(&registration, ActivationArgs::none())
            .unwrap();
        assert_eq!(*instance.downcast::<u32>().unwrap(), 42);
    }

    #[test]
    fn test_default_activator_rejects_non_constructible() {
        let registration = ServiceRegistration::non_constructible(
            "demo::Abstract",
            vec![ContractKey::new("Answer")],
        );

        let result = DefaultActivator.create_instance(&registration, ActivationArgs::none());
        assert!(matches!(result, Err(PluginError::ActivationFailed { .. })));
    }

    #[test]
    fn test_activator_fn_overrides_factory() {
        let registration = ServiceRegistration::new(
            "demo::Answer",
            vec![ContractKey::new("Answer")],
            answer_factory,
        );

        let activator = ActivatorFn::new(|_registration, _args| {
            Ok(Box::new(7u32) as BoxedService)
        });
        let instance = activator
            .create_instance(&registration, ActivationArgs::none())
            .unwrap();
        assert_eq!(*instance.downcast::<u32>().unwrap(), 7);
    }
}
