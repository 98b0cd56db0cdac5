//! Accelerator defaulting for instance specs.
//!
//! Glues the cloud-init resolver to the host-device reconciler. The spec is
//! only written once the whole declaration has been parsed and validated, so
//! a failure never leaves a half-updated device list behind.

use crate::error::ControllerError;
use cloud_init::{CloudInitResolver, SecretSource};
use crds::VirtualMachineInstanceSpec;
use host_devices::{reconcile_host_devices, ResourceDeclaration};
use std::sync::Arc;
use tracing::{debug, info};

/// Applies the `inaccel` declaration of an instance's cloud-init user data
/// to its host devices.
#[derive(Debug)]
pub struct Defaulter {
    resolver: CloudInitResolver,
    max_devices: u64,
}

impl Defaulter {
    /// Creates a defaulter reading Secrets through `secrets`.
    pub fn new(secrets: Arc<dyn SecretSource>, max_devices: u64) -> Self {
        Self {
            resolver: CloudInitResolver::new(secrets),
            max_devices,
        }
    }

    /// Bring the host devices of `spec` in line with its declaration.
    ///
    /// Returns whether the spec changed. Without (or with blank) user data
    /// the spec is left exactly as it is.
    pub async fn default_instance_spec(
        &self,
        namespace: &str,
        spec: &mut VirtualMachineInstanceSpec,
    ) -> Result<bool, ControllerError> {
        let user_data = self.resolver.resolve_user_data(namespace, spec).await?;
        let Some(user_data) = user_data.filter(|data| !data.trim().is_empty()) else {
            debug!("No cloud-init user data in namespace {}, leaving host devices untouched", namespace);
            return Ok(false);
        };

        let declaration = ResourceDeclaration::from_user_data(&user_data)?;
        declaration.ensure_within(self.max_devices)?;
        if declaration.is_empty() {
            debug!("Cloud-init user data declares no accelerators");
        }

        let host_devices = reconcile_host_devices(spec.host_devices(), &declaration);
        if host_devices.as_slice() == spec.host_devices() {
            debug!("Host devices already match the accelerator declaration");
            return Ok(false);
        }

        info!(
            "Setting {} host devices ({} accelerators of {} resources declared)",
            host_devices.len(),
            declaration.total_devices(),
            declaration.len()
        );
        spec.set_host_devices(host_devices);
        Ok(true)
    }
}
