//! Host device list reconciliation.
//!
//! Owned devices are rebuilt from scratch on every call: every entry that
//! follows the `inaccel<index>` convention is dropped and the declaration is
//! expanded again, one entry per unit of quantity, numbered globally from 0.
//! Foreign entries keep their relative order and come first.
//!
//! Shrinking a quantity therefore removes the surplus devices, and because
//! the declaration iterates in a stable order, reconciling an already
//! reconciled list returns it unchanged.

use crate::declaration::ResourceDeclaration;
use crate::naming::{owned_host_device, owned_index};
use crds::HostDevice;
use tracing::debug;

/// Owned devices a declaration asks for, in order.
pub fn desired_owned_devices(declaration: &ResourceDeclaration) -> Vec<HostDevice> {
    let mut devices = Vec::new();
    for (resource, quantity) in declaration.iter() {
        for _ in 0..quantity {
            let index = devices.len();
            devices.push(owned_host_device(resource, index));
        }
    }
    devices
}

/// Compute the device list that reflects `declaration` exactly.
///
/// Foreign devices of `current` are kept as they are, in order, followed by
/// the owned devices of [`desired_owned_devices`].
pub fn reconcile_host_devices(
    current: &[HostDevice],
    declaration: &ResourceDeclaration,
) -> Vec<HostDevice> {
    let (owned, foreign): (Vec<&HostDevice>, Vec<&HostDevice>) = current
        .iter()
        .partition(|device| owned_index(device).is_some());

    let desired = desired_owned_devices(declaration);
    debug!(
        foreign = foreign.len(),
        discarded = owned.len(),
        owned = desired.len(),
        "rebuilding host devices"
    );

    foreign.into_iter().cloned().chain(desired).collect()
}
