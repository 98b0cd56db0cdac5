//! Host devices attached to a virtual machine domain.
//!
//! `spec.domain.devices.hostDevices` lists the host resources (PCI devices
//! exposed through a device plugin) that KubeVirt passes through to the
//! guest.

use crate::UnknownFields;
use serde::{Deserialize, Serialize};

/// A host device assignment.
///
/// `name` identifies the entry inside the VM; `device_name` is the resource
/// name advertised by the device plugin (e.g. `xilinx.com/fpga-xilinx_u250`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostDevice {
    /// Name of the device inside the VM spec
    #[serde(default)]
    pub name: String,

    /// Resource name of the host device
    #[serde(default)]
    pub device_name: String,

    /// Remaining fields (e.g. `tag`), preserved as sent
    #[serde(flatten)]
    pub extra: UnknownFields,
}

impl HostDevice {
    /// Create a host device with just a name and a resource name.
    pub fn new(name: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device_name: device_name.into(),
            extra: UnknownFields::new(),
        }
    }
}

/// `spec.domain.devices`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Devices {
    /// Host devices passed through to the guest
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_devices: Vec<HostDevice>,

    #[serde(flatten)]
    pub extra: UnknownFields,
}

/// `spec.domain`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainSpec {
    /// Devices attached to the domain
    #[serde(default)]
    pub devices: Devices,

    #[serde(flatten)]
    pub extra: UnknownFields,
}
