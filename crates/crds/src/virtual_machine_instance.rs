//! VirtualMachineInstance
//!
//! A running (or about to run) KubeVirt guest. This is the kind the mutating
//! webhook receives.

use crate::{DomainSpec, HostDevice, UnknownFields, Volume};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "kubevirt.io",
    version = "v1",
    kind = "VirtualMachineInstance",
    shortname = "vmi",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineInstanceSpec {
    /// Guest domain (CPU, memory, devices)
    #[serde(default)]
    pub domain: DomainSpec,

    /// Volumes available to the domain
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,

    #[serde(flatten)]
    pub extra: UnknownFields,
}

impl VirtualMachineInstanceSpec {
    /// Host devices currently attached to the domain
    pub fn host_devices(&self) -> &[HostDevice] {
        &self.domain.devices.host_devices
    }

    /// Replace the host devices attached to the domain
    pub fn set_host_devices(&mut self, host_devices: Vec<HostDevice>) {
        self.domain.devices.host_devices = host_devices;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_unmodelled_fields() {
        let raw = serde_json::json!({
            "apiVersion": "kubevirt.io/v1",
            "kind": "VirtualMachineInstance",
            "metadata": {"name": "testvmi", "namespace": "default"},
            "spec": {
                "domain": {
                    "resources": {"requests": {"memory": "1Gi"}},
                    "devices": {
                        "disks": [{"name": "containerdisk", "disk": {"bus": "virtio"}}],
                        "hostDevices": [{"name": "gpu", "deviceName": "nvidia.com/T4"}]
                    }
                },
                "volumes": [
                    {"name": "containerdisk", "containerDisk": {"image": "quay.io/containerdisks/fedora"}},
                    {"name": "cloudinitdisk", "cloudInitNoCloud": {"userData": "#cloud-config\n", "networkData": "version: 2\n"}}
                ],
                "terminationGracePeriodSeconds": 0
            }
        });

        let vmi: VirtualMachineInstance = serde_json::from_value(raw.clone()).expect("valid VMI");
        assert_eq!(vmi.spec.host_devices().len(), 1);
        assert_eq!(vmi.spec.volumes.len(), 2);
        assert_eq!(
            vmi.spec.volumes[1].cloud_init_user_data().and_then(|s| s.user_data.as_deref()),
            Some("#cloud-config\n")
        );

        let serialized = serde_json::to_value(&vmi).expect("serializable");
        assert_eq!(serialized["spec"], raw["spec"]);
    }
}
