//! Test utilities for unit testing the defaulter, webhook and reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::defaulter::Defaulter;
use cloud_init::MockSecretSource;
use crds::{
    CloudInitNoCloudSource, HostDevice, LocalObjectReference, UserDataSource,
    VirtualMachineInstanceSpec, Volume,
};
use std::sync::Arc;

/// Limit used by test defaulters
pub const TEST_MAX_DEVICES: u64 = 64;

/// Helper to create a defaulter backed by an in-memory Secret store
pub fn create_test_defaulter(secrets: MockSecretSource) -> Defaulter {
    Defaulter::new(Arc::new(secrets), TEST_MAX_DEVICES)
}

/// Helper to create a NoCloud volume with inline user data
pub fn inline_cloud_init_volume(user_data: &str) -> Volume {
    cloud_init_volume(UserDataSource {
        user_data: Some(user_data.to_string()),
        ..Default::default()
    })
}

/// Helper to create a NoCloud volume reading its user data from a Secret
pub fn secret_cloud_init_volume(secret_name: &str) -> Volume {
    cloud_init_volume(UserDataSource {
        user_data_secret_ref: Some(LocalObjectReference::new(secret_name)),
        ..Default::default()
    })
}

fn cloud_init_volume(source: UserDataSource) -> Volume {
    Volume {
        name: "cloudinitdisk".to_string(),
        cloud_init_no_cloud: Some(CloudInitNoCloudSource {
            user_data: source,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Helper to create an instance spec with the given devices and cloud-init volume
pub fn create_test_instance_spec(
    host_devices: Vec<HostDevice>,
    cloud_init: Option<Volume>,
) -> VirtualMachineInstanceSpec {
    let mut spec = VirtualMachineInstanceSpec {
        volumes: cloud_init.into_iter().collect(),
        ..Default::default()
    };
    spec.set_host_devices(host_devices);
    spec
}

/// `(name, deviceName)` pairs, for compact assertions
pub fn device_names(devices: &[HostDevice]) -> Vec<(&str, &str)> {
    devices
        .iter()
        .map(|device| (device.name.as_str(), device.device_name.as_str()))
        .collect()
}
