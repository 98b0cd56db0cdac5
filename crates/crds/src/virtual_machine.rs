//! VirtualMachine
//!
//! The stateful wrapper around a `VirtualMachineInstance` template. The
//! controller corrects the host devices of `spec.template.spec` so that
//! instances started from it already carry them.

use crate::{UnknownFields, VirtualMachineInstanceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "kubevirt.io",
    version = "v1",
    kind = "VirtualMachine",
    shortname = "vm",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineSpec {
    /// Template for the instances created from this VM
    #[serde(default)]
    pub template: VirtualMachineInstanceTemplateSpec,

    /// `running`, `runStrategy`, `dataVolumeTemplates`, ...
    #[serde(flatten)]
    pub extra: UnknownFields,
}

/// `spec.template`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineInstanceTemplateSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,

    #[serde(default)]
    pub spec: VirtualMachineInstanceSpec,
}
