//! Volumes of a virtual machine instance.
//!
//! Only the cloud-init volume sources are modelled; every other source
//! (`containerDisk`, `persistentVolumeClaim`, ...) stays in `extra`.

use crate::{LocalObjectReference, UnknownFields};
use serde::{Deserialize, Serialize};

/// A named volume of a `VirtualMachineInstance`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Volume name, referenced by disks
    #[serde(default)]
    pub name: String,

    /// NoCloud cloud-init data source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_init_no_cloud: Option<CloudInitNoCloudSource>,

    /// ConfigDrive cloud-init data source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_init_config_drive: Option<CloudInitConfigDriveSource>,

    #[serde(flatten)]
    pub extra: UnknownFields,
}

impl Volume {
    /// The user data carried by this volume, if it is a cloud-init volume.
    ///
    /// NoCloud takes precedence when a (malformed) volume sets both.
    pub fn cloud_init_user_data(&self) -> Option<&UserDataSource> {
        self.cloud_init_no_cloud
            .as_ref()
            .map(|source| &source.user_data)
            .or_else(|| {
                self.cloud_init_config_drive
                    .as_ref()
                    .map(|source| &source.user_data)
            })
    }
}

/// The three ways KubeVirt accepts cloud-init user data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserDataSource {
    /// Secret holding the user data under `userdata` or `userData`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_secret_ref: Option<LocalObjectReference>,

    /// Base64 encoded user data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_base64: Option<String>,

    /// Inline user data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

/// `cloudInitNoCloud` volume source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudInitNoCloudSource {
    #[serde(flatten)]
    pub user_data: UserDataSource,

    /// Network data and other fields
    #[serde(flatten)]
    pub extra: UnknownFields,
}

/// `cloudInitConfigDrive` volume source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudInitConfigDriveSource {
    #[serde(flatten)]
    pub user_data: UserDataSource,

    /// Network data and other fields
    #[serde(flatten)]
    pub extra: UnknownFields,
}
