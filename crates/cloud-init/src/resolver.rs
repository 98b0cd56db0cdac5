//! Cloud-init user data resolution.
//!
//! The cloud-init volume of an instance is the first volume that carries a
//! `cloudInitNoCloud` or `cloudInitConfigDrive` source; KubeVirt feeds the
//! guest from that one only. Its user data comes from, in order of
//! precedence:
//!
//! 1. the Secret named by `userDataSecretRef` (key `userdata`, else `userData`),
//! 2. `userDataBase64`,
//! 3. inline `userData`.

use crate::error::ResolveError;
use crate::source::SecretSource;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crds::{UserDataSource, VirtualMachineInstanceSpec, Volume};
use k8s_openapi::api::core::v1::Secret;
use std::sync::Arc;
use tracing::debug;

/// Secret keys holding user data, in lookup order
pub const USER_DATA_KEYS: [&str; 2] = ["userdata", "userData"];

/// The volume cloud-init reads its data from, if any.
pub fn cloud_init_volume(spec: &VirtualMachineInstanceSpec) -> Option<&Volume> {
    spec.volumes
        .iter()
        .find(|volume| volume.cloud_init_user_data().is_some())
}

/// Resolves the user data of an instance spec.
pub struct CloudInitResolver {
    secrets: Arc<dyn SecretSource>,
}

impl std::fmt::Debug for CloudInitResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudInitResolver").finish_non_exhaustive()
    }
}

impl CloudInitResolver {
    /// Creates a resolver reading Secrets through `secrets`.
    pub fn new(secrets: Arc<dyn SecretSource>) -> Self {
        Self { secrets }
    }

    /// User data of the cloud-init volume of `spec`.
    ///
    /// `Ok(None)` when the spec has no cloud-init volume or the volume
    /// carries no user data. Secrets are looked up in `namespace`.
    pub async fn resolve_user_data(
        &self,
        namespace: &str,
        spec: &VirtualMachineInstanceSpec,
    ) -> Result<Option<String>, ResolveError> {
        let Some(volume) = cloud_init_volume(spec) else {
            debug!("No cloud-init volume in spec");
            return Ok(None);
        };
        let Some(source) = volume.cloud_init_user_data() else {
            return Ok(None);
        };

        debug!("Resolving user data from cloud-init volume {}", volume.name);
        self.read_source(namespace, source).await
    }

    async fn read_source(
        &self,
        namespace: &str,
        source: &UserDataSource,
    ) -> Result<Option<String>, ResolveError> {
        if let Some(secret_ref) = &source.user_data_secret_ref {
            let secret = self
                .secrets
                .get_secret(namespace, &secret_ref.name)
                .await?
                .ok_or_else(|| ResolveError::SecretNotFound {
                    namespace: namespace.to_string(),
                    name: secret_ref.name.clone(),
                })?;
            let bytes = user_data_from_secret(&secret).ok_or_else(|| {
                ResolveError::MissingUserDataKey {
                    namespace: namespace.to_string(),
                    name: secret_ref.name.clone(),
                }
            })?;
            return Ok(Some(String::from_utf8(bytes)?));
        }

        if let Some(encoded) = source.user_data_base64.as_deref().filter(|s| !s.is_empty()) {
            let bytes = STANDARD.decode(encoded.trim())?;
            return Ok(Some(String::from_utf8(bytes)?));
        }

        Ok(source.user_data.clone())
    }
}

/// Raw user data stored in a Secret, `data` before `stringData`.
fn user_data_from_secret(secret: &Secret) -> Option<Vec<u8>> {
    let from_data = secret.data.as_ref().and_then(|data| {
        USER_DATA_KEYS
            .iter()
            .find_map(|key| data.get(*key))
            .map(|value| value.0.clone())
    });
    from_data.or_else(|| {
        secret.string_data.as_ref().and_then(|data| {
            USER_DATA_KEYS
                .iter()
                .find_map(|key| data.get(*key))
                .map(|value| value.clone().into_bytes())
        })
    })
}
