//! Kubernetes-backed Secret access

use crate::error::ResolveError;
use crate::source::SecretSource;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::debug;

/// Reads Secrets from the API server.
///
/// Reads go straight to the API server, never through a cache, so a Secret
/// created just before its VM is seen on the first admission.
#[derive(Clone)]
pub struct KubeSecretSource {
    client: Client,
}

impl KubeSecretSource {
    /// Create a source backed by `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl std::fmt::Debug for KubeSecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretSource").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl SecretSource for KubeSecretSource {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ResolveError> {
        debug!("Fetching secret {}/{}", namespace, name);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}
