//! SecretSource trait for mocking
//!
//! The resolver only ever needs to read one Secret by namespace and name.
//! The Kubernetes-backed [`KubeSecretSource`](crate::KubeSecretSource)
//! implements this trait, and tests use an in-memory implementation.

use crate::error::ResolveError;
use k8s_openapi::api::core::v1::Secret;

/// Read access to Secrets.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch a Secret, `Ok(None)` if it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ResolveError>;
}
