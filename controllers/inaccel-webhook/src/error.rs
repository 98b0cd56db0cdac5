//! Controller-specific error types.
//!
//! Wraps the errors of the resolver and the declaration parser, which both
//! abort a mutation without touching the object, together with the
//! Kubernetes and transport failures of the binary itself.

use cloud_init::ResolveError;
use host_devices::DeclarationError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the InAccel Webhook.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Cloud-init user data could not be resolved
    #[error("Failed to resolve cloud-init user data: {0}")]
    Resolve(#[from] ResolveError),

    /// Cloud-init user data holds an invalid accelerator declaration
    #[error("Invalid accelerator declaration: {0}")]
    Declaration(#[from] DeclarationError),

    /// Object does not have the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Admitted object cannot carry host devices
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// TLS setup failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
