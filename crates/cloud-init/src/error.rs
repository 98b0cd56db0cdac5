//! Cloud-init resolution errors

use thiserror::Error;

/// Errors that can occur while resolving cloud-init user data
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The referenced user data Secret does not exist
    #[error("user data secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },

    /// The Secret exists but has neither a `userdata` nor a `userData` key
    #[error("no user-data value found in secret {namespace}/{name}")]
    MissingUserDataKey { namespace: String, name: String },

    /// `userDataBase64` is not valid base64
    #[error("invalid base64 user data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The user data is not UTF-8
    #[error("user data is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),
}
