//! Object references used inside KubeVirt specs
//!
//! KubeVirt refers to Secrets with a plain `LocalObjectReference`: a name in
//! the same namespace as the referencing object.

use serde::{Deserialize, Serialize};

/// Reference to an object in the same namespace as the referencing resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectReference {
    /// Name of the referenced object
    #[serde(default)]
    pub name: String,
}

impl LocalObjectReference {
    /// Create a reference to the object called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
