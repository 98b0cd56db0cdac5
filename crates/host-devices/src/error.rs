//! Declaration errors

use crate::quantity::QuantityError;
use thiserror::Error;

/// The cloud-init user data could not be turned into a resource declaration.
///
/// Any of these aborts the whole mutation: the object is left untouched.
#[derive(Debug, Error)]
pub enum DeclarationError {
    /// The document is not YAML, is not a mapping, or `inaccel` is not a
    /// mapping of resource names to quantities
    #[error("invalid cloud-config document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A resource name is not a string, number or boolean
    #[error("invalid resource name {key:?}")]
    InvalidResourceName { key: String },

    /// Two keys name the same resource once read as strings
    #[error("resource {resource:?} is declared more than once")]
    DuplicateResource { resource: String },

    /// A quantity is not a non-negative whole number
    #[error("invalid quantity {value:?} for resource {resource:?}: {source}")]
    InvalidQuantity {
        resource: String,
        value: String,
        #[source]
        source: QuantityError,
    },

    /// The declaration asks for more devices than the webhook accepts
    #[error("declaration requests {requested} host devices, limit is {limit}")]
    TooManyDevices { requested: u64, limit: u64 },
}
