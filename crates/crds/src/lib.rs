//! KubeVirt API types
//!
//! Typed subset of the `kubevirt.io/v1` API consumed by the InAccel
//! admission webhook and `VirtualMachine` controller.
//!
//! Only the fields the webhook reads or writes are modelled. Every struct
//! carries a flattened map of the remaining fields, so an object that is
//! deserialized and serialized again keeps everything the API server sent.

pub mod host_device;
pub mod references;
pub mod virtual_machine;
pub mod virtual_machine_instance;
pub mod volume;

pub use host_device::*;
pub use references::*;
pub use virtual_machine::*;
pub use virtual_machine_instance::*;
pub use volume::*;

/// Fields of a KubeVirt object that are not modelled explicitly.
pub type UnknownFields = std::collections::BTreeMap<String, serde_json::Value>;
