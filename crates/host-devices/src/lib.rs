//! Accelerator host devices
//!
//! Turns the `inaccel` block of a cloud-init document into KubeVirt host
//! devices.
//!
//! ```
//! use crds::HostDevice;
//! use host_devices::{reconcile_host_devices, ResourceDeclaration};
//!
//! let declaration = ResourceDeclaration::from_user_data(
//!     "#cloud-config\ninaccel:\n  xilinx.com/fpga-xilinx_u250: 2\n",
//! )?;
//!
//! let current = vec![HostDevice::new("gpu", "nvidia.com/T4")];
//! let devices = reconcile_host_devices(&current, &declaration);
//!
//! assert_eq!(devices.len(), 3);
//! assert_eq!(devices[1].name, "inaccel0");
//! assert_eq!(devices[2].name, "inaccel1");
//! # Ok::<(), host_devices::DeclarationError>(())
//! ```
//!
//! Devices whose name follows the reserved `inaccel<index>` convention are
//! owned by this crate and rebuilt from the declaration on every call. All
//! other devices are left alone.

pub mod declaration;
pub mod error;
pub mod naming;
pub mod quantity;
pub mod reconcile;

pub use declaration::ResourceDeclaration;
pub use error::DeclarationError;
pub use naming::{canonical_name, is_owned_device, owned_host_device, owned_index, OWNED_PREFIX};
pub use quantity::{parse_quantity, QuantityError};
pub use reconcile::{desired_owned_devices, reconcile_host_devices};
