//! Cloud-init user data resolution
//!
//! Finds the cloud-init volume of a KubeVirt instance spec and returns its
//! user data, whether it is inline, base64 encoded or stored in a Secret.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cloud_init::{CloudInitResolver, KubeSecretSource};
//!
//! # async fn example(spec: crds::VirtualMachineInstanceSpec) -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let resolver = CloudInitResolver::new(Arc::new(KubeSecretSource::new(client)));
//!
//! if let Some(user_data) = resolver.resolve_user_data("default", &spec).await? {
//!     println!("{user_data}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Secrets are read through the [`SecretSource`] trait so that the resolver
//! can be exercised without a cluster (see `MockSecretSource`, behind the
//! `test-util` feature).

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod resolver;
pub mod source;

pub use client::KubeSecretSource;
pub use error::ResolveError;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockSecretSource;
pub use resolver::{cloud_init_volume, CloudInitResolver, USER_DATA_KEYS};
pub use source::SecretSource;
