//! # etcd bootstrap
//! Decides how a booting node should join its etcd cluster.
//!
//! This is a convenience package which includes all of the library crates
//! of the project:
//!
//! ### Features
//! - `etcd_bootstrap_core` - The join decision, membership reconciliation and environment rendering.
//! - `etcd_bootstrap_membership` - A client for the etcd v2 members API.
//! - `etcd_bootstrap_discovery` - Static and DNS SRV instance directories.

#[cfg(feature = "etcd-bootstrap-core")]
pub use etcd_bootstrap_core as core;
#[cfg(feature = "etcd-bootstrap-discovery")]
pub use etcd_bootstrap_discovery as discovery;
#[cfg(feature = "etcd-bootstrap-membership")]
pub use etcd_bootstrap_membership as membership;
