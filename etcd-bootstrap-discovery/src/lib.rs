//! # etcd bootstrap discovery
//!
//! [InstanceDirectory](etcd_bootstrap_core::InstanceDirectory) implementations
//! answering which machines should form the cluster and which of them is local.
//!
//! - [StaticDirectory] serves a list given on the command line.
//! - [SrvDirectory] reads a DNS SRV record and the TXT records of its targets.
//!
//! [AnyDirectory] wraps whichever one was selected at startup.

#[macro_use]
extern crate tracing;

mod any;
mod error;
mod fixed;
mod resolver;
mod srv;

pub use any::AnyDirectory;
pub use error::DirectoryError;
pub use fixed::{parse_instance, StaticDirectory};
pub use resolver::{DnsResolver, HickoryResolver};
pub use srv::{SrvConfig, SrvDirectory, DEFAULT_DNS_TIMEOUT, DEFAULT_SERVICE};
