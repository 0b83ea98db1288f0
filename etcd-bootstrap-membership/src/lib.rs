//! # etcd bootstrap membership
//!
//! A small client for the etcd v2 members API which implements
//! [MembershipClient](etcd_bootstrap_core::MembershipClient).
//!
//! The client tells apart a cluster which has not formed yet, where no
//! endpoint is listening, from genuine failures such as rejected certificates.
//! Only the former is reported as an empty member list.

#[macro_use]
extern crate tracing;

mod client;
mod error;

pub use client::{EtcdMembersClient, MembersClientConfig, DEFAULT_TIMEOUT};
pub use error::MembersError;
