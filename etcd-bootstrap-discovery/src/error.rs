use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
/// A failure discovering the instances which should form the cluster.
pub enum DirectoryError {
    #[error("Invalid instance {spec:?}, expected NAME=ENDPOINT: {reason}")]
    InvalidInstanceSpec { spec: String, reason: &'static str },

    #[error("The local instance {name:?} is not one of the configured instances")]
    UnknownLocalName { name: String },

    #[error("Unable to create the DNS resolver: {0}")]
    Resolver(#[source] anyhow::Error),

    #[error("Unable to lookup SRV for {record}: {error}")]
    SrvLookup {
        record: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("Unable to lookup instance name for SRV target {target}: {error}")]
    TxtLookup {
        target: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("No TXT record with `name=` attribute found for {target}")]
    MissingName { target: String },

    #[error("Unable to resolve the addresses of {target}: {error}")]
    IpLookup {
        target: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("DNS query for {query} did not complete within {timeout:?}")]
    Timeout { query: String, timeout: Duration },

    #[error("None of the SRV targets resolve to the local address {local_ip}")]
    LocalInstanceNotFound { local_ip: IpAddr },
}
