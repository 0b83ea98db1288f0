use std::fmt::Debug;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Unable to list instances from the instance directory: {0}")]
    /// The instance directory could not be enumerated.
    ListInstances(#[source] anyhow::Error),

    #[error("Unable to identify the local instance: {0}")]
    /// The directory could not tell which instance this process runs on.
    LocalInstance(#[source] anyhow::Error),

    #[error("Unable to list etcd members: {0}")]
    /// The live member list could not be read.
    ///
    /// This is never raised for a cluster which simply has not formed yet.
    ListMembers(#[source] anyhow::Error),

    #[error("Unexpected error when adding new member URL {peer_url}: {error}")]
    /// The local peer URL could not be registered with the cluster.
    AddMember {
        peer_url: String,
        #[source]
        error: anyhow::Error,
    },

    #[error("Unable to publish the cluster instances: {0}")]
    /// The registrar rejected the final instance set.
    Registration(#[source] anyhow::Error),
}

impl BootstrapError {
    pub(crate) fn list_instances<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ListInstances(anyhow::Error::new(error))
    }

    pub(crate) fn local_instance<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::LocalInstance(anyhow::Error::new(error))
    }

    pub(crate) fn list_members<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ListMembers(anyhow::Error::new(error))
    }

    pub(crate) fn add_member<E>(peer_url: &str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::AddMember {
            peer_url: peer_url.to_string(),
            error: anyhow::Error::new(error),
        }
    }
}
