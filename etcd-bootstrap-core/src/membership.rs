use std::error::Error;

use async_trait::async_trait;

use crate::Member;

#[async_trait]
/// Read and mutate the member list of the live etcd cluster.
pub trait MembershipClient: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// Lists the current cluster members.
    ///
    /// A cluster which has not formed yet **must** be reported as an empty list
    /// rather than an error. Genuine failures, such as certificate problems,
    /// must be returned as errors so they are never mistaken for an empty cluster.
    async fn list_members(&self) -> Result<Vec<Member>, Self::Error>;

    /// Registers a new peer URL with the cluster.
    ///
    /// The member shows up without a name until the node owning the URL
    /// completes its own startup.
    async fn add_member(&self, peer_url: &str) -> Result<(), Self::Error>;

    /// Removes a member from the cluster.
    ///
    /// Members are resolved by their name, half-joined members without a name
    /// are resolved by their peer URL. A member which no longer exists is not
    /// an error.
    async fn remove_member(&self, member: &Member) -> Result<(), Self::Error>;
}
