use std::error::Error;

use async_trait::async_trait;

use crate::Instance;

#[async_trait]
/// The source of truth for which machines should currently form the cluster.
///
/// This abstracts over the discovery mechanism, e.g. an auto-scaling group,
/// a DNS SRV record or a hypervisor inventory. Exactly one directory is
/// selected at startup.
pub trait InstanceDirectory: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// Returns every live instance which is eligible to be part of the cluster.
    ///
    /// The order of the returned instances is the order members are rendered in
    /// `ETCD_INITIAL_CLUSTER`, so implementations should keep it stable.
    async fn list_instances(&self) -> Result<Vec<Instance>, Self::Error>;

    /// Returns the instance this process is running on.
    async fn local_instance(&self) -> Result<Instance, Self::Error>;
}
