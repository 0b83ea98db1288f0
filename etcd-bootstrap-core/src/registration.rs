use std::convert::Infallible;
use std::error::Error;

use async_trait::async_trait;

use crate::Instance;

#[async_trait]
/// An external directory which is told about the cluster once the node has
/// been bootstrapped, e.g. DNS records or a load balancer pool.
pub trait Registrar: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// Publishes the final set of cluster instances.
    async fn publish(&self, instances: &[Instance]) -> Result<(), Self::Error>;
}

#[derive(Debug, Default, Copy, Clone)]
/// A registrar which does not publish anywhere.
pub struct NoopRegistrar;

#[async_trait]
impl Registrar for NoopRegistrar {
    type Error = Infallible;

    async fn publish(&self, instances: &[Instance]) -> Result<(), Self::Error> {
        debug!(num_instances = instances.len(), "Registration provider set to noop.");
        Ok(())
    }
}
