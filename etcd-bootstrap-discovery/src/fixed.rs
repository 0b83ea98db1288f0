use async_trait::async_trait;
use etcd_bootstrap_core::{Instance, InstanceDirectory};

use crate::DirectoryError;

/// Parses an instance from a `NAME=ENDPOINT` pair, e.g. `etcd-1=10.0.0.1`.
pub fn parse_instance(spec: &str) -> Result<Instance, DirectoryError> {
    let invalid = |reason| DirectoryError::InvalidInstanceSpec {
        spec: spec.to_string(),
        reason,
    };

    let (name, endpoint) = spec.split_once('=').ok_or_else(|| invalid("missing `=`"))?;
    let name = name.trim();
    let endpoint = endpoint.trim();

    if name.is_empty() {
        return Err(invalid("the name is empty"));
    }
    if endpoint.is_empty() {
        return Err(invalid("the endpoint is empty"));
    }

    Ok(Instance::new(name, endpoint))
}

#[derive(Debug, Clone)]
/// A directory over a fixed list of instances.
///
/// Useful where the machines are known up front, e.g. on bare metal.
pub struct StaticDirectory {
    instances: Vec<Instance>,
    local: Instance,
}

impl StaticDirectory {
    /// Creates a new directory, the local instance must be one of `instances`.
    pub fn new(
        instances: Vec<Instance>,
        local_name: &str,
    ) -> Result<Self, DirectoryError> {
        let local = instances
            .iter()
            .find(|instance| instance.name == local_name)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownLocalName {
                name: local_name.to_string(),
            })?;

        Ok(Self { instances, local })
    }
}

#[async_trait]
impl InstanceDirectory for StaticDirectory {
    type Error = DirectoryError;

    async fn list_instances(&self) -> Result<Vec<Instance>, Self::Error> {
        Ok(self.instances.clone())
    }

    async fn local_instance(&self) -> Result<Instance, Self::Error> {
        Ok(self.local.clone())
    }
}
