use async_trait::async_trait;
use etcd_bootstrap_core::{Instance, InstanceDirectory};

use crate::{DirectoryError, DnsResolver, HickoryResolver, SrvDirectory, StaticDirectory};

/// One of the supported instance lookup methods, picked at startup.
pub enum AnyDirectory<R = HickoryResolver> {
    Static(StaticDirectory),
    Srv(SrvDirectory<R>),
}

impl<R> AnyDirectory<R> {
    /// The name of the lookup method, as used on the command line.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::Srv(_) => "srv",
        }
    }
}

impl<R> From<StaticDirectory> for AnyDirectory<R> {
    fn from(directory: StaticDirectory) -> Self {
        Self::Static(directory)
    }
}

impl<R> From<SrvDirectory<R>> for AnyDirectory<R> {
    fn from(directory: SrvDirectory<R>) -> Self {
        Self::Srv(directory)
    }
}

#[async_trait]
impl<R: DnsResolver> InstanceDirectory for AnyDirectory<R> {
    type Error = DirectoryError;

    async fn list_instances(&self) -> Result<Vec<Instance>, Self::Error> {
        match self {
            Self::Static(directory) => directory.list_instances().await,
            Self::Srv(directory) => directory.list_instances().await,
        }
    }

    async fn local_instance(&self) -> Result<Instance, Self::Error> {
        match self {
            Self::Static(directory) => directory.local_instance().await,
            Self::Srv(directory) => directory.local_instance().await,
        }
    }
}
