use std::error::Error;
use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{ResolveError, Resolver};

use crate::DirectoryError;

#[async_trait]
/// The DNS queries needed to discover instances from SRV records.
pub trait DnsResolver: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// Returns the target host of every SRV record at `name`, in answer order.
    async fn lookup_srv(&self, name: &str) -> Result<Vec<String>, Self::Error>;

    /// Returns the TXT records at `name`, with the strings of each record joined.
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, Self::Error>;

    /// Returns every address `host` resolves to.
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, Self::Error>;
}

/// A [DnsResolver] backed by `hickory-resolver`.
pub struct HickoryResolver {
    inner: Resolver<TokioConnectionProvider>,
}

impl HickoryResolver {
    /// Creates a resolver using the system configuration, i.e. `/etc/resolv.conf`.
    pub fn from_system_conf() -> Result<Self, DirectoryError> {
        let inner = Resolver::builder_tokio()
            .map_err(|e| DirectoryError::Resolver(anyhow::Error::new(e)))?
            .build();
        Ok(Self { inner })
    }

    /// Creates a resolver with an explicit upstream configuration.
    pub fn with_config(config: ResolverConfig) -> Self {
        let inner =
            Resolver::builder_with_config(config, TokioConnectionProvider::default())
                .build();
        Self { inner }
    }
}

#[async_trait]
impl DnsResolver for HickoryResolver {
    type Error = ResolveError;

    async fn lookup_srv(&self, name: &str) -> Result<Vec<String>, Self::Error> {
        let lookup = self.inner.srv_lookup(name).await?;
        Ok(lookup.iter().map(|srv| srv.target().to_utf8()).collect())
    }

    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, Self::Error> {
        let lookup = self.inner.txt_lookup(name).await?;
        let records = lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|data| String::from_utf8_lossy(data))
                    .collect::<String>()
            })
            .collect();
        Ok(records)
    }

    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, Self::Error> {
        let lookup = self.inner.lookup_ip(host).await?;
        Ok(lookup.iter().collect())
    }
}
