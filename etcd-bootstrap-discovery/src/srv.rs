use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use etcd_bootstrap_core::{Instance, InstanceDirectory};
use tokio::sync::OnceCell;

use crate::{DirectoryError, DnsResolver};

/// The SRV service instances are published under by default.
pub static DEFAULT_SERVICE: &str = "etcd-bootstrap";
/// How long a single DNS query may take.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

static PROTO: &str = "tcp";
static NAME_ATTRIBUTE: &str = "name";

#[derive(Debug, Clone)]
/// Where to find the SRV record describing the cluster.
pub struct SrvConfig {
    /// The domain the SRV record lives under, e.g. `my-cluster.example.com`.
    pub domain_name: String,
    /// The SRV service, queried as `_{service}._tcp.{domain_name}`.
    pub service: String,
    /// The address of the machine this process runs on.
    pub local_ip: IpAddr,
    /// The timeout applied to each DNS query.
    pub timeout: Duration,
}

impl SrvConfig {
    pub fn new(domain_name: impl Into<String>, local_ip: IpAddr) -> Self {
        Self {
            domain_name: domain_name.into(),
            service: DEFAULT_SERVICE.to_string(),
            local_ip,
            timeout: DEFAULT_DNS_TIMEOUT,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The fully qualified name of the SRV record.
    pub fn record_name(&self) -> String {
        format!("_{}._{}.{}", self.service, PROTO, self.domain_name)
    }
}

/// A directory backed by a DNS SRV record.
///
/// Every SRV target is an instance endpoint. The instance name is taken
/// from the `name=` attribute of the target's TXT records (RFC 1464).
/// Answers are looked up once and reused for the life of the directory.
pub struct SrvDirectory<R> {
    cfg: SrvConfig,
    resolver: R,
    instances: OnceCell<Vec<Instance>>,
    local: OnceCell<Instance>,
}

impl<R: DnsResolver> SrvDirectory<R> {
    pub fn new(cfg: SrvConfig, resolver: R) -> Self {
        Self {
            cfg,
            resolver,
            instances: OnceCell::new(),
            local: OnceCell::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &SrvConfig {
        &self.cfg
    }

    async fn bounded<F, T>(&self, query: &str, fut: F) -> Result<T, DirectoryError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.cfg.timeout, fut)
            .await
            .map_err(|_| DirectoryError::Timeout {
                query: query.to_string(),
                timeout: self.cfg.timeout,
            })
    }

    async fn discover(&self) -> Result<Vec<Instance>, DirectoryError> {
        let record = self.cfg.record_name();
        let targets = self
            .bounded(&record, self.resolver.lookup_srv(&record))
            .await?
            .map_err(|e| DirectoryError::SrvLookup {
                record: record.clone(),
                error: anyhow::Error::new(e),
            })?;
        debug!(record = %record, targets = ?targets, "Resolved SRV record.");

        let mut instances = Vec::with_capacity(targets.len());
        for target in targets {
            let endpoint = target.trim_end_matches('.').to_string();
            let name = self.lookup_name(&target).await?;
            instances.push(Instance::new(name, endpoint));
        }

        Ok(instances)
    }

    async fn lookup_name(&self, target: &str) -> Result<String, DirectoryError> {
        let records = self
            .bounded(target, self.resolver.lookup_txt(target))
            .await?
            .map_err(|e| DirectoryError::TxtLookup {
                target: target.to_string(),
                error: anyhow::Error::new(e),
            })?;

        records
            .iter()
            .filter_map(|record| record.split_once('='))
            .find(|(key, _)| *key == NAME_ATTRIBUTE)
            .map(|(_, name)| name.to_string())
            .ok_or_else(|| DirectoryError::MissingName {
                target: target.to_string(),
            })
    }

    async fn resolves_to_local(&self, instance: &Instance) -> Result<bool, DirectoryError> {
        if let Ok(ip) = instance.endpoint.parse::<IpAddr>() {
            return Ok(ip == self.cfg.local_ip);
        }

        let addrs = self
            .bounded(&instance.endpoint, self.resolver.lookup_ip(&instance.endpoint))
            .await?
            .map_err(|e| DirectoryError::IpLookup {
                target: instance.endpoint.clone(),
                error: anyhow::Error::new(e),
            })?;
        Ok(addrs.contains(&self.cfg.local_ip))
    }

    async fn find_local(&self) -> Result<Instance, DirectoryError> {
        for instance in self.list_instances().await? {
            if self.resolves_to_local(&instance).await? {
                info!(instance = %instance, "Found the local instance.");
                return Ok(instance);
            }
        }

        Err(DirectoryError::LocalInstanceNotFound {
            local_ip: self.cfg.local_ip,
        })
    }
}

#[async_trait]
impl<R: DnsResolver> InstanceDirectory for SrvDirectory<R> {
    type Error = DirectoryError;

    async fn list_instances(&self) -> Result<Vec<Instance>, Self::Error> {
        self.instances
            .get_or_try_init(|| self.discover())
            .await
            .cloned()
    }

    async fn local_instance(&self) -> Result<Instance, Self::Error> {
        self.local
            .get_or_try_init(|| self.find_local())
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct StubResolver {
        srv: HashMap<String, Vec<String>>,
        txt: HashMap<String, Vec<String>>,
        ips: HashMap<String, Vec<IpAddr>>,
        delay: Option<Duration>,
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl StubResolver {
        fn cluster() -> Self {
            let mut resolver = Self::default();
            resolver.srv.insert(
                "_etcd-server-ssl._tcp.my-etcd-cluster.example.com".to_string(),
                vec![
                    "etcd-1.example.com.".to_string(),
                    "etcd-2.example.com.".to_string(),
                    "etcd-3.example.com.".to_string(),
                ],
            );
            resolver.txt.insert(
                "etcd-1.example.com.".to_string(),
                vec![
                    "bogus".to_string(),
                    "boz=woz".to_string(),
                    "name=i-abc1".to_string(),
                    "gbg=rrr".to_string(),
                ],
            );
            resolver
                .txt
                .insert("etcd-2.example.com.".to_string(), vec!["name=i-abc2".to_string()]);
            resolver
                .txt
                .insert("etcd-3.example.com.".to_string(), vec!["name=i-abc3".to_string()]);
            for i in 1..=3 {
                resolver.ips.insert(
                    format!("etcd-{}.example.com", i),
                    vec![format!("10.0.0.{}", i).parse().unwrap()],
                );
            }
            resolver
        }

        fn record(&self, query: String) {
            self.queries.lock().push(query);
        }

        async fn wait(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn not_found(name: &str) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("no records for {}", name))
    }

    #[async_trait]
    impl DnsResolver for StubResolver {
        type Error = io::Error;

        async fn lookup_srv(&self, name: &str) -> Result<Vec<String>, Self::Error> {
            self.record(format!("SRV {}", name));
            self.wait().await;
            self.srv.get(name).cloned().ok_or_else(|| not_found(name))
        }

        async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, Self::Error> {
            self.record(format!("TXT {}", name));
            self.wait().await;
            self.txt.get(name).cloned().ok_or_else(|| not_found(name))
        }

        async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, Self::Error> {
            self.record(format!("A {}", host));
            self.wait().await;
            self.ips.get(host).cloned().ok_or_else(|| not_found(host))
        }
    }

    fn config(local_ip: &str) -> SrvConfig {
        SrvConfig::new("my-etcd-cluster.example.com", local_ip.parse().unwrap())
            .with_service("etcd-server-ssl")
    }

    #[test]
    fn test_record_name() {
        let cfg = SrvConfig::new("example.com", "10.0.0.1".parse().unwrap());
        assert_eq!(cfg.record_name(), "_etcd-bootstrap._tcp.example.com");
        assert_eq!(config("10.0.0.1").record_name(), "_etcd-server-ssl._tcp.my-etcd-cluster.example.com");
    }

    #[tokio::test]
    async fn test_list_instances() {
        let directory = SrvDirectory::new(config("10.0.0.2"), StubResolver::cluster());

        let instances = directory.list_instances().await.expect("List instances");
        assert_eq!(
            instances,
            vec![
                Instance::new("i-abc1", "etcd-1.example.com"),
                Instance::new("i-abc2", "etcd-2.example.com"),
                Instance::new("i-abc3", "etcd-3.example.com"),
            ],
        );
    }

    #[tokio::test]
    async fn test_answers_are_memoised() {
        let resolver = StubResolver::cluster();
        let queries = resolver.queries.clone();
        let directory = SrvDirectory::new(config("10.0.0.2"), resolver);

        let first = directory.list_instances().await.expect("List instances");
        let count = queries.lock().len();
        let second = directory.list_instances().await.expect("List instances");

        assert_eq!(first, second);
        assert_eq!(queries.lock().len(), count, "DNS should only be queried once");
        assert_eq!(queries.lock()[0], "SRV _etcd-server-ssl._tcp.my-etcd-cluster.example.com");
    }

    #[tokio::test]
    async fn test_local_instance_by_ip() {
        let directory = SrvDirectory::new(config("10.0.0.2"), StubResolver::cluster());

        let local = directory.local_instance().await.expect("Find local instance");
        assert_eq!(local, Instance::new("i-abc2", "etcd-2.example.com"));

        let directory = SrvDirectory::new(config("10.0.0.9"), StubResolver::cluster());
        let err = directory
            .local_instance()
            .await
            .expect_err("No target resolves to the local address");
        assert!(matches!(err, DirectoryError::LocalInstanceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_ip_targets_skip_address_lookup() {
        let mut resolver = StubResolver::default();
        resolver.srv.insert(
            "_etcd-bootstrap._tcp.example.com".to_string(),
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
        );
        resolver.txt.insert("10.0.0.1".to_string(), vec!["name=e1".to_string()]);
        resolver.txt.insert("10.0.0.2".to_string(), vec!["name=e2".to_string()]);
        let queries = resolver.queries.clone();

        let cfg = SrvConfig::new("example.com", "10.0.0.2".parse().unwrap());
        let directory = SrvDirectory::new(cfg, resolver);

        let local = directory.local_instance().await.expect("Find local instance");
        assert_eq!(local, Instance::new("e2", "10.0.0.2"));
        assert!(queries.lock().iter().all(|query| !query.starts_with("A ")));
    }

    #[tokio::test]
    async fn test_missing_name_attribute() {
        let mut resolver = StubResolver::cluster();
        resolver
            .txt
            .insert("etcd-3.example.com.".to_string(), vec!["id=i-abc3".to_string()]);
        let directory = SrvDirectory::new(config("10.0.0.1"), resolver);

        let err = directory
            .list_instances()
            .await
            .expect_err("A target without a name should fail the lookup");
        match err {
            DirectoryError::MissingName { target } => assert_eq!(target, "etcd-3.example.com."),
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_srv_lookup_failure() {
        let directory = SrvDirectory::new(
            SrvConfig::new("unknown.example.com", "10.0.0.1".parse().unwrap()),
            StubResolver::cluster(),
        );

        let err = directory.list_instances().await.expect_err("Unknown record");
        assert!(matches!(err, DirectoryError::SrvLookup { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_queries_time_out() {
        let mut resolver = StubResolver::cluster();
        resolver.delay = Some(Duration::from_secs(5));
        let cfg = config("10.0.0.1").with_timeout(Duration::from_millis(20));
        let directory = SrvDirectory::new(cfg, resolver);

        let err = directory.list_instances().await.expect_err("Query should time out");
        assert!(matches!(err, DirectoryError::Timeout { .. }), "{:?}", err);
    }
}
