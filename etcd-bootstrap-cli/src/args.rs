use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use etcd_bootstrap_core::{Instance, TlsConfigError, TlsPaths};
use etcd_bootstrap_discovery::{
    parse_instance,
    AnyDirectory,
    DirectoryError,
    HickoryResolver,
    SrvConfig,
    SrvDirectory,
    StaticDirectory,
    DEFAULT_SERVICE,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
/// Generates the etcd environment for the local node and reconciles the
/// cluster membership so the node can join.
pub struct Args {
    #[arg(short = 'X', long)]
    /// Enables debug logging.
    pub debug: bool,

    #[arg(short, long, default_value = "/var/run/etcd-bootstrap.conf")]
    /// The file the `ETCD_*` environment variables are written to.
    pub output_file: PathBuf,

    #[arg(long, default_value_t = 5)]
    /// The timeout, in seconds, for every network call.
    pub timeout_secs: u64,

    #[command(flatten)]
    pub tls: TlsArgs,

    #[command(subcommand)]
    pub lookup: Lookup,
}

impl Args {
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(ClapArgs, Debug, Default)]
pub struct TlsArgs {
    #[arg(long)]
    /// Serve and talk to etcd over mutual TLS.
    pub enable_tls: bool,

    #[arg(long)]
    /// The CA used to verify clients.
    pub tls_client_ca: Option<PathBuf>,

    #[arg(long)]
    /// The certificate served on the client port.
    pub tls_client_cert: Option<PathBuf>,

    #[arg(long)]
    /// The key of the client port certificate.
    pub tls_client_key: Option<PathBuf>,

    #[arg(long)]
    /// The CA used to verify peers.
    pub tls_peer_ca: Option<PathBuf>,

    #[arg(long)]
    /// The certificate served on the peer port.
    pub tls_peer_cert: Option<PathBuf>,

    #[arg(long)]
    /// The key of the peer port certificate.
    pub tls_peer_key: Option<PathBuf>,
}

impl TlsArgs {
    /// Validates the TLS paths, returning `None` if TLS is disabled.
    pub fn load(&self) -> Result<Option<TlsPaths>, TlsConfigError> {
        if !self.enable_tls {
            return Ok(None);
        }

        let path = |p: &Option<PathBuf>| p.clone().unwrap_or_default();
        TlsPaths::new(
            path(&self.tls_client_ca),
            path(&self.tls_client_cert),
            path(&self.tls_client_key),
            path(&self.tls_peer_ca),
            path(&self.tls_peer_cert),
            path(&self.tls_peer_key),
        )
        .map(Some)
    }
}

#[derive(Subcommand, Debug)]
/// The method used to find the instances of the cluster.
pub enum Lookup {
    /// Use a fixed list of instances.
    Static {
        #[arg(long = "instance", value_parser = parse_instance, required = true)]
        /// An instance of the cluster as `NAME=ENDPOINT`.
        ///
        /// Repeat the flag once per instance.
        instances: Vec<Instance>,

        #[arg(long)]
        /// The name of the instance this process runs on.
        local_name: String,
    },

    /// Use a DNS SRV record, naming each target through its TXT records.
    Srv {
        #[arg(long)]
        /// The domain name the SRV record lives under.
        srv_domain_name: String,

        #[arg(long, default_value = DEFAULT_SERVICE)]
        /// The SRV service name.
        srv_service: String,

        #[arg(long)]
        /// The IP address of this instance, used to pick it out of the SRV targets.
        local_ip: IpAddr,
    },
}

impl Lookup {
    /// Creates the instance directory for the selected method.
    pub fn directory(&self, timeout: Duration) -> Result<AnyDirectory, DirectoryError> {
        match self {
            Self::Static {
                instances,
                local_name,
            } => StaticDirectory::new(instances.clone(), local_name).map(AnyDirectory::from),
            Self::Srv {
                srv_domain_name,
                srv_service,
                local_ip,
            } => {
                let cfg = SrvConfig::new(srv_domain_name.clone(), *local_ip)
                    .with_service(srv_service.clone())
                    .with_timeout(timeout);
                let resolver = HickoryResolver::from_system_conf()?;
                Ok(SrvDirectory::new(cfg, resolver).into())
            },
        }
    }
}
