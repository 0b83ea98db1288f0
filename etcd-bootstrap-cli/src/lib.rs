//! The `etcd-bootstrap` command.
//!
//! Run before etcd starts. It works out how the node should join the cluster,
//! fixes up the cluster membership if needed and writes the `ETCD_*`
//! environment to a file for etcd's service unit to load.

#[macro_use]
extern crate tracing;

mod args;

use std::path::Path;

use anyhow::{Context, Result};
use etcd_bootstrap_core::{
    Bootstrapper,
    InstanceDirectory,
    MembershipClient,
    NoopRegistrar,
    Registrar,
};
use etcd_bootstrap_membership::{EtcdMembersClient, MembersClientConfig};
use tracing::Level;

pub use crate::args::{Args, Lookup, TlsArgs};

/// Installs the log subscriber, `debug` raises the level from INFO to DEBUG.
pub fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}

/// Runs a full bootstrap from the parsed command line.
pub async fn run(args: Args) -> Result<()> {
    let tls = args.tls.load().context("Invalid TLS configuration")?;
    let timeout = args.timeout();

    let directory = args
        .lookup
        .directory(timeout)
        .context("Unable to create the instance directory")?;
    info!(method = directory.method(), "Using instance lookup method.");

    let instances = directory
        .list_instances()
        .await
        .context("Unable to list instances")?;

    let mut cfg = MembersClientConfig::default().with_timeout(timeout);
    if let Some(tls) = tls.clone() {
        cfg = cfg.with_tls(tls);
    }
    let membership = EtcdMembersClient::for_instances(&instances, cfg)
        .context("Unable to create the etcd members client")?;

    let mut bootstrapper = Bootstrapper::new(directory, membership);
    if let Some(tls) = tls {
        bootstrapper = bootstrapper.with_tls(tls);
    }

    bootstrap(&bootstrapper, &NoopRegistrar, &args.output_file).await
}

/// Writes the generated configuration to `output_file`, then publishes the
/// instances through `registrar`.
pub async fn bootstrap<D, M, R>(
    bootstrapper: &Bootstrapper<D, M>,
    registrar: &R,
    output_file: &Path,
) -> Result<()>
where
    D: InstanceDirectory,
    M: MembershipClient,
    R: Registrar,
{
    let configuration = bootstrapper
        .generate_configuration()
        .await
        .context("Unable to generate the etcd configuration")?;
    debug!(configuration = %configuration, "Generated etcd configuration.");

    tokio::fs::write(output_file, configuration.as_bytes())
        .await
        .with_context(|| format!("Unable to write {}", output_file.display()))?;
    info!(output_file = %output_file.display(), "Wrote etcd configuration.");

    bootstrapper
        .register(registrar)
        .await
        .context("Unable to register the cluster instances")?;

    Ok(())
}
