//! # etcd bootstrap core
//!
//! Works out how a booting node should join its etcd cluster and renders the
//! environment etcd needs to start.
//!
//! Every boot falls into one of three cases:
//! - etcd has no members, so every instance in the directory is booting for the
//!   first time and the node starts a **new** cluster with all of them.
//! - The node's peer URL is already registered under its name. etcd ignores the
//!   initial cluster flags once a node has joined, so it is rendered as **new**.
//! - Otherwise the node joins an **existing** cluster. Members whose instances
//!   have disappeared are removed, the local peer URL is added, and only the
//!   members remaining afterwards are rendered into `ETCD_INITIAL_CLUSTER`.
//!
//! Nothing is cached between runs, the decision is recomputed from the
//! [InstanceDirectory] and the [MembershipClient] every time.

#[macro_use]
extern crate tracing;

mod decision;
mod directory;
mod error;
mod instance;
mod member;
mod membership;
mod reconcile;
mod registration;
mod render;
mod state;
mod tls;
pub mod urls;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use decision::{classify, decide, JoinCase, JoinPlan};
pub use directory::InstanceDirectory;
pub use error::BootstrapError;
pub use instance::Instance;
pub use member::Member;
pub use membership::MembershipClient;
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use registration::{NoopRegistrar, Registrar};
pub use render::{render, scheme_for, RenderedConfig};
pub use state::ClusterState;
pub use tls::{CertificateFiles, TlsConfigError, TlsPaths};
pub use urls::Scheme;

/// The names of the rendered environment variables.
pub mod keys {
    pub use crate::render::{
        ADVERTISE_CLIENT_URLS,
        CERT_FILE,
        CLIENT_CERT_AUTH,
        INITIAL_ADVERTISE_PEER_URLS,
        INITIAL_CLUSTER,
        INITIAL_CLUSTER_STATE,
        KEY_FILE,
        LISTEN_CLIENT_URLS,
        LISTEN_PEER_URLS,
        NAME,
        PEER_CERT_FILE,
        PEER_CLIENT_CERT_AUTH,
        PEER_KEY_FILE,
        PEER_TRUSTED_CA_FILE,
        TRUSTED_CA_FILE,
    };
}

/// Generates the etcd environment for the node this process runs on.
pub struct Bootstrapper<D, M> {
    directory: D,
    membership: M,
    tls: Option<TlsPaths>,
}

impl<D, M> Bootstrapper<D, M>
where
    D: InstanceDirectory,
    M: MembershipClient,
{
    /// Create a new bootstrapper using plain HTTP URLs.
    pub fn new(directory: D, membership: M) -> Self {
        Self {
            directory,
            membership,
            tls: None,
        }
    }

    /// Enables mutual TLS.
    ///
    /// All URLs switch to `https` and the certificate paths are rendered
    /// for both the client and peer ports.
    pub fn with_tls(mut self, tls: TlsPaths) -> Self {
        self.tls = Some(tls);
        self
    }

    #[inline]
    pub fn scheme(&self) -> Scheme {
        scheme_for(self.tls.as_ref())
    }

    /// Decides how the local node should join, reconciling the member list
    /// if it is joining an existing cluster.
    pub async fn decide(&self) -> Result<JoinPlan, BootstrapError> {
        decide(&self.directory, &self.membership, self.scheme()).await
    }

    /// Produces the rendered etcd environment for this boot.
    pub async fn generate_config(&self) -> Result<RenderedConfig, BootstrapError> {
        info!("Generating etcd cluster flags.");

        let plan = self.decide().await?;
        Ok(render(
            plan.state,
            &plan.peer_urls,
            &plan.instances,
            &plan.local,
            self.tls.as_ref(),
        ))
    }

    /// Produces the etcd environment as newline separated `KEY=VALUE` lines.
    pub async fn generate_configuration(&self) -> Result<String, BootstrapError> {
        self.generate_config().await.map(|config| config.to_string())
    }

    /// Publishes the current instance set to an external registrar.
    pub async fn register<R>(&self, registrar: &R) -> Result<(), BootstrapError>
    where
        R: Registrar,
    {
        let instances = self
            .directory
            .list_instances()
            .await
            .map_err(BootstrapError::list_instances)?;

        registrar
            .publish(&instances)
            .await
            .map_err(|e| BootstrapError::Registration(anyhow::Error::new(e)))
    }
}
