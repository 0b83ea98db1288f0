use crate::error::BootstrapError;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::urls::Scheme;
use crate::{ClusterState, Instance, InstanceDirectory, Member, MembershipClient};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
/// The situation the local node finds the cluster in.
pub enum JoinCase {
    /// etcd reports no members at all, every instance is booting for the first time.
    EmptyCluster,
    /// The local peer URL is already registered under a confirmed name.
    AlreadyJoined,
    /// Members exist but the local node has not confirmed its membership.
    Joining,
}

/// Classifies the member list relative to the local node's peer URL.
pub fn classify(members: &[Member], local_peer_url: &str) -> JoinCase {
    if members.is_empty() {
        return JoinCase::EmptyCluster;
    }

    let confirmed = members
        .iter()
        .any(|member| member.peer_url == local_peer_url && !member.is_half_joined());
    if confirmed {
        JoinCase::AlreadyJoined
    } else {
        JoinCase::Joining
    }
}

#[derive(Debug, Clone)]
/// The outcome of the bootstrap decision.
pub struct JoinPlan {
    /// The value for `ETCD_INITIAL_CLUSTER_STATE`.
    pub state: ClusterState,
    /// The peer URLs which are allowed into `ETCD_INITIAL_CLUSTER`.
    pub peer_urls: Vec<String>,
    /// The directory listing the decision was made against.
    pub instances: Vec<Instance>,
    /// The instance this process runs on.
    pub local: Instance,
    /// The changes made to the member list, if the node had to join.
    pub reconciled: Option<ReconcileOutcome>,
}

/// Decides how the local node joins the cluster.
///
/// When the node is joining an existing cluster the member list is reconciled
/// first, and only the members remaining afterwards are authoritative. Listing
/// instances which have not joined yet would make etcd fail its member count
/// validation at startup.
pub async fn decide<D, M>(
    directory: &D,
    membership: &M,
    scheme: Scheme,
) -> Result<JoinPlan, BootstrapError>
where
    D: InstanceDirectory,
    M: MembershipClient,
{
    let members = membership
        .list_members()
        .await
        .map_err(BootstrapError::list_members)?;
    let instances = directory
        .list_instances()
        .await
        .map_err(BootstrapError::list_instances)?;
    let local = directory
        .local_instance()
        .await
        .map_err(BootstrapError::local_instance)?;

    debug!(
        members = ?members,
        instances = ?instances,
        local_instance = %local,
        "Loaded cluster snapshot.",
    );

    let local_peer_url = local.peer_url(scheme);
    let (state, peer_urls, reconciled) = match classify(&members, &local_peer_url) {
        JoinCase::EmptyCluster => {
            info!("No cluster found, treating as an initial node in the new cluster.");
            let peer_urls = instances
                .iter()
                .map(|instance| instance.peer_url(scheme))
                .collect();
            (ClusterState::New, peer_urls, None)
        },
        JoinCase::AlreadyJoined => {
            // etcd ignores the INITIAL_* flags once a node has joined, so
            // rendering it as part of a new cluster is safe even if the
            // cluster has fully formed.
            info!(
                peer_url = %local_peer_url,
                "Node peer URL already exists, treating as an existing node in a new cluster.",
            );
            let peer_urls = instances
                .iter()
                .map(|instance| instance.peer_url(scheme))
                .collect();
            (ClusterState::New, peer_urls, None)
        },
        JoinCase::Joining => {
            info!(
                peer_url = %local_peer_url,
                "Node does not exist yet in cluster, joining as a new node.",
            );
            let outcome = Reconciler::new(membership, &instances, &local, scheme)
                .reconcile(&members)
                .await?;

            let peer_urls = membership
                .list_members()
                .await
                .map_err(BootstrapError::list_members)?
                .into_iter()
                .map(|member| member.peer_url)
                .collect();
            (ClusterState::Existing, peer_urls, Some(outcome))
        },
    };

    Ok(JoinPlan {
        state,
        peer_urls,
        instances,
        local,
        reconciled,
    })
}
