use std::collections::HashSet;

use crate::error::BootstrapError;
use crate::urls::Scheme;
use crate::{Instance, Member, MembershipClient};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// What a single reconciliation pass changed.
pub struct ReconcileOutcome {
    /// Members which were removed from the cluster.
    pub removed: Vec<Member>,
    /// Stale members whose removal failed and will be retried on the next boot.
    pub failed_removals: Vec<Member>,
    /// The peer URL which was added for the local instance, if any.
    pub added: Option<String>,
}

/// Brings the etcd member list in line with the instance directory.
///
/// Stale members are removed first, then the local instance is added.
/// Removal failures are logged and ignored, they are usually caused by a
/// temporary loss of quorum and the next boot will retry them. Failing to add
/// the local instance is fatal as etcd will refuse to let the node join.
pub struct Reconciler<'a, M> {
    membership: &'a M,
    instances: &'a [Instance],
    local: &'a Instance,
    scheme: Scheme,
}

impl<'a, M> Reconciler<'a, M>
where
    M: MembershipClient,
{
    pub fn new(
        membership: &'a M,
        instances: &'a [Instance],
        local: &'a Instance,
        scheme: Scheme,
    ) -> Self {
        Self {
            membership,
            instances,
            local,
            scheme,
        }
    }

    /// Runs a full reconciliation pass starting from the given member list.
    pub async fn reconcile(
        &self,
        members: &[Member],
    ) -> Result<ReconcileOutcome, BootstrapError> {
        let mut outcome = ReconcileOutcome::default();
        self.remove_stale_members(members, &mut outcome).await;
        outcome.added = self.add_local_instance().await?;
        Ok(outcome)
    }

    /// Returns the members which no longer have a live instance behind them.
    ///
    /// A member without a name whose peer URL belongs to a live instance is
    /// half-joined and is never considered stale, removing it would abort a
    /// node which is in the middle of joining.
    pub fn stale_members<'m>(&self, members: &'m [Member]) -> Vec<&'m Member> {
        let instance_names = self
            .instances
            .iter()
            .map(|instance| instance.name.as_str())
            .collect::<HashSet<_>>();
        let instance_urls = self
            .instances
            .iter()
            .map(|instance| instance.peer_url(self.scheme))
            .collect::<HashSet<_>>();

        members
            .iter()
            .filter(|member| match member.name() {
                Some(name) => !instance_names.contains(name),
                None => !instance_urls.contains(&member.peer_url),
            })
            .collect()
    }

    async fn remove_stale_members(&self, members: &[Member], outcome: &mut ReconcileOutcome) {
        for member in self.stale_members(members) {
            info!(
                member_name = member.name().unwrap_or_default(),
                peer_url = %member.peer_url,
                "Removing member from etcd member list, not found in instance directory.",
            );

            match self.membership.remove_member(member).await {
                Ok(()) => outcome.removed.push(member.clone()),
                Err(error) => {
                    warn!(
                        error = ?error,
                        peer_url = %member.peer_url,
                        "Unable to remove old member. This may be due to temporary lack of quorum, will ignore.",
                    );
                    outcome.failed_removals.push(member.clone());
                },
            }
        }
    }

    /// Registers the local peer URL unless the local instance is already known
    /// by name, or its peer URL was already added by an earlier boot which
    /// crashed before the node registered its name.
    async fn add_local_instance(&self) -> Result<Option<String>, BootstrapError> {
        let members = self
            .membership
            .list_members()
            .await
            .map_err(BootstrapError::list_members)?;
        let local_peer_url = self.local.peer_url(self.scheme);

        let name_known = members
            .iter()
            .any(|member| member.name() == Some(self.local.name.as_str()));
        let url_known = members
            .iter()
            .any(|member| member.peer_url == local_peer_url);

        if name_known || url_known {
            debug!(
                local_instance = %self.local,
                name_known = name_known,
                url_known = url_known,
                "Local instance is already registered with etcd.",
            );
            return Ok(None);
        }

        info!(
            local_instance = %self.local,
            peer_url = %local_peer_url,
            "Adding local instance to the etcd member list.",
        );
        self.membership
            .add_member(&local_peer_url)
            .await
            .map_err(|e| BootstrapError::add_member(&local_peer_url, e))?;

        Ok(Some(local_peer_url))
    }
}
