use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
/// The value of `ETCD_INITIAL_CLUSTER_STATE` for this boot.
pub enum ClusterState {
    /// The node is one of the initial members of a brand new cluster,
    /// or it has already joined and etcd will ignore the initial flags.
    New,
    /// The node is joining a cluster which already has quorum.
    Existing,
}

impl ClusterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterState::New => "new",
            ClusterState::Existing => "existing",
        }
    }
}

impl Display for ClusterState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
