use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
/// A member as currently reported by the etcd cluster.
pub struct Member {
    /// The name the member registered itself with.
    ///
    /// This is `None` while the member is half-joined: its peer URL has been
    /// added to the cluster but the owning node has not completed its own
    /// startup yet.
    pub name: Option<String>,
    /// The single peer URL the member is reachable on.
    pub peer_url: String,
}

impl Member {
    /// Creates a member which has completed its join.
    pub fn named(name: impl Into<String>, peer_url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            peer_url: peer_url.into(),
        }
    }

    /// Creates a member whose peer URL was added but has not registered a name.
    pub fn half_joined(peer_url: impl Into<String>) -> Self {
        Self {
            name: None,
            peer_url: peer_url.into(),
        }
    }

    /// Creates a member from the raw name reported by etcd, where an
    /// empty name marks a half-joined member.
    pub fn from_reported(name: impl Into<String>, peer_url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() { None } else { Some(name) },
            peer_url: peer_url.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn is_half_joined(&self) -> bool {
        self.name.is_none()
    }
}

impl Display for Member {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.peer_url),
            None => write!(f, "<unnamed> ({})", self.peer_url),
        }
    }
}
