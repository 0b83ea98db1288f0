use std::fmt::{Display, Formatter};

use crate::urls::{self, Scheme};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
/// A machine the cloud provider believes should be part of the etcd cluster.
pub struct Instance {
    /// The unique name of the instance within the cluster.
    ///
    /// This becomes the `ETCD_NAME` of the node once it joins.
    pub name: String,
    /// The hostname or IP address etcd clients and peers use to reach the instance.
    ///
    /// This should be of the form `hostname` or `x.x.x.x`, without a scheme or port.
    pub endpoint: String,
}

impl Instance {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }

    #[inline]
    /// The URL other etcd members use to replicate to this instance.
    pub fn peer_url(&self, scheme: Scheme) -> String {
        urls::peer_url(scheme, &self.endpoint)
    }

    #[inline]
    /// The URL etcd clients use to talk to this instance.
    pub fn client_url(&self, scheme: Scheme) -> String {
        urls::client_url(scheme, &self.endpoint)
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.endpoint)
    }
}
