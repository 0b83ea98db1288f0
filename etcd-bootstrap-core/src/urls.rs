use std::fmt::{Display, Formatter};

/// The port etcd members use for replication traffic.
pub const PEER_PORT: u16 = 2380;
/// The port etcd clients use for reads and writes.
pub const CLIENT_PORT: u16 = 2379;
/// The loopback host which is always included in the client listen URLs
/// so local health checks keep working.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
/// The URL scheme used for both peer and client traffic.
pub enum Scheme {
    #[default]
    Http,
    /// Used whenever mutual TLS is configured.
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the peer URL for the given host.
pub fn peer_url(scheme: Scheme, host: &str) -> String {
    format!("{}://{}:{}", scheme, host, PEER_PORT)
}

/// Builds the client URL for the given host.
pub fn client_url(scheme: Scheme, host: &str) -> String {
    format!("{}://{}:{}", scheme, host, CLIENT_PORT)
}
