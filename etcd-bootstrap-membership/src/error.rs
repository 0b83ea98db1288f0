use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
/// A failure talking to the etcd members API.
pub enum MembersError {
    #[error("No etcd endpoints were configured")]
    NoEndpoints,

    #[error("Unable to load {name} from {}: {error}", path.display())]
    /// A certificate file could not be read when building the client.
    CertificateIo {
        name: &'static str,
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Unable to parse {name} from {}: {error}", path.display())]
    /// A certificate file did not contain valid PEM data.
    InvalidCertificate {
        name: &'static str,
        path: PathBuf,
        #[source]
        error: reqwest::Error,
    },

    #[error("Unable to build the etcd HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("{endpoint} is unreachable: {error}")]
    /// Nothing is listening on the endpoint.
    ///
    /// This is expected while a brand new cluster is still booting.
    Unreachable {
        endpoint: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("There is an error with the TLS certificates when talking to {endpoint}: {error}")]
    Tls {
        endpoint: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("Request to {endpoint} failed: {error}")]
    Request {
        endpoint: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{endpoint} responded with unexpected status {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("Unable to decode the response from {endpoint}: {error}")]
    Decode {
        endpoint: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("Expected a single peer URL, but found {peer_urls:?} for {id}")]
    MultiplePeerUrls { id: String, peer_urls: Vec<String> },

    #[error("All etcd endpoints failed: [{}]", join_errors(.0))]
    AllEndpointsFailed(Vec<MembersError>),
}

impl MembersError {
    /// Classifies a transport level failure.
    pub(crate) fn transport(endpoint: &str, error: reqwest::Error) -> Self {
        let endpoint = endpoint.to_string();

        if error.is_decode() {
            return Self::Decode { endpoint, error };
        }

        match classify(&error) {
            Failure::Tls => Self::Tls { endpoint, error },
            Failure::Unreachable => Self::Unreachable { endpoint, error },
            Failure::Other if error.is_connect() && error.is_timeout() => {
                Self::Unreachable { endpoint, error }
            },
            Failure::Other => Self::Request { endpoint, error },
        }
    }

    /// Returns if the failure only means no etcd process is listening yet.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Unreachable { .. } => true,
            Self::AllEndpointsFailed(errors) => {
                !errors.is_empty() && errors.iter().all(|e| e.is_unreachable())
            },
            _ => false,
        }
    }

    /// Returns if the failure was caused by the TLS certificates.
    pub fn is_tls(&self) -> bool {
        match self {
            Self::Tls { .. } => true,
            Self::AllEndpointsFailed(errors) => errors.iter().any(|e| e.is_tls()),
            _ => false,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Failure {
    Unreachable,
    Tls,
    Other,
}

fn classify(error: &(dyn StdError + 'static)) -> Failure {
    let chain = error_chain(error);

    let tls = chain.iter().any(|e| {
        e.is::<rustls::Error>()
            || e.downcast_ref::<io::Error>()
                .map_or(false, |e| e.kind() == io::ErrorKind::InvalidData)
    });
    if tls {
        return Failure::Tls;
    }

    let unreachable = chain
        .iter()
        .filter_map(|e| e.downcast_ref::<io::Error>())
        .any(|e| is_unreachable_kind(e.kind()));
    if unreachable {
        return Failure::Unreachable;
    }

    Failure::Other
}

fn is_unreachable_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::TimedOut
    )
}

/// Flattens the source chain of an error.
///
/// `io::Error` does not report a wrapped error as its source, only the
/// wrapped error's own source, so wrapped errors are visited explicitly.
fn error_chain<'a>(error: &'a (dyn StdError + 'static)) -> Vec<&'a (dyn StdError + 'static)> {
    let mut chain = Vec::new();
    let mut next = Some(error);
    while let Some(current) = next {
        chain.push(current);
        next = match current.downcast_ref::<io::Error>().and_then(|e| e.get_ref()) {
            Some(inner) => Some(inner as &(dyn StdError + 'static)),
            None => current.source(),
        };
    }
    chain
}

fn join_errors(errors: &[MembersError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_listening_is_unreachable() {
        for kind in [
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::HostUnreachable,
            io::ErrorKind::NetworkUnreachable,
            io::ErrorKind::TimedOut,
        ] {
            let error = io::Error::from(kind);
            assert_eq!(classify(&error), Failure::Unreachable, "{:?}", kind);
        }
    }

    #[test]
    fn test_wrapped_io_errors_are_classified() {
        let error = io::Error::new(
            io::ErrorKind::Other,
            io::Error::from(io::ErrorKind::HostUnreachable),
        );
        assert_eq!(classify(&error), Failure::Unreachable);

        let error = io::Error::new(io::ErrorKind::Other, "connection closed before message completed");
        assert_eq!(classify(&error), Failure::Other);

        let error = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(classify(&error), Failure::Other);
    }

    #[test]
    fn test_certificate_errors_are_tls() {
        let rejected = rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer);
        let error = io::Error::new(io::ErrorKind::Other, rejected);
        assert_eq!(classify(&error), Failure::Tls);

        let error = rustls::Error::InvalidCertificate(rustls::CertificateError::BadSignature);
        assert_eq!(classify(&error), Failure::Tls);
    }

    #[test]
    fn test_cluster_wide_failures() {
        let server_error = || MembersError::Status {
            endpoint: "http://10.0.0.1:2379".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };

        assert!(!MembersError::AllEndpointsFailed(Vec::new()).is_unreachable());
        assert!(!MembersError::AllEndpointsFailed(vec![server_error()]).is_unreachable());
        assert!(!MembersError::AllEndpointsFailed(vec![server_error()]).is_tls());
    }
}
