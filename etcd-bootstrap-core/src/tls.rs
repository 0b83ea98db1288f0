use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsConfigError {
    #[error("The {name} path is required when TLS is enabled")]
    /// A required certificate path was empty.
    Missing { name: &'static str },

    #[error("{name} ({}) is inaccessible: {error}", path.display())]
    /// A certificate path could not be read.
    Inaccessible {
        name: &'static str,
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// The certificate authority, certificate and key used on one etcd port.
pub struct CertificateFiles {
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// Mutual TLS configuration for the client and peer ports.
///
/// Every path is checked for readability when the configuration is built,
/// rather than when etcd or the membership client first uses it.
pub struct TlsPaths {
    client: CertificateFiles,
    peer: CertificateFiles,
}

impl TlsPaths {
    /// Validates and creates a new set of TLS paths.
    pub fn new(
        client_ca: impl Into<PathBuf>,
        client_cert: impl Into<PathBuf>,
        client_key: impl Into<PathBuf>,
        peer_ca: impl Into<PathBuf>,
        peer_cert: impl Into<PathBuf>,
        peer_key: impl Into<PathBuf>,
    ) -> Result<Self, TlsConfigError> {
        let client = CertificateFiles {
            ca: checked("client CA", client_ca.into())?,
            cert: checked("client certificate", client_cert.into())?,
            key: checked("client key", client_key.into())?,
        };
        let peer = CertificateFiles {
            ca: checked("peer CA", peer_ca.into())?,
            cert: checked("peer certificate", peer_cert.into())?,
            key: checked("peer key", peer_key.into())?,
        };

        Ok(Self { client, peer })
    }

    #[inline]
    /// The files used on the client port (2379).
    pub fn client(&self) -> &CertificateFiles {
        &self.client
    }

    #[inline]
    /// The files used on the peer port (2380).
    ///
    /// These double as the identity used when talking to the members API.
    pub fn peer(&self) -> &CertificateFiles {
        &self.peer
    }
}

fn checked(name: &'static str, path: PathBuf) -> Result<PathBuf, TlsConfigError> {
    if path.as_os_str().is_empty() || is_blank(&path) {
        return Err(TlsConfigError::Missing { name });
    }

    // Opening the file catches permission problems as well as missing files.
    if let Err(error) = fs::File::open(&path) {
        return Err(TlsConfigError::Inaccessible { name, path, error });
    }

    Ok(path)
}

fn is_blank(path: &Path) -> bool {
    path.to_str().map(|s| s.trim().is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_temp() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Create temp file");
        file.write_all(b"-----BEGIN CERTIFICATE-----\n")
            .expect("Write temp file");
        file
    }

    #[test]
    fn test_valid_paths() {
        let files = [(); 6].map(|_| write_temp());
        let paths = files.each_ref().map(|file| file.path());
        let tls = TlsPaths::new(
            paths[0], paths[1], paths[2], paths[3], paths[4], paths[5],
        )
        .expect("All paths should be accepted");

        assert_eq!(tls.client().ca, paths[0]);
        assert_eq!(tls.peer().key, paths[5]);
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let file = write_temp();
        let path = file.path();
        let err = TlsPaths::new(path, "", path, path, path, path)
            .expect_err("Empty path should be rejected");
        assert!(
            matches!(err, TlsConfigError::Missing { name: "client certificate" }),
            "Unexpected error: {:?}",
            err,
        );
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let file = write_temp();
        let path = file.path();
        let err = TlsPaths::new(
            path,
            path,
            path,
            "/definitely/not/a/real/ca.pem",
            path,
            path,
        )
        .expect_err("Missing file should be rejected");
        assert!(
            matches!(err, TlsConfigError::Inaccessible { name: "peer CA", .. }),
            "Unexpected error: {:?}",
            err,
        );
    }
}
