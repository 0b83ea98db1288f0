use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use etcd_bootstrap_core::{scheme_for, Instance, Member, MembershipClient, TlsPaths};
use reqwest::{Certificate, Identity, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::MembersError;

/// How long a single request against an etcd endpoint may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

static MEMBERS_PATH: &str = "/v2/members";

#[derive(Debug, Clone)]
/// Configuration for the members API client.
pub struct MembersClientConfig {
    /// The timeout applied to connecting and to each individual request.
    pub timeout: Duration,
    /// Mutual TLS settings. The peer CA, certificate and key are used to
    /// talk to the cluster.
    pub tls: Option<TlsPaths>,
}

impl Default for MembersClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            tls: None,
        }
    }
}

impl MembersClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tls(mut self, tls: TlsPaths) -> Self {
        self.tls = Some(tls);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MemberList {
    #[serde(default)]
    members: Option<Vec<EtcdMember>>,
}

#[derive(Debug, Clone, Deserialize)]
struct EtcdMember {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "peerURLs", default)]
    peer_urls: Vec<String>,
}

impl EtcdMember {
    fn single_peer_url(&self) -> Result<&str, MembersError> {
        match self.peer_urls.as_slice() {
            [peer_url] => Ok(peer_url),
            _ => Err(MembersError::MultiplePeerUrls {
                id: self.id.clone(),
                peer_urls: self.peer_urls.clone(),
            }),
        }
    }

    fn matches(&self, member: &Member) -> bool {
        match member.name() {
            Some(name) => self.name == name,
            None => self.name.is_empty() && self.peer_urls.contains(&member.peer_url),
        }
    }
}

#[derive(Debug, Serialize)]
struct AddMemberRequest<'a> {
    #[serde(rename = "peerURLs")]
    peer_urls: [&'a str; 1],
}

#[derive(Debug, Clone)]
/// A client for the etcd v2 members API.
///
/// Requests go to each endpoint in turn until one of them answers,
/// so a cluster which has lost some of its members can still be reconciled.
pub struct EtcdMembersClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
}

impl EtcdMembersClient {
    /// Creates a new client for the given client URLs, e.g. `http://10.0.0.1:2379`.
    ///
    /// Certificates are loaded immediately, so unreadable or malformed files
    /// are reported here rather than on the first request.
    pub fn new(
        endpoints: impl IntoIterator<Item = impl Into<String>>,
        cfg: MembersClientConfig,
    ) -> Result<Self, MembersError> {
        let endpoints = endpoints
            .into_iter()
            .map(|endpoint| endpoint.into().trim_end_matches('/').to_string())
            .collect::<Vec<_>>();
        if endpoints.is_empty() {
            return Err(MembersError::NoEndpoints);
        }

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(cfg.timeout)
            .timeout(cfg.timeout);

        if let Some(tls) = cfg.tls.as_ref() {
            let peer = tls.peer();

            let ca = read_file("peer CA", &peer.ca)?;
            builder = builder.tls_built_in_root_certs(false);
            for cert in split_pem_certificates(&ca) {
                let cert = Certificate::from_pem(cert.as_bytes()).map_err(|error| {
                    MembersError::InvalidCertificate {
                        name: "peer CA",
                        path: peer.ca.clone(),
                        error,
                    }
                })?;
                builder = builder.add_root_certificate(cert);
            }

            let mut identity = read_file("peer certificate", &peer.cert)?;
            identity.push('\n');
            identity.push_str(&read_file("peer key", &peer.key)?);
            let identity = Identity::from_pem(identity.as_bytes()).map_err(|error| {
                MembersError::InvalidCertificate {
                    name: "peer certificate and key",
                    path: peer.cert.clone(),
                    error,
                }
            })?;
            builder = builder.identity(identity);
        }

        let http = builder.build().map_err(MembersError::Build)?;

        Ok(Self { http, endpoints })
    }

    /// Creates a client which talks to the client URL of every instance.
    ///
    /// The scheme follows the TLS configuration.
    pub fn for_instances(
        instances: &[Instance],
        cfg: MembersClientConfig,
    ) -> Result<Self, MembersError> {
        let scheme = scheme_for(cfg.tls.as_ref());
        let endpoints = instances
            .iter()
            .map(|instance| instance.client_url(scheme))
            .collect::<Vec<_>>();
        Self::new(endpoints, cfg)
    }

    #[inline]
    /// The client URLs requests are sent to, in order.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Lists the raw members from the first endpoint which answers.
    async fn list_raw(&self) -> Result<Vec<EtcdMember>, MembersError> {
        let mut failures = Vec::with_capacity(self.endpoints.len());
        for endpoint in self.endpoints.iter() {
            match self.list_from(endpoint).await {
                Ok(members) => return Ok(members),
                Err(error) => {
                    debug!(endpoint = %endpoint, error = %error, "Unable to list members.");
                    failures.push(error);
                },
            }
        }

        Err(MembersError::AllEndpointsFailed(failures))
    }

    async fn list_from(&self, endpoint: &str) -> Result<Vec<EtcdMember>, MembersError> {
        let url = format!("{}{}", endpoint, MEMBERS_PATH);
        let response = send(endpoint, self.http.get(url)).await?;
        let response = check_status(endpoint, response).await?;
        let list = response
            .json::<MemberList>()
            .await
            .map_err(|e| MembersError::transport(endpoint, e))?;
        Ok(list.members.unwrap_or_default())
    }

    async fn add_to(&self, endpoint: &str, peer_url: &str) -> Result<(), MembersError> {
        let url = format!("{}{}", endpoint, MEMBERS_PATH);
        let body = AddMemberRequest {
            peer_urls: [peer_url],
        };
        let response = send(endpoint, self.http.post(url).json(&body)).await?;
        check_status(endpoint, response).await?;
        Ok(())
    }

    async fn remove_from(&self, endpoint: &str, id: &str) -> Result<(), MembersError> {
        let url = format!("{}{}/{}", endpoint, MEMBERS_PATH, id);
        let response = send(endpoint, self.http.delete(url)).await?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            info!(member_id = %id, "Member has already been removed.");
            return Ok(());
        }

        check_status(endpoint, response).await?;
        Ok(())
    }
}

#[async_trait]
impl MembershipClient for EtcdMembersClient {
    type Error = MembersError;

    async fn list_members(&self) -> Result<Vec<Member>, Self::Error> {
        let raw = match self.list_raw().await {
            Ok(raw) => raw,
            Err(error) if error.is_unreachable() => {
                info!(
                    error = %error,
                    "Detected cluster errors, this is normal when bootstrapping a new cluster.",
                );
                return Ok(Vec::new());
            },
            Err(error) => {
                if error.is_tls() {
                    error!(error = %error, "etcd rejected the TLS handshake, check the peer certificates.");
                }
                return Err(error);
            },
        };

        raw.iter()
            .map(|member| {
                let peer_url = member.single_peer_url()?;
                Ok::<_, MembersError>(Member::from_reported(member.name.as_str(), peer_url))
            })
            .collect()
    }

    async fn add_member(&self, peer_url: &str) -> Result<(), Self::Error> {
        let mut failures = Vec::new();
        for endpoint in self.endpoints.iter() {
            match self.add_to(endpoint, peer_url).await {
                Ok(()) => {
                    info!(peer_url = %peer_url, endpoint = %endpoint, "Added member.");
                    return Ok(());
                },
                // Another member may still accept the request.
                Err(error) if error.is_unreachable() => failures.push(error),
                Err(error) => return Err(error),
            }
        }

        Err(MembersError::AllEndpointsFailed(failures))
    }

    async fn remove_member(&self, member: &Member) -> Result<(), Self::Error> {
        let raw = self.list_raw().await?;
        let target = match raw.iter().find(|existing| existing.matches(member)) {
            Some(target) => target,
            None => {
                info!(member = %member, "Member has already been removed.");
                return Ok(());
            },
        };

        let mut failures = Vec::new();
        for endpoint in self.endpoints.iter() {
            match self.remove_from(endpoint, &target.id).await {
                Ok(()) => return Ok(()),
                Err(error) if error.is_unreachable() => failures.push(error),
                Err(error) => return Err(error),
            }
        }

        Err(MembersError::AllEndpointsFailed(failures))
    }
}

async fn send(endpoint: &str, request: RequestBuilder) -> Result<Response, MembersError> {
    request
        .send()
        .await
        .map_err(|e| MembersError::transport(endpoint, e))
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, MembersError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(MembersError::Status {
        endpoint: endpoint.to_string(),
        status,
        body: body.trim().to_string(),
    })
}

fn read_file(name: &'static str, path: &Path) -> Result<String, MembersError> {
    fs::read_to_string(path).map_err(|error| MembersError::CertificateIo {
        name,
        path: path.to_path_buf(),
        error,
    })
}

/// Splits a PEM bundle into its individual certificates.
fn split_pem_certificates(bundle: &str) -> Vec<String> {
    const END: &str = "-----END CERTIFICATE-----";

    bundle
        .split_inclusive(END)
        .filter(|block| block.contains("-----BEGIN CERTIFICATE-----"))
        .map(|block| block.trim().to_string())
        .collect()
}
