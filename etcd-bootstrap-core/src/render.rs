use std::fmt::{Display, Formatter};

use crate::tls::TlsPaths;
use crate::urls::{self, Scheme, LOOPBACK_HOST};
use crate::{ClusterState, Instance};

pub static INITIAL_CLUSTER_STATE: &str = "ETCD_INITIAL_CLUSTER_STATE";
pub static INITIAL_CLUSTER: &str = "ETCD_INITIAL_CLUSTER";
pub static NAME: &str = "ETCD_NAME";
pub static INITIAL_ADVERTISE_PEER_URLS: &str = "ETCD_INITIAL_ADVERTISE_PEER_URLS";
pub static LISTEN_PEER_URLS: &str = "ETCD_LISTEN_PEER_URLS";
pub static LISTEN_CLIENT_URLS: &str = "ETCD_LISTEN_CLIENT_URLS";
pub static ADVERTISE_CLIENT_URLS: &str = "ETCD_ADVERTISE_CLIENT_URLS";
pub static TRUSTED_CA_FILE: &str = "ETCD_TRUSTED_CA_FILE";
pub static CERT_FILE: &str = "ETCD_CERT_FILE";
pub static KEY_FILE: &str = "ETCD_KEY_FILE";
pub static CLIENT_CERT_AUTH: &str = "ETCD_CLIENT_CERT_AUTH";
pub static PEER_TRUSTED_CA_FILE: &str = "ETCD_PEER_TRUSTED_CA_FILE";
pub static PEER_CERT_FILE: &str = "ETCD_PEER_CERT_FILE";
pub static PEER_KEY_FILE: &str = "ETCD_PEER_KEY_FILE";
pub static PEER_CLIENT_CERT_AUTH: &str = "ETCD_PEER_CLIENT_CERT_AUTH";

#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// The rendered etcd environment.
///
/// Entries keep their insertion order and are displayed as
/// newline separated `KEY=VALUE` lines, including a trailing newline.
pub struct RenderedConfig {
    entries: Vec<(&'static str, String)>,
}

impl RenderedConfig {
    fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.entries.push((key, value.into()));
    }

    /// Gets the value of the first entry with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// An iterator over all entries in the order they are rendered.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Display for RenderedConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (key, value) in self.entries.iter() {
            writeln!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Renders the etcd environment for the local instance.
///
/// `ETCD_INITIAL_CLUSTER` is restricted to the `instances` whose peer URL is in
/// `peer_urls`, in the order the directory listed them. This function does
/// no I/O, identical inputs always produce identical output.
pub fn render(
    state: ClusterState,
    peer_urls: &[String],
    instances: &[Instance],
    local: &Instance,
    tls: Option<&TlsPaths>,
) -> RenderedConfig {
    let scheme = scheme_for(tls);
    let mut config = RenderedConfig::default();

    config.push(INITIAL_CLUSTER_STATE, state.as_str());
    config.push(
        INITIAL_CLUSTER,
        initial_cluster(scheme, peer_urls, instances),
    );

    let local_peer_url = local.peer_url(scheme);
    let local_client_url = local.client_url(scheme);
    config.push(NAME, local.name.as_str());
    config.push(INITIAL_ADVERTISE_PEER_URLS, local_peer_url.as_str());
    config.push(LISTEN_PEER_URLS, local_peer_url);
    config.push(
        LISTEN_CLIENT_URLS,
        format!(
            "{},{}",
            local_client_url,
            urls::client_url(scheme, LOOPBACK_HOST)
        ),
    );
    config.push(ADVERTISE_CLIENT_URLS, local_client_url);

    if let Some(tls) = tls {
        let client = tls.client();
        config.push(TRUSTED_CA_FILE, client.ca.display().to_string());
        config.push(CERT_FILE, client.cert.display().to_string());
        config.push(KEY_FILE, client.key.display().to_string());
        config.push(CLIENT_CERT_AUTH, "true");

        let peer = tls.peer();
        config.push(PEER_TRUSTED_CA_FILE, peer.ca.display().to_string());
        config.push(PEER_CERT_FILE, peer.cert.display().to_string());
        config.push(PEER_KEY_FILE, peer.key.display().to_string());
        config.push(PEER_CLIENT_CERT_AUTH, "true");
    }

    config
}

#[inline]
/// The scheme used for every rendered and queried URL.
pub fn scheme_for(tls: Option<&TlsPaths>) -> Scheme {
    if tls.is_some() {
        Scheme::Https
    } else {
        Scheme::Http
    }
}

fn initial_cluster(scheme: Scheme, peer_urls: &[String], instances: &[Instance]) -> String {
    instances
        .iter()
        .filter_map(|instance| {
            let peer_url = instance.peer_url(scheme);
            if peer_urls.contains(&peer_url) {
                Some(format!("{}={}", instance.name, peer_url))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instances() -> Vec<Instance> {
        vec![
            Instance::new("e1", "10.50.99.1"),
            Instance::new("e2", "10.50.199.1"),
            Instance::new("e3", "10.50.155.1"),
        ]
    }

    #[test]
    fn test_render_new_cluster() {
        let instances = instances();
        let peer_urls = instances
            .iter()
            .map(|i| i.peer_url(Scheme::Http))
            .collect::<Vec<_>>();

        let config = render(ClusterState::New, &peer_urls, &instances, &instances[1], None);
        assert_eq!(
            config.to_string(),
            "ETCD_INITIAL_CLUSTER_STATE=new\n\
             ETCD_INITIAL_CLUSTER=e1=http://10.50.99.1:2380,e2=http://10.50.199.1:2380,e3=http://10.50.155.1:2380\n\
             ETCD_NAME=e2\n\
             ETCD_INITIAL_ADVERTISE_PEER_URLS=http://10.50.199.1:2380\n\
             ETCD_LISTEN_PEER_URLS=http://10.50.199.1:2380\n\
             ETCD_LISTEN_CLIENT_URLS=http://10.50.199.1:2379,http://127.0.0.1:2379\n\
             ETCD_ADVERTISE_CLIENT_URLS=http://10.50.199.1:2379\n",
        );
    }

    #[test]
    fn test_initial_cluster_is_filtered_and_ordered_by_directory() {
        let instances = instances();
        // Reversed to make sure the directory order wins.
        let peer_urls = vec![
            "http://10.50.199.1:2380".to_string(),
            "http://10.50.99.1:2380".to_string(),
            "http://10.50.65.2:2380".to_string(),
        ];

        let config =
            render(ClusterState::Existing, &peer_urls, &instances, &instances[1], None);
        assert_eq!(config.get(INITIAL_CLUSTER_STATE), Some("existing"));
        assert_eq!(
            config.get(INITIAL_CLUSTER),
            Some("e1=http://10.50.99.1:2380,e2=http://10.50.199.1:2380"),
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let instances = instances();
        let peer_urls = vec!["http://10.50.99.1:2380".to_string()];

        let first = render(ClusterState::Existing, &peer_urls, &instances, &instances[0], None);
        let second = render(ClusterState::Existing, &peer_urls, &instances, &instances[0], None);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_render_with_tls() {
        let file = tempfile::NamedTempFile::new().expect("Create temp file");
        let path = file.path();
        let tls = TlsPaths::new(path, path, path, path, path, path)
            .expect("TLS paths should be valid");

        let instances = instances();
        let peer_urls = instances
            .iter()
            .map(|i| i.peer_url(Scheme::Https))
            .collect::<Vec<_>>();
        let config = render(
            ClusterState::New,
            &peer_urls,
            &instances,
            &instances[0],
            Some(&tls),
        );

        assert_eq!(
            config.get(INITIAL_CLUSTER),
            Some("e1=https://10.50.99.1:2380,e2=https://10.50.199.1:2380,e3=https://10.50.155.1:2380"),
        );
        assert_eq!(
            config.get(LISTEN_CLIENT_URLS),
            Some("https://10.50.99.1:2379,https://127.0.0.1:2379"),
        );
        assert_eq!(config.get(CLIENT_CERT_AUTH), Some("true"));
        assert_eq!(config.get(PEER_CLIENT_CERT_AUTH), Some("true"));
        assert_eq!(config.get(PEER_KEY_FILE), Some(path.display().to_string().as_str()));
        assert_eq!(config.len(), 15);

        let keys = config.iter().map(|(k, _)| k).collect::<Vec<_>>();
        assert_eq!(keys[7..], [
            TRUSTED_CA_FILE,
            CERT_FILE,
            KEY_FILE,
            CLIENT_CERT_AUTH,
            PEER_TRUSTED_CA_FILE,
            PEER_CERT_FILE,
            PEER_KEY_FILE,
            PEER_CLIENT_CERT_AUTH,
        ]);
        assert!(config.to_string().ends_with("ETCD_PEER_CLIENT_CERT_AUTH=true\n"));
    }
}
