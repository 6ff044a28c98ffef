//! HTTPS clients configured from the node's SSL directory.
//!
//! Two independent decisions are made from what exists on disk:
//!
//! - CA bundle present: verify the server against it ([`VerifyMode::Peer`]).
//!   Absent: accept any server certificate ([`VerifyMode::None`]).
//! - Client key and certificate both present: present them (mutual TLS).
//!   Otherwise connect anonymously.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nodessl_common::SslLayout;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};

use crate::error::{ClientError, Result};
use crate::verifier::NoVerification;

/// How the server certificate is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    Peer,
    None,
}

/// Builds [`HttpsClient`]s. Construction does no network I/O.
#[derive(Debug, Clone, Default)]
pub struct HttpsClientFactory {
    timeout_connect: Option<Duration>,
    timeout_read: Option<Duration>,
    pinned: HashMap<String, IpAddr>,
}

impl HttpsClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout_connect(mut self, timeout: Duration) -> Self {
        self.timeout_connect = Some(timeout);
        self
    }

    pub fn timeout_read(mut self, timeout: Duration) -> Self {
        self.timeout_read = Some(timeout);
        self
    }

    /// Connect to `addr` whenever `host` is requested, bypassing DNS.
    /// TLS still verifies against `host`.
    pub fn resolve(mut self, host: impl Into<String>, addr: IpAddr) -> Self {
        self.pinned.insert(host.into(), addr);
        self
    }

    pub fn build(&self, layout: &SslLayout) -> Result<HttpsClient> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ClientError::Tls(e.to_string()))?;

        let ca_path = layout.ca_path();
        let (builder, verify_mode, ca_file) = if ca_path.exists() {
            let roots = load_roots(&ca_path)?;
            (builder.with_root_certificates(roots), VerifyMode::Peer, Some(ca_path))
        } else {
            let builder = builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerification::new()));
            (builder, VerifyMode::None, None)
        };

        let (config, client_cert) =
            if layout.has_client_private_key() && layout.has_client_public_cert() {
                let chain = load_certs(&layout.client_public_cert())?;
                let key = load_key(&layout.client_private_key())?;
                let leaf = chain.first().cloned();
                let config = builder
                    .with_client_auth_cert(chain, key)
                    .map_err(|e| ClientError::Tls(e.to_string()))?;
                (config, leaf)
            } else {
                (builder.with_no_client_auth(), None)
            };

        let mut agent = ureq::AgentBuilder::new().tls_config(Arc::new(config));
        if let Some(timeout) = self.timeout_connect {
            agent = agent.timeout_connect(timeout);
        }
        if let Some(timeout) = self.timeout_read {
            agent = agent.timeout_read(timeout);
        }
        if !self.pinned.is_empty() {
            let pinned = self.pinned.clone();
            agent = agent.resolver(move |netloc: &str| resolve_pinned(&pinned, netloc));
        }

        tracing::debug!(
            ?verify_mode,
            client_cert = client_cert.is_some(),
            ssl_dir = %layout.base_dir().display(),
            "Built HTTPS client"
        );

        Ok(HttpsClient {
            agent: agent.build(),
            verify_mode,
            ca_file,
            client_cert,
        })
    }
}

/// A configured HTTPS agent plus a record of how it was configured.
#[derive(Debug, Clone)]
pub struct HttpsClient {
    agent: ureq::Agent,
    verify_mode: VerifyMode,
    ca_file: Option<PathBuf>,
    client_cert: Option<CertificateDer<'static>>,
}

impl HttpsClient {
    pub fn verify_mode(&self) -> VerifyMode {
        self.verify_mode
    }

    /// CA bundle the server is verified against, if any.
    pub fn ca_file(&self) -> Option<&Path> {
        self.ca_file.as_deref()
    }

    pub fn has_client_cert(&self) -> bool {
        self.client_cert.is_some()
    }

    /// DER of the client certificate presented for mutual TLS.
    pub fn client_cert_der(&self) -> Option<&[u8]> {
        self.client_cert.as_ref().map(|c| c.as_ref())
    }

    pub fn agent(&self) -> &ureq::Agent {
        &self.agent
    }
}

fn resolve_pinned(
    pinned: &HashMap<String, IpAddr>,
    netloc: &str,
) -> std::io::Result<Vec<SocketAddr>> {
    if let Some((host, port)) = netloc.rsplit_once(':') {
        if let Some(ip) = pinned.get(host) {
            let port = port.parse().map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("bad port in {netloc}"))
            })?;
            return Ok(vec![SocketAddr::new(*ip, port)]);
        }
    }
    netloc.to_socket_addrs().map(Iterator::collect)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(ClientError::Tls(format!(
            "no certificates in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_roots(path: &Path) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots
            .add(cert)
            .map_err(|e| ClientError::Tls(format!("{}: {e}", path.display())))?;
    }
    Ok(roots)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?
        .ok_or_else(|| ClientError::Tls(format!("no private key in {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodessl_common::Certname;
    use nodessl_testkit::fixtures;

    fn layout(dir: &Path) -> SslLayout {
        let layout = SslLayout::new(dir, Certname::new("rip.mcollective").unwrap());
        layout.make_ssl_dirs().unwrap();
        layout
    }

    #[test]
    fn no_ca_means_no_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let client = HttpsClientFactory::new().build(&layout(tmp.path())).unwrap();

        assert_eq!(client.verify_mode(), VerifyMode::None);
        assert_eq!(client.ca_file(), None);
        assert!(!client.has_client_cert());
    }

    #[test]
    fn ca_present_means_peer_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        fixtures::install_ca(&layout);

        let client = HttpsClientFactory::new().build(&layout).unwrap();
        assert_eq!(client.verify_mode(), VerifyMode::Peer);
        assert_eq!(client.ca_file(), Some(layout.ca_path().as_path()));
        assert!(!client.has_client_cert());
    }

    #[test]
    fn key_and_cert_enable_mutual_tls() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        fixtures::install_ca(&layout);
        fixtures::install_client_key(&layout);
        fixtures::install_client_cert(&layout);

        let client = HttpsClientFactory::new().build(&layout).unwrap();
        assert_eq!(client.verify_mode(), VerifyMode::Peer);
        assert!(client.has_client_cert());
        assert_eq!(
            client.client_cert_der().unwrap(),
            fixtures::client_cert_der().as_slice()
        );
    }

    #[test]
    fn key_without_cert_stays_anonymous() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        fixtures::install_client_key(&layout);

        let client = HttpsClientFactory::new().build(&layout).unwrap();
        assert!(!client.has_client_cert());
        assert_eq!(client.verify_mode(), VerifyMode::None);
    }

    #[test]
    fn cert_without_ca_still_presented() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        fixtures::install_client_key(&layout);
        fixtures::install_client_cert(&layout);

        let client = HttpsClientFactory::new().build(&layout).unwrap();
        assert_eq!(client.verify_mode(), VerifyMode::None);
        assert!(client.has_client_cert());
    }

    #[test]
    fn pinned_hosts_skip_dns() {
        let pinned = HashMap::from([("puppetca".to_string(), IpAddr::from([127, 0, 0, 1]))]);
        assert_eq!(
            resolve_pinned(&pinned, "puppetca:8140").unwrap(),
            vec![SocketAddr::from(([127, 0, 0, 1], 8140))]
        );
        assert!(resolve_pinned(&pinned, "puppetca:port").is_err());
        assert!(!resolve_pinned(&pinned, "127.0.0.1:8140").unwrap().is_empty());
    }

    #[test]
    fn unreadable_ca_bundle_is_a_tls_error() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        std::fs::write(layout.ca_path(), "not a pem").unwrap();

        assert!(matches!(
            HttpsClientFactory::new().build(&layout),
            Err(ClientError::Tls(_))
        ));
    }
}
