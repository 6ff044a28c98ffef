//! A TLS mock of the Puppet server and CA.
//!
//! Every request is recorded. Responses are canned per `(method, path)`;
//! anything unregistered gets a 404, which is also what the CA answers for
//! an unsigned certificate.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::net::TcpListener;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use rustls::client::danger::HandshakeSignatureValid;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::server::WebPkiClientVerifier;
use rustls::{DigitallySignedStruct, DistinguishedName, RootCertStore, ServerConfig, SignatureScheme};

use crate::fixtures;

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    /// Header value by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then_some(value)
        })
    }
}

#[derive(Default)]
struct Shared {
    routes: Mutex<HashMap<(String, String), (u16, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MockPuppet {
    port: u16,
    shared: Arc<Shared>,
    client_certs: Arc<Mutex<Vec<Vec<u8>>>>,
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl MockPuppet {
    /// Serve with a certificate issued by the fixture CA.
    pub fn start() -> Self {
        Self::start_with(
            &fixtures::path(fixtures::SERVER_CERT),
            &fixtures::path(fixtures::SERVER_KEY),
        )
    }

    /// Serve with a certificate issued by an unrelated CA.
    pub fn start_untrusted() -> Self {
        Self::start_with(
            &fixtures::path(fixtures::SERVER_CERT_OTHER_CA),
            &fixtures::path(fixtures::SERVER_KEY),
        )
    }

    /// Serve with a certificate issued by the fixture CA and refuse any
    /// client that does not present a certificate from that CA.
    pub fn start_mutual() -> Self {
        let client_certs = Arc::new(Mutex::new(Vec::new()));
        let inner = WebPkiClientVerifier::builder_with_provider(
            Arc::new(fixture_roots()),
            Arc::new(rustls::crypto::ring::default_provider()),
        )
        .build()
        .expect("client verifier");
        let verifier = Arc::new(RecordingVerifier {
            inner,
            seen: client_certs.clone(),
        });
        let config = server_config(
            &fixtures::path(fixtures::SERVER_CERT),
            &fixtures::path(fixtures::SERVER_KEY),
            Some(verifier),
        );
        Self::serve(config, client_certs)
    }

    pub fn start_with(cert: &Path, key: &Path) -> Self {
        Self::serve(server_config(cert, key, None), Arc::default())
    }

    fn serve(config: ServerConfig, client_certs: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock listener");
        listener
            .set_nonblocking(true)
            .expect("nonblocking mock listener");
        let port = listener.local_addr().expect("mock address").port();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("mock runtime");
        let tls = RustlsConfig::from_config(Arc::new(config));

        let shared = Arc::new(Shared::default());
        let app = Router::new()
            .fallback(respond)
            .with_state(shared.clone());

        let handle = Handle::new();
        let server = axum_server::from_tcp_rustls(listener, tls)
            .handle(handle.clone())
            .serve(app.into_make_service());

        let thread = std::thread::spawn(move || {
            if let Err(e) = runtime.block_on(server) {
                tracing::error!(error = %e, "Mock Puppet server failed");
            }
        });

        tracing::debug!(port, "Mock Puppet server listening");
        Self {
            port,
            shared,
            client_certs,
            handle,
            thread: Some(thread),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Hostname matching the server certificate's SAN.
    pub fn host(&self) -> &'static str {
        "localhost"
    }

    /// Answer `method path` with `status` and `body` from now on.
    pub fn on(&self, method: &str, path: &str, status: u16, body: &str) {
        self.shared
            .routes
            .lock()
            .expect("routes lock")
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().expect("requests lock").clone()
    }

    /// DER of every client certificate accepted during a handshake.
    pub fn client_certs(&self) -> Vec<Vec<u8>> {
        self.client_certs.lock().expect("client certs lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for MockPuppet {
    fn drop(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn server_config(
    cert: &Path,
    key: &Path,
    client_auth: Option<Arc<dyn ClientCertVerifier>>,
) -> ServerConfig {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("mock protocol versions");
    let builder = match client_auth {
        Some(verifier) => builder.with_client_cert_verifier(verifier),
        None => builder.with_no_client_auth(),
    };
    builder
        .with_single_cert(read_certs(cert), read_key(key))
        .expect("mock server certificate")
}

fn read_certs(path: &Path) -> Vec<CertificateDer<'static>> {
    let mut reader = BufReader::new(File::open(path).expect("open certificate"));
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .expect("parse certificate")
}

fn read_key(path: &Path) -> PrivateKeyDer<'static> {
    let mut reader = BufReader::new(File::open(path).expect("open key"));
    rustls_pemfile::private_key(&mut reader)
        .expect("parse key")
        .expect("key present")
}

fn fixture_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    for cert in read_certs(&fixtures::path(fixtures::CA_CERT)) {
        roots.add(cert).expect("fixture CA");
    }
    roots
}

/// Delegates to webpki and keeps each end-entity certificate it accepts.
#[derive(Debug)]
struct RecordingVerifier {
    inner: Arc<dyn ClientCertVerifier>,
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ClientCertVerifier for RecordingVerifier {
    fn offer_client_auth(&self) -> bool {
        self.inner.offer_client_auth()
    }

    fn client_auth_mandatory(&self) -> bool {
        self.inner.client_auth_mandatory()
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        self.inner.root_hint_subjects()
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        let verified = self
            .inner
            .verify_client_cert(end_entity, intermediates, now)?;
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(end_entity.as_ref().to_vec());
        }
        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

async fn respond(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect(),
        body,
    };

    let key = (recorded.method.clone(), recorded.path.clone());
    if let Ok(mut requests) = shared.requests.lock() {
        requests.push(recorded);
    }

    let canned = shared
        .routes
        .lock()
        .ok()
        .and_then(|routes| routes.get(&key).cloned());
    match canned {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        ),
        None => (StatusCode::NOT_FOUND, "Not Found".to_string()),
    }
}
