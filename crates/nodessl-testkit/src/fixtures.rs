//! Fixture files under the workspace `fixtures/` directory.

use std::path::{Path, PathBuf};

use nodessl_common::SslLayout;

/// CA that signed every other fixture certificate.
pub const CA_CERT: &str = "ca_crt.pem";
/// An unrelated CA.
pub const OTHER_CA_CERT: &str = "other_ca_crt.pem";
/// PKCS#1 key for `rip.mcollective`.
pub const CLIENT_KEY: &str = "rip.mcollective.key";
/// `/CN=rip.mcollective`, issued by [`CA_CERT`].
pub const CLIENT_CERT: &str = "rip.mcollective.pem";
pub const SERVER_KEY: &str = "localhost.key";
/// `localhost` / `127.0.0.1`, issued by [`CA_CERT`].
pub const SERVER_CERT: &str = "localhost.pem";
/// Same key as [`SERVER_CERT`], issued by [`OTHER_CA_CERT`].
pub const SERVER_CERT_OTHER_CA: &str = "localhost_other.pem";
/// A `/puppet/v3/environment/production` response.
pub const SAMPLE_ENVIRONMENT: &str = "sample_app.json";

pub fn dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures")
}

pub fn path(name: &str) -> PathBuf {
    dir().join(name)
}

pub fn read(name: &str) -> String {
    let path = path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("reading fixture {}: {e}", path.display()))
}

/// DER of the `rip.mcollective` certificate.
pub fn client_cert_der() -> Vec<u8> {
    let pem = read(CLIENT_CERT);
    let cert = rustls_pemfile::certs(&mut pem.as_bytes())
        .next()
        .expect("fixture has a certificate")
        .expect("fixture certificate parses");
    cert.as_ref().to_vec()
}

fn install(name: &str, dest: &Path) {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).expect("create fixture destination");
    }
    std::fs::copy(path(name), dest)
        .unwrap_or_else(|e| panic!("installing {name} to {}: {e}", dest.display()));
}

pub fn install_ca(layout: &SslLayout) {
    install(CA_CERT, &layout.ca_path());
}

pub fn install_client_key(layout: &SslLayout) {
    install(CLIENT_KEY, &layout.client_private_key());
}

pub fn install_client_cert(layout: &SslLayout) {
    install(CLIENT_CERT, &layout.client_public_cert());
}
