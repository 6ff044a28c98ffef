//! Certificate inspection and subject rendering.

use sha2::{Digest, Sha256};
use x509_parser::objects::{oid2abbrev, oid_registry};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::x509::X509Name;

use crate::keys::CryptoError;

/// Summary of a PEM certificate, for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// OpenSSL-style subject, e.g. `/CN=rip.mcollective`.
    pub subject: String,
    pub issuer: String,
    pub not_after: String,
    /// Puppet-style SHA-256 fingerprint (`AA:BB:...`).
    pub fingerprint: String,
}

impl CertificateInfo {
    /// Inspect the first certificate in a PEM document.
    pub fn from_pem(pem: &[u8]) -> Result<Self, CryptoError> {
        let (_, pem) =
            parse_x509_pem(pem).map_err(|e| CryptoError::Certificate(e.to_string()))?;
        Self::from_der(&pem.contents)
    }

    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| CryptoError::Certificate(e.to_string()))?;

        Ok(Self {
            subject: openssl_name(cert.subject()),
            issuer: openssl_name(cert.issuer()),
            not_after: cert.validity().not_after.to_string(),
            fingerprint: fingerprint_sha256(der),
        })
    }
}

/// Render a distinguished name the way OpenSSL's legacy one-line format
/// does: `/CN=node/OU=mcollective`.
pub fn openssl_name(name: &X509Name<'_>) -> String {
    let mut out = String::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let oid = attr.attr_type();
            let key = oid2abbrev(oid, oid_registry())
                .map(str::to_string)
                .unwrap_or_else(|_| oid.to_id_string());
            let value = attr.as_str().unwrap_or("?");
            out.push('/');
            out.push_str(&key);
            out.push('=');
            out.push_str(value);
        }
    }
    out
}

/// SHA-256 over DER bytes as colon-separated uppercase hex.
pub fn fingerprint_sha256(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_CERT: &[u8] = include_bytes!("../../../fixtures/rip.mcollective.pem");
    const CA_CERT: &[u8] = include_bytes!("../../../fixtures/ca_crt.pem");

    #[test]
    fn inspects_client_certificate() {
        let info = CertificateInfo::from_pem(CLIENT_CERT).unwrap();
        assert_eq!(info.subject, "/CN=rip.mcollective");
        assert_eq!(info.issuer, "/CN=Puppet CA: rspec.puppet");
        assert!(!info.not_after.is_empty());
    }

    #[test]
    fn ca_is_self_issued() {
        let info = CertificateInfo::from_pem(CA_CERT).unwrap();
        assert_eq!(info.subject, info.issuer);
    }

    #[test]
    fn fingerprint_format() {
        let fp = fingerprint_sha256(b"test certificate DER data");
        // 32 bytes, two hex chars each, 31 separators
        assert_eq!(fp.len(), 32 * 2 + 31);
        assert!(fp
            .split(':')
            .all(|pair| pair.len() == 2 && pair.chars().all(|c| c.is_ascii_hexdigit())));
        assert_eq!(fp, fp.to_uppercase());
    }

    #[test]
    fn rejects_non_pem() {
        assert!(CertificateInfo::from_pem(b"not a certificate").is_err());
    }
}
