//! Certificate signing requests.

use rcgen::{CertificateParams, DistinguishedName, DnType};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::prelude::FromDer;

use crate::keys::{ClientKey, CryptoError};
use crate::x509::openssl_name;

/// A PEM-encoded PKCS#10 request together with its DER form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pem: String,
    der: Vec<u8>,
}

/// Build a version-0 CSR with subject `/CN=<certname>/OU=<org_unit>`,
/// signed by `key`.
pub fn create_csr(
    certname: &str,
    org_unit: &str,
    key: &ClientKey,
) -> Result<SigningRequest, CryptoError> {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, certname);
    dn.push(DnType::OrganizationalUnitName, org_unit);
    params.distinguished_name = dn;

    let key_pair = key.signing_key_pair()?;
    let csr = params
        .serialize_request(&key_pair)
        .map_err(|e| CryptoError::Csr(e.to_string()))?;
    let pem = csr.pem().map_err(|e| CryptoError::Csr(e.to_string()))?;

    tracing::debug!(certname, org_unit, "Created certificate signing request");
    Ok(SigningRequest {
        pem,
        der: csr.der().to_vec(),
    })
}

impl SigningRequest {
    /// Parse a stored PEM CSR.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let (_, parsed) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
            .map_err(|e| CryptoError::Csr(e.to_string()))?;
        if parsed.label != "CERTIFICATE REQUEST" {
            return Err(CryptoError::Csr(format!(
                "expected CERTIFICATE REQUEST, found {}",
                parsed.label
            )));
        }
        let request = Self {
            pem: pem.to_string(),
            der: parsed.contents,
        };
        request.parse()?;
        Ok(request)
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject in `/CN=.../OU=...` form.
    pub fn subject(&self) -> Result<String, CryptoError> {
        let req = self.parse()?;
        Ok(openssl_name(&req.certification_request_info.subject))
    }

    /// PKCS#10 version field.
    pub fn version(&self) -> Result<u32, CryptoError> {
        let req = self.parse()?;
        Ok(req.certification_request_info.version.0)
    }

    /// SubjectPublicKeyInfo DER embedded in the request.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        let req = self.parse()?;
        Ok(req.certification_request_info.subject_pki.raw.to_vec())
    }

    fn parse(&self) -> Result<X509CertificationRequest<'_>, CryptoError> {
        let (_, req) = X509CertificationRequest::from_der(&self.der)
            .map_err(|e| CryptoError::Csr(e.to_string()))?;
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_KEY: &str = include_str!("../../../fixtures/rip.mcollective.key");

    fn fixture_key() -> ClientKey {
        ClientKey::from_pem(FIXTURE_KEY).unwrap()
    }

    #[test]
    fn creates_v0_request_with_cn_and_ou() {
        let key = fixture_key();
        let csr = create_csr("rspec.cert", "rspec", &key).unwrap();

        assert_eq!(csr.version().unwrap(), 0);
        assert_eq!(csr.subject().unwrap(), "/CN=rspec.cert/OU=rspec");
        assert!(csr.pem().starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
    }

    #[test]
    fn request_carries_the_key_public_half() {
        let key = fixture_key();
        let csr = create_csr("rspec.cert", "rspec", &key).unwrap();
        assert_eq!(csr.public_key_der().unwrap(), key.public_key_der().unwrap());
    }

    #[test]
    fn stored_request_parses_back() {
        let key = fixture_key();
        let csr = create_csr("rspec.cert", "mcollective", &key).unwrap();

        let loaded = SigningRequest::from_pem(csr.pem()).unwrap();
        assert_eq!(loaded.der(), csr.der());
        assert_eq!(loaded.subject().unwrap(), "/CN=rspec.cert/OU=mcollective");
    }

    #[test]
    fn from_pem_rejects_certificates() {
        let cert = include_str!("../../../fixtures/ca_crt.pem");
        assert!(matches!(
            SigningRequest::from_pem(cert),
            Err(CryptoError::Csr(_))
        ));
    }
}
