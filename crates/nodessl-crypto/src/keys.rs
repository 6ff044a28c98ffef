//! RSA key generation and PEM encoding.
//!
//! Keys are written as PKCS#8 (`BEGIN PRIVATE KEY`). Loading also accepts
//! PKCS#1 (`BEGIN RSA PRIVATE KEY`), which is what a Puppet agent leaves
//! behind when it enrolled the node first.

use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use zeroize::Zeroizing;

/// Size of generated node keys.
pub const RSA_KEY_BITS: usize = 4096;

const PKCS1_PEM_TAG: &str = "BEGIN RSA PRIVATE KEY";

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key generation: {0}")]
    KeyGeneration(String),
    #[error("key encoding: {0}")]
    KeyEncoding(String),
    #[error("certificate request: {0}")]
    Csr(String),
    #[error("certificate: {0}")]
    Certificate(String),
}

/// The node's RSA private key.
#[derive(Clone)]
pub struct ClientKey {
    key: RsaPrivateKey,
}

impl std::fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientKey")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

impl ClientKey {
    /// Generate a fresh [`RSA_KEY_BITS`]-bit key from the OS RNG.
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with_bits(RSA_KEY_BITS)
    }

    pub fn generate_with_bits(bits: usize) -> Result<Self, CryptoError> {
        tracing::debug!(bits, "Generating RSA key");
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(Self { key })
    }

    /// Parse a PKCS#8 or PKCS#1 PEM private key.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = if pem.contains(PKCS1_PEM_TAG) {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| CryptoError::KeyEncoding(e.to_string()))?
        } else {
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::KeyEncoding(e.to_string()))?
        };
        Ok(Self { key })
    }

    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    /// PKCS#8 PEM. Zeroized on drop.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))
    }

    /// SubjectPublicKeyInfo PEM (`BEGIN PUBLIC KEY`).
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))
    }

    /// SubjectPublicKeyInfo DER.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        let doc = self
            .key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// The key in a form rcgen can sign with.
    pub(crate) fn signing_key_pair(&self) -> Result<rcgen::KeyPair, CryptoError> {
        let pem = self.private_key_pem()?;
        rcgen::KeyPair::from_pem(&pem).map_err(|e| CryptoError::KeyEncoding(e.to_string()))
    }
}
