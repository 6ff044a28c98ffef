//! nodessl crypto: the node's RSA key, its signing request, and
//! inspection of the certificates the CA hands back.
//!
//! Pure functions only; persisting any of this is the caller's job.

pub mod csr;
pub mod keys;
pub mod x509;

pub use csr::{create_csr, SigningRequest};
pub use keys::{ClientKey, CryptoError, RSA_KEY_BITS};
pub use x509::CertificateInfo;
