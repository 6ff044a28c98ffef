//! The enrollment handshake.
//!
//! `request_cert` once, then `attempt_fetch_cert` until the CA has signed.
//! Polling cadence belongs to the caller; nothing here sleeps or retries.

use std::fmt;
use std::path::PathBuf;

use nodessl_client::{CaClient, CertFetch};
use nodessl_common::paths::PUBLIC_FILE_MODE;
use nodessl_common::SslLayout;
use nodessl_crypto::{SigningRequest, RSA_KEY_BITS};

use crate::csr::{has_csr, read_csr, write_csr};
use crate::error::{EnrollError, Result};
use crate::files::create_exclusive;
use crate::keys::{has_private_key, read_key, write_key_with_bits};

/// Where a node is in enrollment, judged from the files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    NoKeyNoCert,
    WaitingForSignature,
    Signed,
}

impl EnrollmentState {
    pub fn of(layout: &SslLayout) -> Self {
        if layout.has_client_public_cert() {
            Self::Signed
        } else if has_private_key(layout) {
            Self::WaitingForSignature
        } else {
            Self::NoKeyNoCert
        }
    }
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoKeyNoCert => "not enrolled",
            Self::WaitingForSignature => "waiting for signature",
            Self::Signed => "signed",
        })
    }
}

pub struct CertBootstrapper {
    layout: SslLayout,
    ca: CaClient,
    environment: String,
    key_bits: usize,
}

impl CertBootstrapper {
    pub fn new(layout: SslLayout, ca: CaClient, environment: impl Into<String>) -> Self {
        Self {
            layout,
            ca,
            environment: environment.into(),
            key_bits: RSA_KEY_BITS,
        }
    }

    /// Override the size of generated keys.
    pub fn key_bits(mut self, bits: usize) -> Self {
        self.key_bits = bits;
        self
    }

    pub fn layout(&self) -> &SslLayout {
        &self.layout
    }

    pub fn state(&self) -> EnrollmentState {
        EnrollmentState::of(&self.layout)
    }

    /// A key exists but the signed certificate does not.
    pub fn waiting_for_cert(&self) -> bool {
        self.state() == EnrollmentState::WaitingForSignature
    }

    /// Fetch and store the signed certificate if the CA has it.
    ///
    /// `Ok(false)` means not signed yet; poll again later.
    pub fn attempt_fetch_cert(&self) -> Result<bool> {
        let path = self.layout.client_public_cert();
        if path.exists() {
            return Ok(true);
        }

        let certname = self.layout.certname();
        match self.ca.fetch_cert(certname)? {
            CertFetch::Signed(pem) => {
                let created = create_exclusive(&path, pem.as_bytes(), PUBLIC_FILE_MODE)
                    .map_err(|e| EnrollError::io(&path, e))?;
                if created {
                    tracing::info!(%certname, path = %path.display(), "Signed certificate stored");
                } else {
                    tracing::debug!(path = %path.display(), "Certificate appeared concurrently");
                }
                Ok(true)
            }
            CertFetch::NotYetSigned => {
                tracing::debug!(%certname, "Certificate not signed yet");
                Ok(false)
            }
            CertFetch::Unavailable {
                status,
                reason,
                body,
            } => {
                tracing::warn!(
                    %certname,
                    status,
                    %reason,
                    %body,
                    ca = %self.ca.endpoint(),
                    "Unexpected response fetching certificate"
                );
                Ok(false)
            }
        }
    }

    /// Create or reuse the key, create or reuse the CSR, and submit it.
    ///
    /// A stored CSR is resubmitted only when it embeds the public half of
    /// the key on disk. A CSR with no key next to it is refused before any
    /// key is generated.
    pub fn request_cert(&self) -> Result<bool> {
        let csr_path = self.layout.csr_path();
        let stored_csr = has_csr(&self.layout);

        let key = if has_private_key(&self.layout) {
            read_key(&self.layout)?
        } else if stored_csr {
            return Err(EnrollError::OverwriteRefusal {
                what: "CSR",
                path: csr_path,
            });
        } else {
            write_key_with_bits(&self.layout, self.key_bits)?
        };

        let csr = if stored_csr {
            let pem = read_csr(&self.layout)?;
            let stored = SigningRequest::from_pem(&pem)?;
            if stored.public_key_der()? != key.public_key_der()? {
                return Err(EnrollError::CsrKeyMismatch { path: csr_path });
            }
            tracing::debug!(path = %csr_path.display(), "Resubmitting stored CSR");
            pem
        } else {
            write_csr(&self.layout, &key)?
        };

        self.ca
            .submit_csr(self.layout.certname(), &csr, &self.environment)?;
        Ok(true)
    }

    /// Download the CA certificate unless it is already present.
    pub fn fetch_ca(&self) -> Result<PathBuf> {
        let path = self.layout.ca_path();
        if path.exists() {
            return Ok(path);
        }

        let pem = self.ca.fetch_ca(&self.environment)?;
        let created = create_exclusive(&path, pem.as_bytes(), PUBLIC_FILE_MODE)
            .map_err(|e| EnrollError::io(&path, e))?;
        if created {
            tracing::info!(path = %path.display(), ca = %self.ca.endpoint(), "CA certificate stored");
        }
        Ok(path)
    }
}
