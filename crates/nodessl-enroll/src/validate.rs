use nodessl_common::SslLayout;

use crate::error::{EnrollError, Result};

/// Succeeds only when the client certificate, its key and the CA
/// certificate are all on disk.
pub fn check_ssl_setup(layout: &SslLayout) -> Result<bool> {
    let missing: Vec<_> = [
        layout.client_public_cert(),
        layout.client_private_key(),
        layout.ca_path(),
    ]
    .into_iter()
    .filter(|path| !path.exists())
    .collect();

    if missing.is_empty() {
        return Ok(true);
    }
    for path in &missing {
        tracing::debug!(path = %path.display(), "SSL file missing");
    }
    Err(EnrollError::SetupIncomplete { missing })
}
