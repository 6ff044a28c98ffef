//! The node's private key on disk.

use nodessl_common::paths::PRIVATE_KEY_MODE;
use nodessl_common::SslLayout;
use nodessl_crypto::{ClientKey, RSA_KEY_BITS};

use crate::error::{EnrollError, Result};
use crate::files::create_exclusive;

pub fn has_private_key(layout: &SslLayout) -> bool {
    layout.has_client_private_key()
}

/// Generate a [`RSA_KEY_BITS`]-bit key and store it.
///
/// Refuses if a key already exists.
pub fn write_key(layout: &SslLayout) -> Result<ClientKey> {
    write_key_with_bits(layout, RSA_KEY_BITS)
}

pub fn write_key_with_bits(layout: &SslLayout, bits: usize) -> Result<ClientKey> {
    let path = layout.client_private_key();
    if path.exists() {
        return Err(refusal(path));
    }
    let key = ClientKey::generate_with_bits(bits)?;
    store_key(layout, &key)?;
    Ok(key)
}

/// Store an existing key with mode 0640. Refuses if a key already exists.
pub fn store_key(layout: &SslLayout, key: &ClientKey) -> Result<()> {
    let path = layout.client_private_key();
    let pem = key.private_key_pem()?;
    let created = create_exclusive(&path, pem.as_bytes(), PRIVATE_KEY_MODE)
        .map_err(|e| EnrollError::io(&path, e))?;
    if !created {
        return Err(refusal(path));
    }
    tracing::info!(path = %path.display(), "Private key written");
    Ok(())
}

pub fn read_key(layout: &SslLayout) -> Result<ClientKey> {
    let path = layout.client_private_key();
    let pem = std::fs::read_to_string(&path).map_err(|e| EnrollError::io(&path, e))?;
    Ok(ClientKey::from_pem(&pem)?)
}

fn refusal(path: std::path::PathBuf) -> EnrollError {
    EnrollError::OverwriteRefusal { what: "key", path }
}
