//! The node's certificate signing request on disk.

use nodessl_common::paths::PUBLIC_FILE_MODE;
use nodessl_common::SslLayout;
use nodessl_crypto::{create_csr, ClientKey};

use crate::error::{EnrollError, Result};
use crate::files::create_exclusive;

/// Organisational unit of every node CSR.
pub const CSR_ORG_UNIT: &str = "mcollective";

pub fn has_csr(layout: &SslLayout) -> bool {
    layout.has_csr()
}

/// Build a CSR for `key`, store it with mode 0644 and return its PEM.
///
/// Refuses if a CSR already exists.
pub fn write_csr(layout: &SslLayout, key: &ClientKey) -> Result<String> {
    let path = layout.csr_path();
    if path.exists() {
        return Err(refusal(path));
    }

    let csr = create_csr(layout.certname().as_str(), CSR_ORG_UNIT, key)?;
    let created = create_exclusive(&path, csr.pem().as_bytes(), PUBLIC_FILE_MODE)
        .map_err(|e| EnrollError::io(&path, e))?;
    if !created {
        return Err(refusal(path));
    }

    tracing::info!(path = %path.display(), "Certificate request written");
    Ok(csr.pem().to_string())
}

pub fn read_csr(layout: &SslLayout) -> Result<String> {
    let path = layout.csr_path();
    std::fs::read_to_string(&path).map_err(|e| EnrollError::io(&path, e))
}

fn refusal(path: std::path::PathBuf) -> EnrollError {
    EnrollError::OverwriteRefusal { what: "CSR", path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodessl_common::Certname;
    use nodessl_crypto::SigningRequest;
    use nodessl_testkit::fixtures;

    fn setup() -> (tempfile::TempDir, SslLayout, ClientKey) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = SslLayout::new(tmp.path(), Certname::new("rspec.cert").unwrap());
        layout.make_ssl_dirs().unwrap();
        let key = ClientKey::from_pem(&fixtures::read(fixtures::CLIENT_KEY)).unwrap();
        (tmp, layout, key)
    }

    #[test]
    fn writes_mcollective_csr() {
        let (_tmp, layout, key) = setup();
        assert!(!has_csr(&layout));

        let pem = write_csr(&layout, &key).unwrap();
        assert!(has_csr(&layout));
        assert_eq!(read_csr(&layout).unwrap(), pem);

        let csr = SigningRequest::from_pem(&pem).unwrap();
        assert_eq!(csr.subject().unwrap(), "/CN=rspec.cert/OU=mcollective");
        assert_eq!(csr.public_key_der().unwrap(), key.public_key_der().unwrap());
    }

    #[test]
    fn refuses_to_overwrite() {
        let (_tmp, layout, key) = setup();
        std::fs::write(layout.csr_path(), "existing").unwrap();

        let err = write_csr(&layout, &key).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Refusing to overwrite existing CSR in {}",
                layout.csr_path().display()
            )
        );
        assert_eq!(read_csr(&layout).unwrap(), "existing");
    }

    #[cfg(unix)]
    #[test]
    fn csr_file_is_0644() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, layout, key) = setup();
        write_csr(&layout, &key).unwrap();
        let mode = std::fs::metadata(layout.csr_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
