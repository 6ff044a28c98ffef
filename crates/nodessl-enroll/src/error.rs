//! Enrollment error types.

use std::path::PathBuf;

use nodessl_client::ClientError;
use nodessl_crypto::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
    #[error("Refusing to overwrite existing {what} in {}", .path.display())]
    OverwriteRefusal { what: &'static str, path: PathBuf },

    #[error("CSR in {} was not made from the private key on disk", .path.display())]
    CsrKeyMismatch { path: PathBuf },

    #[error("Client SSL is not correctly setup, please use 'mco request_cert'")]
    SetupIncomplete { missing: Vec<PathBuf> },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EnrollError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_refusal_names_the_file() {
        let err = EnrollError::OverwriteRefusal {
            what: "key",
            path: PathBuf::from("/ssl/private_keys/rspec.cert.pem"),
        };
        assert_eq!(
            err.to_string(),
            "Refusing to overwrite existing key in /ssl/private_keys/rspec.cert.pem"
        );
    }

    #[test]
    fn setup_incomplete_message_is_fixed() {
        let err = EnrollError::SetupIncomplete {
            missing: vec![PathBuf::from("/ssl/certs/ca.pem")],
        };
        assert_eq!(
            err.to_string(),
            "Client SSL is not correctly setup, please use 'mco request_cert'"
        );
    }

    #[test]
    fn client_errors_pass_through() {
        let err = EnrollError::from(ClientError::CertificateRequest {
            host: "puppetca".into(),
            status: 500,
            reason: "Internal Server Error".into(),
            body: "rspec fail".into(),
        });
        assert_eq!(
            err.to_string(),
            "Failed to request certificate from puppetca: 500: Internal Server Error: rspec fail"
        );
    }
}
