use nodessl_common::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The CA answered the CSR submission with a non-success status.
    #[error("Failed to request certificate from {host}: {status}: {reason}: {body}")]
    CertificateRequest {
        host: String,
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Failed to fetch CA from {host}: {status}: {reason}")]
    CaFetch {
        host: String,
        status: u16,
        reason: String,
    },

    #[error("Failed to make request to Puppet: {status}: {reason}: {body}")]
    Puppet {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("{host} not reachable: {message}")]
    Unreachable { host: String, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Status, reason phrase and body of an HTTP error response.
pub(crate) struct StatusParts {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl StatusParts {
    pub(crate) fn from_response(resp: ureq::Response) -> Self {
        let status = resp.status();
        let reason = resp.status_text().to_string();
        let body = resp.into_string().unwrap_or_default();
        Self {
            status,
            reason,
            body,
        }
    }
}

/// Split a ureq error into a status response or a transport failure.
pub(crate) fn split_error(host: &str, e: ureq::Error) -> std::result::Result<StatusParts, ClientError> {
    match e {
        ureq::Error::Status(_, resp) => Ok(StatusParts::from_response(resp)),
        ureq::Error::Transport(t) => Err(ClientError::Unreachable {
            host: host.to_string(),
            message: t.to_string(),
        }),
    }
}
