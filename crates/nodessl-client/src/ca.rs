//! Puppet CA protocol: CSR submission and certificate retrieval.

use nodessl_common::Certname;

use crate::endpoint::Endpoint;
use crate::error::{split_error, ClientError, Result, StatusParts};
use crate::https::HttpsClient;

const CERTIFICATE_REQUEST_PATH: &str = "/puppet-ca/v1/certificate_request";
const CERTIFICATE_PATH: &str = "/puppet-ca/v1/certificate";

/// Name the CA publishes its own certificate under.
const CA_CERTNAME: &str = "ca";

/// Outcome of asking the CA for a node certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertFetch {
    /// The CA returned the signed certificate.
    Signed(String),
    /// 404: the request is known but unsigned, or not yet received.
    NotYetSigned,
    /// Any other status. Treated as not yet available.
    Unavailable {
        status: u16,
        reason: String,
        body: String,
    },
}

impl CertFetch {
    pub fn found(&self) -> bool {
        matches!(self, Self::Signed(_))
    }

    pub fn into_pem(self) -> Option<String> {
        match self {
            Self::Signed(pem) => Some(pem),
            _ => None,
        }
    }
}

pub struct CaClient {
    client: HttpsClient,
    endpoint: Endpoint,
}

impl CaClient {
    pub fn new(client: HttpsClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// `PUT /puppet-ca/v1/certificate_request/<certname>?environment=<env>`
    pub fn submit_csr(
        &self,
        certname: &Certname,
        csr_pem: &str,
        environment: &str,
    ) -> Result<()> {
        let url = self
            .endpoint
            .url(&format!("{CERTIFICATE_REQUEST_PATH}/{certname}"));
        tracing::debug!(%url, environment, "Submitting certificate request");

        let parts = match self
            .client
            .agent()
            .put(&url)
            .query("environment", environment)
            .set("Content-Type", "text/plain")
            .send_string(csr_pem)
        {
            Ok(resp) if (200..300).contains(&resp.status()) => {
                tracing::info!(%certname, ca = %self.endpoint, "Certificate request submitted");
                return Ok(());
            }
            Ok(resp) => StatusParts::from_response(resp),
            Err(e) => split_error(&self.endpoint.host, e)?,
        };

        Err(ClientError::CertificateRequest {
            host: self.endpoint.host.clone(),
            status: parts.status,
            reason: parts.reason,
            body: parts.body,
        })
    }

    /// `GET /puppet-ca/v1/certificate/<certname>`
    pub fn fetch_cert(&self, certname: &Certname) -> Result<CertFetch> {
        let url = self.endpoint.url(&format!("{CERTIFICATE_PATH}/{certname}"));
        tracing::debug!(%url, "Fetching certificate");

        let parts = match self
            .client
            .agent()
            .get(&url)
            .set("Accept", "text/plain")
            .call()
        {
            Ok(resp) if resp.status() == 200 => {
                let pem = resp
                    .into_string()
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                return Ok(CertFetch::Signed(pem));
            }
            Ok(resp) => StatusParts::from_response(resp),
            Err(e) => split_error(&self.endpoint.host, e)?,
        };

        if parts.status == 404 {
            return Ok(CertFetch::NotYetSigned);
        }
        Ok(CertFetch::Unavailable {
            status: parts.status,
            reason: parts.reason,
            body: parts.body,
        })
    }

    /// `GET /puppet-ca/v1/certificate/ca?environment=<env>`
    pub fn fetch_ca(&self, environment: &str) -> Result<String> {
        let url = self.endpoint.url(&format!("{CERTIFICATE_PATH}/{CA_CERTNAME}"));
        tracing::debug!(%url, environment, "Fetching CA certificate");

        let parts = match self
            .client
            .agent()
            .get(&url)
            .query("environment", environment)
            .set("Accept", "text/plain")
            .call()
        {
            Ok(resp) if resp.status() == 200 => {
                return resp
                    .into_string()
                    .map_err(|e| ClientError::Decode(e.to_string()));
            }
            Ok(resp) => StatusParts::from_response(resp),
            Err(e) => split_error(&self.endpoint.host, e)?,
        };

        Err(ClientError::CaFetch {
            host: self.endpoint.host.clone(),
            status: parts.status,
            reason: parts.reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_signed_counts_as_found() {
        assert!(CertFetch::Signed("pem".into()).found());
        assert!(!CertFetch::NotYetSigned.found());
        assert!(!CertFetch::Unavailable {
            status: 500,
            reason: "Internal Server Error".into(),
            body: String::new(),
        }
        .found());
    }

    #[test]
    fn into_pem() {
        assert_eq!(
            CertFetch::Signed("pem".into()).into_pem(),
            Some("pem".to_string())
        );
        assert_eq!(CertFetch::NotYetSigned.into_pem(), None);
    }
}
