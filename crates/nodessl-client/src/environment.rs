//! Puppet environment documents.

use nodessl_common::PluginConfig;

use crate::endpoint::Endpoint;
use crate::error::{split_error, ClientError, Result, StatusParts};
use crate::https::HttpsClient;

const ENVIRONMENT_PATH: &str = "/puppet/v3/environment";

pub struct EnvironmentFetcher {
    client: HttpsClient,
    endpoint: Endpoint,
}

impl EnvironmentFetcher {
    pub fn new(client: HttpsClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    /// Fetcher for the Puppet server named by `puppet.master` / `puppet.port`.
    pub fn for_config(client: HttpsClient, config: &PluginConfig) -> Result<Self> {
        Ok(Self::new(client, Endpoint::puppet_server(config)?))
    }

    /// `GET /puppet/v3/environment/<environment>`, parsed as JSON.
    pub fn fetch_environment(&self, environment: &str) -> Result<serde_json::Value> {
        let url = self.endpoint.url(&format!("{ENVIRONMENT_PATH}/{environment}"));
        tracing::debug!(%url, "Fetching environment");

        let parts = match self
            .client
            .agent()
            .get(&url)
            .set("Accept", "application/json")
            .call()
        {
            Ok(resp) if resp.status() == 200 => {
                let body = resp
                    .into_string()
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                return serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()));
            }
            Ok(resp) => StatusParts::from_response(resp),
            Err(e) => split_error(&self.endpoint.host, e)?,
        };

        Err(ClientError::Puppet {
            status: parts.status,
            reason: parts.reason,
            body: parts.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodessl_common::{Certname, SslLayout};

    #[test]
    fn bad_port_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = SslLayout::new(tmp.path(), Certname::new("rspec.cert").unwrap());
        let client = crate::HttpsClientFactory::new().build(&layout).unwrap();
        let config = PluginConfig::new().with("puppet.port", "eighty");

        assert!(matches!(
            EnvironmentFetcher::for_config(client, &config),
            Err(ClientError::Config(_))
        ));
    }
}
