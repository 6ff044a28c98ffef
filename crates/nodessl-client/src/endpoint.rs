//! Where the CA and the Puppet server live.

use std::fmt;

use nodessl_common::{ConfigError, PluginConfig, DEFAULT_PUPPET_PORT};

/// An HTTPS host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The CA always listens on the standard Puppet port.
    pub fn puppet_ca(config: &PluginConfig) -> Self {
        Self::new(config.puppetca_server(), DEFAULT_PUPPET_PORT)
    }

    /// The Puppet server honours `puppet.port`.
    pub fn puppet_server(config: &PluginConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.puppet_server(), config.puppet_port()?))
    }

    /// `https://host:port` followed by `path`.
    pub fn url(&self, path: &str) -> String {
        format!("https://{}:{}{}", self.host, self.port, path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
