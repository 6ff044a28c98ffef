//! Everything a command needs, resolved once from the CLI.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use nodessl_client::{CaClient, Endpoint, EnvironmentFetcher, HttpsClientFactory};
use nodessl_common::identity::certname;
use nodessl_common::{HostPlatform, PluginConfig, ProcessEnv, SslLayout};
use nodessl_enroll::CertBootstrapper;

use crate::cli::Cli;

const CONFIG_DIR: &str = "nodessl";
const CONFIG_FILENAME: &str = "nodessl.toml";

pub struct Context {
    pub config: PluginConfig,
    pub layout: SslLayout,
    pub environment: String,
    pub json: bool,
    factory: HttpsClientFactory,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => PluginConfig::load_required(path)?,
            None => match default_config_path() {
                Some(path) => PluginConfig::load(&path)?,
                None => PluginConfig::default(),
            },
        };

        let platform = HostPlatform;
        let name = certname(&platform, &ProcessEnv);
        let layout = match &cli.ssl_dir {
            Some(dir) => SslLayout::new(dir, name),
            None => SslLayout::resolve(&platform, name),
        };

        let mut factory = HttpsClientFactory::new();
        if let Some(secs) = cli.timeout {
            let timeout = Duration::from_secs(secs);
            factory = factory.timeout_connect(timeout).timeout_read(timeout);
        }

        tracing::debug!(
            certname = %layout.certname(),
            ssl_dir = %layout.base_dir().display(),
            "Resolved node identity"
        );

        Ok(Self {
            config,
            layout,
            environment: cli.environment.clone(),
            json: cli.json,
            factory,
        })
    }

    /// A bootstrapper whose client reflects the SSL files on disk right now.
    pub fn bootstrapper(&self) -> anyhow::Result<CertBootstrapper> {
        let client = self
            .factory
            .build(&self.layout)
            .context("building CA client")?;
        let ca = CaClient::new(client, Endpoint::puppet_ca(&self.config));
        Ok(CertBootstrapper::new(
            self.layout.clone(),
            ca,
            self.environment.clone(),
        ))
    }

    pub fn environment_fetcher(&self) -> anyhow::Result<EnvironmentFetcher> {
        let client = self
            .factory
            .build(&self.layout)
            .context("building Puppet client")?;
        Ok(EnvironmentFetcher::for_config(client, &self.config)?)
    }
}

/// `<config dir>/nodessl/nodessl.toml`, if present.
fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join(CONFIG_DIR).join(CONFIG_FILENAME);
    path.exists().then_some(path)
}
