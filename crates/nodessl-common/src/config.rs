//! Plugin configuration.
//!
//! A flat map of dotted keys (`puppet.port`, `puppet.ca`, `puppet.master`).
//! Loaded from a TOML file where nested tables flatten into dotted keys, so
//! both of these set the same value:
//!
//! ```toml
//! "puppet.port" = "8141"
//!
//! [puppet]
//! port = 8141
//! ```

use std::collections::BTreeMap;
use std::path::Path;

const PUPPET_PORT_KEY: &str = "puppet.port";
const PUPPET_CA_KEY: &str = "puppet.ca";
const PUPPET_MASTER_KEY: &str = "puppet.master";

/// Source name reported for parse errors in TOML text not read from a file.
const INLINE_SOURCE: &str = "<inline>";

/// Port of the Puppet server and CA when nothing is configured.
pub const DEFAULT_PUPPET_PORT: u16 = 8140;

/// Hostname of the Puppet server and CA when nothing is configured.
pub const DEFAULT_PUPPET_HOST: &str = "puppet";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginConfig {
    values: BTreeMap<String, String>,
}

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Load from a TOML file. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_required(path)
    }

    /// Load from a TOML file that must exist.
    pub fn load_required(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&raw, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), keys = config.values.len(), "Loaded config");
        Ok(config)
    }

    /// Parse TOML text, flattening nested tables into dotted keys.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::parse(raw, INLINE_SOURCE)
    }

    fn parse(raw: &str, source: &str) -> Result<Self, ConfigError> {
        let value: toml::Value = raw.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
            path: source.to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::default();
        if let toml::Value::Table(table) = value {
            flatten_into(&mut config.values, "", &table);
        }
        Ok(config)
    }

    /// Port of the Puppet server (`puppet.port`, default 8140).
    pub fn puppet_port(&self) -> Result<u16, ConfigError> {
        match self.get(PUPPET_PORT_KEY) {
            None => Ok(DEFAULT_PUPPET_PORT),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: PUPPET_PORT_KEY.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    /// Puppet server hostname (`puppet.master`, default `puppet`).
    pub fn puppet_server(&self) -> &str {
        self.get(PUPPET_MASTER_KEY).unwrap_or(DEFAULT_PUPPET_HOST)
    }

    /// Puppet CA hostname (`puppet.ca`, then `puppet.master`, default `puppet`).
    pub fn puppetca_server(&self) -> &str {
        self.get(PUPPET_CA_KEY)
            .or_else(|| self.get(PUPPET_MASTER_KEY))
            .unwrap_or(DEFAULT_PUPPET_HOST)
    }
}

fn flatten_into(
    out: &mut BTreeMap<String, String>,
    prefix: &str,
    table: &toml::map::Map<String, toml::Value>,
) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten_into(out, &full, inner),
            toml::Value::String(s) => {
                out.insert(full, s.clone());
            }
            other => {
                out.insert(full, other.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puppet_port_from_config_defaults_to_8140() {
        let config = PluginConfig::new().with("puppet.port", "8141");
        assert_eq!(config.puppet_port().unwrap(), 8141);

        assert_eq!(PluginConfig::new().puppet_port().unwrap(), 8140);
    }

    #[test]
    fn puppet_port_rejects_garbage() {
        let config = PluginConfig::new().with("puppet.port", "eighty");
        assert!(matches!(
            config.puppet_port(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn puppetca_server_from_config_defaults_to_puppet() {
        let config = PluginConfig::new().with("puppet.ca", "rspec.puppetca");
        assert_eq!(config.puppetca_server(), "rspec.puppetca");

        assert_eq!(PluginConfig::new().puppetca_server(), "puppet");
    }

    #[test]
    fn puppetca_server_falls_back_to_master() {
        let config = PluginConfig::new().with("puppet.master", "rspec.puppet");
        assert_eq!(config.puppetca_server(), "rspec.puppet");
    }

    #[test]
    fn puppet_server_from_config_defaults_to_puppet() {
        let config = PluginConfig::new().with("puppet.master", "rspec.puppet");
        assert_eq!(config.puppet_server(), "rspec.puppet");

        assert_eq!(PluginConfig::new().puppet_server(), "puppet");
    }

    #[test]
    fn toml_tables_flatten_to_dotted_keys() {
        let config = PluginConfig::from_toml_str(
            "[puppet]\nport = 8141\nmaster = \"rspec.puppet\"\n",
        )
        .unwrap();
        assert_eq!(config.get("puppet.port"), Some("8141"));
        assert_eq!(config.puppet_port().unwrap(), 8141);
        assert_eq!(config.puppet_server(), "rspec.puppet");
    }

    #[test]
    fn toml_dotted_string_keys() {
        let config = PluginConfig::from_toml_str("\"puppet.ca\" = \"ca.example.net\"\n").unwrap();
        assert_eq!(config.puppetca_server(), "ca.example.net");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PluginConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, PluginConfig::default());
    }

    #[test]
    fn load_required_rejects_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        let err = PluginConfig::load_required(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn load_required_reads_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nodessl.toml");
        std::fs::write(&path, "[puppet]\nca = \"rspec.puppetca\"\n").unwrap();
        let config = PluginConfig::load_required(&path).unwrap();
        assert_eq!(config.puppetca_server(), "rspec.puppetca");
    }

    #[test]
    fn inline_parse_errors_are_config_errors() {
        let err = PluginConfig::from_toml_str("port = ").unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, "<inline>"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn load_reports_parse_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.toml");
        std::fs::write(&path, "[puppet\nport = ").unwrap();
        assert!(matches!(
            PluginConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
