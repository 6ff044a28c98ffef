use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Environment used when none is given.
pub const DEFAULT_ENVIRONMENT: &str = "production";

#[derive(Parser, Debug)]
#[command(name = "nodessl", version, about = "Node certificate enrollment for Puppet CAs")]
pub struct Cli {
    /// Plugin config file (TOML)
    #[arg(long, env = "NODESSL_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Puppet environment to enroll in and fetch
    #[arg(long, default_value = DEFAULT_ENVIRONMENT, global = true)]
    pub environment: String,

    /// SSL directory (default: platform-specific)
    #[arg(long, env = "NODESSL_SSL_DIR", value_name = "PATH", global = true)]
    pub ssl_dir: Option<PathBuf>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "NODESSL_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to file (in addition to stderr)
    #[arg(long, env = "NODESSL_LOG_FILE", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Connect and read timeout for HTTPS requests
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a key and CSR, submit it and wait for the signed certificate
    RequestCert(RequestCertArgs),
    /// Verify the certificate, key and CA are all in place
    Check,
    /// Fetch an environment document from the Puppet server
    Environment {
        /// Environment name (default: --environment)
        name: Option<String>,
    },
    /// Show identity, SSL directory and enrollment state
    Status,
}

#[derive(Args, Debug)]
pub struct RequestCertArgs {
    /// How long to wait for the CA to sign
    #[arg(long, value_name = "SECONDS", default_value = "240")]
    pub wait: u64,

    /// Seconds between certificate fetch attempts
    #[arg(long, value_name = "SECONDS", default_value = "10")]
    pub interval: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn request_cert_defaults() {
        let cli = Cli::parse_from(["nodessl", "request-cert"]);
        assert_eq!(cli.environment, "production");
        match cli.command {
            Command::RequestCert(args) => {
                assert_eq!(args.wait, 240);
                assert_eq!(args.interval, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "nodessl",
            "environment",
            "staging",
            "--json",
            "--ssl-dir",
            "/tmp/ssl",
            "-vv",
        ]);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.ssl_dir, Some(PathBuf::from("/tmp/ssl")));
        assert!(matches!(
            cli.command,
            Command::Environment { name: Some(ref n) } if n == "staging"
        ));
    }
}
