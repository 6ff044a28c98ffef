//! HTTPS access to the Puppet CA and server.
//!
//! Blocking `ureq` over `rustls`. Clients are configured from whatever SSL
//! material is on disk (see [`HttpsClientFactory`]), so the same code path
//! serves an unenrolled node talking to the CA and an enrolled node
//! fetching its environment over mutual TLS.

pub mod ca;
pub mod endpoint;
pub mod environment;
pub mod error;
pub mod https;
pub mod verifier;

pub use ca::{CaClient, CertFetch};
pub use endpoint::Endpoint;
pub use environment::EnvironmentFetcher;
pub use error::{ClientError, Result};
pub use https::{HttpsClient, HttpsClientFactory, VerifyMode};
