//! Node enrollment: key and CSR storage, the request/poll handshake with
//! the CA, and validation of the resulting trust bundle.

pub mod bootstrap;
pub mod csr;
pub mod error;
mod files;
pub mod keys;
pub mod validate;

pub use bootstrap::{CertBootstrapper, EnrollmentState};
pub use error::{EnrollError, Result};
pub use validate::check_ssl_setup;
