//! Test support for nodessl: fixture PEMs and an HTTPS mock of the Puppet
//! server and CA.

pub mod fixtures;
pub mod server;

pub use server::{MockPuppet, RecordedRequest};
