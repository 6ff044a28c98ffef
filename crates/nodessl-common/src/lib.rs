//! Shared building blocks for nodessl.
//!
//! Everything here is a pure function of explicit inputs: the [`Platform`]
//! capability describes the host, an [`EnvironmentAccessor`] stands in for
//! process environment reads, and [`PluginConfig`] carries the handful of
//! `puppet.*` settings. Nothing reads global state behind the caller's back.

pub mod config;
pub mod env;
pub mod identity;
pub mod paths;
pub mod platform;

pub use config::{ConfigError, PluginConfig, DEFAULT_PUPPET_HOST, DEFAULT_PUPPET_PORT};
pub use env::{EnvironmentAccessor, MapEnv, ProcessEnv};
pub use identity::{Certname, InvalidCertname};
pub use paths::SslLayout;
pub use platform::{HostPlatform, OsFamily, Platform, Privilege, StaticPlatform};
