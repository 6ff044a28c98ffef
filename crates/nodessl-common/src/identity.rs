//! Certname resolution.
//!
//! Root uses the node identity as-is. Everyone else gets a per-user name
//! (`<USER>.mcollective`) so several users on one machine can each hold a
//! certificate, and `MCOLLECTIVE_CERTNAME` overrides both.

use std::fmt;

use crate::env::EnvironmentAccessor;
use crate::platform::{Platform, Privilege};

/// Environment variable naming the invoking user.
pub const USER_VAR: &str = "USER";

/// Environment variable that overrides the derived certname.
pub const CERTNAME_VAR: &str = "MCOLLECTIVE_CERTNAME";

/// Suffix appended to the user name for unprivileged certnames.
const USER_CERTNAME_SUFFIX: &str = "mcollective";

/// Canonical node identity, used as the certificate CN and to name key material.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Certname(String);

/// A certname that cannot name a file under the SSL directory or a CA URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid certname {name:?}: {reason}")]
pub struct InvalidCertname {
    pub name: String,
    pub reason: &'static str,
}

impl Certname {
    /// Accepts any non-empty name that stays a single path component and a
    /// single URL path segment.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidCertname> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("empty")
        } else if name.contains(['/', '\\']) {
            Some("contains a path separator")
        } else if name.contains(['?', '#']) {
            Some("contains a URL delimiter")
        } else if name.contains("..") {
            Some("contains '..'")
        } else if name.chars().any(char::is_control) {
            Some("contains a control character")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(InvalidCertname { name, reason }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Certname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Certname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve the certname for this process.
///
/// Always produces a name. A candidate that could escape the SSL directory
/// or a CA URL is skipped with a warning in favour of the next one down:
/// override, then per-user default, then the node identity.
pub fn certname(platform: &dyn Platform, env: &dyn EnvironmentAccessor) -> Certname {
    let identity = platform.identity();

    let candidates = match platform.privilege() {
        Privilege::Superuser => vec![],
        Privilege::User => {
            let user = env.fetch(USER_VAR, &identity);
            let default = format!("{user}.{USER_CERTNAME_SUFFIX}");
            vec![env.fetch(CERTNAME_VAR, &default), default]
        }
    };

    let certname = candidates
        .into_iter()
        .find_map(|name| match Certname::new(name) {
            Ok(certname) => Some(certname),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring certname");
                None
            }
        })
        .unwrap_or(Certname(identity));
    tracing::debug!(%certname, "Resolved certname");
    certname
}
