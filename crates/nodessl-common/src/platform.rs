use std::path::PathBuf;

/// Operating system family, as far as SSL directory placement cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Unix,
}

/// Privilege level of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// uid 0 on Unix.
    Superuser,
    User,
}

/// Host facts needed to derive identity and paths.
///
/// The real implementation is [`HostPlatform`]; [`StaticPlatform`] lets
/// tests and embedders describe a host without touching the OS.
pub trait Platform {
    fn os_family(&self) -> OsFamily;
    fn privilege(&self) -> Privilege;
    /// Home directory of the effective user, if one can be determined.
    fn home_dir(&self) -> Option<PathBuf>;
    /// OS-level node identity (the hostname).
    fn identity(&self) -> String;
}

/// The machine this process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPlatform;

impl Platform for HostPlatform {
    fn os_family(&self) -> OsFamily {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Unix
        }
    }

    fn privilege(&self) -> Privilege {
        #[cfg(unix)]
        {
            if unsafe { libc::geteuid() } == 0 {
                Privilege::Superuser
            } else {
                Privilege::User
            }
        }
        // Windows nodes always use the machine-wide identity and ProgramData layout.
        #[cfg(not(unix))]
        {
            Privilege::Superuser
        }
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn identity(&self) -> String {
        match hostname::get() {
            Ok(name) => name.to_string_lossy().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not determine hostname, using localhost");
                "localhost".to_string()
            }
        }
    }
}

/// A fixed description of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPlatform {
    pub os_family: OsFamily,
    pub privilege: Privilege,
    pub home_dir: Option<PathBuf>,
    pub identity: String,
}

impl StaticPlatform {
    /// Unprivileged Unix user with the given home directory and hostname.
    pub fn unix_user(home: impl Into<PathBuf>, identity: &str) -> Self {
        Self {
            os_family: OsFamily::Unix,
            privilege: Privilege::User,
            home_dir: Some(home.into()),
            identity: identity.to_string(),
        }
    }

    /// Unix root with the given hostname.
    pub fn unix_root(identity: &str) -> Self {
        Self {
            os_family: OsFamily::Unix,
            privilege: Privilege::Superuser,
            home_dir: Some(PathBuf::from("/root")),
            identity: identity.to_string(),
        }
    }
}

impl Platform for StaticPlatform {
    fn os_family(&self) -> OsFamily {
        self.os_family
    }

    fn privilege(&self) -> Privilege {
        self.privilege
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir.clone()
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }
}
