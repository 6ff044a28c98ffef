//! SSL directory layout.
//!
//! Mirrors the Puppet agent layout so nodessl and `puppet agent` can share
//! key material on the same host:
//!
//! - Windows: `C:\ProgramData\PuppetLabs\puppet\etc\ssl`
//! - Unix, root: `/etc/puppetlabs/puppet/ssl`
//! - Unix, user: `~/.puppetlabs/etc/puppet/ssl`

use std::path::{Path, PathBuf};

use crate::identity::Certname;
use crate::platform::{OsFamily, Platform, Privilege};

const WINDOWS_SSL_DIR: &str = r"C:\ProgramData\PuppetLabs\puppet\etc\ssl";
const ROOT_SSL_DIR: &str = "/etc/puppetlabs/puppet/ssl";
const USER_SSL_SUBDIR: &str = ".puppetlabs/etc/puppet/ssl";

pub const CERTIFICATE_REQUESTS_DIR: &str = "certificate_requests";
pub const CERTS_DIR: &str = "certs";
pub const PUBLIC_KEYS_DIR: &str = "public_keys";
pub const PRIVATE_KEYS_DIR: &str = "private_keys";
pub const PRIVATE_DIR: &str = "private";

const CA_FILENAME: &str = "ca.pem";

/// Mode of the SSL base directory.
pub const BASE_DIR_MODE: u32 = 0o771;

/// Subdirectories of the base and their modes. Key-facing directories are
/// group-readable only; certificate-facing ones are world-readable.
pub const SSL_SUBDIRS: [(&str, u32); 5] = [
    (CERTIFICATE_REQUESTS_DIR, 0o755),
    (CERTS_DIR, 0o755),
    (PUBLIC_KEYS_DIR, 0o755),
    (PRIVATE_KEYS_DIR, 0o750),
    (PRIVATE_DIR, 0o750),
];

/// Mode of `private_keys/<certname>.pem`.
pub const PRIVATE_KEY_MODE: u32 = 0o640;

/// Mode of CSRs, signed certificates and the CA certificate.
pub const PUBLIC_FILE_MODE: u32 = 0o644;

/// Base SSL directory for a host.
pub fn ssl_base_dir(os: OsFamily, privilege: Privilege, home: Option<&Path>) -> PathBuf {
    match (os, privilege) {
        (OsFamily::Windows, _) => PathBuf::from(WINDOWS_SSL_DIR),
        (OsFamily::Unix, Privilege::Superuser) => PathBuf::from(ROOT_SSL_DIR),
        (OsFamily::Unix, Privilege::User) => match home {
            Some(home) => home.join(USER_SSL_SUBDIR),
            None => {
                tracing::warn!("No home directory, using a relative SSL directory");
                PathBuf::from(USER_SSL_SUBDIR)
            }
        },
    }
}

/// Where a node's SSL material lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslLayout {
    base: PathBuf,
    certname: Certname,
}

impl SslLayout {
    /// Layout rooted at an explicit base directory.
    pub fn new(base: impl Into<PathBuf>, certname: Certname) -> Self {
        Self {
            base: base.into(),
            certname,
        }
    }

    /// Layout at the platform's standard location.
    pub fn resolve(platform: &dyn Platform, certname: Certname) -> Self {
        let home = platform.home_dir();
        let base = ssl_base_dir(platform.os_family(), platform.privilege(), home.as_deref());
        Self::new(base, certname)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn certname(&self) -> &Certname {
        &self.certname
    }

    fn pem_name(&self) -> String {
        format!("{}.pem", self.certname)
    }

    /// `certificate_requests/<certname>.pem`
    pub fn csr_path(&self) -> PathBuf {
        self.base
            .join(CERTIFICATE_REQUESTS_DIR)
            .join(self.pem_name())
    }

    /// `certs/ca.pem`
    pub fn ca_path(&self) -> PathBuf {
        self.base.join(CERTS_DIR).join(CA_FILENAME)
    }

    /// `certs/<certname>.pem`
    pub fn client_public_cert(&self) -> PathBuf {
        self.base.join(CERTS_DIR).join(self.pem_name())
    }

    /// `private_keys/<certname>.pem`
    pub fn client_private_key(&self) -> PathBuf {
        self.base.join(PRIVATE_KEYS_DIR).join(self.pem_name())
    }

    pub fn has_ca(&self) -> bool {
        self.ca_path().exists()
    }

    pub fn has_csr(&self) -> bool {
        self.csr_path().exists()
    }

    pub fn has_client_public_cert(&self) -> bool {
        self.client_public_cert().exists()
    }

    pub fn has_client_private_key(&self) -> bool {
        self.client_private_key().exists()
    }

    /// Create the base directory and its subdirectories with their modes.
    ///
    /// Modes are set explicitly after creation so the umask cannot widen or
    /// narrow them. Directories that already exist keep their modes, since
    /// the tree may belong to `puppet agent`. Safe to call repeatedly.
    pub fn make_ssl_dirs(&self) -> std::io::Result<()> {
        make_dir(&self.base, BASE_DIR_MODE)?;
        for (name, mode) in SSL_SUBDIRS {
            make_dir(&self.base.join(name), mode)?;
        }
        tracing::debug!(path = %self.base.display(), "SSL directories ready");
        Ok(())
    }
}

fn make_dir(path: &Path, mode: u32) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::create_dir(path) {
        Ok(()) => {
            tracing::debug!(
                path = %path.display(),
                mode = %format!("{mode:o}"),
                "Created directory"
            );
            set_mode(path, mode)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Apply exact permission bits (no-op off Unix).
pub fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::StaticPlatform;

    fn layout() -> SslLayout {
        SslLayout::new("/ssl", Certname::new("rspec").unwrap())
    }

    #[test]
    fn windows_uses_program_data() {
        assert_eq!(
            ssl_base_dir(OsFamily::Windows, Privilege::User, None),
            PathBuf::from(r"C:\ProgramData\PuppetLabs\puppet\etc\ssl")
        );
    }

    #[test]
    fn unix_root_uses_system_dir() {
        assert_eq!(
            ssl_base_dir(OsFamily::Unix, Privilege::Superuser, Some(Path::new("/root"))),
            PathBuf::from("/etc/puppetlabs/puppet/ssl")
        );
    }

    #[test]
    fn unix_user_uses_home() {
        assert_eq!(
            ssl_base_dir(OsFamily::Unix, Privilege::User, Some(Path::new("/rspec"))),
            PathBuf::from("/rspec/.puppetlabs/etc/puppet/ssl")
        );
    }

    #[test]
    fn resolve_follows_platform() {
        let platform = StaticPlatform::unix_user("/rspec", "node");
        let layout = SslLayout::resolve(&platform, Certname::new("rip.mcollective").unwrap());
        assert_eq!(
            layout.base_dir(),
            Path::new("/rspec/.puppetlabs/etc/puppet/ssl")
        );
    }

    #[test]
    fn file_paths() {
        let layout = layout();
        assert_eq!(
            layout.csr_path(),
            PathBuf::from("/ssl/certificate_requests/rspec.pem")
        );
        assert_eq!(layout.ca_path(), PathBuf::from("/ssl/certs/ca.pem"));
        assert_eq!(
            layout.client_public_cert(),
            PathBuf::from("/ssl/certs/rspec.pem")
        );
        assert_eq!(
            layout.client_private_key(),
            PathBuf::from("/ssl/private_keys/rspec.pem")
        );
    }

    #[cfg(unix)]
    #[test]
    fn make_ssl_dirs_sets_exact_modes() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("ssl");
        let layout = SslLayout::new(&base, Certname::new("rspec").unwrap());

        layout.make_ssl_dirs().unwrap();
        // Idempotent
        layout.make_ssl_dirs().unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode(&base), 0o771);
        assert_eq!(mode(&base.join("certificate_requests")), 0o755);
        assert_eq!(mode(&base.join("certs")), 0o755);
        assert_eq!(mode(&base.join("public_keys")), 0o755);
        assert_eq!(mode(&base.join("private_keys")), 0o750);
        assert_eq!(mode(&base.join("private")), 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn existing_directories_keep_their_modes() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("ssl");
        std::fs::create_dir_all(base.join("certs")).unwrap();
        set_mode(&base, 0o700).unwrap();
        set_mode(&base.join("certs"), 0o700).unwrap();

        SslLayout::new(&base, Certname::new("rspec").unwrap())
            .make_ssl_dirs()
            .unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode(&base), 0o700);
        assert_eq!(mode(&base.join("certs")), 0o700);
        assert_eq!(mode(&base.join("private_keys")), 0o750);
        assert_eq!(mode(&base.join("certificate_requests")), 0o755);
    }

    #[test]
    fn existence_checks_follow_files() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = SslLayout::new(tmp.path(), Certname::new("rspec").unwrap());
        layout.make_ssl_dirs().unwrap();

        assert!(!layout.has_ca());
        std::fs::write(layout.ca_path(), "ca").unwrap();
        assert!(layout.has_ca());
        assert!(!layout.has_client_public_cert());
        assert!(!layout.has_client_private_key());
        assert!(!layout.has_csr());
    }
}
