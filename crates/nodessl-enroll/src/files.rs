//! Exclusive-create writes for SSL material.
//!
//! Contents are staged in a hidden sibling file and hard-linked into place,
//! so the target either appears complete with its final mode or not at all.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use nodessl_common::paths::set_mode;

static STAGED: AtomicU64 = AtomicU64::new(0);

/// Create `path` with `contents` and exactly `mode`.
///
/// Returns `Ok(false)` without touching the file if it already exists, so a
/// concurrent writer is never clobbered.
pub(crate) fn create_exclusive(path: &Path, contents: &[u8], mode: u32) -> io::Result<bool> {
    create_exclusive_with(path, mode, |file| file.write_all(contents))
}

fn create_exclusive_with<F>(path: &Path, mode: u32, fill: F) -> io::Result<bool>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    if path.exists() {
        return Ok(false);
    }

    let staged = staging_path(path)?;
    let mut file = open_new(&staged, mode)?;
    let linked = set_mode(&staged, mode)
        .and_then(|()| fill(&mut file))
        .and_then(|()| file.sync_all())
        .and_then(|()| std::fs::hard_link(&staged, path));
    drop(file);
    if let Err(e) = std::fs::remove_file(&staged) {
        tracing::warn!(path = %staged.display(), error = %e, "Staged file left behind");
    }

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

fn open_new(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}

/// `.<name>.<pid>.<n>.tmp` next to `path`.
fn staging_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no file name in {}", path.display()),
        )
    })?;
    Ok(path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name.to_string_lossy(),
        std::process::id(),
        STAGED.fetch_add(1, Ordering::Relaxed)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_new_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("new.pem");

        assert!(create_exclusive(&path, b"pem", 0o644).unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"pem");
    }

    #[test]
    fn leaves_existing_file_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("existing.pem");
        std::fs::write(&path, "original").unwrap();

        assert!(!create_exclusive(&path, b"replacement", 0o644).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[cfg(unix)]
    #[test]
    fn mode_is_exact() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key.pem");
        create_exclusive(&path, b"key", 0o640).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cert.pem");

        let err = create_exclusive_with(&path, 0o644, |file| {
            file.write_all(b"-----BEGIN")?;
            Err(io::Error::other("disk full"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn successful_write_leaves_only_the_target() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ca.pem");

        create_exclusive(&path, b"ca", 0o644).unwrap();
        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("ca.pem")]);
    }

    #[test]
    fn missing_parent_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent").join("file.pem");
        assert!(create_exclusive(&path, b"x", 0o644).is_err());
    }
}
