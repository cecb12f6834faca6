//! Per-user configuration directory
//!
//! Outer applications call [`ConfigDirectory::bootstrap`] once at start-up;
//! nothing in the protocol stack touches the file system.

use genibus_core::GeniResult;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = "GeniControl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDirectory {
    path: PathBuf,
}

impl ConfigDirectory {
    /// Ensure `<base>/GeniControl` exists, creating it if missing
    ///
    /// # Errors
    /// `GeniError::Connection` wrapping the I/O error if the directory
    /// cannot be created.
    pub fn bootstrap(base: impl AsRef<Path>) -> GeniResult<Self> {
        let path = base.as_ref().join(CONFIG_DIR_NAME);
        if !path.is_dir() {
            log::info!("Configuration directory '{}' doesn't exist, creating", path.display());
            std::fs::create_dir_all(&path)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the directory
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_creates_once() {
        let base = std::env::temp_dir().join(format!("genibus-config-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&base);

        let dir = ConfigDirectory::bootstrap(&base).unwrap();
        assert!(dir.path().is_dir());
        assert_eq!(dir.path(), base.join("GeniControl"));
        assert_eq!(dir.file("settings.json"), base.join("GeniControl").join("settings.json"));

        std::fs::write(dir.file("marker"), b"x").unwrap();
        let again = ConfigDirectory::bootstrap(&base).unwrap();
        assert_eq!(again, dir);
        assert!(again.file("marker").exists());

        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_bootstrap_fails_on_file() {
        let base = std::env::temp_dir().join(format!("genibus-config-file-{}", std::process::id()));
        std::fs::write(&base, b"not a directory").unwrap();
        assert!(ConfigDirectory::bootstrap(&base).is_err());
        std::fs::remove_file(&base).unwrap();
    }
}
