use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// True if only the owner can read and write `path`. Always true off Unix.
pub fn is_private(path: &Path) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)?.permissions().mode();
        Ok(mode & 0o777 == 0o600)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(true)
    }
}

/// Stored `JSESSIONID` cookie reused across runs.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored cookie, if any. A file readable by others is deleted.
    pub fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        if !is_private(&self.path)? {
            log::error!(
                "session file {} does not have mode 0600, removing it",
                self.path.display()
            );
            self.remove()?;
            return Ok(None);
        }

        let cookie = fs::read_to_string(&self.path)?;
        let cookie = cookie.trim();
        Ok((!cookie.is_empty()).then(|| cookie.to_string()))
    }

    pub fn write(&self, cookie: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, cookie)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        log::debug!("saved session to {}", self.path.display());
        Ok(())
    }

    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
