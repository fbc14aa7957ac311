//! File-based credential storage.

use super::CredentialStore;
use crate::auth::credentials::Credentials;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Name of the credentials file inside the storage directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// File permissions for the credentials file (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// File-based credential storage.
///
/// Keeps the pair as pretty-printed JSON in `{dir}/credentials.json`, so a
/// login survives across invocations of the CLI.
///
/// # Security
/// - File permissions are set to 0600 (owner read/write only) on Unix
/// - Parent directories are created with 0700 permissions
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the directory where credentials are stored.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the credentials file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                Error::Storage(format!(
                    "Failed to create credentials directory '{}': {}",
                    self.dir.display(),
                    e
                ))
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(DIR_MODE);
                std::fs::set_permissions(&self.dir, perms).map_err(|e| {
                    Error::Storage(format!(
                        "Failed to set directory permissions on '{}': {}",
                        self.dir.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }

    fn write_temp(&self, temp_path: &Path, content: &str) -> Result<()> {
        let io_err = |e: std::io::Error| {
            Error::Storage(format!(
                "Failed to write temp file '{}': {}",
                temp_path.display(),
                e
            ))
        };

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(FILE_MODE)
                .open(temp_path)
                .map_err(io_err)?;
            file.write_all(content.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(temp_path, content).map_err(io_err)?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self))]
    fn load(&self) -> Result<Option<Credentials>> {
        let path = self.path();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read credentials file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let credentials = serde_json::from_str(&content).map_err(|e| {
            Error::Storage(format!(
                "Failed to parse credentials file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(Some(credentials))
    }

    #[instrument(skip(self, credentials), fields(identity = %credentials.identity))]
    fn save(&self, credentials: &Credentials) -> Result<()> {
        self.ensure_dir()?;

        let path = self.path();
        let content = serde_json::to_string_pretty(credentials)
            .map_err(|e| Error::Storage(format!("Failed to serialize credentials: {}", e)))?;

        // Write to a temp file created with restrictive permissions, then
        // rename over the real file.
        let temp_path = path.with_extension("tmp");
        self.write_temp(&temp_path, &content)?;

        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(Error::Storage(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                path.display(),
                e
            )));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to remove credentials file '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}
