//! Advisory lock guarding a snapshot table against concurrent runs

use crate::error::{RatingError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lock file held for the lifetime of a run, removed on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Lock file path used for a snapshot table
    pub fn path_for(table: &Path) -> PathBuf {
        let mut name = table
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        table.with_file_name(name)
    }

    /// Take the lock next to `table`, failing if another run holds it
    pub fn acquire(table: &Path, owner: &str) -> Result<Self> {
        let path = Self::path_for(table);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RatingError::Storage {
                message: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(RatingError::Locked {
                    path: path.display().to_string(),
                }
                .into())
            }
            Err(e) => {
                return Err(RatingError::Storage {
                    message: format!("Failed to create lock {}: {}", path.display(), e),
                }
                .into())
            }
        };

        writeln!(file, "{} pid={}", owner, std::process::id()).map_err(|e| {
            RatingError::Storage {
                message: format!("Failed to write lock {}: {}", path.display(), e),
            }
        })?;

        debug!("Acquired run lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove run lock {}: {}", self.path.display(), e);
        }
    }
}
