//! Generator that deletes a path from the image.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use super::{image_path, Generator};
use crate::error::{Error, Result};
use crate::rootfs;

pub struct Remove {
    path: String,
}

impl Remove {
    /// Delete image path `path`, recursively for directories.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn remove(&self, rootfs: &Path) -> Result<()> {
        let path = rootfs::resolve_parent(rootfs, &image_path(&self.path)?)?;

        // symlink_metadata so a symlinked directory is unlinked, not followed.
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "nothing to remove");
                return Ok(());
            }
            Err(e) => return Err(Error::io("inspect", &path, e)),
        };

        if metadata.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| Error::io("remove directory", &path, e))?;
        } else {
            fs::remove_file(&path).map_err(|e| Error::io("remove file", &path, e))?;
        }

        info!(path = %path.display(), "removed");
        Ok(())
    }
}

impl Generator for Remove {
    fn name(&self) -> &str {
        "remove"
    }

    fn run_container(&self, rootfs: &Path) -> Result<()> {
        self.remove(rootfs)
    }

    fn run_vm(&self, rootfs: &Path, _filesystem: &str) -> Result<()> {
        self.remove(rootfs)
    }
}
