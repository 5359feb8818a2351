//! Generator that writes fixed content to a file in the image.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tracing::info;

use super::{rootfs_path, Generator};
use crate::error::{Error, Result};

pub struct Dump {
    path: String,
    content: String,
}

impl Dump {
    /// Write `content` to image path `path`, adding a final newline if missing.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    fn write(&self, rootfs: &Path) -> Result<()> {
        let path = rootfs_path(rootfs, &self.path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
        }

        let mut file = File::create(&path).map_err(|e| Error::io("create file", &path, e))?;
        file.write_all(self.content.as_bytes())
            .map_err(|e| Error::io("write to file", &path, e))?;
        if !self.content.ends_with('\n') {
            file.write_all(b"\n")
                .map_err(|e| Error::io("write to file", &path, e))?;
        }

        info!(path = %path.display(), "file written");
        Ok(())
    }
}

impl Generator for Dump {
    fn name(&self) -> &str {
        "dump"
    }

    fn run_container(&self, rootfs: &Path) -> Result<()> {
        self.write(rootfs)
    }

    fn run_vm(&self, rootfs: &Path, _filesystem: &str) -> Result<()> {
        self.write(rootfs)
    }
}
