//! Mount table (`/etc/fstab`) generator.
//!
//! Only virtual-machine images have a disk layout to describe; containers
//! get their mounts from the runtime.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tracing::info;

use super::{rootfs_path, Generator};
use crate::error::{Error, Result};

pub const FSTAB_PATH: &str = "etc/fstab";
pub const DEFAULT_FILESYSTEM: &str = "ext4";
pub const DEFAULT_OPTIONS: &str = "defaults";

pub struct Fstab;

/// Render the mount table for a root filesystem of type `filesystem`.
pub fn render(filesystem: &str) -> String {
    let filesystem = if filesystem.is_empty() {
        DEFAULT_FILESYSTEM
    } else {
        filesystem
    };

    let options = if filesystem == "btrfs" {
        format!("{},subvol=@", DEFAULT_OPTIONS)
    } else {
        DEFAULT_OPTIONS.to_string()
    };

    format!(
        "LABEL=rootfs  /         {}  {}  0 0\n\
         LABEL=UEFI    /boot/efi vfat  defaults  0 0\n",
        filesystem, options
    )
}

impl Generator for Fstab {
    fn name(&self) -> &str {
        "fstab"
    }

    fn run_container(&self, _rootfs: &Path) -> Result<()> {
        Err(Error::unsupported("fstab generator", "container targets"))
    }

    fn run_vm(&self, rootfs: &Path, filesystem: &str) -> Result<()> {
        let path = rootfs_path(rootfs, FSTAB_PATH)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
        }

        let mut file = File::create(&path).map_err(|e| Error::io("create file", &path, e))?;
        file.write_all(render(filesystem).as_bytes())
            .map_err(|e| Error::io("write to file", &path, e))?;

        info!(path = %path.display(), "fstab written");
        Ok(())
    }
}
