//! Target-specific artifact generators.
//!
//! A [`Generator`] writes one artifact into the rootfs. What it writes (or
//! whether it can write anything at all) depends on the build target, so
//! every generator implements one routine per [`TargetDescriptor`] variant
//! and [`dispatch`] picks the right one.
//!
//! # Example
//!
//! ```rust,ignore
//! use distro_imagegen::generator::{dispatch, fstab::Fstab, TargetDescriptor};
//!
//! let target = TargetDescriptor::VirtualMachine { filesystem: "btrfs".into() };
//! dispatch(&Fstab, &target, Path::new("/tmp/rootfs"))?;
//! ```

pub mod dump;
pub mod fstab;
pub mod remove;

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::rootfs;

/// The kind of image being built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetDescriptor {
    Container,
    #[serde(rename = "vm")]
    VirtualMachine {
        /// Root filesystem type; empty means the default.
        #[serde(default)]
        filesystem: String,
    },
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetDescriptor::Container => write!(f, "container targets"),
            TargetDescriptor::VirtualMachine { .. } => write!(f, "virtual-machine targets"),
        }
    }
}

/// Writes one artifact into a rootfs.
pub trait Generator {
    /// Name for logging and error messages.
    fn name(&self) -> &str;

    fn run_container(&self, rootfs: &Path) -> Result<()>;

    fn run_vm(&self, rootfs: &Path, filesystem: &str) -> Result<()>;
}

/// Run `generator` for `target`.
///
/// Returns [`Error::Unsupported`] when the generator has no behavior for the
/// target; in that case nothing in the rootfs has been touched.
pub fn dispatch(generator: &dyn Generator, target: &TargetDescriptor, rootfs: &Path) -> Result<()> {
    match target {
        TargetDescriptor::Container => generator.run_container(rootfs),
        TargetDescriptor::VirtualMachine { filesystem } => generator.run_vm(rootfs, filesystem),
    }
}

/// Map an image path (absolute or relative) to its location under `rootfs`.
///
/// Parent-directory components are rejected, and symlinks already present in
/// the image are resolved against `rootfs`, so the result never leaves the
/// rootfs.
pub fn rootfs_path(rootfs: &Path, path: &str) -> Result<PathBuf> {
    rootfs::resolve(rootfs, &image_path(path)?)
}

/// Validate an image path and return it relative to the image root.
pub(crate) fn image_path(path: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();

    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(Error::InvalidPath {
                    path: path.to_string(),
                    reason: "path escapes the rootfs",
                })
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "path names the rootfs itself",
        });
    }

    Ok(relative)
}
