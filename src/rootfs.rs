//! Path resolution inside an image rootfs.
//!
//! Symlinks found in the image are followed the way the image itself would
//! see them once booted: an absolute target restarts at the rootfs, and `..`
//! stops at the rootfs. A resolved path therefore always stays under the
//! rootfs it was resolved against.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Same limit the kernel applies before giving up with `ELOOP`.
const MAX_SYMLINKS: usize = 40;

enum Step {
    Parent,
    Name(OsString),
}

/// Resolve image path `path` (absolute or relative) to its location under
/// `rootfs`, following every symlink including the final component.
///
/// Components that do not exist yet are taken literally, so the result can
/// be used to create new files.
///
/// # Arguments
///
/// * `rootfs` - Host path of the image root
/// * `path` - Path as seen from inside the image
///
/// # Returns
///
/// The host path, or [`Error::InvalidPath`] on a symlink loop.
pub fn resolve(rootfs: &Path, path: &Path) -> Result<PathBuf> {
    let mut pending = VecDeque::new();
    queue_front(&mut pending, path);

    let mut resolved: Vec<OsString> = Vec::new();
    let mut followed = 0;

    while let Some(step) = pending.pop_front() {
        let name = match step {
            Step::Parent => {
                resolved.pop();
                continue;
            }
            Step::Name(name) => name,
        };

        let candidate = under(rootfs, &resolved).join(&name);
        let is_symlink = fs::symlink_metadata(&candidate)
            .map(|metadata| metadata.file_type().is_symlink())
            .unwrap_or(false);
        if !is_symlink {
            resolved.push(name);
            continue;
        }

        followed += 1;
        if followed > MAX_SYMLINKS {
            return Err(Error::InvalidPath {
                path: path.display().to_string(),
                reason: "too many levels of symbolic links",
            });
        }

        let target =
            fs::read_link(&candidate).map_err(|e| Error::io("read link", &candidate, e))?;
        if target.has_root() {
            resolved.clear();
        }
        queue_front(&mut pending, &target);
    }

    Ok(under(rootfs, &resolved))
}

/// Like [`resolve`], but the final component is left as is.
///
/// Used where the last component itself is the subject, e.g. unlinking a
/// symlink rather than its target.
pub fn resolve_parent(rootfs: &Path, path: &Path) -> Result<PathBuf> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok(resolve(rootfs, parent)?.join(name)),
        _ => resolve(rootfs, path),
    }
}

fn queue_front(pending: &mut VecDeque<Step>, path: &Path) {
    let steps: Vec<Step> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(Step::Name(name.to_os_string())),
            Component::ParentDir => Some(Step::Parent),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => None,
        })
        .collect();

    for step in steps.into_iter().rev() {
        pending.push_front(step);
    }
}

fn under(rootfs: &Path, parts: &[OsString]) -> PathBuf {
    let mut path = rootfs.to_path_buf();
    path.extend(parts);
    path
}
