//! Repository list and trust-key configuration.
//!
//! List files carry an ownership marker as their first line. A file that
//! starts with the marker belongs to us and new source lines are appended to
//! it; anything else is foreign content and is replaced. Trust keys are
//! always written from scratch.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::process::CommandRunner;
use crate::rootfs;

/// First line of every list file this tool owns.
pub const OWNERSHIP_MARKER: &str = "# Generated by distro-imagegen\n";

pub const PGP_PUBLIC_KEY_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";
pub const PEM_PUBLIC_KEY_HEADER: &str = "-----BEGIN PUBLIC KEY-----";

/// One package source to install into the image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryDeclaration {
    /// List file name, or the family's reserved primary name.
    pub name: String,
    /// One or more source-definition lines, written verbatim.
    #[serde(rename = "url")]
    pub source_line: String,
    /// Armored key block or a bare key id.
    #[serde(default, rename = "key")]
    pub trust_key: Option<String>,
}

impl RepositoryDeclaration {
    /// Create a declaration. An empty `trust_key` is the same as `None`.
    pub fn new(
        name: impl Into<String>,
        source_line: impl Into<String>,
        trust_key: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_line: source_line.into(),
            trust_key,
        }
    }

    /// The trust key, treating an empty string as absent.
    pub fn trust_key(&self) -> Option<&str> {
        self.trust_key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Where a family keeps its repository list files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPlacement {
    /// One file per declaration in `dir`, named `<name><suffix>`. The
    /// optional `primary` pair maps a reserved name to the main list file.
    DropIn {
        primary: Option<(&'static str, &'static str)>,
        dir: &'static str,
        suffix: &'static str,
    },
    /// Every declaration accumulates in this one file.
    Single(&'static str),
}

/// Encoding of trust keys a family accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// OpenPGP armored keys; bare ids are fetched with gpg from a key server.
    Pgp,
    /// PEM public keys; must always be supplied inline.
    Pem,
}

impl KeyFormat {
    /// Armor header that marks an inline key of this format.
    pub fn header(self) -> &'static str {
        match self {
            KeyFormat::Pgp => PGP_PUBLIC_KEY_HEADER,
            KeyFormat::Pem => PEM_PUBLIC_KEY_HEADER,
        }
    }
}

/// On-disk layout of one family's repository configuration, relative to the rootfs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryLayout {
    pub lists: ListPlacement,
    pub key_dir: &'static str,
    pub key_suffix: &'static str,
    pub key_format: KeyFormat,
}

impl RepositoryLayout {
    /// Rootfs-relative path of the list file for repository `name`.
    pub fn list_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;

        match self.lists {
            ListPlacement::DropIn {
                primary: Some((reserved, path)),
                ..
            } if name == reserved => Ok(PathBuf::from(path)),
            ListPlacement::DropIn { dir, suffix, .. } => {
                let file = if name.ends_with(suffix) {
                    name.to_string()
                } else {
                    format!("{}{}", name, suffix)
                };
                Ok(Path::new(dir).join(file))
            }
            ListPlacement::Single(path) => Ok(PathBuf::from(path)),
        }
    }

    /// Rootfs-relative path of the trust key for repository `name`.
    pub fn key_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(Path::new(self.key_dir).join(format!("{}{}", name, self.key_suffix)))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "repository name is empty"
    } else if name.contains('/') {
        "repository name contains '/'"
    } else if name == "." || name == ".." {
        "repository name is a directory reference"
    } else {
        return Ok(());
    };

    Err(Error::InvalidPath {
        path: name.to_string(),
        reason,
    })
}

/// Write `decl` into the rootfs: its source lines into the list file, then
/// its trust key (if any) into the key directory.
///
/// Steps run strictly in order and stop at the first failure. Nothing is
/// rolled back: a list file updated before a failed key fetch stays updated.
pub fn configure(
    rootfs: &Path,
    layout: &RepositoryLayout,
    decl: &RepositoryDeclaration,
    runner: impl CommandRunner,
) -> Result<()> {
    let list_path = rootfs::resolve(rootfs, &layout.list_path(&decl.name)?)?;
    append_source_lines(&list_path, &decl.source_line)?;
    info!(repository = %decl.name, path = %list_path.display(), "repository list written");

    let Some(key) = decl.trust_key() else {
        return Ok(());
    };

    let material = resolve_key(layout.key_format, key, &runner)?;
    let key_path = rootfs::resolve(rootfs, &layout.key_path(&decl.name)?)?;
    write_key(&key_path, &material)?;
    info!(repository = %decl.name, path = %key_path.display(), "trust key written");

    Ok(())
}

/// Add `source_line` to the list file at `path`, taking ownership of it
/// first if it does not start with [`OWNERSHIP_MARKER`].
fn append_source_lines(path: &Path, source_line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
        }
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::io("open file", path, e))?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| Error::io("read from file", path, e))?;

    // The decision is made once, on the full content, before any mutation.
    if !content.starts_with(OWNERSHIP_MARKER.as_bytes()) {
        if !content.is_empty() {
            debug!(path = %path.display(), "replacing unmanaged list file");
        }
        file.set_len(0)
            .map_err(|e| Error::io("truncate file", path, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io("seek in file", path, e))?;
        file.write_all(OWNERSHIP_MARKER.as_bytes())
            .map_err(|e| Error::io("write to file", path, e))?;
    }

    file.write_all(source_line.as_bytes())
        .map_err(|e| Error::io("write to file", path, e))?;
    if !source_line.ends_with('\n') {
        file.write_all(b"\n")
            .map_err(|e| Error::io("write to file", path, e))?;
    }

    Ok(())
}

fn resolve_key(format: KeyFormat, key: &str, runner: &impl CommandRunner) -> Result<String> {
    if key.starts_with(format.header()) {
        return Ok(key.to_string());
    }

    match format {
        KeyFormat::Pgp => fetch_pgp_key(key, runner),
        KeyFormat::Pem => Err(Error::unsupported(
            format!("Fetching key '{}' by id", key),
            "PEM signing keys",
        )),
    }
}

/// Receive `key_id` from the configured key server and export it armored.
fn fetch_pgp_key(key_id: &str, runner: &impl CommandRunner) -> Result<String> {
    debug!(key_id, "fetching trust key from key server");
    runner.run("gpg", &["--recv-keys".to_string(), key_id.to_string()])?;

    let export_args = vec![
        "--export".to_string(),
        "--armor".to_string(),
        key_id.to_string(),
    ];
    let exported = runner.run("gpg", &export_args)?;

    // gpg exits 0 with empty output when the key is not in the keyring.
    if exported.stdout.trim().is_empty() {
        return Err(Error::Command {
            program: "gpg".to_string(),
            args: export_args,
            output: format!("no key material exported for '{}'", key_id),
        });
    }

    Ok(exported.stdout)
}

fn write_key(path: &Path, material: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
        }
    }

    let mut file = File::create(path).map_err(|e| Error::io("create file", path, e))?;
    file.write_all(material.as_bytes())
        .map_err(|e| Error::io("write to file", path, e))?;

    Ok(())
}
