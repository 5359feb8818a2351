//! Preflight checks for build validation.
//!
//! Validates that the tools a build will spawn exist before anything in the
//! rootfs is modified. When commands run chrooted, the package manager and
//! gpg must exist inside the rootfs and only `chroot` is needed on the host.
//!
//! # Example
//!
//! ```rust
//! use distro_imagegen::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("chroot") {
//!     println!("coreutils not installed");
//! }
//!
//! let tools = &[("gpg", "gnupg")];
//! if let Err(e) = check_required_tools(tools, None) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};
use std::path::Path;

use crate::definition::ImageDefinition;
use crate::manager::{KeyFormat, ManagerKind, Operation};

/// Directories searched for executables inside a rootfs.
const ROOTFS_BIN_DIRS: &[&str] = &["usr/local/sbin", "usr/local/bin", "usr/sbin", "usr/bin", "sbin", "bin"];

/// Check if a command exists on the host PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Check if a command exists in the standard binary directories of `rootfs`.
pub fn command_exists_in(rootfs: &Path, cmd: &str) -> bool {
    let Ok(paths) = std::env::join_paths(ROOTFS_BIN_DIRS.iter().map(|dir| rootfs.join(dir))) else {
        return false;
    };
    which::which_in(cmd, Some(paths), rootfs).is_ok()
}

/// Check that specific tools are available.
///
/// Each tuple is (command_name, package_name). With `rootfs` set the tools
/// are looked up inside it instead of on the host.
pub fn check_required_tools(tools: &[(&str, &str)], rootfs: Option<&Path>) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        let found = match rootfs {
            Some(root) => command_exists_in(root, tool),
            None => command_exists(tool),
        };
        if !found {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let location = match rootfs {
            Some(root) => format!("in rootfs {}", root.display()),
            None => "on the host".to_string(),
        };
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required tools {}:\n{}", location, msg);
    }

    Ok(())
}

/// Tools the package steps of `definition` will spawn, as (command, package).
pub fn required_tools(definition: &ImageDefinition) -> Vec<(&'static str, &'static str)> {
    let packages = &definition.packages;
    let kind = packages.manager;
    let mut tools = vec![(
        kind.load().entry(Operation::Install).program,
        manager_package(kind),
    )];

    let layout = kind.layout();
    let fetches_keys = layout.key_format == KeyFormat::Pgp
        && packages.repositories.iter().any(|repo| {
            repo.trust_key()
                .is_some_and(|key| !key.starts_with(layout.key_format.header()))
        });
    if fetches_keys {
        tools.push(("gpg", "gnupg"));
    }

    tools
}

/// Verify every tool `definition` needs, chrooted into `rootfs` or on the host.
pub fn check_definition(definition: &ImageDefinition, rootfs: &Path, chroot: bool) -> Result<()> {
    if chroot {
        check_required_tools(&[("chroot", "coreutils")], None)?;
        check_required_tools(&required_tools(definition), Some(rootfs))
    } else {
        check_required_tools(&required_tools(definition), None)
    }
}

fn manager_package(kind: ManagerKind) -> &'static str {
    match kind {
        ManagerKind::Apt => "apt",
        ManagerKind::Dnf => "dnf",
        ManagerKind::Apk => "apk-tools",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::parse_definition;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn definition(text: &str) -> ImageDefinition {
        parse_definition(text, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn test_command_exists() {
        // 'sh' should exist on any Unix system
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_command_exists_in_rootfs() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("usr/bin/apt-get");
        fs::create_dir_all(bin.parent().unwrap()).unwrap();
        fs::write(&bin, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(command_exists_in(temp.path(), "apt-get"));
        assert!(!command_exists_in(temp.path(), "dnf"));
    }

    #[test]
    fn test_check_required_tools_failure_lists_all() {
        let tools = &[("nonexistent_command_xyz", "fake-package"), ("also_missing_abc", "other")];
        let err = check_required_tools(tools, None).unwrap_err().to_string();
        assert!(err.contains("nonexistent_command_xyz (install: fake-package)"));
        assert!(err.contains("also_missing_abc (install: other)"));
        assert!(err.contains("on the host"));
    }

    #[test]
    fn test_check_required_tools_success() {
        let tools = &[("sh", "dash"), ("ls", "coreutils")];
        assert!(check_required_tools(tools, None).is_ok());
    }

    #[test]
    fn test_required_tools_gpg_only_for_key_ids() {
        let inline = definition(
            r#"
[target]
kind = "container"

[packages]
manager = "apt"

[[packages.repositories]]
name = "inline"
url = "deb a b c"
key = "-----BEGIN PGP PUBLIC KEY BLOCK-----\nxyz\n"
"#,
        );
        assert_eq!(required_tools(&inline), vec![("apt-get", "apt")]);

        let by_id = definition(
            r#"
[target]
kind = "container"

[packages]
manager = "dnf"

[[packages.repositories]]
name = "fetched"
url = "[fetched]"
key = "ABCD1234"
"#,
        );
        assert_eq!(required_tools(&by_id), vec![("dnf", "dnf"), ("gpg", "gnupg")]);
    }

    #[test]
    fn test_required_tools_apk_never_needs_gpg() {
        let def = definition(
            r#"
[target]
kind = "container"

[packages]
manager = "apk"

[[packages.repositories]]
name = "edge"
url = "https://x/edge"
key = "ABCD1234"
"#,
        );
        assert_eq!(required_tools(&def), vec![("apk", "apk-tools")]);
    }

    #[test]
    fn test_empty_rootfs_has_no_manager() {
        let temp = TempDir::new().unwrap();
        let def = definition("[target]\nkind = \"vm\"\n\n[packages]\nmanager = \"apt\"\n");

        let err = check_required_tools(&required_tools(&def), Some(temp.path())).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("apt-get (install: apt)"));
        assert!(msg.contains("in rootfs"));
    }
}
