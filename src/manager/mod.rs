//! Package manager drivers.
//!
//! Each supported family provides a static [`CommandTable`] and a
//! [`RepositoryLayout`]. The [`PackageManager`] driver is the same for every
//! family: it looks operations up in the table and hands repository
//! declarations to the configurator in [`repository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use distro_imagegen::manager::{ManagerKind, PackageManager};
//! use distro_imagegen::process::SystemRunner;
//!
//! let rootfs = Path::new("/tmp/rootfs");
//! let apt = PackageManager::new(ManagerKind::Apt, rootfs, SystemRunner::chroot(rootfs));
//! apt.refresh()?;
//! apt.install(&["vim".to_string()])?;
//! ```

pub mod apk;
pub mod apt;
pub mod dnf;
pub mod repository;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::process::{CommandOutput, CommandRunner};

pub use repository::{KeyFormat, ListPlacement, RepositoryDeclaration, RepositoryLayout};

/// Abstract operations shared by every package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Clean,
    Install,
    Refresh,
    Remove,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Clean => write!(f, "clean"),
            Operation::Install => write!(f, "install"),
            Operation::Refresh => write!(f, "refresh"),
            Operation::Remove => write!(f, "remove"),
            Operation::Update => write!(f, "update"),
        }
    }
}

/// Executable and flags for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub program: &'static str,
    pub flags: &'static [&'static str],
}

/// Static operation-to-command mapping for one package-manager family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTable {
    /// Flags placed before every operation's own flags.
    pub global: &'static [&'static str],
    pub clean: CommandEntry,
    pub install: CommandEntry,
    pub refresh: CommandEntry,
    pub remove: CommandEntry,
    pub update: CommandEntry,
}

impl CommandTable {
    /// Command for `op`.
    pub fn entry(&self, op: Operation) -> &CommandEntry {
        match op {
            Operation::Clean => &self.clean,
            Operation::Install => &self.install,
            Operation::Refresh => &self.refresh,
            Operation::Remove => &self.remove,
            Operation::Update => &self.update,
        }
    }

    /// Executable and full argument list: global flags, operation flags, then `extra`.
    pub fn command_line(&self, op: Operation, extra: &[String]) -> (&'static str, Vec<String>) {
        let entry = self.entry(op);
        let args = self
            .global
            .iter()
            .chain(entry.flags.iter())
            .map(|s| s.to_string())
            .chain(extra.iter().cloned())
            .collect();
        (entry.program, args)
    }
}

/// Supported package-manager families. Exactly one is selected per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerKind {
    Apt,
    Dnf,
    Apk,
}

impl ManagerKind {
    /// Populate the command table for this family.
    pub fn load(self) -> CommandTable {
        match self {
            ManagerKind::Apt => apt::COMMANDS,
            ManagerKind::Dnf => dnf::COMMANDS,
            ManagerKind::Apk => apk::COMMANDS,
        }
    }

    /// Where this family keeps repository lists and trust keys.
    pub fn layout(self) -> RepositoryLayout {
        match self {
            ManagerKind::Apt => apt::LAYOUT,
            ManagerKind::Dnf => dnf::LAYOUT,
            ManagerKind::Apk => apk::LAYOUT,
        }
    }
}

impl fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerKind::Apt => write!(f, "apt"),
            ManagerKind::Dnf => write!(f, "dnf"),
            ManagerKind::Apk => write!(f, "apk"),
        }
    }
}

/// Driver for the package manager inside one rootfs.
pub struct PackageManager<R> {
    kind: ManagerKind,
    commands: CommandTable,
    rootfs: PathBuf,
    runner: R,
}

impl<R: CommandRunner> PackageManager<R> {
    /// Create a driver for `kind` that configures repositories under `rootfs`
    /// and runs commands through `runner`.
    pub fn new(kind: ManagerKind, rootfs: &Path, runner: R) -> Self {
        Self {
            kind,
            commands: kind.load(),
            rootfs: rootfs.to_path_buf(),
            runner,
        }
    }

    /// Install `packages` in one invocation.
    pub fn install(&self, packages: &[String]) -> Result<CommandOutput> {
        self.run(Operation::Install, packages)
    }

    /// Remove `packages` in one invocation.
    pub fn remove(&self, packages: &[String]) -> Result<CommandOutput> {
        self.run(Operation::Remove, packages)
    }

    /// Refresh the package index from the configured repositories.
    pub fn refresh(&self) -> Result<CommandOutput> {
        self.run(Operation::Refresh, &[])
    }

    /// Upgrade every installed package.
    pub fn update(&self) -> Result<CommandOutput> {
        self.run(Operation::Update, &[])
    }

    /// Drop downloaded package caches.
    pub fn clean(&self) -> Result<CommandOutput> {
        self.run(Operation::Clean, &[])
    }

    /// Write the repository list entry and trust key for `decl` into the rootfs.
    pub fn manage_repository(&self, decl: &RepositoryDeclaration) -> Result<()> {
        repository::configure(&self.rootfs, &self.kind.layout(), decl, &self.runner)
    }

    fn run(&self, op: Operation, packages: &[String]) -> Result<CommandOutput> {
        let (program, args) = self.commands.command_line(op, packages);
        info!(manager = %self.kind, operation = %op, packages = ?packages, "running package manager");
        self.runner.run(program, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testutil::RecordingRunner;
    use tempfile::TempDir;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_apt_command_lines() {
        let table = ManagerKind::Apt.load();

        assert_eq!(
            table.command_line(Operation::Install, &strings(&["vim", "curl"])),
            ("apt-get", strings(&["-y", "install", "vim", "curl"]))
        );
        assert_eq!(
            table.command_line(Operation::Remove, &strings(&["nano"])),
            ("apt-get", strings(&["-y", "remove", "--auto-remove", "nano"]))
        );
        assert_eq!(
            table.command_line(Operation::Refresh, &[]),
            ("apt-get", strings(&["-y", "update"]))
        );
        assert_eq!(
            table.command_line(Operation::Update, &[]),
            ("apt-get", strings(&["-y", "dist-upgrade"]))
        );
        assert_eq!(
            table.command_line(Operation::Clean, &[]),
            ("apt-get", strings(&["-y", "clean"]))
        );
    }

    #[test]
    fn test_every_family_has_complete_table() {
        let ops = [
            Operation::Clean,
            Operation::Install,
            Operation::Refresh,
            Operation::Remove,
            Operation::Update,
        ];
        for kind in [ManagerKind::Apt, ManagerKind::Dnf, ManagerKind::Apk] {
            let table = kind.load();
            for op in ops {
                let entry = table.entry(op);
                assert!(!entry.program.is_empty(), "{kind} {op} has no program");
                assert!(!entry.flags.is_empty(), "{kind} {op} has no flags");
            }
        }
    }

    #[test]
    fn test_driver_runs_table_commands() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let dnf = PackageManager::new(ManagerKind::Dnf, temp.path(), &runner);

        dnf.refresh().unwrap();
        dnf.install(&strings(&["git"])).unwrap();
        dnf.clean().unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "dnf -y makecache".to_string(),
                "dnf -y install git".to_string(),
                "dnf -y clean all".to_string(),
            ]
        );
    }

    #[test]
    fn test_driver_surfaces_command_failure() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::failing_on("apt-get");
        let apt = PackageManager::new(ManagerKind::Apt, temp.path(), &runner);

        let err = apt.update().unwrap_err();
        match err {
            Error::Command { program, args, .. } => {
                assert_eq!(program, "apt-get");
                assert_eq!(args, vec!["-y".to_string(), "dist-upgrade".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_manager_kind_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            manager: ManagerKind,
        }
        let parsed: Wrapper = toml::from_str("manager = \"apk\"").unwrap();
        assert_eq!(parsed.manager, ManagerKind::Apk);
        assert!(toml::from_str::<Wrapper>("manager = \"pacman\"").is_err());
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Clean.to_string(), "clean");
        assert_eq!(Operation::Refresh.to_string(), "refresh");
        assert_eq!(ManagerKind::Dnf.to_string(), "dnf");
    }
}
