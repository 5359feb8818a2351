//! Fedora/RHEL `dnf` family.

use super::repository::{KeyFormat, ListPlacement, RepositoryLayout};
use super::{CommandEntry, CommandTable};

const DNF: &str = "dnf";

pub const COMMANDS: CommandTable = CommandTable {
    global: &["-y"],
    clean: CommandEntry {
        program: DNF,
        flags: &["clean", "all"],
    },
    install: CommandEntry {
        program: DNF,
        flags: &["install"],
    },
    refresh: CommandEntry {
        program: DNF,
        flags: &["makecache"],
    },
    remove: CommandEntry {
        program: DNF,
        flags: &["remove"],
    },
    update: CommandEntry {
        program: DNF,
        flags: &["upgrade"],
    },
};

pub const LAYOUT: RepositoryLayout = RepositoryLayout {
    lists: ListPlacement::DropIn {
        primary: None,
        dir: "etc/yum.repos.d",
        suffix: ".repo",
    },
    key_dir: "etc/pki/rpm-gpg",
    key_suffix: ".asc",
    key_format: KeyFormat::Pgp,
};
