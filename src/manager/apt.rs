//! Debian-style `apt` family.

use super::repository::{KeyFormat, ListPlacement, RepositoryLayout};
use super::{CommandEntry, CommandTable};

const APT_GET: &str = "apt-get";

pub const COMMANDS: CommandTable = CommandTable {
    global: &["-y"],
    clean: CommandEntry {
        program: APT_GET,
        flags: &["clean"],
    },
    install: CommandEntry {
        program: APT_GET,
        flags: &["install"],
    },
    refresh: CommandEntry {
        program: APT_GET,
        flags: &["update"],
    },
    remove: CommandEntry {
        program: APT_GET,
        flags: &["remove", "--auto-remove"],
    },
    update: CommandEntry {
        program: APT_GET,
        flags: &["dist-upgrade"],
    },
};

/// `sources.list` is the reserved name for the primary list; everything
/// else becomes a drop-in under `sources.list.d`.
pub const LAYOUT: RepositoryLayout = RepositoryLayout {
    lists: ListPlacement::DropIn {
        primary: Some(("sources.list", "etc/apt/sources.list")),
        dir: "etc/apt/sources.list.d",
        suffix: ".list",
    },
    key_dir: "etc/apt/trusted.gpg.d",
    key_suffix: ".asc",
    key_format: KeyFormat::Pgp,
};
