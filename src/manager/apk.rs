//! Alpine `apk` family.
//!
//! All repositories share `/etc/apk/repositories`. Signing keys are RSA
//! public keys in PEM form under `/etc/apk/keys`; there is no key server to
//! fetch them from by id.

use super::repository::{KeyFormat, ListPlacement, RepositoryLayout};
use super::{CommandEntry, CommandTable};

const APK: &str = "apk";

pub const COMMANDS: CommandTable = CommandTable {
    global: &["--no-cache"],
    clean: CommandEntry {
        program: APK,
        flags: &["cache", "clean"],
    },
    install: CommandEntry {
        program: APK,
        flags: &["add"],
    },
    refresh: CommandEntry {
        program: APK,
        flags: &["update"],
    },
    remove: CommandEntry {
        program: APK,
        flags: &["del"],
    },
    update: CommandEntry {
        program: APK,
        flags: &["upgrade"],
    },
};

pub const LAYOUT: RepositoryLayout = RepositoryLayout {
    lists: ListPlacement::Single("etc/apk/repositories"),
    key_dir: "etc/apk/keys",
    key_suffix: ".rsa.pub",
    key_format: KeyFormat::Pem,
};
