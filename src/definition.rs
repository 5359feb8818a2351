//! Image definition file.
//!
//! The definition is a TOML document naming the build target, the package
//! manager with its repositories and package lists, and the generated files.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::generator::dump::Dump;
use crate::generator::fstab::Fstab;
use crate::generator::remove::Remove;
use crate::generator::{Generator, TargetDescriptor};
use crate::manager::{ManagerKind, RepositoryDeclaration};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageDefinition {
    #[serde(default)]
    pub image: ImageSection,
    pub target: TargetDescriptor,
    pub packages: PackagesSection,
    #[serde(default)]
    pub files: Vec<FileDeclaration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSection {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackagesSection {
    pub manager: ManagerKind,
    /// Refresh indexes and upgrade installed packages before installing.
    #[serde(default)]
    pub update: bool,
    /// Clean the package cache once everything is installed.
    #[serde(default)]
    pub cleanup: bool,
    #[serde(default)]
    pub install: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub repositories: Vec<RepositoryDeclaration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Fstab,
    Dump,
    Remove,
}

/// One `[[files]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDeclaration {
    pub generator: GeneratorKind,
    pub path: Option<String>,
    pub content: Option<String>,
}

impl FileDeclaration {
    /// Build the generator this entry describes.
    pub fn generator(&self) -> Result<Box<dyn Generator>> {
        match self.generator {
            GeneratorKind::Fstab => Ok(Box::new(Fstab)),
            GeneratorKind::Dump => {
                let (Some(path), Some(content)) = (&self.path, &self.content) else {
                    bail!("dump generator requires both 'path' and 'content'");
                };
                Ok(Box::new(Dump::new(path, content)))
            }
            GeneratorKind::Remove => {
                let Some(path) = &self.path else {
                    bail!("remove generator requires 'path'");
                };
                Ok(Box::new(Remove::new(path)))
            }
        }
    }
}

/// Read and validate the definition at `path`.
pub fn load_definition(path: &Path) -> Result<ImageDefinition> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading image definition '{}'", path.display()))?;
    parse_definition(&text, path)
}

/// Parse and validate definition text. `origin` is only used in messages.
pub fn parse_definition(text: &str, origin: &Path) -> Result<ImageDefinition> {
    let definition: ImageDefinition = toml::from_str(text)
        .with_context(|| format!("parsing image definition '{}'", origin.display()))?;

    for (index, file) in definition.files.iter().enumerate() {
        file.generator().with_context(|| {
            format!(
                "invalid image definition '{}': files[{}]",
                origin.display(),
                index
            )
        })?;
    }

    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
[image]
description = "Debian bookworm VM"

[target]
kind = "vm"
filesystem = "btrfs"

[packages]
manager = "apt"
update = true
cleanup = true
install = ["vim", "curl"]
remove = ["nano"]

[[packages.repositories]]
name = "sources.list"
url = "deb http://deb.debian.org/debian bookworm main"

[[packages.repositories]]
name = "my-repo"
url = "deb https://example.test/ stable main"
key = "ABCD1234"

[[files]]
generator = "fstab"

[[files]]
generator = "dump"
path = "/etc/motd"
content = "hello"

[[files]]
generator = "remove"
path = "/etc/machine-id"
"#;

    fn origin() -> &'static Path {
        Path::new("image.toml")
    }

    #[test]
    fn test_parse_full_definition() {
        let def = parse_definition(FULL, origin()).unwrap();

        assert_eq!(def.image.description.as_deref(), Some("Debian bookworm VM"));
        assert_eq!(
            def.target,
            TargetDescriptor::VirtualMachine {
                filesystem: "btrfs".into()
            }
        );
        assert_eq!(def.packages.manager, ManagerKind::Apt);
        assert!(def.packages.update);
        assert!(def.packages.cleanup);
        assert_eq!(def.packages.install, vec!["vim", "curl"]);
        assert_eq!(def.packages.remove, vec!["nano"]);
        assert_eq!(def.packages.repositories.len(), 2);
        assert_eq!(def.packages.repositories[1].trust_key(), Some("ABCD1234"));
        assert_eq!(def.files.len(), 3);
        assert_eq!(def.files[0].generator().unwrap().name(), "fstab");
        assert_eq!(def.files[1].generator().unwrap().name(), "dump");
        assert_eq!(def.files[2].generator().unwrap().name(), "remove");
    }

    #[test]
    fn test_minimal_definition_defaults() {
        let def = parse_definition(
            "[target]\nkind = \"container\"\n\n[packages]\nmanager = \"dnf\"\n",
            origin(),
        )
        .unwrap();

        assert_eq!(def.target, TargetDescriptor::Container);
        assert!(!def.packages.update);
        assert!(!def.packages.cleanup);
        assert!(def.packages.install.is_empty());
        assert!(def.packages.repositories.is_empty());
        assert!(def.files.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse_definition(
            "[target]\nkind = \"container\"\n\n[packages]\nmanager = \"apt\"\nsets = []\n",
            origin(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("image.toml"));
    }

    #[test]
    fn test_dump_without_content_rejected() {
        let err = parse_definition(
            "[target]\nkind = \"container\"\n\n[packages]\nmanager = \"apt\"\n\n\
             [[files]]\ngenerator = \"dump\"\npath = \"/etc/motd\"\n",
            origin(),
        )
        .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("files[0]"));
        assert!(msg.contains("'path' and 'content'"));
    }

    #[test]
    fn test_remove_without_path_rejected() {
        let err = parse_definition(
            "[target]\nkind = \"vm\"\n\n[packages]\nmanager = \"apk\"\n\n\
             [[files]]\ngenerator = \"remove\"\n",
            origin(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("requires 'path'"));
    }

    #[test]
    fn test_load_definition_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("image.toml");
        fs::write(&path, FULL).unwrap();

        let def = load_definition(&path).unwrap();
        assert_eq!(def.packages.manager, ManagerKind::Apt);

        let missing = load_definition(&temp.path().join("missing.toml")).unwrap_err();
        assert!(missing.to_string().contains("missing.toml"));
    }
}
