//! Apply an image definition to a rootfs.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::definition::ImageDefinition;
use crate::generator::dispatch;
use crate::manager::PackageManager;
use crate::process::CommandRunner;

/// Configure repositories, run package operations, then generate files.
///
/// Everything runs in definition order and stops at the first failure.
/// Generators that do not support the target are skipped.
pub fn apply(definition: &ImageDefinition, rootfs: &Path, runner: impl CommandRunner) -> Result<()> {
    let packages = &definition.packages;
    let manager = PackageManager::new(packages.manager, rootfs, runner);

    for repo in &packages.repositories {
        manager
            .manage_repository(repo)
            .with_context(|| format!("configuring repository '{}'", repo.name))?;
    }

    if packages.update {
        manager.refresh().context("refreshing package indexes")?;
        manager.update().context("updating installed packages")?;
    }

    if !packages.install.is_empty() {
        manager
            .install(&packages.install)
            .context("installing packages")?;
    }

    if !packages.remove.is_empty() {
        manager.remove(&packages.remove).context("removing packages")?;
    }

    if packages.cleanup {
        manager.clean().context("cleaning package cache")?;
    }

    for file in &definition.files {
        let generator = file.generator()?;
        match dispatch(generator.as_ref(), &definition.target, rootfs) {
            Ok(()) => {}
            Err(e) if e.is_unsupported() => {
                warn!(generator = generator.name(), "skipped: {}", e);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("running {} generator", generator.name()))
            }
        }
    }

    info!(rootfs = %rootfs.display(), "image definition applied");
    Ok(())
}
