use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use distro_imagegen::build::apply;
use distro_imagegen::definition::{load_definition, FileDeclaration, GeneratorKind};
use distro_imagegen::manager::{ManagerKind, PackageManager, RepositoryDeclaration};
use distro_imagegen::preflight::check_definition;
use distro_imagegen::process::SystemRunner;
use distro_imagegen::{dispatch, TargetDescriptor};

#[derive(Parser)]
#[command(name = "distro-imagegen")]
#[command(about = "Configure package repositories and generated files inside an image rootfs")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an image definition to a rootfs
    Apply {
        definition: PathBuf,
        rootfs: PathBuf,
        /// Run package-manager and gpg commands on the host instead of chrooted
        #[arg(long)]
        no_chroot: bool,
    },

    /// Configure a single repository
    Repo {
        rootfs: PathBuf,
        #[arg(long, value_enum)]
        manager: Manager,
        #[arg(long)]
        name: String,
        /// Source line(s) to write
        #[arg(long)]
        url: String,
        /// Armored key block or key id
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        no_chroot: bool,
    },

    /// Run one path-less generator (fstab) against a target
    Generate {
        rootfs: PathBuf,
        #[arg(value_enum)]
        generator: PathlessGenerator,
        #[arg(long, value_enum, default_value = "vm")]
        target: Target,
        /// Root filesystem type for VM targets (default: ext4)
        #[arg(long, default_value = "")]
        filesystem: String,
    },

    /// Check that every tool a definition needs is available
    Preflight {
        definition: PathBuf,
        rootfs: PathBuf,
        #[arg(long)]
        no_chroot: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Manager {
    Apt,
    Dnf,
    Apk,
}

impl From<Manager> for ManagerKind {
    fn from(manager: Manager) -> Self {
        match manager {
            Manager::Apt => ManagerKind::Apt,
            Manager::Dnf => ManagerKind::Dnf,
            Manager::Apk => ManagerKind::Apk,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PathlessGenerator {
    Fstab,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Container,
    Vm,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .without_time()
        .init();

    match cli.command {
        Commands::Apply {
            definition,
            rootfs,
            no_chroot,
        } => {
            let def = load_definition(&definition)?;
            ensure_rootfs(&rootfs)?;
            check_definition(&def, &rootfs, !no_chroot)?;
            info!(definition = %definition.display(), rootfs = %rootfs.display(), "applying");
            apply(&def, &rootfs, runner(&rootfs, no_chroot)).with_context(|| {
                format!(
                    "applying '{}' to '{}'",
                    definition.display(),
                    rootfs.display()
                )
            })
        }
        Commands::Repo {
            rootfs,
            manager,
            name,
            url,
            key,
            no_chroot,
        } => {
            ensure_rootfs(&rootfs)?;
            let manager = PackageManager::new(manager.into(), &rootfs, runner(&rootfs, no_chroot));
            let decl = RepositoryDeclaration::new(name, url, key);
            manager
                .manage_repository(&decl)
                .with_context(|| format!("configuring repository '{}'", decl.name))
        }
        Commands::Generate {
            rootfs,
            generator,
            target,
            filesystem,
        } => {
            ensure_rootfs(&rootfs)?;
            let declaration = FileDeclaration {
                generator: match generator {
                    PathlessGenerator::Fstab => GeneratorKind::Fstab,
                },
                path: None,
                content: None,
            };
            let target = match target {
                Target::Container => TargetDescriptor::Container,
                Target::Vm => TargetDescriptor::VirtualMachine { filesystem },
            };
            let generator = declaration.generator()?;
            dispatch(generator.as_ref(), &target, &rootfs)?;
            Ok(())
        }
        Commands::Preflight {
            definition,
            rootfs,
            no_chroot,
        } => {
            let def = load_definition(&definition)?;
            check_definition(&def, &rootfs, !no_chroot)?;
            println!("All required tools found.");
            Ok(())
        }
    }
}

fn runner(rootfs: &Path, no_chroot: bool) -> SystemRunner {
    let runner = if no_chroot {
        SystemRunner::host()
    } else {
        SystemRunner::chroot(rootfs)
    };
    match runner.chroot_dir() {
        Some(root) => debug!(root = %root.display(), "commands run chrooted"),
        None => debug!("commands run on the host"),
    }
    runner
}

fn ensure_rootfs(rootfs: &Path) -> Result<()> {
    if !rootfs.is_dir() {
        anyhow::bail!("rootfs '{}' is not a directory", rootfs.display());
    }
    Ok(())
}
