//! Package-manager repository and mount-table configuration for OS image
//! root filesystems.
//!
//! Given an image definition, this crate materializes target-specific files
//! inside a rootfs that is being assembled for a container or VM image:
//!
//! - **Package managers** - one driver per family (apt, dnf, apk) with a static
//!   command table and an idempotent repository configurator
//! - **Generators** - target-specific artifacts such as `/etc/fstab`
//! - **Definition** - the TOML image definition that drives a build
//! - **Preflight checks** - tool validation before anything is modified
//!
//! # Architecture
//!
//! ```text
//! definition (TOML)
//!     │
//!     ├── packages ──► PackageManager<R: CommandRunner>
//!     │                   ├── CommandTable   (install/remove/refresh/update/clean)
//!     │                   └── repository     (list file + trust key)
//!     │
//!     └── files ─────► dispatch(Generator, TargetDescriptor)
//!                         ├── Container
//!                         └── VirtualMachine { filesystem }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use distro_imagegen::manager::{ManagerKind, PackageManager, RepositoryDeclaration};
//! use distro_imagegen::process::SystemRunner;
//!
//! let rootfs = Path::new("/tmp/rootfs");
//! let apt = PackageManager::new(ManagerKind::Apt, rootfs, SystemRunner::chroot(rootfs));
//! apt.manage_repository(&RepositoryDeclaration::new(
//!     "my-repo",
//!     "deb https://example.test/ stable main",
//!     Some("ABCD1234".into()),
//! ))?;
//! ```

pub mod build;
pub mod definition;
pub mod error;
pub mod generator;
pub mod manager;
pub mod preflight;
pub mod process;
pub mod rootfs;

#[cfg(test)]
mod testutil;

pub use error::{Error, Result};
pub use generator::{dispatch, Generator, TargetDescriptor};
pub use manager::{ManagerKind, PackageManager, RepositoryDeclaration};
