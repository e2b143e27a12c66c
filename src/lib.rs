//! Deploy a grml live system (ISO image or already-mounted live tree) onto
//! a USB block device or directory and make it bootable via a legacy PC
//! bootloader.
//!
//! The pipeline per source image: mount → identify the image flavour →
//! copy the boot payload into a fixed on-disk layout → render bootloader
//! configuration → optionally install a bootloader and master boot record
//! on the raw target device. Mount points are scoped resources, released
//! on every exit path.
//!
//! # Architecture
//!
//! ```text
//! orchestrator
//!     │
//!     ├── mount        mount/unmount lifecycle, scoped guards
//!     ├── manifest     one-shot filename index of the source tree
//!     ├── flavour      image variant from the version marker
//!     ├── deploy       boot payload → deployment layout
//!     ├── bootconfig   GRUB + syslinux menu rendering (pure)
//!     ├── bootloader   first-stage installer, device normalization
//!     └── mbr          ordered master-boot-record sequence
//! ```
//!
//! Every mutating operation goes through [`ExecContext`], so a dry run
//! logs instead of executing; read-only discovery behaves identically in
//! both modes.

pub mod bootconfig;
pub mod bootloader;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod flavour;
pub mod manifest;
pub mod mbr;
pub mod mount;
pub mod orchestrator;
pub mod preflight;
pub mod probe;

pub use config::Config;
pub use context::ExecContext;
pub use error::DeployError;
pub use flavour::Flavour;
