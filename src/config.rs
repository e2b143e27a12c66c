//! Run configuration consumed from the command-line layer.

/// Switches affecting a deployment run.
///
/// Validated by the CLI layer before the core is invoked; read-only for
/// the whole run, no component mutates it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Simulate only: mutating operations are logged, never executed.
    pub dry_run: bool,
    /// Copy the core payload only; skip bootloader-support files,
    /// generated configuration and bootloader installation.
    pub copy_only: bool,
    /// Skip file deployment, only install the bootloader.
    pub bootloader_only: bool,
    /// Install GRUB instead of the syslinux-family bootloader.
    pub use_grub: bool,
    /// Install a master boot record on the target device.
    pub install_mbr: bool,
    /// Bypass advisory checks that would otherwise warn.
    pub force: bool,
    /// Extra kernel command-line options appended to both generated menus.
    pub boot_options: Option<String>,
}
