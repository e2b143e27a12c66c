//! First-stage bootloader installation.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::context::ExecContext;
use crate::error::DeployError;

/// Strip a trailing partition number to obtain the owning whole device.
///
/// A first-stage bootloader is installed on the device (`/dev/sda`), never
/// on a partition (`/dev/sda1`). Paths without trailing digits pass
/// through unchanged.
pub fn whole_device(path: &Path) -> PathBuf {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };
    let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.len() == name.len() || trimmed.is_empty() {
        path.to_path_buf()
    } else {
        path.with_file_name(trimmed)
    }
}

/// Install exactly one of the two supported bootloaders on the whole
/// device owning `target_device`.
pub fn install_bootloader(
    ctx: &ExecContext,
    target_device: &Path,
    use_grub: bool,
) -> Result<(), DeployError> {
    let device = whole_device(target_device);
    if use_grub {
        run_installer(ctx, "grub-install", &[], &device)
    } else {
        run_installer(ctx, "syslinux", &["-d", "boot/isolinux"], &device)
    }
}

fn run_installer(
    ctx: &ExecContext,
    installer: &str,
    args: &[&str],
    device: &Path,
) -> Result<(), DeployError> {
    println!("Installing {installer} on device {}", device.display());
    let label = if args.is_empty() {
        format!("{installer} {}", device.display())
    } else {
        format!("{installer} {} {}", args.join(" "), device.display())
    };
    ctx.run(&label, || {
        let status = Command::new(installer)
            .args(args)
            .arg(device)
            .status()
            .map_err(|err| DeployError::BootloaderInstall {
                device: device.to_path_buf(),
                detail: format!("could not run {installer}: {err}"),
            })?;
        if !status.success() {
            return Err(DeployError::BootloaderInstall {
                device: device.to_path_buf(),
                detail: format!("{installer} exited with {status}"),
            });
        }
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_path_is_normalized_to_device() {
        assert_eq!(whole_device(Path::new("/dev/sdb1")), PathBuf::from("/dev/sdb"));
        assert_eq!(whole_device(Path::new("/dev/sdc12")), PathBuf::from("/dev/sdc"));
    }

    #[test]
    fn test_device_path_passes_through() {
        assert_eq!(whole_device(Path::new("/dev/sdb")), PathBuf::from("/dev/sdb"));
    }

    #[test]
    fn test_only_the_trailing_digit_run_is_stripped() {
        assert_eq!(
            whole_device(Path::new("/dev/usb-sdb1")),
            PathBuf::from("/dev/usb-sdb")
        );
    }

    #[test]
    fn test_dry_run_invokes_no_installer() {
        // A bogus installer name would fail if actually invoked.
        install_bootloader(&ExecContext::simulated(), Path::new("/dev/sdb1"), false).unwrap();
        install_bootloader(&ExecContext::simulated(), Path::new("/dev/sdb1"), true).unwrap();
    }
}
