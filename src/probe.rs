//! Filesystem-type probe for the target partition.

use std::path::Path;
use std::process::Command;

/// Whether `device` holds a FAT filesystem according to `blkid`.
///
/// syslinux requires a FAT-formatted partition. Any probe failure (tool
/// missing, unreadable device, no filesystem signature) is treated as
/// "not usable" rather than as an error; the check is advisory.
pub fn is_fat_partition(device: &Path) -> bool {
    let output = match Command::new("blkid")
        .args(["-o", "value", "-s", "TYPE"])
        .arg(device)
        .output()
    {
        Ok(output) => output,
        Err(_) => return false,
    };
    if !output.status.success() {
        return false;
    }
    String::from_utf8_lossy(&output.stdout).trim() == "vfat"
}
