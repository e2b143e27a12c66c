//! Master boot record installation.
//!
//! The sequence is order sensitive and nothing is rolled back on failure:
//! a partially written boot record can already have altered the partition
//! table, so the run aborts at the first failed step and the operator
//! recovers manually. Both preconditions (writable device, available
//! writer and MBR blob) are checked before any destructive action.

use std::ffi::CString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::context::ExecContext;
use crate::error::DeployError;

/// Known-good first-stage boot code, shipped by syslinux.
pub const DEFAULT_MBR_BLOB: &str = "/usr/lib/syslinux/mbr.bin";

/// External boot-record writer plus fallback MBR blob.
///
/// Both are injectable so the precondition checks and the write sequence
/// can be exercised against plain files.
pub struct MbrInstaller {
    writer: String,
    blob: PathBuf,
}

impl Default for MbrInstaller {
    fn default() -> Self {
        Self::new("lilo", Path::new(DEFAULT_MBR_BLOB))
    }
}

impl MbrInstaller {
    pub fn new(writer: &str, blob: &Path) -> Self {
        Self {
            writer: writer.to_string(),
            blob: blob.to_path_buf(),
        }
    }

    /// Write a master boot record onto `device`, which must be the whole
    /// device path, never a partition.
    ///
    /// Steps, each aborting the sequence on its first failure:
    /// 1. initialize the writer's boot record for an extended-partition
    ///    aware layout,
    /// 2. mark the first partition active,
    /// 3. overwrite the first-stage boot code with the known-good blob
    ///    (the writer's own first-stage code is unreliable).
    pub fn install(&self, ctx: &ExecContext, device: &Path) -> Result<(), DeployError> {
        if !is_writable(device) {
            return Err(DeployError::DeviceNotWritable {
                device: device.to_path_buf(),
            });
        }
        let writer = which::which(&self.writer).map_err(|_| DeployError::ToolNotFound {
            tool: self.writer.clone(),
            hint: "install: lilo".into(),
        })?;
        if !self.blob.is_file() {
            return Err(DeployError::ToolNotFound {
                tool: self.blob.display().to_string(),
                hint: "install: syslinux".into(),
            });
        }

        self.writer_step(ctx, &writer, device, "initialize", "-M", "ext")?;
        self.writer_step(ctx, &writer, device, "activate-partition", "-A", "1")?;

        let label = format!("cat {} > {}", self.blob.display(), device.display());
        ctx.run(&label, || self.write_boot_code(device))?;
        Ok(())
    }

    fn writer_step(
        &self,
        ctx: &ExecContext,
        writer: &Path,
        device: &Path,
        step: &'static str,
        mode: &str,
        arg: &str,
    ) -> Result<(), DeployError> {
        let failed = |detail: String| DeployError::BootRecordStep {
            step,
            device: device.to_path_buf(),
            detail,
        };
        let label = format!(
            "{} -S /dev/null {mode} {} {arg}",
            writer.display(),
            device.display()
        );
        ctx.run(&label, || {
            let status = Command::new(writer)
                .args(["-S", "/dev/null", mode])
                .arg(device)
                .arg(arg)
                .status()
                .map_err(|err| failed(err.to_string()))?;
            if !status.success() {
                return Err(failed(format!("{} exited with {status}", writer.display())));
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Raw copy of the blob onto the start of the device. The single most
    /// destructive operation in the whole system: pointed at a partition
    /// instead of the device it corrupts the partition table.
    fn write_boot_code(&self, device: &Path) -> Result<(), DeployError> {
        let failed = |detail: String| DeployError::BootRecordStep {
            step: "write-boot-code",
            device: device.to_path_buf(),
            detail,
        };
        let code = fs::read(&self.blob).map_err(|err| failed(err.to_string()))?;
        let mut out = OpenOptions::new()
            .write(true)
            .open(device)
            .map_err(|err| failed(err.to_string()))?;
        out.write_all(&code).map_err(|err| failed(err.to_string()))?;
        out.flush().map_err(|err| failed(err.to_string()))
    }
}

/// Check that the device is readable and writable by the current user.
fn is_writable(device: &Path) -> bool {
    if !device.exists() {
        return false;
    }
    let Ok(path) = CString::new(device.as_os_str().as_bytes()) else {
        return false;
    };
    // Safety: access only inspects the path, no memory is shared.
    unsafe { libc::access(path.as_ptr(), libc::R_OK | libc::W_OK) == 0 }
}
