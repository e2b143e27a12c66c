//! Mount lifecycle management.
//!
//! Mount points are ephemeral directories created immediately before
//! mounting and destroyed immediately after unmounting. Directories
//! supplied by the caller are never deleted. [`MountGuard`] pairs a mount
//! with its mount point so that release happens exactly once on every
//! exit path, normal or failing.

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use crate::context::ExecContext;
use crate::error::DeployError;

/// Mount targets with an active mount, unwound by the termination handler.
static ACTIVE_MOUNTS: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Run the external `mount` program. Non-zero exit is an error; the call
/// is never retried.
pub fn mount(
    ctx: &ExecContext,
    source: &Path,
    target: &Path,
    options: &[&str],
) -> Result<bool, DeployError> {
    let label = format!(
        "mount {} {} {}",
        options.join(" "),
        source.display(),
        target.display()
    );
    let performed = ctx.run(&label, || {
        let status = Command::new("mount")
            .args(options)
            .arg(source)
            .arg(target)
            .status()
            .map_err(DeployError::Io)?;
        if !status.success() {
            return Err(DeployError::Mount {
                image: source.to_path_buf(),
                target: target.to_path_buf(),
                status,
            });
        }
        register_active(target);
        Ok(())
    })?;
    Ok(performed.is_some())
}

/// Run the external `umount` program. Non-zero exit is an error; the call
/// is never retried.
pub fn unmount(ctx: &ExecContext, target: &Path) -> Result<(), DeployError> {
    ctx.run(&format!("umount {}", target.display()), || {
        let status = Command::new("umount")
            .arg(target)
            .status()
            .map_err(DeployError::Io)?;
        if !status.success() {
            return Err(DeployError::Unmount {
                target: target.to_path_buf(),
                status,
            });
        }
        unregister_active(target);
        Ok(())
    })?;
    Ok(())
}

/// A directory hosting a mount.
///
/// Tracks whether this process created the directory: only directories we
/// created are removed again after unmounting.
pub struct MountPoint {
    path: PathBuf,
    owned: bool,
}

impl MountPoint {
    /// Create a fresh temporary directory to mount on.
    pub fn acquire() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("grml2usb-").tempdir()?;
        Ok(Self {
            path: dir.keep(),
            owned: true,
        })
    }

    /// Use a caller-supplied directory that already exists. It will never
    /// be deleted on release.
    pub fn existing(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            owned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }
}

/// Scoped mount with guaranteed release.
///
/// Release unmounts (if a mount was actually performed) and then removes
/// the directory (if this process created it). Dropping an unreleased
/// guard performs a best-effort release that only warns on failure; paths
/// that need to report unmount errors call [`release`] explicitly.
///
/// [`release`]: MountGuard::release
pub struct MountGuard {
    ctx: ExecContext,
    point: MountPoint,
    mounted: bool,
    released: bool,
}

impl MountGuard {
    /// Mount `source` on the given mount point.
    ///
    /// On mount failure an owned mount point directory is removed before
    /// the error is returned, so nothing leaks.
    pub fn mount_at(
        ctx: ExecContext,
        source: &Path,
        point: MountPoint,
        options: &[&str],
    ) -> Result<Self, DeployError> {
        match mount(&ctx, source, point.path(), options) {
            Ok(performed) => Ok(Self {
                ctx,
                point,
                mounted: performed,
                released: false,
            }),
            Err(err) => {
                if point.is_owned() {
                    let _ = fs::remove_dir(point.path());
                }
                Err(err)
            }
        }
    }

    /// Wrap a directory that is already a usable tree; no mount happens
    /// and release leaves it untouched.
    pub fn passthrough(ctx: ExecContext, point: MountPoint) -> Self {
        Self {
            ctx,
            point,
            mounted: false,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        self.point.path()
    }

    /// Release now, surfacing unmount and removal errors to the caller.
    pub fn release(mut self) -> Result<(), DeployError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), DeployError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        if self.mounted {
            unmount(&self.ctx, self.point.path())?;
            self.mounted = false;
        }
        if self.point.is_owned() {
            fs::remove_dir(self.point.path())?;
        }
        Ok(())
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            eprintln!(
                "Warning: failed to release mount point '{}': {err}",
                self.point.path().display()
            );
        }
    }
}

fn register_active(target: &Path) {
    if let Ok(mut active) = ACTIVE_MOUNTS.lock() {
        active.push(target.to_path_buf());
    }
}

fn unregister_active(target: &Path) {
    if let Ok(mut active) = ACTIVE_MOUNTS.lock() {
        active.retain(|path| path != target);
    }
}

/// Unmount everything still registered, directly via the `umount(2)`
/// syscall. Best effort: skipped entirely if the registry lock is held at
/// the time of the signal.
fn emergency_release_all() {
    if let Ok(mut active) = ACTIVE_MOUNTS.try_lock() {
        for path in active.drain(..) {
            if let Ok(target) = CString::new(path.as_os_str().as_bytes()) {
                unsafe {
                    libc::umount(target.as_ptr());
                }
            }
        }
    }
}

extern "C" fn handle_termination(_signal: libc::c_int) {
    emergency_release_all();
    unsafe { libc::_exit(1) }
}

/// Install a best-effort cleanup handler that releases active mounts when
/// the process is interrupted mid-run.
pub fn install_cleanup_handler() {
    let handler = handle_termination as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}
