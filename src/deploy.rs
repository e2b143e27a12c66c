//! File deployment onto the target tree.
//!
//! Copies the fixed set of boot artifacts from the mounted source into the
//! deployment layout under the target root:
//!
//! ```text
//! live/<flavour>.squashfs        compressed root filesystem
//! live/<flavour>.module          filesystem metadata
//! boot/release/<flavour>/        kernel + initrd
//! boot/isolinux/                 splash + function-key help screens
//! boot/grub/                     splash image + stage file
//! ```
//!
//! Generated configuration files are written by the orchestrator, not
//! here.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::context::ExecContext;
use crate::error::DeployError;
use crate::flavour::Flavour;
use crate::manifest::SourceManifest;

/// Fixed mode for deployed files: group-writable so a later run as a
/// regular user can overwrite them.
const DEPLOY_MODE: u32 = 0o664;

/// Function-key help screens referenced by the syslinux menu.
const HELP_SCREENS: &[&str] = &["f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10"];

/// Copy the boot payload for `flavour` from the source onto `target`.
///
/// Artifacts are processed in a fixed order; the first one that cannot be
/// located ([`DeployError::ArtifactNotFound`]) or copied
/// ([`DeployError::Copy`]) fails the whole deployment. With
/// `Config::copy_only` the bootloader-support files are skipped entirely
/// and only the core payload lands on the target.
pub fn deploy_files(
    ctx: &ExecContext,
    flavour: &Flavour,
    manifest: &SourceManifest,
    target: &Path,
    config: &Config,
) -> Result<(), DeployError> {
    println!("Copying files. This might take a while....");

    let live = target.join("live");
    install_artifact(
        ctx,
        manifest,
        &format!("{flavour}.squashfs"),
        &live.join(format!("{flavour}.squashfs")),
    )?;
    install_artifact(
        ctx,
        manifest,
        "filesystem.module",
        &live.join(format!("{flavour}.module")),
    )?;

    let release = target.join("boot/release").join(flavour.as_str());
    install_artifact(ctx, manifest, "linux26", &release.join("linux26"))?;
    install_artifact(ctx, manifest, "initrd.gz", &release.join("initrd.gz"))?;

    if !config.copy_only {
        let isolinux = target.join("boot/isolinux");
        install_artifact(ctx, manifest, "logo.16", &isolinux.join("logo.16"))?;
        for screen in HELP_SCREENS {
            install_artifact(ctx, manifest, screen, &isolinux.join(screen))?;
        }

        let grub = target.join("boot/grub");
        install_artifact(ctx, manifest, "splash.xpm.gz", &grub.join("splash.xpm.gz"))?;
        install_artifact(ctx, manifest, "stage2_eltorito", &grub.join("stage2_eltorito"))?;
    }

    flush_target(ctx)
}

/// Locate one artifact by name and install it at `dest` with the fixed
/// deployment mode. Destination directory creation is idempotent.
fn install_artifact(
    ctx: &ExecContext,
    manifest: &SourceManifest,
    name: &str,
    dest: &Path,
) -> Result<(), DeployError> {
    let source = manifest
        .lookup(name)
        .ok_or_else(|| DeployError::ArtifactNotFound {
            name: name.to_string(),
        })?
        .to_path_buf();

    let label = format!("install --mode=664 {} {}", source.display(), dest.display());
    ctx.run(&label, || {
        copy_with_mode(&source, dest).map_err(|err| DeployError::Copy {
            name: name.to_string(),
            dest: dest.to_path_buf(),
            source: err,
        })
    })?;
    Ok(())
}

fn copy_with_mode(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    fs::set_permissions(dest, fs::Permissions::from_mode(DEPLOY_MODE))
}

/// Push written data to stable storage before returning to the caller.
/// Removable media may be unplugged right after the run finishes.
fn flush_target(ctx: &ExecContext) -> Result<(), DeployError> {
    ctx.run("sync", || {
        let status = Command::new("sync").status().map_err(DeployError::Io)?;
        if !status.success() {
            return Err(DeployError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("sync exited with {status}"),
            )));
        }
        Ok(())
    })?;
    Ok(())
}
