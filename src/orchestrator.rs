//! Deployment orchestration.
//!
//! Drives the per-source pipeline (mount source → identify flavour →
//! deploy files → write generated configuration → release mounts) and the
//! per-run tail (MBR installation, bootloader installation). Mount points
//! are scoped: release runs on every exit path, including identification
//! and copy failures.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::bootconfig;
use crate::bootloader;
use crate::config::Config;
use crate::context::ExecContext;
use crate::deploy;
use crate::error::DeployError;
use crate::flavour::{self, Flavour};
use crate::manifest::SourceManifest;
use crate::mbr::MbrInstaller;
use crate::mount::{MountGuard, MountPoint};
use crate::probe;

/// Run a full deployment of `sources` onto `target`.
///
/// Sources are processed strictly one after another; the first source that
/// fails aborts the run. A target that is a directory disables MBR and
/// bootloader installation for the whole run (a directory has no boot
/// record), decided here from the resolved target kind rather than from
/// shared state.
pub fn run_deployment(
    ctx: ExecContext,
    config: &Config,
    sources: &[PathBuf],
    target: &Path,
    mbr: &MbrInstaller,
) -> Result<()> {
    let target_is_device = !target.is_dir();

    if target_is_device && !config.force && !probe::is_fat_partition(target) {
        println!(
            "Warning: target '{}' does not probe as a FAT filesystem; \
             syslinux needs one (use --force to silence this check).",
            target.display()
        );
    }

    for source in sources {
        handle_source(ctx, config, source, target, target_is_device)
            .with_context(|| format!("deploying source '{}'", source.display()))?;
    }

    if config.install_mbr {
        if target_is_device {
            let device = bootloader::whole_device(target);
            println!("Installing MBR on device {}", device.display());
            mbr.install(&ctx, &device)
                .with_context(|| format!("installing MBR on '{}'", device.display()))?;
        } else {
            println!("Warning: target is a directory, skipping MBR installation.");
        }
    }

    if config.copy_only {
        println!("Not installing bootloader and its files as requested via option copy-only.");
    } else if target_is_device {
        bootloader::install_bootloader(&ctx, target, config.use_grub)
            .with_context(|| format!("installing bootloader for '{}'", target.display()))?;
    } else {
        println!("Warning: target is a directory, skipping bootloader installation.");
    }

    println!("Finished deployment. Have fun with your live system.");
    Ok(())
}

/// Process one source image against the target, with both mounts scoped to
/// this call.
fn handle_source(
    ctx: ExecContext,
    config: &Config,
    source: &Path,
    target: &Path,
    target_is_device: bool,
) -> Result<(), DeployError> {
    println!("Handling source '{}'", source.display());

    let source_guard = if source.is_dir() {
        MountGuard::passthrough(ctx, MountPoint::existing(source))
    } else {
        // Loop-mount the ISO read-only. In simulation no mount happens, so
        // an ISO source cannot be inspected; directory sources are
        // unaffected.
        MountGuard::mount_at(
            ctx,
            source,
            MountPoint::acquire()?,
            &["-o", "loop,ro", "-t", "iso9660"],
        )?
    };

    let target_guard = if target_is_device {
        MountGuard::mount_at(ctx, target, MountPoint::acquire()?, &[])?
    } else {
        MountGuard::passthrough(ctx, MountPoint::existing(target))
    };

    let deployed = deploy_source(ctx, config, source_guard.path(), target_guard.path());

    // Release explicitly so unmount failures surface as errors; a failed
    // deployment still releases both guards before returning.
    let source_released = source_guard.release();
    let target_released = target_guard.release();
    deployed?;
    source_released?;
    target_released
}

fn deploy_source(
    ctx: ExecContext,
    config: &Config,
    source_root: &Path,
    target_root: &Path,
) -> Result<(), DeployError> {
    let manifest = SourceManifest::index(source_root)?;
    let flavour = flavour::identify(&manifest)?;
    println!("Identified flavour \"{flavour}\".");

    if config.bootloader_only {
        println!("Skipping file deployment as requested via option bootloader-only.");
        return Ok(());
    }

    deploy::deploy_files(&ctx, &flavour, &manifest, target_root, config)?;

    if !config.copy_only {
        write_boot_config(&ctx, &flavour, target_root, config)?;
    }
    Ok(())
}

/// Render and write the generated configuration files into the deployment
/// layout.
fn write_boot_config(
    ctx: &ExecContext,
    flavour: &Flavour,
    target_root: &Path,
    config: &Config,
) -> Result<(), DeployError> {
    let boot_options = config.boot_options.as_deref();
    write_generated(
        ctx,
        &target_root.join("boot/grub/menu.lst"),
        &bootconfig::grub_menu(flavour, boot_options),
    )?;
    write_generated(
        ctx,
        &target_root.join("boot/isolinux/syslinux.cfg"),
        &bootconfig::syslinux_menu(flavour, boot_options),
    )?;
    write_generated(
        ctx,
        &target_root.join("boot/isolinux/boot.msg"),
        &bootconfig::splash_message(flavour),
    )
}

fn write_generated(ctx: &ExecContext, path: &Path, content: &str) -> Result<(), DeployError> {
    ctx.run(&format!("write {}", path.display()), || {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok::<(), DeployError>(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavour::VERSION_MARKER;
    use tempfile::TempDir;

    /// Source tree with every artifact a full deployment needs, scattered
    /// across subdirectories to exercise the recursive lookup.
    fn fixture_source(root: &Path, flavour: &str) {
        fs::create_dir_all(root.join("live")).unwrap();
        fs::create_dir_all(root.join("boot/isolinux")).unwrap();
        fs::create_dir_all(root.join("boot/grub")).unwrap();

        fs::write(root.join(VERSION_MARKER), format!("{flavour} 2021.01\n")).unwrap();
        fs::write(root.join("live").join(format!("{flavour}.squashfs")), "squashfs").unwrap();
        fs::write(root.join("live/filesystem.module"), "module").unwrap();
        fs::write(root.join("boot/linux26"), "kernel").unwrap();
        fs::write(root.join("boot/initrd.gz"), "initrd").unwrap();
        fs::write(root.join("boot/isolinux/logo.16"), "logo").unwrap();
        for screen in ["f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10"] {
            fs::write(root.join("boot/isolinux").join(screen), "help").unwrap();
        }
        fs::write(root.join("boot/grub/splash.xpm.gz"), "splash").unwrap();
        fs::write(root.join("boot/grub/stage2_eltorito"), "stage2").unwrap();
    }

    fn run_with(config: &Config, flavour: &str) -> (TempDir, PathBuf, Result<()>) {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        fixture_source(&source, flavour);

        let ctx = ExecContext::new(config.dry_run);
        let result = run_deployment(
            ctx,
            config,
            &[source.clone()],
            &target,
            &MbrInstaller::default(),
        );
        (temp, target, result)
    }

    #[test]
    fn test_full_deployment_to_directory_target() {
        let (_temp, target, result) = run_with(&Config::default(), "grml-testflavour");
        result.unwrap();

        assert!(target.join("live/grml-testflavour.squashfs").is_file());
        assert!(target.join("live/grml-testflavour.module").is_file());
        assert!(target.join("boot/release/grml-testflavour/linux26").is_file());
        assert!(target.join("boot/release/grml-testflavour/initrd.gz").is_file());

        let menu = fs::read_to_string(target.join("boot/grub/menu.lst")).unwrap();
        assert!(menu.contains("grml-testflavour"));
        let syslinux = fs::read_to_string(target.join("boot/isolinux/syslinux.cfg")).unwrap();
        assert!(syslinux.contains("grml-testflavour"));
        assert!(target.join("boot/isolinux/boot.msg").is_file());
        assert!(target.join("boot/grub/splash.xpm.gz").is_file());
    }

    #[test]
    fn test_copy_only_leaves_bootloader_directories_absent() {
        let config = Config {
            copy_only: true,
            ..Config::default()
        };
        let (_temp, target, result) = run_with(&config, "grml-testflavour");
        result.unwrap();

        assert!(target.join("live/grml-testflavour.squashfs").is_file());
        assert!(target.join("boot/release/grml-testflavour/initrd.gz").is_file());
        assert!(!target.join("boot/isolinux").exists());
        assert!(!target.join("boot/grub").exists());
    }

    #[test]
    fn test_unidentifiable_source_copies_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        fixture_source(&source, "grml-testflavour");
        // First marker line empty: no flavour can be extracted.
        fs::write(source.join(VERSION_MARKER), "\n").unwrap();

        let err = run_deployment(
            ExecContext::real(),
            &Config::default(),
            &[source],
            &target,
            &MbrInstaller::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::FlavourUnreadable { .. })
        ));
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_directory_target_skips_mbr_and_bootloader() {
        // With a block device this would invoke lilo and syslinux; for a
        // directory target both are skipped and the run succeeds.
        let config = Config {
            install_mbr: true,
            ..Config::default()
        };
        let (_temp, target, result) = run_with(&config, "grml-testflavour");
        result.unwrap();
        assert!(target.join("live/grml-testflavour.squashfs").is_file());
    }

    #[test]
    fn test_dry_run_mutates_nothing_but_identifies_flavour() {
        let config = Config {
            dry_run: true,
            ..Config::default()
        };
        let (_temp, target, result) = run_with(&config, "grml-testflavour");
        result.unwrap();
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_bootloader_only_skips_file_deployment() {
        let config = Config {
            bootloader_only: true,
            ..Config::default()
        };
        let (_temp, target, result) = run_with(&config, "grml-testflavour");
        result.unwrap();
        assert!(!target.join("live").exists());
    }

    #[test]
    fn test_missing_artifact_aborts_after_cleanup() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        fixture_source(&source, "grml-testflavour");
        fs::remove_file(source.join("live/grml-testflavour.squashfs")).unwrap();

        let err = run_deployment(
            ExecContext::real(),
            &Config::default(),
            &[source],
            &target,
            &MbrInstaller::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::ArtifactNotFound { .. })
        ));
        // Caller-supplied source and target directories survive cleanup.
        assert!(target.is_dir());
    }

    #[test]
    fn test_mbr_installation_targets_the_whole_device() {
        let temp = TempDir::new().unwrap();
        // A partition path ending in a digit, next to the owning device.
        let partition = temp.path().join("device1");
        let device = temp.path().join("device");
        fs::write(&partition, vec![0u8; 512]).unwrap();
        fs::write(&device, vec![0u8; 512]).unwrap();
        let blob = temp.path().join("mbr.bin");
        fs::write(&blob, b"BOOTCODE").unwrap();

        // copy-only keeps the bootloader installer out of the run; force
        // silences the FAT probe on the fake device.
        let config = Config {
            install_mbr: true,
            copy_only: true,
            force: true,
            ..Config::default()
        };
        let installer = MbrInstaller::new("true", &blob);
        run_deployment(ExecContext::real(), &config, &[], &partition, &installer).unwrap();

        assert_eq!(&fs::read(&device).unwrap()[..8], b"BOOTCODE");
        assert_eq!(
            fs::read(&partition).unwrap(),
            vec![0u8; 512],
            "the partition path must never be written"
        );
    }

    #[test]
    fn test_multiple_sources_deploy_sequentially() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        let target = temp.path().join("target");
        fs::create_dir_all(&target).unwrap();
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fixture_source(&first, "grml-small");
        fixture_source(&second, "grml-full");

        run_deployment(
            ExecContext::real(),
            &Config::default(),
            &[first, second],
            &target,
            &MbrInstaller::default(),
        )
        .unwrap();

        assert!(target.join("live/grml-small.squashfs").is_file());
        assert!(target.join("live/grml-full.squashfs").is_file());
        assert!(target.join("boot/release/grml-small/linux26").is_file());
        assert!(target.join("boot/release/grml-full/linux26").is_file());
    }
}
