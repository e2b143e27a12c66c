use std::path::PathBuf;

use anyhow::{bail, Result};

use grml2usb::config::Config;
use grml2usb::context::ExecContext;
use grml2usb::mbr::MbrInstaller;
use grml2usb::orchestrator::run_deployment;
use grml2usb::{mount, preflight};

const PROG_VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage() -> &'static str {
    "Usage: grml2usb [options] <ISO[s] | /live/image> <target>\n\
     \n\
     Installs a grml ISO onto a USB device to be able to boot from it.\n\
     Needs at least a grml ISO or a running grml system (/live/image),\n\
     syslinux and root permissions.\n\
     \n\
     options:\n\
     \x20 --bootoptions <opts>  use specified bootoptions as default\n\
     \x20 --bootloader-only     do not copy files, just install a bootloader\n\
     \x20 --copy-only           copy files only, do not install a bootloader\n\
     \x20 --dry-run             do not actually execute any commands\n\
     \x20 --force               force any actions requiring manual interaction\n\
     \x20 --grub                install grub instead of syslinux\n\
     \x20 --mbr                 install a master boot record on the device\n\
     \x20 -v, --version         display version and exit"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config, sources, target) = parse_args(&args)?;

    let ctx = ExecContext::new(config.dry_run);
    if ctx.is_dry_run() {
        println!("Running in simulate mode as requested via option dry-run.");
    } else if !preflight::running_as_root() {
        bail!("please run with root permissions (uid 0), or use --dry-run");
    }
    preflight::check_deploy_tools(&config)?;
    mount::install_cleanup_handler();

    run_deployment(ctx, &config, &sources, &target, &MbrInstaller::default())
}

fn parse_args(args: &[String]) -> Result<(Config, Vec<PathBuf>, PathBuf)> {
    let mut config = Config::default();
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--bootloader-only" => config.bootloader_only = true,
            "--copy-only" => config.copy_only = true,
            "--dry-run" => config.dry_run = true,
            "--force" => config.force = true,
            "--grub" => config.use_grub = true,
            "--mbr" => config.install_mbr = true,
            "--bootoptions" => {
                let Some(value) = iter.next() else {
                    bail!("--bootoptions requires a value\n\n{}", usage());
                };
                config.boot_options = Some(value.clone());
            }
            "-v" | "--version" => {
                println!("grml2usb {PROG_VERSION}");
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                bail!("unknown option '{other}'\n\n{}", usage());
            }
            path => positional.push(PathBuf::from(path)),
        }
    }

    if positional.len() < 2 {
        bail!(usage());
    }
    let target = positional.pop().expect("length checked above");
    Ok((config, positional, target))
}
