//! Up-front host checks.
//!
//! Validates that required external tools exist before any deployment work
//! begins. This prevents a run from failing halfway through with files
//! already copied onto the target.

use crate::config::Config;
use crate::error::DeployError;

/// Check if a command exists on the host system via a PATH lookup.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Verify the tools a run will need, per the given configuration.
///
/// The syslinux installer is a precondition for the whole run unless GRUB
/// mode was explicitly requested; the GRUB installer's absence surfaces as
/// a [`DeployError::BootloaderInstall`] at install time instead.
pub fn check_deploy_tools(config: &Config) -> Result<(), DeployError> {
    if !config.use_grub && !command_exists("syslinux") {
        return Err(DeployError::ToolNotFound {
            tool: "syslinux".into(),
            hint: "install syslinux or use the --grub option".into(),
        });
    }
    Ok(())
}

/// Whether the current process runs with root privileges.
///
/// Mounting and raw device writes need uid 0; dry-run mode does not.
pub fn running_as_root() -> bool {
    // Safety: geteuid has no failure mode and touches no memory.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        assert!(command_exists("ls"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_grub_mode_does_not_require_syslinux() {
        let config = Config {
            use_grub: true,
            ..Config::default()
        };
        assert!(check_deploy_tools(&config).is_ok());
    }

    #[test]
    fn test_missing_syslinux_is_reported() {
        // Only meaningful on hosts without syslinux; on hosts that have it
        // the check passes, which is equally correct.
        let config = Config::default();
        match check_deploy_tools(&config) {
            Ok(()) => assert!(command_exists("syslinux")),
            Err(DeployError::ToolNotFound { tool, .. }) => assert_eq!(tool, "syslinux"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
