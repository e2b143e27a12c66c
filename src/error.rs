//! Error taxonomy for the deployment pipeline.
//!
//! Precondition failures (missing tools, unwritable devices) are raised
//! before any destructive action. Per-source failures abort that source's
//! deployment; mount cleanup still runs for it. MBR sequence failures are
//! never rolled back automatically, the device is left in whatever state
//! the failed step produced and the operator recovers manually.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    /// A required external program is missing from the search path.
    #[error("required tool '{tool}' not found ({hint})")]
    ToolNotFound { tool: String, hint: String },

    #[error("mounting '{image}' on '{target}' failed with {status}")]
    Mount {
        image: PathBuf,
        target: PathBuf,
        status: ExitStatus,
    },

    #[error("unmounting '{target}' failed with {status}")]
    Unmount { target: PathBuf, status: ExitStatus },

    /// No version marker file anywhere under the source tree.
    #[error("could not find a '{marker}' file under '{root}'")]
    FlavourNotFound { marker: &'static str, root: PathBuf },

    /// The marker exists but its first line yields no flavour name.
    #[error("version marker '{path}' is unusable: {reason}")]
    FlavourUnreadable { path: PathBuf, reason: String },

    #[error("artifact '{name}' not found in source tree")]
    ArtifactNotFound { name: String },

    #[error("copying artifact '{name}' to '{dest}' failed: {source}")]
    Copy {
        name: String,
        dest: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("device '{device}' is not readable and writable by the current user")]
    DeviceNotWritable { device: PathBuf },

    /// One step of the ordered MBR sequence failed; earlier steps are not
    /// undone.
    #[error("boot record step '{step}' failed on '{device}': {detail}")]
    BootRecordStep {
        step: &'static str,
        device: PathBuf,
        detail: String,
    },

    #[error("bootloader installation on '{device}' failed: {detail}")]
    BootloaderInstall { device: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}
