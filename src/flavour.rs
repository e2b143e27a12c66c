//! Flavour identification.
//!
//! The flavour is the named variant of the deployed live image (for
//! example `grml-small`). It is derived once per source from the first
//! line of the version marker file and drives artifact naming as well as
//! the generated bootloader configuration.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::error::DeployError;
use crate::manifest::SourceManifest;

/// File name of the version marker searched for under the source tree.
pub const VERSION_MARKER: &str = "grml-version";

/// Image variant name: letters, digits, hyphens and underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flavour(String);

impl Flavour {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Flavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the flavour from the source's version marker.
///
/// Reads only the first line of the marker and takes the longest leading
/// run of word characters and hyphens as the flavour name. A missing
/// marker is [`DeployError::FlavourNotFound`]; a marker that cannot be
/// opened or whose first line yields no name is
/// [`DeployError::FlavourUnreadable`].
pub fn identify(manifest: &SourceManifest) -> Result<Flavour, DeployError> {
    let marker = manifest
        .lookup(VERSION_MARKER)
        .ok_or_else(|| DeployError::FlavourNotFound {
            marker: VERSION_MARKER,
            root: manifest.root().to_path_buf(),
        })?;

    let unreadable = |reason: String| DeployError::FlavourUnreadable {
        path: marker.to_path_buf(),
        reason,
    };

    let file = File::open(marker).map_err(|err| unreadable(err.to_string()))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|err| unreadable(err.to_string()))?;

    let name: String = first_line
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if name.is_empty() {
        return Err(unreadable("first line does not start with a flavour name".into()));
    }
    Ok(Flavour(name))
}
