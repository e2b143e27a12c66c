//! Dry-run execution wrapper.

/// Decides whether mutating operations run for real or are only logged.
///
/// Every mutating filesystem or device operation goes through [`run`];
/// read-only discovery (file search, flavour identification) never does,
/// since it must behave identically in both modes.
///
/// [`run`]: ExecContext::run
#[derive(Debug, Clone, Copy)]
pub struct ExecContext {
    dry_run: bool,
}

impl ExecContext {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Context that executes operations for real.
    pub fn real() -> Self {
        Self::new(false)
    }

    /// Context that only logs what would be executed.
    pub fn simulated() -> Self {
        Self::new(true)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run a mutating operation, or log `label` in simulation.
    ///
    /// In simulation the operation is not invoked and `None` is returned.
    /// Callers that need the result for subsequent steps must tolerate its
    /// absence; this is an accepted limitation of simulation mode.
    pub fn run<T, E>(
        &self,
        label: &str,
        op: impl FnOnce() -> Result<T, E>,
    ) -> Result<Option<T>, E> {
        if self.dry_run {
            println!("dry-run: {label}");
            Ok(None)
        } else {
            op().map(Some)
        }
    }
}
