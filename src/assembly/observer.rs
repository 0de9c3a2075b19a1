use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::AssemblyError;

use super::AssemblyParams;

/// Stage of an assembly run reported to an [`AssemblyObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Assembling,
    BorderCompletion,
    Done,
}

/// Snapshot of a running assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Stitching passes completed so far in this run.
    pub passes: usize,
    /// Fragments still open.
    pub remaining: usize,
}

/// Receives progress notifications. Every method defaults to a no-op.
pub trait AssemblyObserver {
    fn on_phase(&self, _phase: Phase) {}

    fn on_pass(&self, _pass: usize) {}

    /// Fraction of the current merge phase completed, in `[0, 1]`.
    fn on_progress(&self, _fraction: f64) {}

    fn on_status(&self, _progress: Progress) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AssemblyObserver for NoopObserver {}

/// Cooperative cancellation flag shared between a caller and a running
/// assembly. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything one run needs besides the fragments themselves.
pub(crate) struct RunContext<'a> {
    pub(crate) params: &'a AssemblyParams,
    pub(crate) observer: &'a dyn AssemblyObserver,
    pub(crate) cancellation: Option<&'a CancellationToken>,
    pub(crate) passes: usize,
}

impl RunContext<'_> {
    pub(crate) fn check_cancelled(&self) -> Result<(), AssemblyError> {
        if self.cancellation.is_some_and(CancellationToken::is_cancelled) {
            Err(AssemblyError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn phase(&self, phase: Phase) {
        tracing::debug!(?phase, "assembly phase");
        self.observer.on_phase(phase);
    }
}
