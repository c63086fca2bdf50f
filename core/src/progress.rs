//! Coarse-grained run progress, emitted to an observing channel.
//!
//! Side-channel only: delivery is at-least-once, nothing acknowledges,
//! and a vanished observer never fails the run.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Emitted after every aggregate and every royalty record.
    Processing { current: usize, total: usize },
    /// Emitted once, when the run completes.
    Processed,
}

pub trait ProgressSink {
    fn processing(&mut self, current: usize, total: usize);
    fn processed(&mut self);
}

/// Any mpsc sender of progress events is a sink. Send errors are
/// swallowed: the observer hanging up must not abort payouts.
impl ProgressSink for std::sync::mpsc::Sender<ProgressEvent> {
    fn processing(&mut self, current: usize, total: usize) {
        let _ = self.send(ProgressEvent::Processing { current, total });
    }

    fn processed(&mut self) {
        let _ = self.send(ProgressEvent::Processed);
    }
}

/// Sink that drops everything. Used when nobody is watching.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn processing(&mut self, _current: usize, _total: usize) {}
    fn processed(&mut self) {}
}

/// End-of-run totals returned by the engine, by record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub failed: usize,
    /// Records left Pending because their treasury had already failed.
    pub skipped: usize,
    pub royalties_submitted: usize,
    pub royalties_failed: usize,
    pub royalties_skipped: usize,
}
