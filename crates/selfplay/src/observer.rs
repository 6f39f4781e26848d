//! Progress reporting hooks for the training loop.

use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use uzero_core::TrainStats;

/// Snapshot emitted after every completed iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationReport {
    /// 0-based index of the iteration that just finished.
    pub iteration: usize,

    /// Successful games across all iterations so far.
    pub games_played: usize,

    /// Games of this iteration that were dropped after an error.
    pub failed_games: usize,

    /// Examples appended during this iteration.
    pub examples_added: usize,

    pub buffer_size: usize,

    /// Time since the loop started.
    pub elapsed: Duration,

    /// Mean losses over this iteration's steps, `None` when training was skipped.
    pub train_stats: Option<TrainStats>,

    pub checkpoint: Option<PathBuf>,
}

/// Receives an [`IterationReport`] after each iteration.
///
/// Any `FnMut(&IterationReport) + Send` closure is an observer.
pub trait ProgressObserver: Send {
    fn on_iteration(&mut self, report: &IterationReport);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&IterationReport) + Send,
{
    fn on_iteration(&mut self, report: &IterationReport) {
        self(report)
    }
}

/// Writes one `info` line per iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn on_iteration(&mut self, report: &IterationReport) {
        let (policy_loss, value_loss) = report
            .train_stats
            .map(|s| (s.policy_loss, s.value_loss))
            .unwrap_or((f32::NAN, f32::NAN));
        info!(
            iteration = report.iteration,
            games = report.games_played,
            failed = report.failed_games,
            added = report.examples_added,
            buffer = report.buffer_size,
            policy_loss,
            value_loss,
            elapsed_s = report.elapsed.as_secs_f64(),
            "iteration complete"
        );
    }
}
