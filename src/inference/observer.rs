//! Per-iteration trace hooks for the fixed-point solver.

use tracing::debug;

use super::fpi::SolveReport;

/// Snapshot of the solver after one full forward/backward sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationRecord {
    /// Zero-based sweep index
    pub iteration: usize,
    /// Free energy after the sweep
    pub free_energy: f64,
    /// Absolute change from the previous free energy
    pub delta: f64,
    /// Whether `delta` fell below the tolerance
    pub converged: bool,
}

/// Receives solver progress. Implement this to collect diagnostics.
pub trait FpiObserver {
    /// Called once per completed sweep.
    fn on_iteration(&mut self, record: &IterationRecord);

    /// Called once when the solver returns.
    fn on_finish(&mut self, _report: &SolveReport) {}
}

/// Emits `tracing` debug events. Silent unless the caller installs a subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl FpiObserver for TracingObserver {
    fn on_iteration(&mut self, record: &IterationRecord) {
        debug!(
            iteration = record.iteration,
            free_energy = record.free_energy,
            delta = record.delta,
            converged = record.converged,
            "fixed-point sweep"
        );
    }

    fn on_finish(&mut self, report: &SolveReport) {
        if report.converged {
            debug!(iterations = report.iterations, free_energy = report.free_energy, "posterior converged");
        } else {
            debug!(
                iterations = report.iterations,
                free_energy = report.free_energy,
                "iteration cap reached before convergence"
            );
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl FpiObserver for NoopObserver {
    fn on_iteration(&mut self, _record: &IterationRecord) {}
}

impl FpiObserver for Vec<IterationRecord> {
    fn on_iteration(&mut self, record: &IterationRecord) {
        self.push(*record);
    }
}
