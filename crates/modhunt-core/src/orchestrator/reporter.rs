//! Progress reporting for hunt lifecycle events.

use tracing::{info, warn};

use super::{HuntReport, TestOutcome};
use crate::archive::Archive;
use crate::error::HuntError;

/// Tracing target for hunt progress.
const HUNT_TARGET: &str = "modhunt::orchestrator";

/// Observer receiving hunt lifecycle events.
///
/// Events arrive in run order from a single thread. Implementations must not
/// block for long: the host is idle between events but a run's wall-clock
/// budget starts as soon as the next candidate is launched.
pub trait HuntReporter {
    /// Invoked once every archive has been reset to disabled.
    fn normalised(&mut self, total: usize);

    /// Invoked before a candidate is enabled. `position` is one-based.
    fn candidate_started(&mut self, position: usize, total: usize, archive: &Archive);

    /// Invoked when a candidate cannot be enabled and is skipped.
    fn candidate_skipped(&mut self, archive: &Archive, error: &HuntError);

    /// Invoked when the first run names missing dependencies.
    fn missing_dependencies(&mut self, archive: &Archive, plugin_ids: &[String]);

    /// Invoked for each dependency archive enabled for the re-run.
    fn dependency_enabled(&mut self, candidate: &Archive, dependency: &Archive);

    /// Invoked with the identifiers no archive provides.
    fn dependency_unresolved(&mut self, archive: &Archive, plugin_ids: &[String]);

    /// Invoked once a candidate's test cycle has ended.
    fn candidate_finished(&mut self, archive: &Archive, outcome: &TestOutcome);

    /// Invoked with the final report.
    fn hunt_finished(&mut self, report: &HuntReport);
}

impl<T> HuntReporter for &mut T
where
    T: HuntReporter + ?Sized,
{
    fn normalised(&mut self, total: usize) {
        (**self).normalised(total);
    }

    fn candidate_started(&mut self, position: usize, total: usize, archive: &Archive) {
        (**self).candidate_started(position, total, archive);
    }

    fn candidate_skipped(&mut self, archive: &Archive, error: &HuntError) {
        (**self).candidate_skipped(archive, error);
    }

    fn missing_dependencies(&mut self, archive: &Archive, plugin_ids: &[String]) {
        (**self).missing_dependencies(archive, plugin_ids);
    }

    fn dependency_enabled(&mut self, candidate: &Archive, dependency: &Archive) {
        (**self).dependency_enabled(candidate, dependency);
    }

    fn dependency_unresolved(&mut self, archive: &Archive, plugin_ids: &[String]) {
        (**self).dependency_unresolved(archive, plugin_ids);
    }

    fn candidate_finished(&mut self, archive: &Archive, outcome: &TestOutcome) {
        (**self).candidate_finished(archive, outcome);
    }

    fn hunt_finished(&mut self, report: &HuntReport) {
        (**self).hunt_finished(report);
    }
}

/// Default reporter that records hunt events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHuntReporter;

impl StructuredHuntReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HuntReporter for StructuredHuntReporter {
    fn normalised(&mut self, total: usize) {
        info!(
            target: HUNT_TARGET,
            event = "normalised",
            total,
            "all archives disabled"
        );
    }

    fn candidate_started(&mut self, position: usize, total: usize, archive: &Archive) {
        info!(
            target: HUNT_TARGET,
            event = "candidate_started",
            position,
            total,
            archive = %archive.file_name(),
            "testing candidate"
        );
    }

    fn candidate_skipped(&mut self, archive: &Archive, error: &HuntError) {
        warn!(
            target: HUNT_TARGET,
            event = "candidate_skipped",
            archive = %archive.file_name(),
            %error,
            "cannot enable candidate; skipping"
        );
    }

    fn missing_dependencies(&mut self, archive: &Archive, plugin_ids: &[String]) {
        info!(
            target: HUNT_TARGET,
            event = "missing_dependencies",
            archive = %archive.file_name(),
            plugin_ids = ?plugin_ids,
            "candidate is missing dependencies"
        );
    }

    fn dependency_enabled(&mut self, candidate: &Archive, dependency: &Archive) {
        info!(
            target: HUNT_TARGET,
            event = "dependency_enabled",
            archive = %candidate.file_name(),
            dependency = %dependency.file_name(),
            "enabled dependency for re-run"
        );
    }

    fn dependency_unresolved(&mut self, archive: &Archive, plugin_ids: &[String]) {
        warn!(
            target: HUNT_TARGET,
            event = "dependency_unresolved",
            archive = %archive.file_name(),
            plugin_ids = ?plugin_ids,
            "no archive provides these dependencies"
        );
    }

    fn candidate_finished(&mut self, archive: &Archive, outcome: &TestOutcome) {
        match outcome {
            TestOutcome::Timeout => warn!(
                target: HUNT_TARGET,
                event = "candidate_timed_out",
                archive = %archive.file_name(),
                "host timed out; candidate skipped"
            ),
            TestOutcome::CrashConfirmed(_) => warn!(
                target: HUNT_TARGET,
                event = "crash_found",
                archive = %archive.file_name(),
                "crash signature found"
            ),
            _ => info!(
                target: HUNT_TARGET,
                event = "candidate_finished",
                archive = %archive.file_name(),
                outcome = outcome.as_str(),
                "candidate tested"
            ),
        }
    }

    fn hunt_finished(&mut self, report: &HuntReport) {
        info!(
            target: HUNT_TARGET,
            event = "hunt_finished",
            result = report.as_str(),
            tested = report.tested(),
            total = report.total(),
            "hunt finished"
        );
    }
}
