//! Linear crash hunt over the archive set.
//!
//! The [`Orchestrator`] owns the hunt state machine. For each candidate in
//! discovery order it enables that archive alone, runs the host, and
//! classifies the log. A crash ends the hunt with the candidate left enabled.
//! A run that names missing dependencies gets one re-run with the providing
//! archives enabled alongside the candidate; those archives are disabled
//! again afterwards whatever the outcome. Apart from a confirmed culprit,
//! every archive is disabled between candidates.

mod reporter;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

pub use self::reporter::{HuntReporter, StructuredHuntReporter};
use crate::analysis::{LogAnalyzer, Verdict};
use crate::archive::{Archive, ArchiveId, ArchiveStore};
use crate::error::HuntError;
use crate::metadata::PluginIdSource;
use crate::process::{CancellationToken, ExitKind, HostExecutor, RunRequest};
use crate::resolver::DependencyResolver;

/// Tracing target for orchestration.
const ORCHESTRATOR_TARGET: &str = "modhunt::orchestrator";

/// Run parameters shared by every host launch in a hunt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuntSettings {
    /// Log file the host writes to; truncated before every run.
    pub log_path: PathBuf,
    /// Wall-clock budget of a single host run.
    pub timeout: Duration,
    /// Log substring identifying the crash being hunted.
    pub crash_signature: String,
}

/// Result of testing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The crash signature appeared while this archive was enabled.
    CrashConfirmed(ArchiveId),
    /// The host exceeded its budget; inconclusive.
    Timeout,
    /// The host started without the crash signature.
    Clean,
    /// The candidate needs plugins no archive provides; it was tested
    /// without them.
    DependencyUnresolved(Vec<String>),
    /// The candidate could not be enabled and was not tested.
    Skipped,
    /// Cancellation stopped the test.
    Interrupted,
}

impl TestOutcome {
    /// Short machine-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CrashConfirmed(_) => "crash_confirmed",
            Self::Timeout => "timeout",
            Self::Clean => "clean",
            Self::DependencyUnresolved(_) => "dependency_unresolved",
            Self::Skipped => "skipped",
            Self::Interrupted => "interrupted",
        }
    }

    /// Returns `true` when the host ran to a conclusion for this candidate.
    #[must_use]
    pub const fn was_tested(&self) -> bool {
        !matches!(self, Self::Skipped | Self::Interrupted)
    }
}

/// A candidate whose missing dependencies could not all be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedCandidate {
    /// Candidate archive path.
    pub archive: PathBuf,
    /// Plugin identifiers no archive provides.
    pub plugin_ids: Vec<String>,
}

/// Final result of a hunt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HuntReport {
    /// A culprit was identified and left enabled.
    CrashFound {
        /// Culprit archive path.
        archive: PathBuf,
        /// Culprit plugin identifier, when readable.
        plugin_id: Option<String>,
        /// Candidates tested, the culprit included.
        tested: usize,
        /// Archives discovered.
        total: usize,
    },
    /// Every candidate was tested without reproducing the crash.
    NoCrashFound {
        /// Candidates tested.
        tested: usize,
        /// Archives discovered.
        total: usize,
        /// Candidates whose run timed out.
        timed_out: Vec<PathBuf>,
        /// Candidates tested without some of their dependencies.
        unresolved: Vec<UnresolvedCandidate>,
    },
    /// The hunt was cancelled before it could finish.
    Interrupted {
        /// Candidates tested before cancellation.
        tested: usize,
        /// Archives discovered.
        total: usize,
    },
}

impl HuntReport {
    /// Short machine-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CrashFound { .. } => "crash_found",
            Self::NoCrashFound { .. } => "no_crash_found",
            Self::Interrupted { .. } => "interrupted",
        }
    }

    /// Candidates tested.
    #[must_use]
    pub const fn tested(&self) -> usize {
        match self {
            Self::CrashFound { tested, .. }
            | Self::NoCrashFound { tested, .. }
            | Self::Interrupted { tested, .. } => *tested,
        }
    }

    /// Archives discovered.
    #[must_use]
    pub const fn total(&self) -> usize {
        match self {
            Self::CrashFound { total, .. }
            | Self::NoCrashFound { total, .. }
            | Self::Interrupted { total, .. } => *total,
        }
    }
}

/// Running totals across candidates.
#[derive(Debug, Default)]
struct Tally {
    tested: usize,
    timed_out: Vec<PathBuf>,
    unresolved: Vec<UnresolvedCandidate>,
}

/// Drives the hunt over an [`ArchiveStore`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use modhunt_core::{
///     ArchiveStore, HostProcess, HuntSettings, JarManifestReader, Orchestrator,
///     StructuredHuntReporter,
/// };
///
/// let store = ArchiveStore::open("/srv/forge/mods", "jar")?;
/// let settings = HuntSettings {
///     log_path: "/srv/forge/server_log.txt".into(),
///     timeout: Duration::from_secs(20),
///     crash_signature: String::from("invalid dist DEDICATED_SERVER"),
/// };
/// let mut orchestrator = Orchestrator::new(
///     store,
///     HostProcess::new("/srv/forge", "start.sh"),
///     JarManifestReader::new(),
///     StructuredHuntReporter::new(),
///     settings,
/// );
/// let report = orchestrator.run()?;
/// println!("{}", report.as_str());
/// # Ok::<(), modhunt_core::HuntError>(())
/// ```
#[derive(Debug)]
pub struct Orchestrator<E, S, R> {
    store: ArchiveStore,
    executor: E,
    source: S,
    reporter: R,
    analyzer: LogAnalyzer,
    settings: HuntSettings,
    cancel: CancellationToken,
}

impl<E, S, R> Orchestrator<E, S, R>
where
    E: HostExecutor,
    S: PluginIdSource,
    R: HuntReporter,
{
    /// Creates an orchestrator over `store`.
    #[must_use]
    pub fn new(
        store: ArchiveStore,
        executor: E,
        source: S,
        reporter: R,
        settings: HuntSettings,
    ) -> Self {
        let analyzer = LogAnalyzer::new(settings.crash_signature.clone());
        Self {
            store,
            executor,
            source,
            reporter,
            analyzer,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Observes `cancel` between candidates and during host runs.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Archive store in its current state.
    #[must_use]
    pub const fn store(&self) -> &ArchiveStore {
        &self.store
    }

    /// Consumes the orchestrator, returning the archive store.
    #[must_use]
    pub fn into_store(self) -> ArchiveStore {
        self.store
    }

    /// Tests every archive in turn until one reproduces the crash.
    ///
    /// Archives are first normalised to disabled. On return every archive is
    /// disabled, except a confirmed culprit which is left enabled.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::Normalise`] when an archive is still enabled after
    /// normalisation.
    /// Returns [`HuntError::Launch`] or [`HuntError::Supervise`] when the
    /// host cannot be run and [`HuntError::LogReset`] when the log cannot be
    /// truncated. The archives are disabled before the error is returned.
    pub fn run(&mut self) -> Result<HuntReport, HuntError> {
        self.store.enable_all();
        self.store.disable_all();
        if let Some(stuck) = self.store.enabled().first() {
            let path = self.store.get(*stuck).map(Archive::path).unwrap_or_default();
            return Err(HuntError::Normalise { path });
        }
        let total = self.store.len();
        self.reporter.normalised(total);

        let mut tally = Tally::default();
        for (offset, id) in self.store.ids().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(self.finish(HuntReport::Interrupted {
                    tested: tally.tested,
                    total,
                }));
            }
            if let Some(archive) = self.store.get(id) {
                self.reporter.candidate_started(offset + 1, total, archive);
            }

            let outcome = self.test_candidate(id)?;
            if let Some(archive) = self.store.get(id) {
                self.reporter.candidate_finished(archive, &outcome);
            }
            if outcome.was_tested() {
                tally.tested += 1;
            }

            match outcome {
                TestOutcome::CrashConfirmed(culprit) => {
                    let report = self.crash_report(culprit, tally.tested, total);
                    return Ok(self.finish(report));
                }
                TestOutcome::Interrupted => {
                    return Ok(self.finish(HuntReport::Interrupted {
                        tested: tally.tested,
                        total,
                    }));
                }
                TestOutcome::Timeout => tally.timed_out.push(self.archive_path(id)),
                TestOutcome::DependencyUnresolved(plugin_ids) => {
                    tally.unresolved.push(UnresolvedCandidate {
                        archive: self.archive_path(id),
                        plugin_ids,
                    });
                }
                TestOutcome::Clean | TestOutcome::Skipped => {}
            }
        }

        Ok(self.finish(HuntReport::NoCrashFound {
            tested: tally.tested,
            total,
            timed_out: tally.timed_out,
            unresolved: tally.unresolved,
        }))
    }

    fn finish(&mut self, report: HuntReport) -> HuntReport {
        self.reporter.hunt_finished(&report);
        report
    }

    fn crash_report(&self, culprit: ArchiveId, tested: usize, total: usize) -> HuntReport {
        let archive = self.store.get(culprit);
        HuntReport::CrashFound {
            archive: archive.map(|found| found.path()).unwrap_or_default(),
            plugin_id: archive
                .and_then(|found| found.plugin_id(&self.source))
                .map(str::to_owned),
            tested,
            total,
        }
    }

    fn archive_path(&self, id: ArchiveId) -> PathBuf {
        self.store
            .get(id)
            .map(|archive| archive.base_path().to_path_buf())
            .unwrap_or_default()
    }

    /// Runs one candidate's test cycle and restores the disabled state,
    /// leaving only a confirmed culprit enabled.
    fn test_candidate(&mut self, id: ArchiveId) -> Result<TestOutcome, HuntError> {
        if let Err(error) = self.store.enable(id) {
            if !error.is_recoverable() {
                return Err(error);
            }
            if let Some(archive) = self.store.get(id) {
                self.reporter.candidate_skipped(archive, &error);
            }
            return Ok(TestOutcome::Skipped);
        }

        let mut dependencies = Vec::new();
        let result = self.exercise(id, &mut dependencies);

        for dependency in dependencies {
            self.disable_quietly(dependency);
        }
        if !matches!(result, Ok(TestOutcome::CrashConfirmed(_))) {
            self.disable_quietly(id);
        }
        result
    }

    /// First run, then at most one re-run with resolved dependencies.
    /// Every dependency enabled is pushed onto `dependencies`.
    fn exercise(
        &mut self,
        id: ArchiveId,
        dependencies: &mut Vec<ArchiveId>,
    ) -> Result<TestOutcome, HuntError> {
        let verdict = match self.run_host()? {
            ExitKind::TimedOut => return Ok(TestOutcome::Timeout),
            ExitKind::Cancelled => return Ok(TestOutcome::Interrupted),
            ExitKind::Normal(_) => self.analyzer.analyze(&self.settings.log_path),
        };
        if verdict.crash_detected() {
            return Ok(TestOutcome::CrashConfirmed(id));
        }
        if !verdict.has_missing_dependencies() {
            return Ok(TestOutcome::Clean);
        }

        let unresolved = self.enable_dependencies(id, &verdict, dependencies)?;
        if dependencies.is_empty() {
            return Ok(TestOutcome::DependencyUnresolved(unresolved));
        }

        let retry = match self.run_host()? {
            ExitKind::TimedOut => return Ok(TestOutcome::Timeout),
            ExitKind::Cancelled => return Ok(TestOutcome::Interrupted),
            ExitKind::Normal(_) => self.analyzer.analyze(&self.settings.log_path),
        };
        if retry.crash_detected() {
            return Ok(TestOutcome::CrashConfirmed(id));
        }
        if unresolved.is_empty() {
            Ok(TestOutcome::Clean)
        } else {
            Ok(TestOutcome::DependencyUnresolved(unresolved))
        }
    }

    /// Resolves and enables the archives providing the verdict's missing
    /// identifiers, returning the identifiers left unresolved.
    fn enable_dependencies(
        &mut self,
        id: ArchiveId,
        verdict: &Verdict,
        dependencies: &mut Vec<ArchiveId>,
    ) -> Result<Vec<String>, HuntError> {
        if let Some(archive) = self.store.get(id) {
            self.reporter
                .missing_dependencies(archive, verdict.missing_dependencies());
        }
        let resolution = DependencyResolver::new(&self.source).resolve_all(
            &self.store,
            id,
            verdict.missing_dependencies(),
        );
        let mut unresolved = resolution.unresolved;

        for dependency in resolution.resolved {
            match self.store.enable(dependency) {
                Ok(()) => {
                    dependencies.push(dependency);
                    if let (Some(candidate), Some(provider)) =
                        (self.store.get(id), self.store.get(dependency))
                    {
                        self.reporter.dependency_enabled(candidate, provider);
                    }
                }
                Err(error) if error.is_recoverable() => {
                    warn!(
                        target: ORCHESTRATOR_TARGET,
                        dependency = %dependency,
                        %error,
                        "cannot enable dependency"
                    );
                    if let Some(plugin_id) = self
                        .store
                        .get(dependency)
                        .and_then(|archive| archive.cached_plugin_id())
                    {
                        unresolved.push(plugin_id.to_owned());
                    }
                }
                Err(error) => return Err(error),
            }
        }

        if !unresolved.is_empty() {
            if let Some(archive) = self.store.get(id) {
                self.reporter.dependency_unresolved(archive, &unresolved);
            }
        }
        Ok(unresolved)
    }

    /// Truncates the log and runs the host once.
    fn run_host(&self) -> Result<ExitKind, HuntError> {
        let log_path = &self.settings.log_path;
        File::create(log_path).map_err(|source| HuntError::LogReset {
            path: log_path.clone(),
            source: Arc::new(source),
        })?;
        let request = RunRequest {
            log_path,
            timeout: self.settings.timeout,
            cancel: &self.cancel,
        };
        Ok(self.executor.run(&request)?.exit())
    }

    fn disable_quietly(&mut self, id: ArchiveId) {
        if let Err(error) = self.store.disable(id) {
            warn!(
                target: ORCHESTRATOR_TARGET,
                archive = %id,
                %error,
                "cannot disable archive"
            );
        }
    }
}
