//! Console rendering of hunt progress and results.

use std::io::{self, Write};
use std::process::ExitCode;

use modhunt_core::{
    Archive, HuntError, HuntReport, HuntReporter, StructuredHuntReporter, TestOutcome,
};
use serde::Serialize;

use crate::AppError;
use crate::cli::OutputFormat;

/// Exit status when no archive reproduced the crash.
const EXIT_NO_CRASH: u8 = 2;

/// Exit status after cancellation by signal.
const EXIT_INTERRUPTED: u8 = 130;

/// Maps a final report to the process exit status.
pub(crate) fn exit_code(report: &HuntReport) -> ExitCode {
    match report {
        HuntReport::CrashFound { .. } => ExitCode::SUCCESS,
        HuntReport::NoCrashFound { .. } => ExitCode::from(EXIT_NO_CRASH),
        HuntReport::Interrupted { .. } => ExitCode::from(EXIT_INTERRUPTED),
    }
}

/// Reporter printing `[i/total]` progress lines and forwarding every event
/// to the structured log.
pub(crate) struct ConsoleReporter<W: Write> {
    out: W,
    structured: StructuredHuntReporter,
}

impl<W: Write> ConsoleReporter<W> {
    pub(crate) const fn new(out: W) -> Self {
        Self {
            out,
            structured: StructuredHuntReporter::new(),
        }
    }

    fn line(&mut self, text: &str) {
        if let Err(error) = writeln!(self.out, "{text}") {
            tracing::debug!(target: "modhunt::cli", %error, "cannot write progress line");
        }
    }
}

impl<W: Write> HuntReporter for ConsoleReporter<W> {
    fn normalised(&mut self, total: usize) {
        self.structured.normalised(total);
        self.line(&format!("Disabled all {total} archives."));
    }

    fn candidate_started(&mut self, position: usize, total: usize, archive: &Archive) {
        self.structured.candidate_started(position, total, archive);
        self.line(&format!("[{position}/{total}] Testing {}", archive.file_name()));
    }

    fn candidate_skipped(&mut self, archive: &Archive, error: &HuntError) {
        self.structured.candidate_skipped(archive, error);
        self.line(&format!("  skipped: {error}"));
    }

    fn missing_dependencies(&mut self, archive: &Archive, plugin_ids: &[String]) {
        self.structured.missing_dependencies(archive, plugin_ids);
        self.line(&format!("  missing dependencies: {}", plugin_ids.join(", ")));
    }

    fn dependency_enabled(&mut self, candidate: &Archive, dependency: &Archive) {
        self.structured.dependency_enabled(candidate, dependency);
        self.line(&format!("  enabled dependency {}", dependency.file_name()));
    }

    fn dependency_unresolved(&mut self, archive: &Archive, plugin_ids: &[String]) {
        self.structured.dependency_unresolved(archive, plugin_ids);
        self.line(&format!("  no archive provides: {}", plugin_ids.join(", ")));
    }

    fn candidate_finished(&mut self, archive: &Archive, outcome: &TestOutcome) {
        self.structured.candidate_finished(archive, outcome);
        let text = match outcome {
            TestOutcome::CrashConfirmed(_) => "crash reproduced",
            TestOutcome::Timeout => "timed out, skipped",
            TestOutcome::Clean => "clean",
            TestOutcome::DependencyUnresolved(_) => "clean without some dependencies",
            TestOutcome::Skipped => return,
            TestOutcome::Interrupted => "interrupted",
        };
        self.line(&format!("  {text}"));
    }

    fn hunt_finished(&mut self, report: &HuntReport) {
        self.structured.hunt_finished(report);
    }
}

/// Writes the final report in the requested format.
pub(crate) fn render_report<W: Write>(
    out: &mut W,
    format: OutputFormat,
    report: &HuntReport,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => write_json(out, report),
        OutputFormat::Human => write_human(out, report).map_err(AppError::Output),
    }
}

fn write_human<W: Write>(out: &mut W, report: &HuntReport) -> io::Result<()> {
    match report {
        HuntReport::CrashFound {
            archive,
            plugin_id,
            tested,
            total,
        } => {
            writeln!(out, "Crash reproduced by {}", archive.display())?;
            if let Some(id) = plugin_id {
                writeln!(out, "Plugin id: {id}")?;
            }
            writeln!(out, "Tested {tested} of {total} archives; the culprit is left enabled.")
        }
        HuntReport::NoCrashFound {
            tested,
            timed_out,
            unresolved,
            ..
        } => {
            writeln!(out, "No crash found, {tested} tested.")?;
            for path in timed_out {
                writeln!(out, "  timed out: {}", path.display())?;
            }
            for candidate in unresolved {
                writeln!(
                    out,
                    "  tested without {}: {}",
                    candidate.plugin_ids.join(", "),
                    candidate.archive.display()
                )?;
            }
            Ok(())
        }
        HuntReport::Interrupted { tested, total } => writeln!(
            out,
            "Interrupted after testing {tested} of {total} archives; all archives disabled."
        ),
    }
}

/// Serialises `value` as one line of JSON.
pub(crate) fn write_json<W: Write, T: Serialize + ?Sized>(
    out: &mut W,
    value: &T,
) -> Result<(), AppError> {
    serde_json::to_writer(&mut *out, value).map_err(AppError::SerialiseReport)?;
    writeln!(out)?;
    Ok(())
}
