//! Crash and missing-dependency detection in host logs.
//!
//! The host's log is free text. A crash is recognised by a fixed signature
//! substring; missing companions are reported by the host as
//! `Mod ID: '<id>'` fragments, one per absent plugin.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

/// Tracing target for log analysis.
const ANALYSIS_TARGET: &str = "modhunt::analysis";

/// Captures the plugin identifier of a missing-dependency report.
#[expect(clippy::expect_used, reason = "the pattern is a checked literal")]
static MISSING_DEPENDENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mod ID: '([^']+)'").expect("dependency regex is valid"));

/// Classification of one host run's log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    crash_detected: bool,
    missing_dependencies: Vec<String>,
}

impl Verdict {
    /// Returns `true` when the crash signature appeared in the log.
    #[must_use]
    pub const fn crash_detected(&self) -> bool {
        self.crash_detected
    }

    /// Missing plugin identifiers in first-seen order, without duplicates.
    #[must_use]
    pub fn missing_dependencies(&self) -> &[String] {
        &self.missing_dependencies
    }

    /// Returns `true` when the log named at least one missing dependency.
    #[must_use]
    pub fn has_missing_dependencies(&self) -> bool {
        !self.missing_dependencies.is_empty()
    }
}

/// Scans host logs for a crash signature and missing dependencies.
#[derive(Debug, Clone)]
pub struct LogAnalyzer {
    signature: String,
}

impl LogAnalyzer {
    /// Creates an analyzer matching `signature` case-sensitively.
    #[must_use]
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }

    /// Reads and classifies the log at `log_path`.
    ///
    /// Invalid UTF-8 is replaced rather than rejected. A log that cannot be
    /// read is treated as empty: inconclusive, never a crash.
    #[must_use]
    pub fn analyze(&self, log_path: &Path) -> Verdict {
        match fs::read(log_path) {
            Ok(bytes) => self.analyze_text(&String::from_utf8_lossy(&bytes)),
            Err(error) => {
                warn!(
                    target: ANALYSIS_TARGET,
                    log = %log_path.display(),
                    %error,
                    "cannot read host log; treating it as empty"
                );
                Verdict::default()
            }
        }
    }

    /// Classifies log text already in memory.
    #[must_use]
    pub fn analyze_text(&self, text: &str) -> Verdict {
        let crash_detected = !self.signature.is_empty() && text.contains(&self.signature);

        let mut missing_dependencies: Vec<String> = Vec::new();
        for captures in MISSING_DEPENDENCY.captures_iter(text) {
            let Some(id) = captures.get(1).map(|group| group.as_str()) else {
                continue;
            };
            if !missing_dependencies.iter().any(|seen| seen == id) {
                missing_dependencies.push(id.to_owned());
            }
        }

        debug!(
            target: ANALYSIS_TARGET,
            crash_detected,
            missing = missing_dependencies.len(),
            "analyzed host log"
        );
        Verdict {
            crash_detected,
            missing_dependencies,
        }
    }
}
