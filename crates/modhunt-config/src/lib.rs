//! Shared configuration for the modhunt toolchain.
//!
//! [`Config`] is loaded through `ortho_config`, which layers built-in
//! defaults, an optional TOML configuration file, `MODHUNT_*` environment
//! variables, and command-line flags (highest precedence). Every key is
//! optional; the accessors fall back to the constants in [`defaults`] so the
//! rest of the workspace never handles missing values.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_ARCHIVE_EXTENSION, DEFAULT_CRASH_SIGNATURE, DEFAULT_LOG_FILE, DEFAULT_LOG_FILTER,
    DEFAULT_MODS_DIR, DEFAULT_SERVER_ROOT, DEFAULT_SERVER_SCRIPT, DEFAULT_SETTLE_MILLIS,
    DEFAULT_TIMEOUT_SECS, expand_home,
};
pub use logging::LogFormat;

/// Resolved configuration shared by the CLI and the hunt engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "MODHUNT")]
pub struct Config {
    /// Directory holding the server start script, archives, and log.
    server_root: Option<Utf8PathBuf>,
    /// Start script launched with no arguments from the server directory.
    server_script: Option<String>,
    /// Archive directory, relative to the server directory unless absolute.
    mods_dir: Option<Utf8PathBuf>,
    /// Server log file, relative to the server directory unless absolute.
    log_file: Option<Utf8PathBuf>,
    /// Extension of enabled archives (without the leading dot).
    archive_extension: Option<String>,
    /// Substring whose presence in the server log marks the crash.
    crash_signature: Option<String>,
    /// Wall-clock budget for one server run, in seconds.
    timeout_secs: Option<u64>,
    /// Pause after each run so the log is flushed, in milliseconds.
    settle_millis: Option<u64>,
    /// `tracing` filter expression.
    log_filter: Option<String>,
    /// Diagnostic log format on stderr.
    log_format: Option<LogFormat>,
}

impl Config {
    /// Server directory with a leading `~` expanded.
    #[must_use]
    pub fn server_root(&self) -> Utf8PathBuf {
        let raw = self
            .server_root
            .as_ref()
            .map_or(DEFAULT_SERVER_ROOT, |root| root.as_str());
        expand_home(raw)
    }

    /// Start script name or path.
    #[must_use]
    pub fn server_script(&self) -> &str {
        self.server_script
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_SCRIPT)
    }

    /// Absolute (or root-relative) archive directory.
    #[must_use]
    pub fn mods_dir(&self) -> Utf8PathBuf {
        let dir = self.mods_dir.as_deref().map_or(DEFAULT_MODS_DIR, |dir| dir.as_str());
        self.server_root().join(expand_home(dir))
    }

    /// Absolute (or root-relative) server log path.
    #[must_use]
    pub fn log_file(&self) -> Utf8PathBuf {
        let file = self.log_file.as_deref().map_or(DEFAULT_LOG_FILE, |file| file.as_str());
        self.server_root().join(expand_home(file))
    }

    /// Extension of enabled archives, without a leading dot.
    #[must_use]
    pub fn archive_extension(&self) -> &str {
        self.archive_extension
            .as_deref()
            .map_or(DEFAULT_ARCHIVE_EXTENSION, |ext| ext.trim_start_matches('.'))
    }

    /// Crash signature searched for in the server log.
    #[must_use]
    pub fn crash_signature(&self) -> &str {
        self.crash_signature
            .as_deref()
            .unwrap_or(DEFAULT_CRASH_SIGNATURE)
    }

    /// Run timeout in whole seconds.
    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Run timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs())
    }

    /// Delay applied after each run before the log is analysed.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_millis.unwrap_or(DEFAULT_SETTLE_MILLIS))
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Diagnostic log format; [`LogFormat::Auto`] unless configured.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_default()
    }

    /// Overrides the server directory.
    #[must_use]
    pub fn with_server_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.server_root = Some(root.into());
        self
    }

    /// Overrides the start script.
    #[must_use]
    pub fn with_server_script(mut self, script: impl Into<String>) -> Self {
        self.server_script = Some(script.into());
        self
    }

    /// Overrides the crash signature.
    #[must_use]
    pub fn with_crash_signature(mut self, signature: impl Into<String>) -> Self {
        self.crash_signature = Some(signature.into());
        self
    }

    /// Overrides the run timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Overrides the settle delay.
    #[must_use]
    pub const fn with_settle_millis(mut self, millis: u64) -> Self {
        self.settle_millis = Some(millis);
        self
    }
}
