//! Domain errors raised while hunting for a crashing archive.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::archive::ToggleState;

/// Errors arising from archive toggling, host supervision, and log handling.
#[derive(Debug, Error)]
pub enum HuntError {
    /// The archive directory could not be listed.
    #[error("cannot read archive directory {path}: {source}")]
    ArchiveDirectory {
        /// Directory that was scanned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A toggle was requested for an archive id outside the discovered set.
    #[error("no archive with index {index} was discovered")]
    UnknownArchive {
        /// Offending index.
        index: usize,
    },

    /// The archive file is not where its recorded toggle state places it.
    #[error("archive {path} not found in {state} state")]
    ArchiveState {
        /// Location the archive was expected at.
        path: PathBuf,
        /// Recorded toggle state.
        state: ToggleState,
    },

    /// The toggle target is already occupied by another file.
    #[error("cannot toggle {from}: {to} already exists")]
    ToggleConflict {
        /// Current archive location.
        from: PathBuf,
        /// Occupied target location.
        to: PathBuf,
    },

    /// Renaming the archive failed.
    #[error("failed to rename {path}: {source}")]
    Toggle {
        /// Current archive location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// An archive stayed enabled after the hunt disabled every archive.
    #[error("cannot start the hunt: {path} is still enabled")]
    Normalise {
        /// Location of the archive that stayed enabled.
        path: PathBuf,
    },

    /// The host executable could not be started.
    #[error("failed to launch {executable}: {message}")]
    Launch {
        /// Executable that was launched.
        executable: PathBuf,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// Polling or terminating the running host failed.
    #[error("lost track of host process {executable}: {source}")]
    Supervise {
        /// Executable that was running.
        executable: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The shared log file could not be truncated before a run.
    #[error("failed to reset log {path}: {source}")]
    LogReset {
        /// Log file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl HuntError {
    /// Returns `true` for toggle failures the orchestrator logs and skips.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownArchive { .. }
                | Self::ArchiveState { .. }
                | Self::ToggleConflict { .. }
                | Self::Toggle { .. }
        )
    }
}

/// Reasons a plugin identifier could not be read from an archive.
///
/// These never abort a hunt: the metadata reader logs them and reports the
/// archive's identifier as unknown.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The archive file could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Archive path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The archive is not a readable zip container.
    #[error("cannot read {path} as an archive: {source}")]
    Container {
        /// Archive path.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: Arc<zip::result::ZipError>,
    },

    /// The manifest entry could not be read.
    #[error("cannot read {entry} in {path}: {source}")]
    Entry {
        /// Archive path.
        path: PathBuf,
        /// Manifest entry name.
        entry: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The TOML manifest is malformed.
    #[error("malformed manifest {entry} in {path}: {source}")]
    Toml {
        /// Archive path.
        path: PathBuf,
        /// Manifest entry name.
        entry: String,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The JSON manifest is malformed.
    #[error("malformed manifest {entry} in {path}: {source}")]
    Json {
        /// Archive path.
        path: PathBuf,
        /// Manifest entry name.
        entry: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}
