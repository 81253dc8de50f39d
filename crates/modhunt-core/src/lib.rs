//! Crash isolation engine for modded game servers.
//!
//! The `modhunt-core` crate finds the plugin archive that makes a dedicated
//! server crash at startup. It hides every archive from the server, then
//! enables one candidate at a time, launches the server with a wall-clock
//! budget, and scans the server log for a known crash signature. When a
//! candidate fails to load because a companion plugin is absent, the
//! companion archive is located through its embedded manifest and the
//! candidate is re-tested with it.
//!
//! # Architecture
//!
//! - [`archive`] discovers archives and toggles them by renaming.
//! - [`metadata`] reads plugin identifiers from archive manifests.
//! - [`process`] runs the server start script under supervision.
//! - [`analysis`] classifies the server log.
//! - [`resolver`] maps missing plugin identifiers to archives.
//! - [`orchestrator`] drives the hunt and reports progress.
//!
//! The server is reached only through the [`HostExecutor`] trait and
//! manifests only through [`PluginIdSource`], so the hunt logic runs without
//! a real server in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use modhunt_core::{
//!     ArchiveStore, HostProcess, HuntReport, HuntSettings, JarManifestReader, Orchestrator,
//!     StructuredHuntReporter,
//! };
//!
//! let store = ArchiveStore::open("/srv/forge/mods", "jar")?;
//! let settings = HuntSettings {
//!     log_path: "/srv/forge/server_log.txt".into(),
//!     timeout: Duration::from_secs(20),
//!     crash_signature: String::from("for invalid dist DEDICATED_SERVER"),
//! };
//! let report = Orchestrator::new(
//!     store,
//!     HostProcess::new("/srv/forge", "start.sh"),
//!     JarManifestReader::new(),
//!     StructuredHuntReporter::new(),
//!     settings,
//! )
//! .run()?;
//! if let HuntReport::CrashFound { archive, .. } = report {
//!     println!("culprit: {}", archive.display());
//! }
//! # Ok::<(), modhunt_core::HuntError>(())
//! ```

pub mod analysis;
pub mod archive;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod process;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use self::analysis::{LogAnalyzer, Verdict};
pub use self::archive::{Archive, ArchiveId, ArchiveStore, ToggleState};
pub use self::error::{HuntError, MetadataError};
pub use self::metadata::{JarManifestReader, PluginIdSource};
pub use self::orchestrator::{
    HuntReport, HuntReporter, HuntSettings, Orchestrator, StructuredHuntReporter, TestOutcome,
    UnresolvedCandidate,
};
pub use self::process::{CancellationToken, ExitKind, HostExecutor, HostProcess, RunResult};
pub use self::resolver::{DependencyResolver, Resolution};
