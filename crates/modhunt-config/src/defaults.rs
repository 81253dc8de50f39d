use camino::Utf8PathBuf;

/// Server directory used when none is configured. A leading `~/` is expanded
/// against the invoking user's home directory.
pub const DEFAULT_SERVER_ROOT: &str = "~/forge_server";

/// Start script launched inside the server directory.
pub const DEFAULT_SERVER_SCRIPT: &str = "start.sh";

/// Archive directory, relative to the server directory.
pub const DEFAULT_MODS_DIR: &str = "mods";

/// Server log file, relative to the server directory.
pub const DEFAULT_LOG_FILE: &str = "server_log.txt";

/// File extension carried by enabled archives.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "jar";

/// Log line emitted by the server when a client-only class is loaded on a
/// dedicated server.
pub const DEFAULT_CRASH_SIGNATURE: &str =
    "Attempted to load class net/minecraft/client/gui/Gui for invalid dist DEDICATED_SERVER";

/// Wall-clock budget for a single server run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Pause after the server exits so buffered log writes reach the disk.
pub const DEFAULT_SETTLE_MILLIS: u64 = 2_000;

/// `tracing` filter applied when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Expands a leading `~` against the home directory.
///
/// Paths without a leading tilde, and hosts without a resolvable UTF-8 home
/// directory, are returned unchanged.
#[must_use]
pub fn expand_home(path: &str) -> Utf8PathBuf {
    let remainder = match path {
        "~" => "",
        other => match other.strip_prefix("~/") {
            Some(rest) => rest,
            None => return Utf8PathBuf::from(path),
        },
    };
    match home_directory() {
        Some(home) if remainder.is_empty() => home,
        Some(home) => home.join(remainder),
        None => Utf8PathBuf::from(path),
    }
}

fn home_directory() -> Option<Utf8PathBuf> {
    dirs::home_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}
