//! Shared test support and crate-level behaviour tests.

use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::HuntError;
use crate::process::{ExitKind, HostExecutor, RunRequest, RunResult};


/// Crash line the scripted host writes when a culprit is loaded.
pub(crate) const CRASH_LINE: &str =
    "Attempted to load class net/minecraft/client/gui/Gui for invalid dist DEDICATED_SERVER";

/// Creates an empty file named `name` in `dir`.
pub(crate) fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"").expect("create file");
}

/// Writes a zip archive named `name` in `dir` holding the given entries.
pub(crate) fn write_jar(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let file = fs::File::create(&path).expect("create jar");
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (entry, content) in entries {
        writer.start_file(*entry, options).expect("start entry");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish jar");
    path
}

/// Writes a jar declaring `plugin_id` in a Forge-style manifest.
pub(crate) fn write_mod(dir: &Path, name: &str, plugin_id: &str) -> PathBuf {
    let manifest = format!("modLoader = \"javafml\"\n\n[[mods]]\nmodId = \"{plugin_id}\"\n");
    write_jar(dir, name, &[("META-INF/mods.toml", manifest.as_str())])
}

/// What the scripted host does on one run.
#[derive(Debug, Clone)]
pub(crate) enum HostScript {
    /// Exits normally after writing `log`.
    Exit(String),
    /// Writes `log`, then reports a timeout.
    TimedOut(String),
    /// Reports cancellation without writing anything.
    Cancelled,
    /// Fails to launch.
    LaunchFailure,
}

impl HostScript {
    pub(crate) fn clean() -> Self {
        Self::Exit(String::from("[main/INFO] Done (3.2s)!\n"))
    }

    pub(crate) fn crash() -> Self {
        Self::Exit(format!("[main/ERROR] {CRASH_LINE}\n"))
    }

    pub(crate) fn missing(ids: &[&str]) -> Self {
        let mut log = String::from("[main/ERROR] Missing or unsupported mandatory dependencies:\n");
        for id in ids {
            log.push_str(&format!("\tMod ID: '{id}', Requested by: 'candidate'\n"));
        }
        Self::Exit(log)
    }
}

/// Host double that decides each run from the archives enabled on disk.
///
/// The script closure receives the sorted file names of the enabled
/// archives. Every run's enabled set is recorded for later assertions.
pub(crate) struct ScriptedHost<F> {
    mods_dir: PathBuf,
    script: F,
    runs: RefCell<Vec<Vec<String>>>,
}

impl<F> ScriptedHost<F>
where
    F: Fn(&[String]) -> HostScript,
{
    pub(crate) fn new(mods_dir: impl Into<PathBuf>, script: F) -> Self {
        Self {
            mods_dir: mods_dir.into(),
            script,
            runs: RefCell::new(Vec::new()),
        }
    }

    /// Enabled sets observed by each run, in order.
    pub(crate) fn runs(&self) -> Vec<Vec<String>> {
        self.runs.borrow().clone()
    }

    fn enabled_on_disk(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.mods_dir)
            .expect("list mods dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".jar"))
            .collect();
        names.sort();
        names
    }
}

impl<F> HostExecutor for ScriptedHost<F>
where
    F: Fn(&[String]) -> HostScript,
{
    fn run(&self, request: &RunRequest<'_>) -> Result<RunResult, HuntError> {
        let enabled = self.enabled_on_disk();
        let outcome = (self.script)(&enabled);
        self.runs.borrow_mut().push(enabled);

        let append = |text: &str| {
            let mut log = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(request.log_path)
                .expect("open log");
            log.write_all(text.as_bytes()).expect("write log");
        };
        let exit = match outcome {
            HostScript::Exit(text) => {
                append(&text);
                ExitKind::Normal(Some(0))
            }
            HostScript::TimedOut(text) => {
                append(&text);
                ExitKind::TimedOut
            }
            HostScript::Cancelled => ExitKind::Cancelled,
            HostScript::LaunchFailure => {
                return Err(HuntError::Launch {
                    executable: PathBuf::from("start.sh"),
                    message: String::from("scripted launch failure"),
                    source: None,
                });
            }
        };
        Ok(RunResult::new(
            exit,
            request.log_path.to_path_buf(),
            Duration::from_millis(1),
        ))
    }
}
