//! Archive discovery and enable/disable toggling.
//!
//! The server loads every `*.jar` in its mods directory and ignores files
//! carrying an extra `.disabled` suffix. [`ToggleState`] models that
//! convention as a value with a pure path mapping; [`ArchiveStore`] applies
//! it to the filesystem by renaming files. Archive contents are never read or
//! written here.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::HuntError;
use crate::metadata::PluginIdSource;

/// Tracing target for archive operations.
const ARCHIVE_TARGET: &str = "modhunt::archive";

/// Suffix appended to an archive's file name to hide it from the server.
pub const DISABLED_SUFFIX: &str = ".disabled";

/// Whether the server currently sees an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    /// Loaded by the server (`name.jar`).
    Enabled,
    /// Hidden from the server (`name.jar.disabled`).
    Disabled,
}

impl ToggleState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }

    /// Returns the opposite state.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Enabled => Self::Disabled,
            Self::Disabled => Self::Enabled,
        }
    }

    /// Returns `true` for [`ToggleState::Enabled`].
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Maps an archive's base path to its on-disk location in this state.
    ///
    /// # Example
    ///
    /// ```
    /// use std::path::Path;
    /// use modhunt_core::ToggleState;
    ///
    /// let base = Path::new("mods/jei.jar");
    /// assert_eq!(ToggleState::Enabled.path_for(base), Path::new("mods/jei.jar"));
    /// assert_eq!(
    ///     ToggleState::Disabled.path_for(base),
    ///     Path::new("mods/jei.jar.disabled"),
    /// );
    /// ```
    #[must_use]
    pub fn path_for(self, base: &Path) -> PathBuf {
        match self {
            Self::Enabled => base.to_path_buf(),
            Self::Disabled => {
                let mut name = base.as_os_str().to_os_string();
                name.push(DISABLED_SUFFIX);
                PathBuf::from(name)
            }
        }
    }
}

impl fmt::Display for ToggleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a directory entry name as an archive.
///
/// Returns the base file name (without the disabled suffix) and the toggle
/// state encoded by the name, or `None` for unrelated files.
#[must_use]
pub fn classify<'a>(file_name: &'a str, extension: &str) -> Option<(&'a str, ToggleState)> {
    let (base, state) = match file_name.strip_suffix(DISABLED_SUFFIX) {
        Some(base) => (base, ToggleState::Disabled),
        None => (file_name, ToggleState::Enabled),
    };
    let stem = base.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.is_empty() {
        return None;
    }
    Some((base, state))
}

/// Position of an archive in discovery order, valid for one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArchiveId(usize);

impl ArchiveId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based discovery index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A plugin archive discovered in the mods directory.
#[derive(Debug, Clone)]
pub struct Archive {
    base: PathBuf,
    state: ToggleState,
    /// An outdated `.disabled` copy sits next to the enabled file.
    stale_copy: bool,
    plugin_id: OnceCell<Option<String>>,
}

impl Archive {
    fn new(base: PathBuf, state: ToggleState, stale_copy: bool) -> Self {
        Self {
            base,
            state,
            stale_copy,
            plugin_id: OnceCell::new(),
        }
    }

    /// Path of the archive without the disabled suffix; its stable identity.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        self.base.as_path()
    }

    /// Current on-disk location.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.state.path_for(&self.base)
    }

    /// Base file name, for display.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.base
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Recorded toggle state.
    #[must_use]
    pub const fn state(&self) -> ToggleState {
        self.state
    }

    /// Returns `true` when the server would load this archive.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Plugin identifier, read through `source` on first use and cached for
    /// the lifetime of the store.
    #[must_use]
    pub fn plugin_id<S>(&self, source: &S) -> Option<&str>
    where
        S: PluginIdSource + ?Sized,
    {
        self.plugin_id
            .get_or_init(|| source.plugin_id(&self.path()))
            .as_deref()
    }

    /// Plugin identifier if it has already been read.
    #[must_use]
    pub fn cached_plugin_id(&self) -> Option<&str> {
        self.plugin_id.get().and_then(Option::as_deref)
    }
}

/// The set of archives in one mods directory and their toggle states.
///
/// Discovery happens once, in [`ArchiveStore::open`]; the set is then fixed
/// for the run and ordered by file name.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    directory: PathBuf,
    archives: Vec<Archive>,
}

impl ArchiveStore {
    /// Scans `directory` (one level, no recursion) for archives carrying
    /// `extension`, enabled or disabled.
    ///
    /// When both `x.jar` and `x.jar.disabled` exist the enabled file is kept
    /// and the disabled copy is treated as stale: the first disable renames
    /// the enabled file over it.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::ArchiveDirectory`] when the directory cannot be
    /// listed.
    pub fn open(dir: impl Into<PathBuf>, extension: &str) -> Result<Self, HuntError> {
        let directory = dir.into();
        let listing_error = |source: std::io::Error| HuntError::ArchiveDirectory {
            path: directory.clone(),
            source: Arc::new(source),
        };

        let mut discovered: BTreeMap<String, (ToggleState, bool)> = BTreeMap::new();
        for entry in fs::read_dir(&directory).map_err(listing_error)? {
            let dir_entry = entry.map_err(listing_error)?;
            if !dir_entry.path().is_file() {
                continue;
            }
            let os_name = dir_entry.file_name();
            let Some(name) = os_name.to_str() else {
                debug!(
                    target: ARCHIVE_TARGET,
                    name = ?os_name,
                    "skipping non UTF-8 file name"
                );
                continue;
            };
            let Some((base, state)) = classify(name, extension) else {
                continue;
            };
            match discovered.entry(base.to_owned()) {
                Entry::Vacant(slot) => {
                    slot.insert((state, false));
                }
                Entry::Occupied(mut slot) => {
                    warn!(
                        target: ARCHIVE_TARGET,
                        archive = base,
                        "archive present both enabled and disabled; the disabled copy will be replaced"
                    );
                    slot.insert((ToggleState::Enabled, true));
                }
            }
        }

        let archives: Vec<Archive> = discovered
            .into_iter()
            .map(|(name, (state, stale_copy))| {
                Archive::new(directory.join(name), state, stale_copy)
            })
            .collect();

        debug!(
            target: ARCHIVE_TARGET,
            directory = %directory.display(),
            count = archives.len(),
            "discovered archives"
        );

        Ok(Self {
            directory,
            archives,
        })
    }

    /// Directory the archives were discovered in.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    /// Archives in discovery order.
    #[must_use]
    pub fn archives(&self) -> &[Archive] {
        &self.archives
    }

    /// Iterates archives together with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ArchiveId, &Archive)> {
        self.archives
            .iter()
            .enumerate()
            .map(|(index, archive)| (ArchiveId::new(index), archive))
    }

    /// Ids of every archive in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = ArchiveId> + use<> {
        (0..self.archives.len()).map(ArchiveId::new)
    }

    /// Looks up an archive by id.
    #[must_use]
    pub fn get(&self, id: ArchiveId) -> Option<&Archive> {
        self.archives.get(id.index())
    }

    /// Ids of the archives currently enabled.
    #[must_use]
    pub fn enabled(&self) -> Vec<ArchiveId> {
        self.iter()
            .filter(|(_, archive)| archive.is_enabled())
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of discovered archives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Returns `true` when the directory held no archives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Makes the archive visible to the server.
    ///
    /// # Errors
    ///
    /// See [`ArchiveStore::disable`].
    pub fn enable(&mut self, id: ArchiveId) -> Result<(), HuntError> {
        self.apply(id, ToggleState::Enabled).map(drop)
    }

    /// Hides the archive from the server. Already-disabled archives are left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::UnknownArchive`] for ids outside the store,
    /// [`HuntError::ArchiveState`] when the file is at neither location,
    /// [`HuntError::ToggleConflict`] when the target name is taken, and
    /// [`HuntError::Toggle`] when the rename fails.
    pub fn disable(&mut self, id: ArchiveId) -> Result<(), HuntError> {
        self.apply(id, ToggleState::Disabled).map(drop)
    }

    /// Enables every archive, returning how many were renamed.
    ///
    /// Per-archive failures are logged and skipped.
    pub fn enable_all(&mut self) -> usize {
        self.apply_all(ToggleState::Enabled)
    }

    /// Disables every archive, returning how many were renamed.
    ///
    /// Per-archive failures are logged and skipped.
    pub fn disable_all(&mut self) -> usize {
        self.apply_all(ToggleState::Disabled)
    }

    fn apply_all(&mut self, target: ToggleState) -> usize {
        let mut renamed = 0;
        for id in self.ids() {
            match self.apply(id, target) {
                Ok(true) => renamed += 1,
                Ok(false) => {}
                Err(error) => warn!(
                    target: ARCHIVE_TARGET,
                    archive = %id,
                    %error,
                    "skipping archive during bulk toggle"
                ),
            }
        }
        renamed
    }

    /// Moves the archive into `target`, returning whether a rename happened.
    fn apply(&mut self, id: ArchiveId, target: ToggleState) -> Result<bool, HuntError> {
        let archive = self
            .archives
            .get_mut(id.index())
            .ok_or(HuntError::UnknownArchive { index: id.index() })?;
        if archive.state == target {
            return Ok(false);
        }

        let from = archive.path();
        let to = target.path_for(&archive.base);
        if !from.exists() {
            if to.exists() {
                debug!(
                    target: ARCHIVE_TARGET,
                    archive = %to.display(),
                    state = %target,
                    "archive already in target state"
                );
                archive.state = target;
                archive.stale_copy = false;
                return Ok(false);
            }
            return Err(HuntError::ArchiveState {
                path: from,
                state: archive.state,
            });
        }
        let replaces_stale = archive.stale_copy && target == ToggleState::Disabled;
        if to.exists() && !replaces_stale {
            return Err(HuntError::ToggleConflict { from, to });
        }

        fs::rename(&from, &to).map_err(|source| HuntError::Toggle {
            path: from.clone(),
            source: Arc::new(source),
        })?;
        archive.state = target;
        archive.stale_copy = false;
        debug!(
            target: ARCHIVE_TARGET,
            archive = %archive.base.display(),
            state = %target,
            replaced_stale_copy = replaces_stale,
            "toggled archive"
        );
        Ok(true)
    }
}
