//! Plugin identifier extraction from archive manifests.
//!
//! Mod archives are zip containers carrying a manifest under `META-INF/`:
//! a TOML `mods.toml` (Forge and NeoForge) or a JSON `mod.json`. Both declare
//! the plugin identifier under a `modId` key, either at the top level or on
//! the first entry of a `mods` list. Failing to find one is common and never
//! fatal: the archive's identifier is simply unknown.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use zip::ZipArchive;

use crate::error::MetadataError;

/// Tracing target for manifest reads.
const METADATA_TARGET: &str = "modhunt::metadata";

/// Directory prefix shared by manifest entries.
const MANIFEST_DIR: &str = "META-INF/";

/// Key holding the plugin identifier in either manifest format.
const MOD_ID_KEY: &str = "modId";

/// Key holding the list of plugins declared by a multi-plugin manifest.
const MODS_KEY: &str = "mods";

/// Lookup from an archive path to the plugin identifier it provides.
///
/// The production implementation is [`JarManifestReader`]. Tests substitute
/// fixed mappings.
#[cfg_attr(test, mockall::automock)]
pub trait PluginIdSource {
    /// Returns the plugin identifier declared by the archive, or `None` when
    /// it cannot be determined.
    fn plugin_id(&self, archive: &Path) -> Option<String>;
}

impl<T> PluginIdSource for &T
where
    T: PluginIdSource + ?Sized,
{
    fn plugin_id(&self, archive: &Path) -> Option<String> {
        (**self).plugin_id(archive)
    }
}

/// Manifest encodings understood by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `META-INF/*mods.toml`.
    Toml,
    /// `META-INF/*mod.json`.
    Json,
}

impl ManifestFormat {
    /// Detects the manifest format of a zip entry name.
    ///
    /// # Example
    ///
    /// ```
    /// use modhunt_core::metadata::ManifestFormat;
    ///
    /// assert_eq!(
    ///     ManifestFormat::from_entry("META-INF/neoforge.mods.toml"),
    ///     Some(ManifestFormat::Toml),
    /// );
    /// assert_eq!(ManifestFormat::from_entry("META-INF/MANIFEST.MF"), None);
    /// ```
    #[must_use]
    pub fn from_entry(name: &str) -> Option<Self> {
        if !name.starts_with(MANIFEST_DIR) {
            return None;
        }
        if name.ends_with("mods.toml") {
            Some(Self::Toml)
        } else if name.ends_with("mod.json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// Reads plugin identifiers from zip-packaged mod archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct JarManifestReader;

impl JarManifestReader {
    /// Creates a reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Reads the plugin identifier, surfacing why it could not be read.
    ///
    /// Returns `Ok(None)` when the archive has no manifest or the manifest
    /// declares no identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] when the archive cannot be opened or the
    /// manifest cannot be parsed.
    pub fn read(&self, archive: &Path) -> Result<Option<String>, MetadataError> {
        let file = File::open(archive).map_err(|source| MetadataError::Open {
            path: archive.to_path_buf(),
            source: Arc::new(source),
        })?;
        let container_error = |source: zip::result::ZipError| MetadataError::Container {
            path: archive.to_path_buf(),
            source: Arc::new(source),
        };
        let mut container = ZipArchive::new(file).map_err(container_error)?;

        let Some((entry_name, format)) = container.file_names().find_map(|name| {
            ManifestFormat::from_entry(name).map(|format| (name.to_owned(), format))
        }) else {
            return Ok(None);
        };

        let mut bytes = Vec::new();
        container
            .by_name(&entry_name)
            .map_err(container_error)?
            .read_to_end(&mut bytes)
            .map_err(|source| MetadataError::Entry {
                path: archive.to_path_buf(),
                entry: entry_name.clone(),
                source: Arc::new(source),
            })?;
        let text = String::from_utf8_lossy(&bytes);

        match format {
            ManifestFormat::Toml => {
                plugin_id_from_toml(&text).map_err(|source| MetadataError::Toml {
                    path: archive.to_path_buf(),
                    entry: entry_name,
                    source: Box::new(source),
                })
            }
            ManifestFormat::Json => {
                plugin_id_from_json(&text).map_err(|source| MetadataError::Json {
                    path: archive.to_path_buf(),
                    entry: entry_name,
                    source,
                })
            }
        }
    }
}

impl PluginIdSource for JarManifestReader {
    fn plugin_id(&self, archive: &Path) -> Option<String> {
        match self.read(archive) {
            Ok(id) => {
                debug!(
                    target: METADATA_TARGET,
                    archive = %archive.display(),
                    plugin_id = id.as_deref().unwrap_or("<none>"),
                    "read archive manifest"
                );
                id
            }
            Err(error) => {
                debug!(
                    target: METADATA_TARGET,
                    archive = %archive.display(),
                    %error,
                    "plugin id unavailable"
                );
                None
            }
        }
    }
}

/// Extracts the plugin identifier from a TOML manifest.
///
/// # Errors
///
/// Returns the parse error for malformed TOML.
pub fn plugin_id_from_toml(text: &str) -> Result<Option<String>, toml::de::Error> {
    let table: toml::Table = toml::from_str(text)?;
    let top_level = table.get(MOD_ID_KEY).and_then(toml::Value::as_str);
    let listed = || {
        table
            .get(MODS_KEY)
            .and_then(toml::Value::as_array)
            .into_iter()
            .flatten()
            .find_map(|entry| entry.get(MOD_ID_KEY).and_then(toml::Value::as_str))
    };
    Ok(top_level.or_else(listed).and_then(clean_id))
}

/// Extracts the plugin identifier from a JSON manifest.
///
/// # Errors
///
/// Returns the parse error for malformed JSON.
pub fn plugin_id_from_json(text: &str) -> Result<Option<String>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let top_level = value.get(MOD_ID_KEY).and_then(serde_json::Value::as_str);
    let listed = || {
        value
            .get(MODS_KEY)
            .and_then(serde_json::Value::as_array)
            .into_iter()
            .flatten()
            .find_map(|entry| entry.get(MOD_ID_KEY).and_then(serde_json::Value::as_str))
    };
    Ok(top_level.or_else(listed).and_then(clean_id))
}

/// Trims whitespace and stray quoting; empty identifiers count as absent.
fn clean_id(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches(['"', '\'']).trim();
    (!cleaned.is_empty()).then(|| cleaned.to_owned())
}

#[cfg(test)]
mod tests;
