//! Mapping missing plugin identifiers to archives in the store.

use tracing::debug;

use crate::archive::{ArchiveId, ArchiveStore};
use crate::metadata::PluginIdSource;

/// Tracing target for dependency resolution.
const RESOLVER_TARGET: &str = "modhunt::resolver";

/// Result of resolving a batch of missing identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Archives providing at least one of the identifiers, without
    /// duplicates, in the order their identifiers were requested.
    pub resolved: Vec<ArchiveId>,
    /// Identifiers no archive provides.
    pub unresolved: Vec<String>,
}

impl Resolution {
    /// Returns `true` when every identifier found a provider.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Finds the archives providing missing plugins.
///
/// Plugin identifiers are read through a [`PluginIdSource`] and cached on
/// each archive, so repeated lookups in one run open every archive at most
/// once.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a, S: ?Sized> {
    source: &'a S,
}

impl<'a, S> DependencyResolver<'a, S>
where
    S: PluginIdSource + ?Sized,
{
    /// Creates a resolver reading identifiers through `source`.
    #[must_use]
    pub const fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Returns the first archive, enabled or disabled, whose plugin
    /// identifier equals `plugin_id`.
    ///
    /// Archives whose identifier cannot be read are skipped.
    #[must_use]
    pub fn resolve(&self, store: &ArchiveStore, plugin_id: &str) -> Option<ArchiveId> {
        let found = store
            .iter()
            .find(|(_, archive)| archive.plugin_id(self.source) == Some(plugin_id))
            .map(|(id, _)| id);
        debug!(
            target: RESOLVER_TARGET,
            plugin_id,
            archive = ?found,
            "resolved dependency"
        );
        found
    }

    /// Resolves every identifier in `plugin_ids`, never returning
    /// `candidate` and never listing an archive twice.
    ///
    /// An identifier provided only by the candidate itself counts as
    /// unresolved: enabling it again would not change the next run.
    #[must_use]
    pub fn resolve_all(
        &self,
        store: &ArchiveStore,
        candidate: ArchiveId,
        plugin_ids: &[String],
    ) -> Resolution {
        let mut resolution = Resolution::default();
        for plugin_id in plugin_ids {
            match self.resolve(store, plugin_id) {
                Some(id) if id == candidate => resolution.unresolved.push(plugin_id.clone()),
                Some(id) => {
                    if !resolution.resolved.contains(&id) {
                        resolution.resolved.push(id);
                    }
                }
                None => resolution.unresolved.push(plugin_id.clone()),
            }
        }
        resolution
    }
}

#[cfg(test)]
mod tests;
