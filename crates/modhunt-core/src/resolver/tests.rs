//! Unit tests for dependency resolution.

use std::path::Path;

use mockall::predicate::always;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::metadata::MockPluginIdSource;
use crate::tests::touch;

/// Three archives: `a.jar` provides `alpha`, `b.jar.disabled` provides
/// `beta`, and `c.jar.disabled` has no readable identifier.
#[fixture]
fn store_dir() -> TempDir {
    let dir = TempDir::new().expect("create dir");
    touch(dir.path(), "a.jar");
    touch(dir.path(), "b.jar.disabled");
    touch(dir.path(), "c.jar.disabled");
    dir
}

fn id_for(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    match name.trim_end_matches(".disabled") {
        "a.jar" => Some(String::from("alpha")),
        "b.jar" => Some(String::from("beta")),
        _ => None,
    }
}

fn source(calls: usize) -> MockPluginIdSource {
    let mut source = MockPluginIdSource::new();
    source
        .expect_plugin_id()
        .with(always())
        .times(calls)
        .returning(id_for);
    source
}

#[rstest]
fn resolves_disabled_archive(store_dir: TempDir) {
    let store = ArchiveStore::open(store_dir.path(), "jar").expect("open store");
    let source = source(2);
    let resolver = DependencyResolver::new(&source);
    assert_eq!(resolver.resolve(&store, "beta"), Some(ArchiveId::new(1)));
}

#[rstest]
fn unknown_id_reads_every_archive_once(store_dir: TempDir) {
    let store = ArchiveStore::open(store_dir.path(), "jar").expect("open store");
    let source = source(3);
    let resolver = DependencyResolver::new(&source);
    assert_eq!(resolver.resolve(&store, "gamma"), None);
    assert_eq!(resolver.resolve(&store, "delta"), None);
    assert_eq!(store.archives()[2].cached_plugin_id(), None);
    assert_eq!(store.archives()[0].cached_plugin_id(), Some("alpha"));
}

#[rstest]
fn identifiers_must_match_exactly(store_dir: TempDir) {
    let store = ArchiveStore::open(store_dir.path(), "jar").expect("open store");
    let source = source(3);
    let resolver = DependencyResolver::new(&source);
    assert_eq!(resolver.resolve(&store, "Alpha"), None);
}

#[rstest]
fn batch_excludes_candidate_and_duplicates(store_dir: TempDir) {
    let store = ArchiveStore::open(store_dir.path(), "jar").expect("open store");
    let source = source(3);
    let resolver = DependencyResolver::new(&source);
    let ids = vec![
        String::from("beta"),
        String::from("alpha"),
        String::from("beta"),
        String::from("gamma"),
    ];
    let resolution = resolver.resolve_all(&store, ArchiveId::new(0), &ids);
    assert_eq!(resolution.resolved, vec![ArchiveId::new(1)]);
    assert_eq!(
        resolution.unresolved,
        vec![String::from("alpha"), String::from("gamma")]
    );
    assert!(!resolution.is_complete());
}

#[rstest]
fn complete_batch(store_dir: TempDir) {
    let store = ArchiveStore::open(store_dir.path(), "jar").expect("open store");
    let source = source(2);
    let resolver = DependencyResolver::new(&source);
    let resolution = resolver.resolve_all(&store, ArchiveId::new(2), &[String::from("beta")]);
    assert_eq!(resolution.resolved, vec![ArchiveId::new(1)]);
    assert!(resolution.is_complete());
}
