//! Unit tests for manifest parsing and archive reading.

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::tests::{touch, write_jar};

const FORGE_MANIFEST: &str = r#"
modLoader = "javafml"
loaderVersion = "[47,)"
license = "MIT"

[[mods]]
modId = "examplemod"
version = "${file.jarVersion}"
displayName = "Example Mod"

[[dependencies.examplemod]]
modId = "forge"
mandatory = true
"#;

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

// ---------------------------------------------------------------------------
// Structured parsing
// ---------------------------------------------------------------------------

#[rstest]
fn toml_reads_first_listed_mod() {
    let id = plugin_id_from_toml(FORGE_MANIFEST).expect("parse");
    assert_eq!(id.as_deref(), Some("examplemod"));
}

#[rstest]
#[case("modId = \"toplevel\"\n", Some("toplevel"))]
#[case("modId = \"  'quoted'  \"\n", Some("quoted"))]
#[case("modId = \"   \"\n", None)]
#[case("license = \"MIT\"\n", None)]
#[case("[[mods]]\ndisplayName = \"x\"\n[[mods]]\nmodId = \"second\"\n", Some("second"))]
fn toml_cases(#[case] text: &str, #[case] expected: Option<&str>) {
    let id = plugin_id_from_toml(text).expect("parse");
    assert_eq!(id.as_deref(), expected);
}

#[rstest]
#[case(r#"{"modId": "fabricish"}"#, Some("fabricish"))]
#[case(r#"{"mods": [{"modId": " listed "}]}"#, Some("listed"))]
#[case(r#"{"id": "other"}"#, None)]
#[case(r#"{"modId": 7}"#, None)]
fn json_cases(#[case] text: &str, #[case] expected: Option<&str>) {
    let id = plugin_id_from_json(text).expect("parse");
    assert_eq!(id.as_deref(), expected);
}

#[rstest]
fn malformed_toml_is_an_error() {
    assert!(plugin_id_from_toml("modId = ").is_err());
}

#[rstest]
#[case("META-INF/mods.toml", Some(ManifestFormat::Toml))]
#[case("META-INF/neoforge.mods.toml", Some(ManifestFormat::Toml))]
#[case("META-INF/mod.json", Some(ManifestFormat::Json))]
#[case("mods.toml", None)]
#[case("META-INF/MANIFEST.MF", None)]
fn manifest_entry_detection(#[case] name: &str, #[case] expected: Option<ManifestFormat>) {
    assert_eq!(ManifestFormat::from_entry(name), expected);
}

// ---------------------------------------------------------------------------
// Archive reading
// ---------------------------------------------------------------------------

#[rstest]
fn reads_toml_manifest_from_jar(workdir: TempDir) {
    let jar = write_jar(
        workdir.path(),
        "example.jar",
        &[
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n"),
            ("META-INF/mods.toml", FORGE_MANIFEST),
        ],
    );
    assert_eq!(
        JarManifestReader::new().plugin_id(&jar).as_deref(),
        Some("examplemod")
    );
}

#[rstest]
fn reads_json_manifest_from_jar(workdir: TempDir) {
    let jar = write_jar(
        workdir.path(),
        "json.jar",
        &[("META-INF/mod.json", r#"{"modId": "jsonmod"}"#)],
    );
    assert_eq!(
        JarManifestReader::new().plugin_id(&jar).as_deref(),
        Some("jsonmod")
    );
}

#[rstest]
fn jar_without_manifest_has_no_id(workdir: TempDir) {
    let jar = write_jar(
        workdir.path(),
        "bare.jar",
        &[("com/example/Main.class", "cafebabe")],
    );
    let result = JarManifestReader::new().read(&jar).expect("read jar");
    assert_eq!(result, None);
}

#[rstest]
fn non_zip_file_is_a_container_error(workdir: TempDir) {
    touch(workdir.path(), "broken.jar");
    let path = workdir.path().join("broken.jar");
    let err = JarManifestReader::new()
        .read(&path)
        .expect_err("should fail");
    assert!(matches!(err, MetadataError::Container { .. }));
    assert_eq!(JarManifestReader::new().plugin_id(&path), None);
}

#[rstest]
fn missing_file_is_an_open_error(workdir: TempDir) {
    let err = JarManifestReader::new()
        .read(&workdir.path().join("absent.jar"))
        .expect_err("should fail");
    assert!(matches!(err, MetadataError::Open { .. }));
}

#[rstest]
fn malformed_manifest_reads_as_unknown(workdir: TempDir) {
    let jar = write_jar(
        workdir.path(),
        "garbled.jar",
        &[("META-INF/mods.toml", "[[mods]\nmodId = ")],
    );
    let err = JarManifestReader::new()
        .read(&jar)
        .expect_err("should fail");
    assert!(matches!(err, MetadataError::Toml { .. }));
    assert_eq!(JarManifestReader::new().plugin_id(&jar), None);
}
