//! Layering behaviour of the `ortho_config`-backed loader.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use modhunt_config::{Config, LogFormat};
use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const TIMEOUT_VAR: &str = "MODHUNT_TIMEOUT_SECS";

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` under edition 2024; callers hold
        // `ENV_MUTEX` for the lifetime of the override.
        unsafe { std::env::set_var(key, value) };
        Self { key, previous }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}

struct Harness {
    temp_dir: TempDir,
    _guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn write_config(&self, body: &str) -> OsString {
        let path = self.temp_dir.path().join("modhunt.toml");
        fs::write(&path, body).expect("write configuration");
        path.into_os_string()
    }
}

#[fixture]
fn harness() -> Harness {
    let guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Harness {
        temp_dir: TempDir::new().expect("create temp dir"),
        _guard: guard,
    }
}

fn args(extra: &[&OsStr]) -> Vec<OsString> {
    let mut all = vec![OsString::from("modhunt")];
    all.extend(extra.iter().map(|arg| arg.to_os_string()));
    all
}

#[rstest]
fn bare_invocation_uses_defaults(#[from(harness)] _harness: Harness) {
    let config = Config::load_from_iter(args(&[])).expect("load defaults");
    assert_eq!(config.timeout_secs(), 20);
    assert_eq!(config.server_script(), "start.sh");
    assert_eq!(config.log_format(), LogFormat::Auto);
}

#[rstest]
fn file_values_apply(harness: Harness) {
    let path = harness.write_config(
        "timeout_secs = 45\nserver_script = \"run.sh\"\nlog_format = \"json\"\n",
    );
    let config = Config::load_from_iter(args(&[OsStr::new("--config-path"), path.as_os_str()]))
        .expect("load file configuration");
    assert_eq!(config.timeout_secs(), 45);
    assert_eq!(config.server_script(), "run.sh");
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
fn environment_overrides_file(harness: Harness) {
    let path = harness.write_config("timeout_secs = 45\n");
    let _env = EnvOverride::set_var(TIMEOUT_VAR, OsStr::new("60"));
    let config = Config::load_from_iter(args(&[OsStr::new("--config-path"), path.as_os_str()]))
        .expect("load layered configuration");
    assert_eq!(config.timeout_secs(), 60);
}

#[rstest]
fn cli_overrides_environment(harness: Harness) {
    let path = harness.write_config("timeout_secs = 45\n");
    let _env = EnvOverride::set_var(TIMEOUT_VAR, OsStr::new("60"));
    let config = Config::load_from_iter(args(&[
        OsStr::new("--config-path"),
        path.as_os_str(),
        OsStr::new("--timeout-secs"),
        OsStr::new("90"),
    ]))
    .expect("load layered configuration");
    assert_eq!(config.timeout_secs(), 90);
}

#[rstest]
fn malformed_file_is_rejected(harness: Harness) {
    let path = harness.write_config("timeout_secs = \"soon\"\n");
    let error = Config::load_from_iter(args(&[OsStr::new("--config-path"), path.as_os_str()]))
        .expect_err("loading must fail");
    assert!(!error.to_string().is_empty());
}
