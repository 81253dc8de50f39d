//! Configuration loading helpers for the `modhunt` CLI.
//!
//! Configuration flags must precede the command. The leading run of known
//! flags (and their values) is handed to `ortho_config`; everything after it
//! is parsed by `clap`.

use std::ffi::{OsStr, OsString};

use modhunt_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Kept in sync with the fields of [`Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--server-root",
    "--server-script",
    "--mods-dir",
    "--log-file",
    "--archive-extension",
    "--crash-signature",
    "--timeout-secs",
    "--settle-millis",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*text, false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments split between the configuration loader and `clap`.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    /// Program name followed by the configuration flags.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name followed by the command arguments.
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit::default();
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter();
    let mut command_arguments = vec![program.clone()];
    while let Some(argument) = remaining.next() {
        match classify_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                if needs_value {
                    config_arguments.extend(remaining.next().cloned());
                }
            }
            FlagAction::Stop => {
                command_arguments.push(argument.clone());
                command_arguments.extend(remaining.by_ref().cloned());
                break;
            }
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case("--timeout-secs", FlagAction::Include { needs_value: true })]
    #[case("hunt", FlagAction::Stop)]
    #[case("--output", FlagAction::Stop)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify_flag(OsStr::new(argument)), expected);
    }

    #[rstest]
    fn leading_config_flags_are_split_off() {
        let split = split_config_arguments(&os(&[
            "modhunt",
            "--server-root",
            "/srv/forge",
            "--timeout-secs=5",
            "--output",
            "json",
            "hunt",
        ]));
        assert_eq!(
            split.config_arguments,
            os(&["modhunt", "--server-root", "/srv/forge", "--timeout-secs=5"])
        );
        assert_eq!(
            split.command_arguments,
            os(&["modhunt", "--output", "json", "hunt"])
        );
    }

    #[rstest]
    fn config_flags_after_command_stay_with_command() {
        let split = split_config_arguments(&os(&["modhunt", "list", "--log-filter", "debug"]));
        assert_eq!(split.config_arguments, os(&["modhunt"]));
        assert_eq!(
            split.command_arguments,
            os(&["modhunt", "list", "--log-filter", "debug"])
        );
    }

    #[rstest]
    fn empty_arguments_split_to_nothing() {
        assert_eq!(split_config_arguments(&[]), ConfigArgumentSplit::default());
    }
}
