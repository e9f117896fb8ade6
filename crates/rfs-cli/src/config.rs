//! Configuration loading for the CLI.
//!
//! Leading configuration flags are split off and handed to `ortho_config`;
//! everything from the first other token on is parsed by `clap`.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use rfs_config::Config;

use crate::errors::AppError;

/// Flags that configure the client rather than select an operation.
///
/// Keep in sync with the fields of [`rfs_config::Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--server-path",
    "--server-threads",
    "--persistence",
    "--refresh-interval-secs",
    "--host",
    "--request-timeout-ms",
    "--instrumented",
    "--log-filter",
    "--log-format",
];

/// Configuration flags that take no value.
const SWITCH_FLAGS: &[&str] = &["--persistence", "--instrumented"];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the program name plus configuration flags.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Loads configuration through `ortho_config`'s layered sources.
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

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let mut parts = text.splitn(2, '=');
    let flag = parts.next().unwrap_or_default();
    let inline_value = parts.next().is_some();
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value && !SWITCH_FLAGS.contains(&flag),
        }
    } else {
        FlagAction::Stop
    }
}

/// Configuration arguments (with the program name first) and the index of
/// the first command token.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut pending_value = false;
    let mut command_start = 1;
    for argument in args.iter().skip(1) {
        if pending_value {
            pending_value = false;
        } else {
            match classify(argument) {
                FlagAction::Include { needs_value } => pending_value = needs_value,
                FlagAction::Stop => break,
            }
        }
        config_arguments.push(argument.clone());
        command_start += 1;
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start,
    }
}

/// The program name followed by the command tokens.
pub(crate) fn command_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::inline_value("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case::separate_value("--host", FlagAction::Include { needs_value: true })]
    #[case::switch("--instrumented", FlagAction::Include { needs_value: false })]
    #[case::command("ls", FlagAction::Stop)]
    #[case::command_flag("--recursive", FlagAction::Stop)]
    fn classifies_arguments(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[rstest]
    fn loads_command_line_configuration() {
        let config = OrthoConfigLoader
            .load(&os_args(&["rfs", "--host", "build01", "--server-threads", "2"]))
            .expect("configuration should load");
        assert_eq!(config.host(), "build01");
        assert_eq!(config.server_threads(), 2);
    }

    #[rstest]
    fn splits_configuration_from_command() {
        let args = os_args(&[
            "rfs",
            "--host",
            "build01",
            "--instrumented",
            "--log-format=json",
            "ls",
            "--host",
            "/tmp",
        ]);
        let split = split_config_arguments(&args);
        assert_eq!(
            split.config_arguments,
            os_args(&["rfs", "--host", "build01", "--instrumented", "--log-format=json"])
        );
        assert_eq!(
            command_arguments(&args, &split),
            os_args(&["rfs", "ls", "--host", "/tmp"])
        );
    }

    #[rstest]
    fn handles_empty_arguments() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(command_arguments(&[], &split).is_empty());
    }
}
