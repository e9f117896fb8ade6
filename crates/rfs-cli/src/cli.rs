//! Command-line argument definitions for `rfs`.

use clap::{Parser, Subcommand};

/// Queries a remote file system through the `fs_server` helper.
///
/// Configuration flags such as `--server-path` and `--host` must precede
/// the subcommand.
#[derive(Parser, Debug)]
#[command(name = "rfs", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The operation to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations offered by the helper.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Lists a directory.
    Ls {
        /// Lists every directory below the path as well.
        #[arg(short, long)]
        recursive: bool,
        /// Directory to list.
        path: String,
    },
    /// Shows one entry, following symbolic links.
    Stat {
        /// Path to inspect.
        path: String,
    },
    /// Shows one entry without following symbolic links.
    Lstat {
        /// Path to inspect.
        path: String,
    },
    /// Copies a file, link or directory tree.
    Cp {
        /// Source path.
        from: String,
        /// Destination path; must not exist.
        to: String,
    },
    /// Moves a plain file.
    Mv {
        /// Source path.
        from: String,
        /// Destination path.
        to: String,
    },
    /// Deletes a file or directory tree.
    Rm {
        /// Path to delete.
        path: String,
    },
    /// Prints the helper's version.
    Info,
    /// Runs a refresh cycle and prints the directories that changed.
    Refresh {
        /// Root of the refresh.
        #[arg(default_value = "/")]
        path: String,
    },
}
