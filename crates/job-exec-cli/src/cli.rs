use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jobexec",
    version,
    about = "Run job commands and copies locally, over SSH, or through a shared mount"
)]
pub(crate) struct Args {
    #[arg(long, default_value = "config/servers.toml")]
    pub(crate) config: PathBuf,
    /// Server profile name; defaults to `default_server` from the config.
    #[arg(long)]
    pub(crate) server: Option<String>,
    /// Overrides `timeout_ms` from the config.
    #[arg(long)]
    pub(crate) timeout_ms: Option<u64>,
    /// Also write JSON logs to a daily rolling file in this directory.
    #[arg(long)]
    pub(crate) log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run a command on the server (or locally with --local).
    Shell {
        #[arg(long)]
        local: bool,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
    /// Copy a file; the destination is local unless --local-source is set.
    Copy {
        #[arg(long)]
        local_source: bool,
        source: String,
        destination: String,
    },
    /// Create a unique job working directory.
    Mkjob {
        #[arg(long)]
        seed: Option<String>,
    },
    /// Print the mounted mirror of a remote path.
    Mounted { path: PathBuf },
    /// Print the remote path behind a mirror path.
    Original { path: PathBuf },
    /// Print a fresh identifier.
    Uid {
        #[arg(long)]
        seed: Option<String>,
    },
}
