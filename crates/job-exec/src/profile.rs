use std::path::PathBuf;

use anyhow::Context;
use protocol::config::{
    ExecMethod, NumericId, ServerConfig, SshOptions, DEFAULT_LOCAL_COPY, DEFAULT_LOCAL_SHELL,
    DEFAULT_SCP_EXEC, DEFAULT_SSH_EXEC,
};
use system_utils::process::ProcessIdentity;
use system_utils::ssh::{split_ssh_options, ssh_address};

/// A validated, immutable server profile.
///
/// Built from a [`ServerConfig`] with defaults filled in. The uid and gid are
/// parsed here but an unparsable value is kept as `None` rather than
/// rejected: only calls that need a process identity fail on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerProfile {
    pub name: String,
    pub method: ExecMethod,
    pub ssh_exec: String,
    pub scp_exec: String,
    pub local_shell: String,
    pub local_copy: String,
    pub default_ssh_options: Vec<String>,
    pub username: String,
    pub server_name: String,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub secret_key_path: String,
    pub use_shared_dir: bool,
    /// Local mount root mirroring `working_dir`.
    pub shared_dir: PathBuf,
    /// Root of job directories as the remote host sees it.
    pub working_dir: PathBuf,
    pub permissions: Option<String>,
}

impl ServerProfile {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let default_ssh_options = match config.default_opts.as_ref() {
            Some(SshOptions::Line(line)) => split_ssh_options(line)
                .with_context(|| format!("server {} has invalid default_opts", config.name))?,
            Some(SshOptions::List(list)) => list
                .iter()
                .filter(|option| !option.is_empty())
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(Self {
            name: config.name.clone(),
            method: config.method,
            ssh_exec: or_default(config.ssh_exec.as_deref(), DEFAULT_SSH_EXEC),
            scp_exec: or_default(config.scp_exec.as_deref(), DEFAULT_SCP_EXEC),
            local_shell: or_default(config.local_shell.as_deref(), DEFAULT_LOCAL_SHELL),
            local_copy: or_default(config.local_copy.as_deref(), DEFAULT_LOCAL_COPY),
            default_ssh_options,
            username: config.username.clone().unwrap_or_default(),
            server_name: config.server_name.clone().unwrap_or_default(),
            uid: config.uid.as_ref().and_then(NumericId::parse),
            gid: config.gid.as_ref().and_then(NumericId::parse),
            secret_key_path: config.secret_access_key.clone().unwrap_or_default(),
            use_shared_dir: config.use_shared_dir,
            shared_dir: config
                .shared_dir
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_default(),
            working_dir: PathBuf::from(&config.working_dir),
            permissions: config
                .permissions
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        })
    }

    pub fn ssh_address(&self) -> String {
        ssh_address(&self.username, &self.server_name)
    }

    /// Both ids, or `None` if either is missing or invalid.
    pub fn identity(&self) -> Option<ProcessIdentity> {
        Some(ProcessIdentity {
            uid: self.uid?,
            gid: self.gid?,
        })
    }
}

fn or_default(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}
