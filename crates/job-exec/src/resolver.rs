//! Execution strategy resolution.
//!
//! A request goes through a linear pipeline: the required process identity
//! is checked, the request is classified into a [`Strategy`], the strategy is
//! translated into a [`Plan`] (a concrete invocation, or nothing to do), the
//! plan is spawned and the output is checked for the SSH first-connection
//! warning, which triggers exactly one retry.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use protocol::config::ExecMethod;
use protocol::{CommandKind, ExecutionRequest, ExecutionResult};
use system_utils::process::{
    Invocation, InvocationShell, ProcessIdentity, SpawnOptions, DEFAULT_SPAWN_TIMEOUT,
};
use system_utils::ssh::{is_host_key_added_warning, remote_spec};
use tracing::{debug, info, warn};

use crate::paths::{is_within, mounted_path, normalize, original_path};
use crate::profile::ServerProfile;
use crate::spawner::{ProcessSpawner, Spawner};

pub const INVALID_IDENTITY_MESSAGE: &str = "Please specify valid uid/gid";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    InvalidIdentity,
    EmptyCommand,
    CopyOperands(usize),
    NoMountedPath(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::InvalidIdentity => f.write_str(INVALID_IDENTITY_MESSAGE),
            ResolveError::EmptyCommand => f.write_str("empty command"),
            ResolveError::CopyOperands(count) => write!(
                f,
                "copy expects [source, destination], got {count} argument(s)"
            ),
            ResolveError::NoMountedPath(path) => write!(f, "no mounted path for {path}"),
        }
    }
}

impl std::error::Error for ResolveError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopySide {
    Source,
    Destination,
}

/// Where and how a request runs, before paths are translated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    LocalShell {
        program: String,
        args: Vec<String>,
    },
    RemoteShell {
        argv: Vec<String>,
    },
    LocalCopy {
        source: String,
        destination: String,
    },
    /// Copy through the shared mount; `remote` is the remote-addressed side.
    SharedCopy {
        source: String,
        destination: String,
        remote: CopySide,
    },
    Scp {
        source: String,
        destination: String,
        remote: CopySide,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    Spawn(Invocation),
    /// Shared-mount resolution collapsed a copy onto itself.
    Skip,
}

pub struct Resolver<S = ProcessSpawner> {
    spawner: S,
    platform: Platform,
    timeout: Duration,
}

impl Resolver<ProcessSpawner> {
    pub fn new() -> Self {
        Self::with_spawner(ProcessSpawner, Platform::current())
    }
}

impl Default for Resolver<ProcessSpawner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Spawner> Resolver<S> {
    pub fn with_spawner(spawner: S, platform: Platform) -> Self {
        Self {
            spawner,
            platform,
            timeout: DEFAULT_SPAWN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Runs `request` against `profile`. Failures are reported in the
    /// returned result, never as a panic or an `Err`.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        profile: &ServerProfile,
    ) -> ExecutionResult {
        let identity = match self.identity_for(request, profile) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(event = "exec.failed", server = %profile.name, error = %err, "rejected before spawn");
                return ExecutionResult::rejected(err.to_string());
            }
        };
        let plan = match self
            .classify(request, profile)
            .and_then(|strategy| self.plan(strategy, profile))
        {
            Ok(plan) => plan,
            Err(err) => {
                warn!(event = "exec.failed", server = %profile.name, error = %err, "unable to resolve request");
                return ExecutionResult::failed(err.to_string());
            }
        };
        match plan {
            Plan::Skip => {
                info!(event = "exec.copy.noop", server = %profile.name, "source and destination are the same file");
                ExecutionResult::skipped()
            }
            Plan::Spawn(invocation) => {
                let options = SpawnOptions {
                    timeout: self.timeout,
                    identity,
                };
                self.run(&invocation, &options).await
            }
        }
    }

    /// Identity is required off Windows whenever the profile runs locally,
    /// shares a mount, or the request is forced local.
    pub fn identity_for(
        &self,
        request: &ExecutionRequest,
        profile: &ServerProfile,
    ) -> Result<Option<ProcessIdentity>, ResolveError> {
        if self.platform == Platform::Windows {
            return Ok(None);
        }
        let required = profile.method == ExecMethod::Local
            || profile.use_shared_dir
            || request.force_local;
        if !required {
            return Ok(None);
        }
        profile.identity().map(Some).ok_or(ResolveError::InvalidIdentity)
    }

    pub fn classify(
        &self,
        request: &ExecutionRequest,
        profile: &ServerProfile,
    ) -> Result<Strategy, ResolveError> {
        let strategy = match request.kind {
            CommandKind::Shell => {
                let (program, args) = request
                    .argv
                    .split_first()
                    .ok_or(ResolveError::EmptyCommand)?;
                if profile.method == ExecMethod::Local || request.force_local {
                    Strategy::LocalShell {
                        program: program.clone(),
                        args: args.to_vec(),
                    }
                } else {
                    Strategy::RemoteShell {
                        argv: request.argv.clone(),
                    }
                }
            }
            CommandKind::Copy => {
                let [source, destination] = request.argv.as_slice() else {
                    return Err(ResolveError::CopyOperands(request.argv.len()));
                };
                let (source, destination) = (source.clone(), destination.clone());
                let remote = if request.force_local {
                    CopySide::Destination
                } else {
                    CopySide::Source
                };
                match profile.method {
                    ExecMethod::Local => Strategy::LocalCopy {
                        source,
                        destination,
                    },
                    ExecMethod::Ssh if profile.use_shared_dir => {
                        shared_copy_strategy(profile, source, destination, remote)
                    }
                    ExecMethod::Ssh => Strategy::Scp {
                        source,
                        destination,
                        remote,
                    },
                }
            }
        };
        debug!(event = "exec.resolve", server = %profile.name, strategy = ?strategy, "classified request");
        Ok(strategy)
    }

    pub fn plan(&self, strategy: Strategy, profile: &ServerProfile) -> Result<Plan, ResolveError> {
        let invocation = match strategy {
            Strategy::LocalShell { program, args } => {
                let shell = match self.platform {
                    Platform::Posix => Some(InvocationShell::Posix(profile.local_shell.clone())),
                    Platform::Windows => None,
                };
                Invocation::new(program).with_args(args).with_shell(shell)
            }
            Strategy::RemoteShell { argv } => Invocation::new(&profile.ssh_exec)
                .with_args([
                    profile.ssh_address(),
                    "-i".to_string(),
                    profile.secret_key_path.clone(),
                ])
                .with_args(profile.default_ssh_options.iter().cloned())
                .with_args(argv),
            Strategy::LocalCopy {
                source,
                destination,
            } => self.local_copy(profile, &source, &destination),
            Strategy::SharedCopy {
                source,
                destination,
                remote,
            } => {
                let (source, destination) = match remote {
                    CopySide::Source => (mirror_of(profile, &source)?, PathBuf::from(destination)),
                    CopySide::Destination => (PathBuf::from(source), mirror_of(profile, &destination)?),
                };
                if is_self_copy(&source, &destination) {
                    return Ok(Plan::Skip);
                }
                self.local_copy(
                    profile,
                    &source.to_string_lossy(),
                    &destination.to_string_lossy(),
                )
            }
            Strategy::Scp {
                source,
                destination,
                remote,
            } => {
                let address = profile.ssh_address();
                let (source, destination) = match remote {
                    CopySide::Source => (remote_spec(&address, &source), destination),
                    CopySide::Destination => (source, remote_spec(&address, &destination)),
                };
                Invocation::new(&profile.scp_exec)
                    .with_args(profile.default_ssh_options.iter().cloned())
                    .with_args([
                        "-i".to_string(),
                        profile.secret_key_path.clone(),
                        source,
                        destination,
                    ])
            }
        };
        Ok(Plan::Spawn(invocation))
    }

    fn local_copy(&self, profile: &ServerProfile, source: &str, destination: &str) -> Invocation {
        let shell = match self.platform {
            Platform::Posix => InvocationShell::Posix(profile.local_shell.clone()),
            Platform::Windows => InvocationShell::CommandInterpreter,
        };
        Invocation::new(&profile.local_copy)
            .with_args([quote(source), quote(destination)])
            .with_shell(Some(shell))
    }

    async fn run(&self, invocation: &Invocation, options: &SpawnOptions) -> ExecutionResult {
        debug!(event = "exec.spawn", program = %invocation.program, args = ?invocation.args, "spawning");
        let output = match self.spawner.spawn(invocation, options).await {
            Ok(output) => output,
            Err(err) => return spawn_failed(invocation, err),
        };
        if is_host_key_added_warning(&output.stderr) {
            info!(event = "exec.retry.host_key", program = %invocation.program, "new host key added, retrying once");
            return match self.spawner.spawn(invocation, options).await {
                Ok(retry) => ExecutionResult::completed(retry.status, retry.stdout, retry.stderr),
                Err(err) => spawn_failed(invocation, err),
            };
        }
        let mut result = ExecutionResult::completed(output.status, output.stdout, output.stderr);
        if !result.stderr.is_empty() {
            warn!(event = "exec.failed", program = %invocation.program, status = ?result.status, "command wrote to stderr");
            result.error = Some(result.stderr.clone());
        }
        result
    }
}

/// A shared-mount copy whose local side already sits on the mount is run as
/// a plain copy between canonical paths, dispatched like any shell request
/// (over SSH for an ssh profile).
fn shared_copy_strategy(
    profile: &ServerProfile,
    source: String,
    destination: String,
    remote: CopySide,
) -> Strategy {
    let local = match remote {
        CopySide::Source => &destination,
        CopySide::Destination => &source,
    };
    if !is_within(local, &profile.shared_dir) {
        return Strategy::SharedCopy {
            source,
            destination,
            remote,
        };
    }
    let canonical = original_path(profile, local).to_string_lossy().into_owned();
    let (source, destination) = match remote {
        CopySide::Source => (source, canonical),
        CopySide::Destination => (canonical, destination),
    };
    Strategy::RemoteShell {
        argv: vec![profile.local_copy.clone(), source, destination],
    }
}

fn mirror_of(profile: &ServerProfile, path: &str) -> Result<PathBuf, ResolveError> {
    mounted_path(profile, path).ok_or_else(|| ResolveError::NoMountedPath(path.to_string()))
}

/// True when copying `source` into `destination` would target `source`
/// itself, either named directly or as its parent directory.
fn is_self_copy(source: &Path, destination: &Path) -> bool {
    let source = normalize(source);
    let destination = normalize(destination);
    if source == destination {
        return true;
    }
    source
        .file_name()
        .is_some_and(|name| destination.join(name) == source)
}

fn quote(text: &str) -> String {
    format!("\"{text}\"")
}

fn spawn_failed(invocation: &Invocation, err: anyhow::Error) -> ExecutionResult {
    warn!(event = "exec.failed", program = %invocation.program, error = %err, "spawn failed");
    ExecutionResult::failed(format!("{err:#}"))
}
