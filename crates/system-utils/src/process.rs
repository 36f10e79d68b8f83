use std::process::{ExitStatus, Stdio};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_COMMAND_INTERPRETER: &str = "cmd.exe";

/// How the program line reaches the operating system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationShell {
    /// `<shell> -c "<program> <args…>"`.
    Posix(String),
    /// `%ComSpec% /d /s /c "<program> <args…>"`.
    CommandInterpreter,
}

/// A fully resolved process invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub shell: Option<InvocationShell>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            shell: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_shell(mut self, shell: Option<InvocationShell>) -> Self {
        self.shell = shell;
        self
    }

    /// Program and arguments joined by single spaces, as a shell sees them.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnOptions {
    pub timeout: Duration,
    /// Ignored on platforms without POSIX process identity.
    pub identity: Option<ProcessIdentity>,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SPAWN_TIMEOUT,
            identity: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub async fn spawn_captured(
    invocation: &Invocation,
    options: &SpawnOptions,
) -> anyhow::Result<CapturedOutput> {
    if invocation.program.trim().is_empty() {
        anyhow::bail!("empty command");
    }
    let mut cmd = build_command(invocation);
    apply_identity(&mut cmd, options.identity);
    let (status, stdout, stderr) =
        run_command_with_timeout(&mut cmd, options.timeout, &invocation.program).await?;
    Ok(CapturedOutput {
        status: status.code(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

fn build_command(invocation: &Invocation) -> Command {
    match &invocation.shell {
        Some(InvocationShell::Posix(shell)) => {
            let mut cmd = Command::new(shell);
            cmd.arg("-c").arg(invocation.command_line());
            cmd
        }
        Some(InvocationShell::CommandInterpreter) => {
            let interpreter = std::env::var("ComSpec")
                .unwrap_or_else(|_| DEFAULT_COMMAND_INTERPRETER.to_string());
            let mut cmd = Command::new(interpreter);
            cmd.arg("/d").arg("/s").arg("/c");
            #[cfg(windows)]
            cmd.raw_arg(format!("\"{}\"", invocation.command_line()));
            #[cfg(not(windows))]
            cmd.arg(invocation.command_line());
            cmd
        }
        None => {
            let mut cmd = Command::new(&invocation.program);
            cmd.args(&invocation.args);
            cmd
        }
    }
}

#[cfg(unix)]
fn apply_identity(cmd: &mut Command, identity: Option<ProcessIdentity>) {
    if let Some(identity) = identity {
        cmd.uid(identity.uid);
        cmd.gid(identity.gid);
    }
}

#[cfg(not(unix))]
fn apply_identity(_cmd: &mut Command, _identity: Option<ProcessIdentity>) {}

/// Runs `cmd` to completion with piped output, killing it once
/// `command_timeout` elapses.
pub async fn run_command_with_timeout(
    cmd: &mut Command,
    command_timeout: Duration,
    label: &str,
) -> anyhow::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {label}"))?;
    let stdout_task = tokio::spawn(read_all(child.stdout.take()));
    let stderr_task = tokio::spawn(read_all(child.stderr.take()));
    let status = match timeout(command_timeout, child.wait()).await {
        Ok(result) => result.with_context(|| format!("{label} failed"))?,
        Err(_) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            anyhow::bail!(
                "{label} timed out after {}ms",
                command_timeout.as_millis()
            )
        }
    };
    let stdout = stdout_task.await.context("stdout task join")?;
    let stderr = stderr_task.await.context("stderr task join")?;
    Ok((status, stdout, stderr))
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_with_spaces() {
        let invocation = Invocation::new("/bin/cp").with_args(["\"a b\"", "\"c\""]);
        assert_eq!(invocation.command_line(), "/bin/cp \"a b\" \"c\"");
        assert_eq!(Invocation::new("ls").command_line(), "ls");
    }

    #[tokio::test]
    async fn empty_program_fails_before_spawn() {
        let err = spawn_captured(&Invocation::new(""), &SpawnOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let invocation = Invocation::new("/definitely/not/a/real/binary");
        assert!(spawn_captured(&invocation, &SpawnOptions::default())
            .await
            .is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn posix_shell_runs_joined_line() {
        let invocation = Invocation::new("echo")
            .with_args(["hello", "world", "1>&2"])
            .with_shell(Some(InvocationShell::Posix("/bin/sh".to_string())));
        let output = spawn_captured(&invocation, &SpawnOptions::default())
            .await
            .expect("spawn");
        assert_eq!(output.status, Some(0));
        assert_eq!(output.stdout, "");
        assert_eq!(output.stderr.trim(), "hello world");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn direct_invocation_keeps_exit_status() {
        let invocation = Invocation::new("/bin/sh").with_args(["-c", "printf out; exit 3"]);
        let output = spawn_captured(&invocation, &SpawnOptions::default())
            .await
            .expect("spawn");
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout, "out");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let invocation = Invocation::new("/bin/sh").with_args(["-c", "sleep 5"]);
        let options = SpawnOptions {
            timeout: Duration::from_millis(100),
            identity: None,
        };
        let err = spawn_captured(&invocation, &options).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 100ms"));
    }
}
