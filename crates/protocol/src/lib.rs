use serde::{Deserialize, Serialize};

pub mod config;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// `argv` is an executable followed by its arguments.
    Shell,
    /// `argv` is `[source, destination]`.
    Copy,
}

/// A logical command or file copy, before any execution strategy is chosen.
///
/// `force_local` depends on `kind`: for shell requests it runs the command on
/// the local machine whatever the profile method is; for copy requests it
/// marks `argv[0]` (the source) as the local side, otherwise the destination
/// is the local side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub kind: CommandKind,
    pub argv: Vec<String>,
    #[serde(default)]
    pub force_local: bool,
}

impl ExecutionRequest {
    pub fn shell<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: CommandKind::Shell,
            argv: argv.into_iter().map(Into::into).collect(),
            force_local: false,
        }
    }

    pub fn copy(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Copy,
            argv: vec![source.into(), destination.into()],
            force_local: false,
        }
    }

    pub fn with_force_local(mut self, force_local: bool) -> Self {
        self.force_local = force_local;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionResult {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Set whenever the call is considered failed.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
}

impl ExecutionResult {
    pub fn completed(
        status: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: None,
            status,
        }
    }

    /// The call never reached a process, or the spawn itself failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            error: Some(message.into()),
            status: None,
        }
    }

    /// Configuration problems are reported on stderr as well as in `error`.
    pub fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            stdout: String::new(),
            stderr: message.clone(),
            error: Some(message),
            status: None,
        }
    }

    /// Success without a spawned process.
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
