use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use protocol::config::ExecMethod;
use system_utils::process::{CapturedOutput, Invocation, SpawnOptions};

use crate::profile::ServerProfile;
use crate::spawner::Spawner;

/// Records every invocation and answers from a queue of canned replies,
/// falling back to a silent success.
pub(crate) struct RecordingSpawner {
    calls: Mutex<Vec<(Invocation, SpawnOptions)>>,
    replies: Mutex<VecDeque<Result<CapturedOutput, String>>>,
}

impl RecordingSpawner {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn reply(self, output: CapturedOutput) -> Self {
        self.replies.lock().unwrap().push_back(Ok(output));
        self
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<(Invocation, SpawnOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Spawner for RecordingSpawner {
    async fn spawn(
        &self,
        invocation: &Invocation,
        options: &SpawnOptions,
    ) -> anyhow::Result<CapturedOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((invocation.clone(), options.clone()));
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(CapturedOutput {
                status: Some(0),
                ..CapturedOutput::default()
            }),
        }
    }
}

/// ssh profile without a shared mount; no uid/gid configured.
pub(crate) fn scp_profile() -> ServerProfile {
    ServerProfile {
        name: "pbs".to_string(),
        method: ExecMethod::Ssh,
        ssh_exec: "/usr/bin/ssh".to_string(),
        scp_exec: "/usr/bin/scp".to_string(),
        local_shell: "/bin/sh".to_string(),
        local_copy: "/bin/cp".to_string(),
        default_ssh_options: vec!["-o".to_string(), "StrictHostKeyChecking=no".to_string()],
        username: "user".to_string(),
        server_name: "pbsserver".to_string(),
        uid: None,
        gid: None,
        secret_key_path: "/home/user/.ssh/id_rsa".to_string(),
        use_shared_dir: false,
        shared_dir: PathBuf::new(),
        working_dir: PathBuf::from("/tmp"),
        permissions: None,
    }
}

/// ssh profile with `/tmp` on the host mounted at `/localMount`.
pub(crate) fn shared_profile() -> ServerProfile {
    ServerProfile {
        uid: Some(1000),
        gid: Some(1000),
        use_shared_dir: true,
        shared_dir: PathBuf::from("/localMount"),
        ..scp_profile()
    }
}

pub(crate) fn local_profile() -> ServerProfile {
    ServerProfile {
        name: "workstation".to_string(),
        method: ExecMethod::Local,
        uid: Some(1000),
        gid: Some(1000),
        working_dir: PathBuf::from("/data"),
        ..scp_profile()
    }
}

pub(crate) fn temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{prefix}-{nanos}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
