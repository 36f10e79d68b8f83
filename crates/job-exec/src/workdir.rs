use std::path::{Path, PathBuf};

use protocol::ExecutionRequest;
use system_utils::process::DEFAULT_COMMAND_INTERPRETER;
use tracing::info;

use crate::paths::normalize;
use crate::profile::ServerProfile;
use crate::resolver::{Platform, Resolver};
use crate::spawner::Spawner;
use crate::uid::new_id;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobWorkDir {
    pub name: String,
    /// `working_dir/<name>`, as the remote host sees it.
    pub remote: PathBuf,
    /// `shared_dir/<name>` when the profile shares a mount.
    pub mounted: Option<PathBuf>,
}

/// Creates a uniquely named job directory, on the mount when one is shared
/// and through the resolver otherwise. Creation is "create if absent".
pub async fn create_job_work_dir<S: Spawner>(
    resolver: &Resolver<S>,
    profile: &ServerProfile,
    seed: Option<&str>,
) -> anyhow::Result<JobWorkDir> {
    let name = new_id(seed);
    let remote = normalize(profile.working_dir.join(&name));
    let mounted = profile
        .use_shared_dir
        .then(|| normalize(profile.shared_dir.join(&name)));
    let target = mounted.as_deref().unwrap_or(remote.as_path());

    info!(
        event = "workdir.create",
        server = %profile.name,
        dir = %target.display(),
        "creating job working directory"
    );
    let request = mkdir_request(resolver.platform(), profile, target);
    let result = resolver.execute(&request, profile).await;
    if !result.stderr.is_empty() {
        anyhow::bail!(result.stderr);
    }
    if let Some(error) = result.error {
        anyhow::bail!(error);
    }
    Ok(JobWorkDir {
        name,
        remote,
        mounted,
    })
}

fn mkdir_request(platform: Platform, profile: &ServerProfile, dir: &Path) -> ExecutionRequest {
    let dir = dir.to_string_lossy();
    let request = match platform {
        Platform::Windows => {
            let interpreter = std::env::var("ComSpec")
                .unwrap_or_else(|_| DEFAULT_COMMAND_INTERPRETER.to_string());
            let dir = format!("\"{dir}\"");
            let test = format!("IF NOT EXIST {dir} {interpreter} /c mkdir {dir}");
            ExecutionRequest::shell([interpreter, "/c".to_string(), test])
        }
        Platform::Posix => {
            let dir = shell_words::quote(&dir);
            let mode = profile
                .permissions
                .as_deref()
                .map(|mode| format!("-m {} ", shell_words::quote(mode)))
                .unwrap_or_default();
            ExecutionRequest::shell([format!("[ -d {dir} ] || mkdir {mode}{dir}")])
        }
    };
    request.with_force_local(profile.use_shared_dir)
}
