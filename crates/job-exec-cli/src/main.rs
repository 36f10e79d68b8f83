mod cli;
mod config;
mod logging;

use crate::cli::{Args, Command};
use crate::config::load_profiles_config;
use crate::logging::init_tracing;
use anyhow::Context;
use clap::Parser;
use job_exec::paths::{mounted_path, original_path};
use job_exec::uid::new_id;
use job_exec::{create_job_work_dir, Resolver, ServerProfile};
use protocol::{ExecutionRequest, ExecutionResult};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Serialize)]
struct WorkDirOutput {
    name: String,
    remote: String,
    mounted: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let _file_guard = init_tracing(args.log_dir.as_deref())?;
    run(args).await
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    match args.command {
        Command::Uid { seed } => {
            println!("{}", new_id(seed.as_deref()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Shell { local, argv } => {
            let (profile, resolver) = select_server(&args.config, args.server.as_deref(), args.timeout_ms)?;
            let request = ExecutionRequest::shell(argv).with_force_local(local);
            let result = resolver.execute(&request, &profile).await;
            print_result(&result)
        }
        Command::Copy {
            local_source,
            source,
            destination,
        } => {
            let (profile, resolver) = select_server(&args.config, args.server.as_deref(), args.timeout_ms)?;
            let request = ExecutionRequest::copy(source, destination).with_force_local(local_source);
            let result = resolver.execute(&request, &profile).await;
            print_result(&result)
        }
        Command::Mkjob { seed } => {
            let (profile, resolver) = select_server(&args.config, args.server.as_deref(), args.timeout_ms)?;
            let dir = create_job_work_dir(&resolver, &profile, seed.as_deref()).await?;
            let output = WorkDirOutput {
                name: dir.name,
                remote: dir.remote.display().to_string(),
                mounted: dir.mounted.map(|path| path.display().to_string()),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Mounted { path } => {
            let (profile, _) = select_server(&args.config, args.server.as_deref(), args.timeout_ms)?;
            match mounted_path(&profile, &path) {
                Some(mounted) => {
                    println!("{}", mounted.display());
                    Ok(ExitCode::SUCCESS)
                }
                None => anyhow::bail!("server {} has no mounted mirror", profile.name),
            }
        }
        Command::Original { path } => {
            let (profile, _) = select_server(&args.config, args.server.as_deref(), args.timeout_ms)?;
            println!("{}", original_path(&profile, &path).display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads the profiles file and builds the selected profile and a resolver
/// with the effective timeout.
fn select_server(
    config_path: &Path,
    server: Option<&str>,
    timeout_ms: Option<u64>,
) -> anyhow::Result<(ServerProfile, Resolver)> {
    let config = load_profiles_config(config_path)?;
    let selected = config.server(server).with_context(|| match server {
        Some(name) => format!("server {name} is not defined"),
        None => "no server selected".to_string(),
    })?;
    let profile = ServerProfile::from_config(selected)?;
    tracing::debug!(
        event = "config.loaded",
        server = %profile.name,
        method = ?profile.method,
        shared = profile.use_shared_dir,
        "server profile selected"
    );
    let mut resolver = Resolver::new();
    if let Some(timeout_ms) = timeout_ms.or(config.timeout_ms) {
        resolver = resolver.with_timeout(Duration::from_millis(timeout_ms));
    }
    Ok((profile, resolver))
}

fn print_result(result: &ExecutionResult) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
