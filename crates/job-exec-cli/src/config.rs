use anyhow::Context;
use protocol::config::{ExecMethod, ProfilesConfig};
use std::collections::HashSet;
use std::path::Path;

fn validate_profiles_config(config: &ProfilesConfig) -> anyhow::Result<()> {
    if config.servers.is_empty() {
        anyhow::bail!("config must include at least one server");
    }
    let mut names = HashSet::new();
    for (index, server) in config.servers.iter().enumerate() {
        let name = server.name.trim();
        let label = if name.is_empty() {
            format!("server[{}]", index)
        } else {
            format!("server {}", name)
        };
        if name.is_empty() {
            anyhow::bail!("{} must set name", label);
        }
        if !names.insert(name) {
            anyhow::bail!("{} is defined more than once", label);
        }
        if server.working_dir.trim().is_empty() {
            anyhow::bail!("{} must set working_dir", label);
        }
        if server.method == ExecMethod::Ssh {
            for (field, value) in [
                ("username", &server.username),
                ("server_name", &server.server_name),
                ("secret_access_key", &server.secret_access_key),
            ] {
                if value.as_deref().unwrap_or("").trim().is_empty() {
                    anyhow::bail!("{} must set {} for ssh", label, field);
                }
            }
        }
        if server.use_shared_dir && server.shared_dir.as_deref().unwrap_or("").trim().is_empty() {
            anyhow::bail!("{} must set shared_dir when use_shared_dir is enabled", label);
        }
    }
    if let Some(default) = config.default_server.as_deref().map(str::trim) {
        if !config.servers.iter().any(|server| server.name.trim() == default) {
            anyhow::bail!("default_server {} is not defined", default);
        }
    }
    Ok(())
}

pub(crate) fn load_profiles_config(path: &Path) -> anyhow::Result<ProfilesConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: ProfilesConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    validate_profiles_config(&config)?;
    Ok(config)
}
