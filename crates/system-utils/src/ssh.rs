use anyhow::Context;

/// OpenSSH prints this once per new host on first connection. It is
/// informational and the only stderr text treated as transient.
pub const HOST_KEY_ADDED_WARNING: &str = "Warning: Permanently added";

pub fn is_host_key_added_warning(stderr: &str) -> bool {
    stderr.contains(HOST_KEY_ADDED_WARNING)
}

pub fn ssh_address(username: &str, server_name: &str) -> String {
    format!("{username}@{server_name}")
}

/// `user@host:path`, the scp form of a remote path.
pub fn remote_spec(address: &str, path: &str) -> String {
    format!("{address}:{path}")
}

/// Splits a flag line such as `-o StrictHostKeyChecking=no` into words.
pub fn split_ssh_options(line: &str) -> anyhow::Result<Vec<String>> {
    let words = shell_words::split(line)
        .with_context(|| format!("invalid ssh options: {line}"))?;
    Ok(words.into_iter().filter(|word| !word.is_empty()).collect())
}
