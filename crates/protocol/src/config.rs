use serde::{Deserialize, Serialize};

pub const DEFAULT_SSH_EXEC: &str = "/usr/bin/ssh";
pub const DEFAULT_SCP_EXEC: &str = "/usr/bin/scp";
pub const DEFAULT_LOCAL_SHELL: &str = "/bin/sh";
pub const DEFAULT_LOCAL_COPY: &str = "/bin/cp";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecMethod {
    #[default]
    Ssh,
    Local,
}

/// A uid or gid as written in a config file: `10000` and `"10000"` are both
/// accepted. Validity is only checked when a call needs the identity.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NumericId {
    Number(i64),
    Text(String),
}

impl NumericId {
    pub fn parse(&self) -> Option<u32> {
        match self {
            NumericId::Number(value) => u32::try_from(*value).ok(),
            NumericId::Text(value) => value.trim().parse::<u32>().ok(),
        }
    }
}

/// Extra SSH flags, either one command-line string or a list of flags.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SshOptions {
    Line(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    #[serde(default)]
    pub method: ExecMethod,
    pub ssh_exec: Option<String>,
    pub scp_exec: Option<String>,
    pub local_shell: Option<String>,
    pub local_copy: Option<String>,
    pub default_opts: Option<SshOptions>,
    pub username: Option<String>,
    pub server_name: Option<String>,
    pub uid: Option<NumericId>,
    pub gid: Option<NumericId>,
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub use_shared_dir: bool,
    pub shared_dir: Option<String>,
    pub working_dir: String,
    pub permissions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfilesConfig {
    pub default_server: Option<String>,
    pub timeout_ms: Option<u64>,
    pub servers: Vec<ServerConfig>,
}

impl ProfilesConfig {
    /// Looks up `name`, falling back to `default_server` and then to the
    /// first server in the file. Names compare with surrounding whitespace
    /// trimmed.
    pub fn server(&self, name: Option<&str>) -> Option<&ServerConfig> {
        match name.or(self.default_server.as_deref()) {
            Some(name) => {
                let name = name.trim();
                self.servers.iter().find(|server| server.name.trim() == name)
            }
            None => self.servers.first(),
        }
    }
}
