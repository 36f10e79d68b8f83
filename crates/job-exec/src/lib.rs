//! Decides whether a job command or file copy runs locally, over SSH, or
//! through a shared mount, and provisions unique per-job working directories.

pub mod paths;
pub mod profile;
pub mod resolver;
pub mod spawner;
pub mod uid;
pub mod workdir;
#[cfg(test)]
mod test_utils;

pub use profile::ServerProfile;
pub use resolver::{CopySide, Plan, Platform, ResolveError, Resolver, Strategy};
pub use spawner::{ProcessSpawner, Spawner};
pub use workdir::{create_job_work_dir, JobWorkDir};
