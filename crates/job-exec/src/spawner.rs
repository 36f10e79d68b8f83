use async_trait::async_trait;
use system_utils::process::{spawn_captured, CapturedOutput, Invocation, SpawnOptions};

/// Runs one invocation to completion and captures its output.
#[async_trait]
pub trait Spawner: Send + Sync {
    async fn spawn(
        &self,
        invocation: &Invocation,
        options: &SpawnOptions,
    ) -> anyhow::Result<CapturedOutput>;
}

/// Spawns real operating-system processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessSpawner;

#[async_trait]
impl Spawner for ProcessSpawner {
    async fn spawn(
        &self,
        invocation: &Invocation,
        options: &SpawnOptions,
    ) -> anyhow::Result<CapturedOutput> {
        spawn_captured(invocation, options).await
    }
}
