//! Subprocess-backed [`SupervisedProcess`]

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{LaunchSpec, SupervisedProcess, SupervisorError};
use crate::routing::Provider;

/// A provider program spawned by the router
///
/// The child is killed when the handle is dropped, so a router crash never
/// leaves an orphaned provider holding its port.
pub struct LocalProcess {
    provider: Provider,
    child: Mutex<Option<Child>>,
}

impl LocalProcess {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            child: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SupervisedProcess for LocalProcess {
    async fn is_running(&self) -> bool {
        let mut child = self.child.lock().await;
        let Some(running) = child.as_mut() else {
            return false;
        };

        match running.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!(provider = %self.provider, status = %status, "Supervised provider exited");
                *child = None;
                false
            }
            Err(e) => {
                warn!(provider = %self.provider, error = %e, "Failed to poll supervised provider");
                false
            }
        }
    }

    async fn start(&self, launch: &LaunchSpec) -> Result<(), SupervisorError> {
        let mut child = self.child.lock().await;
        if let Some(running) = child.as_mut() {
            if matches!(running.try_wait(), Ok(None)) {
                debug!(provider = %self.provider, "Supervised provider already running");
                return Ok(());
            }
        }

        let spawned = Command::new(&launch.binary)
            .args(&launch.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                provider: self.provider,
                source,
            })?;

        info!(
            provider = %self.provider,
            pid = ?spawned.id(),
            binary = %launch.binary.display(),
            port = launch.port,
            "Spawned supervised provider"
        );
        *child = Some(spawned);
        Ok(())
    }

    async fn stop(&self) -> Result<(), SupervisorError> {
        let Some(mut running) = self.child.lock().await.take() else {
            return Ok(());
        };

        if matches!(running.try_wait(), Ok(Some(_))) {
            return Ok(());
        }

        running.kill().await.map_err(|source| SupervisorError::Stop {
            provider: self.provider,
            source,
        })?;
        info!(provider = %self.provider, "Stopped supervised provider");
        Ok(())
    }
}
