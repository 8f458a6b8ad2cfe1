// src/sys/systemd.rs

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::Result;
use crate::sys::exec;
use crate::sys::traits::ServiceManager;

pub struct LinuxSystemdManager;

impl LinuxSystemdManager {
    async fn systemctl(&self, args: &[&str]) -> Result<()> {
        let mut cmd = Command::new("systemctl");
        cmd.args(args);
        exec::run(cmd).await?;
        Ok(())
    }
}

#[async_trait]
impl ServiceManager for LinuxSystemdManager {
    async fn start(&self, service: &str) -> Result<()> {
        info!("Starting {}", service);
        self.systemctl(&["start", service]).await
    }

    async fn stop(&self, service: &str) -> Result<()> {
        info!("Stopping {}", service);
        self.systemctl(&["stop", service]).await
    }

    async fn restart(&self, service: &str) -> Result<()> {
        info!("Restarting {}", service);
        self.systemctl(&["restart", service]).await
    }

    async fn set_environment(&self, key: &str, value: &str) -> Result<()> {
        self.systemctl(&["set-environment", &format!("{key}={value}")]).await
    }

    async fn unset_environment(&self, key: &str) -> Result<()> {
        self.systemctl(&["unset-environment", key]).await
    }
}
