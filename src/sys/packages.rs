// src/sys/packages.rs

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{Result, ToolError};
use crate::sys::exec;
use crate::sys::traits::PackageManager;

/// Debian/Ubuntu implementation backed by `apt-get`, with `fuser` as the
/// lock probe.
pub struct AptPackageManager {
    lock_path: PathBuf,
}

impl AptPackageManager {
    pub fn new(lock_path: PathBuf) -> Self {
        Self { lock_path }
    }
}

#[async_trait]
impl PackageManager for AptPackageManager {
    async fn lock_held(&self) -> Result<bool> {
        let mut cmd = Command::new("fuser");
        cmd.arg(&self.lock_path);
        match exec::probe(cmd).await? {
            Some(held) => Ok(held),
            None => {
                warn!("fuser is not installed; assuming {} is free", self.lock_path.display());
                Ok(false)
            }
        }
    }

    async fn install(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut cmd = Command::new("apt-get");
        cmd.env("DEBIAN_FRONTEND", "noninteractive")
            .args(["install", "-y", "-q"])
            .args(packages);
        exec::run(cmd).await?;
        Ok(())
    }
}

/// 1s, 2s, 4s ... capped at 10s; gives up after 60 attempts (~9 minutes).
pub fn default_lock_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(10))
        .with_max_times(60)
}

/// Waits until the package lock is free. Bounded by `policy`; Ctrl-C
/// cancels the wait.
pub async fn wait_for_lock(
    pkg_mgr: &dyn PackageManager,
    lock_path: &Path,
    policy: ExponentialBuilder,
) -> Result<()> {
    let attempt = || async {
        if pkg_mgr.lock_held().await? {
            return Err(ToolError::PackageManagerBusy(lock_path.to_path_buf()));
        }
        Ok(())
    };

    let wait = attempt
        .retry(policy)
        .when(|e: &ToolError| matches!(e, ToolError::PackageManagerBusy(_)))
        .notify(|_, dur: Duration| {
            info!("Waiting for package manager lock {} (retry in {:?})", lock_path.display(), dur);
        });

    tokio::select! {
        result = wait => result,
        _ = tokio::signal::ctrl_c() => Err(ToolError::Cancelled),
    }
}
