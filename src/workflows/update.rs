// src/workflows/update.rs

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, ToolError};
use crate::service::MariaDbOpsService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    AlreadyCurrent,
    Replaced { backup: PathBuf },
}

fn backup_path(exe: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let mut name = exe.as_os_str().to_os_string();
    name.push(format!(".bak.{stamp}"));
    PathBuf::from(name)
}

impl MariaDbOpsService {
    /// Replaces the running executable with the published release. Nothing
    /// on disk changes unless a non-empty, different payload was downloaded.
    pub async fn self_update(&self) -> Result<UpdateOutcome> {
        let url = self.config.update_url.as_deref().ok_or(ToolError::MissingArgument("KARI_UPDATE_URL"))?;

        info!("Downloading release from {}", url);
        let payload = self.fetcher.fetch(url).await?;
        if payload.is_empty() {
            return Err(ToolError::EmptyPayload(url.to_string()));
        }

        let exe = &self.self_path;
        let current = std::fs::read(exe).map_err(|e| ToolError::io(exe, e))?;
        if current == payload {
            info!("Already up to date");
            return Ok(UpdateOutcome::AlreadyCurrent);
        }

        let backup = backup_path(exe);
        std::fs::copy(exe, &backup).map_err(|e| ToolError::io(&backup, e))?;
        info!("Previous binary saved to {}", backup.display());

        // Same directory, so the final rename cannot cross filesystems.
        let dir = exe.parent().unwrap_or(Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|e| ToolError::io(dir, e))?;
        staged.write_all(&payload).map_err(|e| ToolError::io(staged.path(), e))?;
        staged.as_file().sync_all().map_err(|e| ToolError::io(staged.path(), e))?;
        std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(0o755))
            .map_err(|e| ToolError::io(staged.path(), e))?;
        staged.persist(exe).map_err(|e| ToolError::io(exe, e.error))?;

        info!("Updated {}; re-run the command to use the new version", exe.display());
        Ok(UpdateOutcome::Replaced { backup })
    }
}
