// src/workflows/bootstrap.rs

use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::error::{Result, ToolError};
use crate::service::MariaDbOpsService;
use crate::sys::mariadb;
use crate::sys::packages;
use crate::sys::secrets::DbSecret;
use crate::sys::traits::SqlSession;

const BYPASS_ENV_KEY: &str = "MYSQLD_OPTS";
const BYPASS_ENV_VALUE: &str = "--skip-grant-tables --skip-networking";

impl MariaDbOpsService {
    /// One-shot host bootstrap: packages, TLS, root password reset, and the
    /// administrative credential file.
    pub async fn configure(&self) -> Result<()> {
        // 📦 1. Packages
        packages::wait_for_lock(&*self.pkg_mgr, &self.config.package_lock, self.lock_policy.clone()).await?;
        info!("Installing {}", self.config.packages.join(" "));
        self.pkg_mgr.install(&self.config.packages).await?;

        // 🧹 2. Stale credentials would authenticate against a password we are about to replace
        remove_if_present(&self.config.credentials_file)?;

        // 🔐 3. TLS
        self.acquire_certificates().await?;

        // ⚠️ 4-7. Bypass window
        let secret = DbSecret::generate();
        if let Err(e) = self.reset_root_password(&secret).await {
            error!("Bootstrap failed while MariaDB may be running without authentication");
            return Err(ToolError::BypassWindow(Box::new(e)));
        }

        // 💾 8. Persist
        self.write_credentials(&secret)?;
        info!("Bootstrap complete; administrative credentials stored in {}", self.config.credentials_file.display());
        Ok(())
    }

    async fn reset_root_password(&self, secret: &DbSecret) -> Result<()> {
        let service = &self.config.db_service;

        self.svc_mgr.stop(service).await?;
        self.svc_mgr.set_environment(BYPASS_ENV_KEY, BYPASS_ENV_VALUE).await?;
        self.svc_mgr.start(service).await?;
        warn!("{} is running with grant tables and networking disabled", service);

        let script = secret.use_secret(mariadb::root_password_script);
        self.sql.execute(SqlSession::Bypass, &script).await?;
        info!("Root password rotated");

        self.svc_mgr.stop(service).await?;
        self.svc_mgr.unset_environment(BYPASS_ENV_KEY).await?;
        self.svc_mgr.start(service).await?;
        info!("{} restarted with authentication enabled", service);
        Ok(())
    }

    /// `[client]` option file, mode 400 from creation.
    fn write_credentials(&self, secret: &DbSecret) -> Result<()> {
        let path = &self.config.credentials_file;
        remove_if_present(path)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o400)
            .open(path)
            .map_err(|e| ToolError::io(path, e))?;
        secret
            .use_secret(|pw| {
                let body = Zeroizing::new(format!("[client]\npassword={pw}\n"));
                file.write_all(body.as_bytes())
            })
            .map_err(|e| ToolError::io(path, e))?;
        file.sync_all().map_err(|e| ToolError::io(path, e))
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ToolError::io(path, e)),
    }
}
