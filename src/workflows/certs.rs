// src/workflows/certs.rs

use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::SslEnvironment;
use crate::error::{Result, ToolError};
use crate::service::MariaDbOpsService;
use crate::sys::ssl::{self, SyncOutcome};

pub const HOOK_FILE: &str = "kari-mariadb.sh";

const LOCALHOST_NAMES: [&str; 2] = ["localhost", "localhost.localdomain"];

impl MariaDbOpsService {
    /// Pre-flight for certificate issuance. Returns the FQDN once it is known
    /// to be public, resolvable, and pointing at this host.
    pub async fn verify_hostname(&self) -> Result<String> {
        let fqdn = self.host.fqdn().await?;
        let lowered = fqdn.trim().trim_end_matches('.').to_ascii_lowercase();

        if lowered.is_empty() || LOCALHOST_NAMES.contains(&lowered.as_str()) {
            return Err(ToolError::HostnameInvalid(fqdn));
        }

        let resolved = self.host.resolve_ipv4(&lowered).await?;
        if resolved.is_empty() {
            return Err(ToolError::DnsUnresolvable(lowered));
        }

        let local = self.host.local_ipv4()?;
        if !resolved.iter().any(|ip| local.contains(ip)) {
            return Err(ToolError::DnsMismatch { host: lowered, resolved, local });
        }

        info!("Hostname {} resolves to this host ({:?})", lowered, resolved);
        Ok(lowered)
    }

    /// Resolves the certificate layout for the current FQDN without any DNS
    /// checks; renewal must keep working even if DNS is briefly unhealthy.
    pub(crate) async fn resolve_ssl_environment(&self) -> Result<SslEnvironment> {
        let fqdn = self.host.fqdn().await?;
        let domain = fqdn.trim().trim_end_matches('.').to_ascii_lowercase();
        self.config.ssl_environment(&domain)
    }

    pub(crate) fn sync_certificates(&self, env: &SslEnvironment) -> Result<SyncOutcome> {
        ssl::sync_certificates(&env.source, &env.destination, &self.config.db_user)
    }

    /// Points `ssl_cert`, `ssl_key` and `ssl_ca` at the destination triple.
    fn point_server_at_certificates(&self, env: &SslEnvironment) -> Result<()> {
        let section = &self.config.mysql_section;
        let mut cnf = self.load_cnf()?;
        cnf.set(section, "ssl_cert", &env.destination.cert.to_string_lossy());
        cnf.set(section, "ssl_key", &env.destination.key.to_string_lossy());
        cnf.set(section, "ssl_ca", &env.destination.chain.to_string_lossy());
        self.save_cnf(&cnf)
    }

    /// Full acquisition: pre-flight, certbot, sync, server config, renewal
    /// hook, and a restart only when the material actually changed.
    pub async fn acquire_certificates(&self) -> Result<SslEnvironment> {
        let domain = self.verify_hostname().await?;
        let env = self.config.ssl_environment(&domain)?;

        info!("Requesting certificate for {}", env.domain);
        self.ca.obtain(&env.domain, self.config.acme_email.as_deref()).await?;

        let outcome = self.sync_certificates(&env)?;
        if outcome == SyncOutcome::SourceMissing {
            return Err(ToolError::SourceMissing(env.source.dir().to_path_buf()));
        }

        self.point_server_at_certificates(&env)?;
        self.install_renewal_hook()?;

        if outcome == SyncOutcome::Updated {
            self.restart_db().await?;
        } else {
            info!("Certificates already in place; no restart needed");
        }
        Ok(env)
    }

    /// Renewal entry point, called by certbot's deploy hook.
    pub async fn renew_certificates(&self) -> Result<SyncOutcome> {
        let env = self.resolve_ssl_environment().await?;

        let outcome = self.sync_certificates(&env)?;
        match outcome {
            SyncOutcome::SourceMissing => {
                warn!("No certificate at {} yet; nothing to renew", env.source.dir().display());
            }
            SyncOutcome::Unchanged => info!("Certificates for {} are current", env.domain),
            SyncOutcome::Updated => {
                info!("Renewed certificates for {} installed", env.domain);
                self.restart_db().await?;
            }
        }
        Ok(outcome)
    }

    /// Writes the certbot deploy hook that calls back into `renew-ssl`.
    /// Content is static, so it is simply overwritten every time.
    pub fn install_renewal_hook(&self) -> Result<PathBuf> {
        let dir = &self.config.renewal_hook_dir;
        std::fs::create_dir_all(dir).map_err(|e| ToolError::io(dir, e))?;

        let path = dir.join(HOOK_FILE);
        let script = format!(
            "#!/bin/sh\n# Installed by kari-mariadb: copy renewed certificates to MariaDB.\nexec \"{}\" renew-ssl\n",
            self.self_path.display()
        );

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o755)
            .open(&path)
            .map_err(|e| ToolError::io(&path, e))?;
        file.write_all(script.as_bytes()).map_err(|e| ToolError::io(&path, e))?;
        file.set_permissions(std::fs::Permissions::from_mode(0o755))
            .map_err(|e| ToolError::io(&path, e))?;

        info!("Renewal hook installed at {}", path.display());
        Ok(path)
    }
}
