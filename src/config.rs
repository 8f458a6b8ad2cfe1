// src/config.rs

use std::env;
use std::path::PathBuf;

use crate::error::{Result, ToolError};
use crate::sys::ssl::CertTriple;

#[derive(Clone, Debug)]
pub struct ToolConfig {
    // 📂 MariaDB server layout
    pub mysql_conf: PathBuf,
    pub mysql_section: String,
    pub credentials_file: PathBuf,
    pub mysql_ssl_dir: PathBuf,
    pub db_service: String,
    pub db_user: String,
    pub db_client: String,

    // 🔐 certbot integration
    pub letsencrypt_live_dir: PathBuf,
    pub renewal_hook_dir: PathBuf,
    pub acme_email: Option<String>,

    // 📦 Host integration
    pub packages: Vec<String>,
    pub package_lock: PathBuf,
    pub log_file: PathBuf,
    pub update_url: Option<String>,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Release channel: the runtime variable wins over the URL baked in at build
/// time (`KARI_UPDATE_URL=... cargo build`). Blank values count as unset.
fn pick_update_url(runtime: Option<String>, built_in: Option<&str>) -> Option<String> {
    runtime
        .filter(|u| !u.trim().is_empty())
        .or_else(|| built_in.filter(|u| !u.trim().is_empty()).map(str::to_string))
}

impl ToolConfig {
    pub fn load() -> Self {
        let packages = var_or("KARI_PACKAGES", "mariadb-server mariadb-client certbot")
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            mysql_conf: var_or("KARI_MYSQL_CONF", "/etc/mysql/mariadb.conf.d/50-server.cnf").into(),
            mysql_section: var_or("KARI_MYSQL_SECTION", "mysqld"),
            credentials_file: var_or("KARI_CREDENTIALS_FILE", "/root/.my.cnf").into(),
            mysql_ssl_dir: var_or("KARI_MYSQL_SSL_DIR", "/etc/mysql/ssl").into(),
            db_service: var_or("KARI_DB_SERVICE", "mariadb"),
            db_user: var_or("KARI_DB_USER", "mysql"),
            db_client: var_or("KARI_DB_CLIENT", "mariadb"),

            letsencrypt_live_dir: var_or("KARI_LETSENCRYPT_LIVE_DIR", "/etc/letsencrypt/live").into(),
            renewal_hook_dir: var_or("KARI_RENEWAL_HOOK_DIR", "/etc/letsencrypt/renewal-hooks/deploy")
                .into(),
            acme_email: env::var("KARI_ACME_EMAIL").ok().filter(|e| !e.trim().is_empty()),

            packages,
            package_lock: var_or("KARI_PACKAGE_LOCK", "/var/lib/dpkg/lock-frontend").into(),
            log_file: var_or("KARI_LOG_FILE", "/var/log/kari-mariadb.log").into(),
            update_url: pick_update_url(env::var("KARI_UPDATE_URL").ok(), option_env!("KARI_UPDATE_URL")),
        }
    }

    /// Builds the certificate layout for `domain`. Computed once per run and
    /// threaded explicitly into acquisition, sync and renewal.
    pub fn ssl_environment(&self, domain: &str) -> Result<SslEnvironment> {
        if domain.is_empty() || domain.contains("..") || domain.contains('/') {
            return Err(ToolError::HostnameInvalid(domain.to_string()));
        }
        let source_dir = self.letsencrypt_live_dir.join(domain);
        Ok(SslEnvironment {
            domain: domain.to_string(),
            source: CertTriple::in_dir(&source_dir),
            destination: CertTriple::in_dir(&self.mysql_ssl_dir),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SslEnvironment {
    pub domain: String,
    pub source: CertTriple,
    pub destination: CertTriple,
}

#[cfg(test)]
impl ToolConfig {
    /// Every path rooted under `root`, so tests never touch the host.
    pub fn rooted_at(root: &std::path::Path) -> Self {
        Self {
            mysql_conf: root.join("50-server.cnf"),
            mysql_section: "mysqld".into(),
            credentials_file: root.join("my.cnf"),
            mysql_ssl_dir: root.join("mysql-ssl"),
            db_service: "mariadb".into(),
            db_user: nix::unistd::User::from_uid(nix::unistd::geteuid())
                .ok()
                .flatten()
                .map(|u| u.name)
                .unwrap_or_else(|| "root".into()),
            db_client: "mariadb".into(),
            letsencrypt_live_dir: root.join("live"),
            renewal_hook_dir: root.join("hooks"),
            acme_email: None,
            packages: vec!["mariadb-server".into(), "certbot".into()],
            package_lock: root.join("lock-frontend"),
            log_file: root.join("kari-mariadb.log"),
            update_url: Some("https://updates.invalid/kari-mariadb".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssl_environment_points_at_live_and_mysql_dirs() {
        let cfg = ToolConfig::rooted_at(std::path::Path::new("/srv"));
        let env = cfg.ssl_environment("db.example.com").unwrap();
        assert_eq!(env.source.cert, PathBuf::from("/srv/live/db.example.com/cert.pem"));
        assert_eq!(env.destination.key, PathBuf::from("/srv/mysql-ssl/privkey.pem"));
    }

    #[test]
    fn ssl_environment_rejects_traversal() {
        let cfg = ToolConfig::rooted_at(std::path::Path::new("/srv"));
        assert!(cfg.ssl_environment("../etc").is_err());
        assert!(cfg.ssl_environment("").is_err());
    }

    #[test]
    fn update_url_prefers_runtime_over_built_in() {
        let built_in = Some("https://releases.example.com/kari-mariadb");
        assert_eq!(
            pick_update_url(Some("https://mirror.example.com/k".into()), built_in).as_deref(),
            Some("https://mirror.example.com/k")
        );
        assert_eq!(pick_update_url(None, built_in).as_deref(), built_in);
        assert_eq!(pick_update_url(Some("  ".into()), built_in).as_deref(), built_in);
        assert_eq!(pick_update_url(None, Some("")), None);
        assert_eq!(pick_update_url(None, None), None);
    }
}
