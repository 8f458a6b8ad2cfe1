use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::error::Result;

// ==============================================================================
// 1. Package Manager (Idempotent Installs)
// ==============================================================================

#[async_trait]
pub trait PackageManager: Send + Sync {
    /// True while another process holds the package database lock.
    async fn lock_held(&self) -> Result<bool>;

    /// Installs `packages`; already-installed packages are a no-op.
    async fn install(&self, packages: &[String]) -> Result<()>;
}

// ==============================================================================
// 2. Service Manager (systemd)
// ==============================================================================

#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn start(&self, service: &str) -> Result<()>;
    async fn stop(&self, service: &str) -> Result<()>;
    async fn restart(&self, service: &str) -> Result<()>;

    /// Sets a variable in the manager's environment block, visible to units
    /// started afterwards (MariaDB's unit reads `MYSQLD_OPTS` from it).
    async fn set_environment(&self, key: &str, value: &str) -> Result<()>;
    async fn unset_environment(&self, key: &str) -> Result<()>;
}

// ==============================================================================
// 3. Certificate Authority Client
// ==============================================================================

#[async_trait]
pub trait CertAuthority: Send + Sync {
    /// Obtains (or keeps, when not near expiry) a certificate for `domain`.
    /// On success the material lives under the CA client's live directory.
    async fn obtain(&self, domain: &str, email: Option<&str>) -> Result<()>;
}

// ==============================================================================
// 4. SQL Client (Administrative Sessions)
// ==============================================================================

/// How the administrative client authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlSession {
    /// Credentials come from the administrative credential file.
    Admin,
    /// No credentials at all; only valid while the engine runs with
    /// `--skip-grant-tables`.
    Bypass,
}

#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Runs `script` in a single client session and returns the batch-mode
    /// output (tab separated, no column headers).
    /// 🛡️ The script is written to the client's stdin, never to argv.
    async fn execute(&self, session: SqlSession, script: &str) -> Result<String>;
}

// ==============================================================================
// 5. Host Identity (Pre-flight Inputs)
// ==============================================================================

#[async_trait]
pub trait HostResolver: Send + Sync {
    /// The fully-qualified hostname this host believes it has.
    async fn fqdn(&self) -> Result<String>;

    /// Public DNS A records for `host`. Empty when the name does not resolve.
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>>;

    /// Non-loopback IPv4 addresses bound to local interfaces.
    fn local_ipv4(&self) -> Result<Vec<Ipv4Addr>>;
}

// ==============================================================================
// 6. Release Channel (Self-Update)
// ==============================================================================

#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
