// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Every failure a workflow can surface. The dispatcher maps all of them to
/// exit status 1; only the message differs.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid name '{0}': use 1-64 characters from [A-Za-z0-9_]")]
    InvalidName(String),

    #[error("this command must be run as root")]
    InsufficientPrivileges,

    #[error("hostname '{0}' is not a fully-qualified public name")]
    HostnameInvalid(String),

    #[error("hostname '{0}' has no DNS A record")]
    DnsUnresolvable(String),

    #[error("hostname '{host}' resolves to {resolved:?}, none of which belong to this host ({local:?})")]
    DnsMismatch {
        host: String,
        resolved: Vec<std::net::Ipv4Addr>,
        local: Vec<std::net::Ipv4Addr>,
    },

    #[error("certificate source directory {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}: {stderr}")]
    ExternalCommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("download from {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("downloaded payload from {0} is empty")]
    EmptyPayload(String),

    #[error("package manager lock {0} is still held after waiting")]
    PackageManagerBusy(PathBuf),

    #[error("operation cancelled by operator")]
    Cancelled,

    /// A failure between stopping the service and restarting it normally.
    /// The engine may still be running with authentication and networking
    /// disabled.
    #[error(
        "bootstrap failed during the bypass window: {0}. MariaDB may still be in bypass mode; \
         run `systemctl unset-environment MYSQLD_OPTS && systemctl restart mariadb` and re-run configure"
    )]
    BypassWindow(Box<ToolError>),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
