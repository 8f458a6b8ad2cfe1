use std::fs as std_fs;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{Result, ToolError};

// ==============================================================================
// 1. Certificate Layout
// ==============================================================================

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "privkey.pem";
pub const CHAIN_FILE: &str = "chain.pem";

/// Certificate, private key and trust chain, always handled as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertTriple {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub chain: PathBuf,
}

impl CertTriple {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cert: dir.join(CERT_FILE),
            key: dir.join(KEY_FILE),
            chain: dir.join(CHAIN_FILE),
        }
    }

    pub fn dir(&self) -> &Path {
        self.cert.parent().unwrap_or(Path::new("/"))
    }

    fn files(&self) -> [&Path; 3] {
        [&self.cert, &self.key, &self.chain]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Destination already mirrors the source; nothing was written.
    Unchanged,
    /// All three files were (re)copied.
    Updated,
    /// The source directory does not exist.
    SourceMissing,
}

// ==============================================================================
// 2. Idempotent Sync (Linux Filesystem)
// ==============================================================================

fn read(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    std_fs::read(path).map(Zeroizing::new).map_err(|e| ToolError::io(path, e))
}

fn read_if_present(path: &Path) -> Result<Option<Zeroizing<Vec<u8>>>> {
    match std_fs::read(path) {
        Ok(bytes) => Ok(Some(Zeroizing::new(bytes))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ToolError::io(path, e)),
    }
}

fn chown_to(path: &Path, owner: &str) -> Result<()> {
    let user = nix::unistd::User::from_name(owner)
        .map_err(|e| ToolError::io(path, std::io::Error::from(e)))?
        .ok_or_else(|| {
            ToolError::io(path, std::io::Error::new(std::io::ErrorKind::NotFound, format!("no such user '{owner}'")))
        })?;
    nix::unistd::chown(path, Some(user.uid), Some(user.gid))
        .map_err(|e| ToolError::io(path, std::io::Error::from(e)))
}

/// Mirrors `source` into `destination`, owned by `owner` with mode 600.
///
/// Either every destination file already matches byte-for-byte and nothing
/// is touched, or all three are rewritten. Copying only the file that changed
/// could pair a new certificate with an old key.
pub fn sync_certificates(source: &CertTriple, destination: &CertTriple, owner: &str) -> Result<SyncOutcome> {
    if !source.dir().is_dir() {
        return Ok(SyncOutcome::SourceMissing);
    }

    // Read the whole source first: a half-present source is an error, never
    // a partial copy.
    let mut payload = Vec::with_capacity(3);
    for path in source.files() {
        payload.push(read(path)?);
    }

    let mut in_sync = true;
    for (dst, src_bytes) in destination.files().iter().zip(&payload) {
        match read_if_present(dst)? {
            Some(existing) if existing.as_slice() == src_bytes.as_slice() => {}
            _ => {
                debug!("{} is missing or stale", dst.display());
                in_sync = false;
                break;
            }
        }
    }
    if in_sync {
        return Ok(SyncOutcome::Unchanged);
    }

    let dst_dir = destination.dir();
    std_fs::create_dir_all(dst_dir).map_err(|e| ToolError::io(dst_dir, e))?;
    std_fs::set_permissions(dst_dir, std_fs::Permissions::from_mode(0o750)).map_err(|e| ToolError::io(dst_dir, e))?;
    chown_to(dst_dir, owner)?;

    for (dst, bytes) in destination.files().iter().zip(&payload) {
        write_restricted(dst, bytes, owner)?;
    }

    info!("Certificates copied to {}", dst_dir.display());
    Ok(SyncOutcome::Updated)
}

/// 🛡️ Mode 600 from inception; an existing file is re-chmodded because
/// `mode()` only applies on creation.
fn write_restricted(path: &Path, bytes: &[u8], owner: &str) -> Result<()> {
    let mut file = std_fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| ToolError::io(path, e))?;
    file.set_permissions(std_fs::Permissions::from_mode(0o600)).map_err(|e| ToolError::io(path, e))?;
    file.write_all(bytes).map_err(|e| ToolError::io(path, e))?;
    file.sync_all().map_err(|e| ToolError::io(path, e))?;
    chown_to(path, owner)
}
