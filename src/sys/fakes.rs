// src/sys/fakes.rs
//
// Recording stand-ins for the external collaborators. Every fake appends to a
// shared journal so tests can assert on cross-collaborator ordering.

use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Result, ToolError};
use crate::sys::traits::{
    CertAuthority, HostResolver, PackageManager, ReleaseFetcher, ServiceManager, SqlClient, SqlSession,
};

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(journal: &Journal, entry: String) {
    journal.lock().unwrap().push(entry);
}

fn failed(program: &str, stderr: &str) -> ToolError {
    ToolError::ExternalCommandFailed { program: program.into(), code: 1, stderr: stderr.into() }
}

// ------------------------------------------------------------------------------
// Packages
// ------------------------------------------------------------------------------

pub struct FakePackageManager {
    busy_checks: usize,
    checks: AtomicUsize,
    pub journal: Journal,
}

impl FakePackageManager {
    /// Lock reports held for the first `n` probes.
    pub fn locked_for(n: usize) -> Self {
        Self { busy_checks: n, checks: AtomicUsize::new(0), journal: journal() }
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self { busy_checks: 0, checks: AtomicUsize::new(0), journal }
    }

    pub fn lock_checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageManager for FakePackageManager {
    async fn lock_held(&self) -> Result<bool> {
        let seen = self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(seen < self.busy_checks)
    }

    async fn install(&self, packages: &[String]) -> Result<()> {
        record(&self.journal, format!("pkg:install {}", packages.join(" ")));
        Ok(())
    }
}

// ------------------------------------------------------------------------------
// Services
// ------------------------------------------------------------------------------

pub struct FakeServiceManager {
    pub journal: Journal,
    /// Journal entry (e.g. `svc:start mariadb`) that fails instead of succeeding.
    pub fail_on: Option<String>,
}

impl FakeServiceManager {
    fn act(&self, entry: String) -> Result<()> {
        let should_fail = self.fail_on.as_deref() == Some(entry.as_str());
        record(&self.journal, entry);
        if should_fail {
            return Err(failed("systemctl", "Job failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceManager for FakeServiceManager {
    async fn start(&self, service: &str) -> Result<()> {
        self.act(format!("svc:start {service}"))
    }
    async fn stop(&self, service: &str) -> Result<()> {
        self.act(format!("svc:stop {service}"))
    }
    async fn restart(&self, service: &str) -> Result<()> {
        self.act(format!("svc:restart {service}"))
    }
    async fn set_environment(&self, key: &str, value: &str) -> Result<()> {
        self.act(format!("svc:set-environment {key}={value}"))
    }
    async fn unset_environment(&self, key: &str) -> Result<()> {
        self.act(format!("svc:unset-environment {key}"))
    }
}

// ------------------------------------------------------------------------------
// Certificate authority
// ------------------------------------------------------------------------------

pub struct FakeCertAuthority {
    pub journal: Journal,
    /// When set, a successful `obtain` materializes cert/privkey/chain here.
    pub live_dir: Option<PathBuf>,
    pub material: [Vec<u8>; 3],
    pub fail: bool,
}

#[async_trait]
impl CertAuthority for FakeCertAuthority {
    async fn obtain(&self, domain: &str, _email: Option<&str>) -> Result<()> {
        record(&self.journal, format!("ca:obtain {domain}"));
        if self.fail {
            return Err(failed("certbot", "Challenge failed"));
        }
        if let Some(live) = &self.live_dir {
            let dir = live.join(domain);
            std::fs::create_dir_all(&dir).unwrap();
            for (name, bytes) in ["cert.pem", "privkey.pem", "chain.pem"].iter().zip(&self.material) {
                std::fs::write(dir.join(name), bytes).unwrap();
            }
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------
// SQL: a tiny in-memory engine that understands exactly the statements we emit
// ------------------------------------------------------------------------------

#[derive(Default)]
pub struct SqlState {
    pub databases: BTreeSet<String>,
    pub users: BTreeMap<String, String>,
    pub grants: BTreeSet<(String, String)>,
    pub root_password: Option<String>,
    pub flushes: usize,
}

pub struct FakeSql {
    pub journal: Journal,
    pub state: Arc<Mutex<SqlState>>,
    pub fail_on: Option<String>,
}

impl FakeSql {
    pub fn new(journal: Journal) -> Self {
        Self { journal, state: Arc::new(Mutex::new(SqlState::default())), fail_on: None }
    }

    fn apply(&self, state: &mut SqlState, stmt: &str) -> Result<String> {
        let create_db = Regex::new(r"^CREATE DATABASE `(\w+)`$").unwrap();
        let create_user = Regex::new(r"^CREATE USER '(\w+)'@'%' IDENTIFIED BY '([^']*)'$").unwrap();
        let grant = Regex::new(r"^GRANT ALL PRIVILEGES ON `(\w+)`\.\* TO '(\w+)'@'%'$").unwrap();
        let alter = Regex::new(r"^ALTER USER '(\w+)'@'([^']+)' IDENTIFIED BY '([^']*)'$").unwrap();
        let drop_db = Regex::new(r"^DROP DATABASE IF EXISTS `(\w+)`$").unwrap();
        let drop_user = Regex::new(r"^DROP USER IF EXISTS '(\w+)'@'%'$").unwrap();
        let show_grants = Regex::new(r"^SHOW GRANTS FOR '(\w+)'@'%'$").unwrap();

        if stmt == "FLUSH PRIVILEGES" {
            state.flushes += 1;
            return Ok(String::new());
        }
        if stmt == "SELECT User, Host FROM mysql.user ORDER BY User, Host" {
            let mut out = String::from("root\tlocalhost\n");
            for user in state.users.keys() {
                out.push_str(&format!("{user}\t%\n"));
            }
            return Ok(out);
        }
        if let Some(c) = create_db.captures(stmt) {
            if !state.databases.insert(c[1].to_string()) {
                return Err(failed("mariadb", "ERROR 1007 (HY000): database exists"));
            }
            return Ok(String::new());
        }
        if let Some(c) = create_user.captures(stmt) {
            if state.users.contains_key(&c[1]) {
                return Err(failed("mariadb", "ERROR 1396 (HY000): Operation CREATE USER failed"));
            }
            state.users.insert(c[1].to_string(), c[2].to_string());
            return Ok(String::new());
        }
        if let Some(c) = grant.captures(stmt) {
            state.grants.insert((c[2].to_string(), c[1].to_string()));
            return Ok(String::new());
        }
        if let Some(c) = alter.captures(stmt) {
            if &c[1] == "root" && &c[2] == "localhost" {
                state.root_password = Some(c[3].to_string());
                return Ok(String::new());
            }
            return match state.users.get_mut(&c[1]) {
                Some(pw) if &c[2] == "%" => {
                    *pw = c[3].to_string();
                    Ok(String::new())
                }
                _ => Err(failed("mariadb", "ERROR 1396 (HY000): Operation ALTER USER failed")),
            };
        }
        if let Some(c) = drop_db.captures(stmt) {
            state.databases.remove(&c[1]);
            return Ok(String::new());
        }
        if let Some(c) = drop_user.captures(stmt) {
            state.users.remove(&c[1]);
            state.grants.retain(|(u, _)| u != &c[1]);
            return Ok(String::new());
        }
        if let Some(c) = show_grants.captures(stmt) {
            let user = &c[1];
            if !state.users.contains_key(user) {
                return Err(failed("mariadb", "ERROR 1141 (42000): There is no such grant defined"));
            }
            let mut out = format!("GRANT USAGE ON *.* TO `{user}`@`%` IDENTIFIED BY PASSWORD '*HASH'\n");
            for (_, db) in state.grants.iter().filter(|(u, _)| u == user) {
                out.push_str(&format!("GRANT ALL PRIVILEGES ON `{db}`.* TO `{user}`@`%`\n"));
            }
            return Ok(out);
        }
        Err(failed("mariadb", &format!("ERROR 1064 (42000): unsupported statement: {stmt}")))
    }
}

#[async_trait]
impl SqlClient for FakeSql {
    async fn execute(&self, session: SqlSession, script: &str) -> Result<String> {
        record(&self.journal, format!("sql:{:?}", session));
        if let Some(marker) = &self.fail_on {
            if script.contains(marker.as_str()) {
                return Err(failed("mariadb", "ERROR 2002 (HY000): Can't connect"));
            }
        }
        let mut state = self.state.lock().unwrap();
        let mut out = String::new();
        for stmt in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            out.push_str(&self.apply(&mut state, stmt)?);
        }
        Ok(out)
    }
}

// ------------------------------------------------------------------------------
// Host identity
// ------------------------------------------------------------------------------

pub struct FakeResolver {
    pub fqdn: String,
    pub resolved: Vec<Ipv4Addr>,
    pub local: Vec<Ipv4Addr>,
}

impl FakeResolver {
    /// A host whose public name resolves to one of its own interfaces.
    pub fn healthy(fqdn: &str) -> Self {
        Self {
            fqdn: fqdn.into(),
            resolved: vec![Ipv4Addr::new(203, 0, 113, 10)],
            local: vec![Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(203, 0, 113, 10)],
        }
    }
}

#[async_trait]
impl HostResolver for FakeResolver {
    async fn fqdn(&self) -> Result<String> {
        Ok(self.fqdn.clone())
    }
    async fn resolve_ipv4(&self, _host: &str) -> Result<Vec<Ipv4Addr>> {
        Ok(self.resolved.clone())
    }
    fn local_ipv4(&self) -> Result<Vec<Ipv4Addr>> {
        Ok(self.local.clone())
    }
}

// ------------------------------------------------------------------------------
// Release channel
// ------------------------------------------------------------------------------

pub struct FakeFetcher {
    pub payload: Option<Vec<u8>>,
}

#[async_trait]
impl ReleaseFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.payload.clone().ok_or_else(|| ToolError::DownloadFailed {
            url: url.into(),
            reason: "connection refused".into(),
        })
    }
}
