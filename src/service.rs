// src/service.rs

use backon::ExponentialBuilder;
use std::path::PathBuf;

use crate::cnf::ServerCnf;
use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::sys::certbot::CertbotAuthority;
use crate::sys::mariadb::MariaDbClient;
use crate::sys::network::LinuxHostResolver;
use crate::sys::packages::{self, AptPackageManager};
use crate::sys::release::HttpReleaseFetcher;
use crate::sys::systemd::LinuxSystemdManager;
use crate::sys::traits::{CertAuthority, HostResolver, PackageManager, ReleaseFetcher, ServiceManager, SqlClient};

/// The orchestrator: owns the configuration and one implementation of every
/// external collaborator. Workflows live in `crate::workflows` as `impl`
/// blocks on this type.
pub struct MariaDbOpsService {
    pub(crate) config: ToolConfig,
    pub(crate) pkg_mgr: Box<dyn PackageManager>,
    pub(crate) svc_mgr: Box<dyn ServiceManager>,
    pub(crate) ca: Box<dyn CertAuthority>,
    pub(crate) sql: Box<dyn SqlClient>,
    pub(crate) host: Box<dyn HostResolver>,
    pub(crate) fetcher: Box<dyn ReleaseFetcher>,
    /// The executable the renewal hook calls and self-update replaces.
    pub(crate) self_path: PathBuf,
    pub(crate) lock_policy: ExponentialBuilder,
}

impl MariaDbOpsService {
    pub fn new(config: ToolConfig) -> Result<Self> {
        let self_path = std::env::current_exe().map_err(|e| ToolError::io("/proc/self/exe", e))?;

        Ok(Self {
            pkg_mgr: Box::new(AptPackageManager::new(config.package_lock.clone())),
            svc_mgr: Box::new(LinuxSystemdManager),
            ca: Box::new(CertbotAuthority),
            // Injecting paths via config
            sql: Box::new(MariaDbClient::new(config.db_client.clone(), config.credentials_file.clone())),
            host: Box::new(LinuxHostResolver),
            fetcher: Box::new(HttpReleaseFetcher::new()?),
            self_path,
            lock_policy: packages::default_lock_policy(),
            config,
        })
    }

    pub(crate) fn load_cnf(&self) -> Result<ServerCnf> {
        ServerCnf::load(&self.config.mysql_conf)
    }

    pub(crate) fn save_cnf(&self, cnf: &ServerCnf) -> Result<()> {
        cnf.save(&self.config.mysql_conf)
    }

    pub(crate) async fn restart_db(&self) -> Result<()> {
        self.svc_mgr.restart(&self.config.db_service).await
    }
}

#[cfg(test)]
pub(crate) mod harness {
    use super::*;
    use crate::sys::fakes::{
        self, FakeCertAuthority, FakeFetcher, FakePackageManager, FakeResolver, FakeServiceManager, FakeSql, Journal,
        SqlState,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// A service wired to fakes, with every path under a temp directory.
    pub struct Harness {
        pub dir: TempDir,
        pub journal: Journal,
        pub sql_state: Arc<Mutex<SqlState>>,
        pub service: MariaDbOpsService,
    }

    pub struct HarnessBuilder {
        pub resolver: FakeResolver,
        pub ca_fails: bool,
        pub svc_fail_on: Option<String>,
        pub sql_fail_on: Option<String>,
        pub payload: Option<Vec<u8>>,
    }

    impl Default for HarnessBuilder {
        fn default() -> Self {
            Self {
                resolver: FakeResolver::healthy("db.example.com"),
                ca_fails: false,
                svc_fail_on: None,
                sql_fail_on: None,
                payload: None,
            }
        }
    }

    impl HarnessBuilder {
        pub fn build(self) -> Harness {
            let dir = tempfile::tempdir().unwrap();
            let config = ToolConfig::rooted_at(dir.path());
            let journal = fakes::journal();

            let mut sql = FakeSql::new(journal.clone());
            sql.fail_on = self.sql_fail_on;
            let sql_state = sql.state.clone();

            let self_path = dir.path().join("bin/kari-mariadb");
            std::fs::create_dir_all(self_path.parent().unwrap()).unwrap();
            std::fs::write(&self_path, b"#!/bin/sh\necho v1\n").unwrap();

            let service = MariaDbOpsService {
                pkg_mgr: Box::new(FakePackageManager::with_journal(journal.clone())),
                svc_mgr: Box::new(FakeServiceManager { journal: journal.clone(), fail_on: self.svc_fail_on }),
                ca: Box::new(FakeCertAuthority {
                    journal: journal.clone(),
                    live_dir: Some(config.letsencrypt_live_dir.clone()),
                    material: [b"CERT".to_vec(), b"KEY".to_vec(), b"CHAIN".to_vec()],
                    fail: self.ca_fails,
                }),
                sql: Box::new(sql),
                host: Box::new(self.resolver),
                fetcher: Box::new(FakeFetcher { payload: self.payload }),
                self_path,
                lock_policy: ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(1))
                    .with_max_times(1),
                config,
            };
            Harness { dir, journal, sql_state, service }
        }
    }

    impl Harness {
        pub fn new() -> Self {
            HarnessBuilder::default().build()
        }

        pub fn entries(&self) -> Vec<String> {
            self.journal.lock().unwrap().clone()
        }

        pub fn sql(&self) -> std::sync::MutexGuard<'_, SqlState> {
            self.sql_state.lock().unwrap()
        }
    }
}
