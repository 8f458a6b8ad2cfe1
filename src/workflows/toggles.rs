// src/workflows/toggles.rs

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::service::MariaDbOpsService;

pub const FORCE_TLS_KEY: &str = "require_secure_transport";
pub const BIND_ADDRESS_KEY: &str = "bind-address";
pub const SKIP_NETWORKING_KEY: &str = "skip-networking";

const LOOPBACK: &str = "127.0.0.1";
const ANY_ADDRESS: &str = "0.0.0.0";

/// Before/after view of one toggled option, as read back from disk after
/// the restart. `None` means the option is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleReport {
    pub setting: &'static str,
    pub previous: Option<String>,
    pub current: Option<String>,
}

fn force_tls_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("ON"))
}

impl MariaDbOpsService {
    /// Flips `require_secure_transport` between `ON` and `OFF`. An absent
    /// key counts as `OFF`.
    pub async fn toggle_force_tls(&self) -> Result<ToggleReport> {
        let section = &self.config.mysql_section;
        let mut cnf = self.load_cnf()?;

        let previous = cnf.get(section, FORCE_TLS_KEY).map(str::to_string);
        let next = if force_tls_enabled(previous.as_deref()) { "OFF" } else { "ON" };
        cnf.set(section, FORCE_TLS_KEY, next);
        self.save_cnf(&cnf)?;

        self.restart_db().await?;
        self.report(FORCE_TLS_KEY, previous)
    }

    /// Switches between loopback-only and all-interfaces binding. Any
    /// `skip-networking` line is dropped either way; it would silently
    /// override the bind address.
    pub async fn toggle_remote_access(&self) -> Result<ToggleReport> {
        let section = &self.config.mysql_section;
        let mut cnf = self.load_cnf()?;

        let previous = cnf.get(section, BIND_ADDRESS_KEY).map(str::to_string);
        let next = if previous.as_deref().map(str::trim) == Some(LOOPBACK) { ANY_ADDRESS } else { LOOPBACK };

        if cnf.contains(section, SKIP_NETWORKING_KEY) {
            cnf.unset(section, SKIP_NETWORKING_KEY);
            info!("Removed {} from [{}]", SKIP_NETWORKING_KEY, section);
        }
        cnf.set(section, BIND_ADDRESS_KEY, next);
        self.save_cnf(&cnf)?;

        self.restart_db().await?;
        self.report(BIND_ADDRESS_KEY, previous)
    }

    fn report(&self, setting: &'static str, previous: Option<String>) -> Result<ToggleReport> {
        let current = self.load_cnf()?.get(&self.config.mysql_section, setting).map(str::to_string);
        info!(
            "{}: {} -> {}",
            setting,
            previous.as_deref().unwrap_or("(unset)"),
            current.as_deref().unwrap_or("(unset)")
        );
        Ok(ToggleReport { setting, previous, current })
    }
}
