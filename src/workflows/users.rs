// src/workflows/users.rs

use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::error::{Result, ToolError};
use crate::service::MariaDbOpsService;
use crate::sys::mariadb::{self, validate_name};
use crate::sys::secrets::DbSecret;
use crate::sys::traits::SqlSession;

/// A freshly issued password for `user`. The secret is shown to the operator
/// once and then dropped; it is never logged or written to disk.
#[derive(Debug)]
pub struct UserCredentials {
    pub user: String,
    pub database: String,
    pub secret: DbSecret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbAccount {
    pub user: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantReport {
    pub user: String,
    pub grants: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Dropped,
    Aborted,
}

fn required_name(name: Option<&str>) -> Result<&str> {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).ok_or(ToolError::MissingArgument("name"))?;
    validate_name(name)?;
    Ok(name)
}

/// Only a literal `y` (any case, surrounding whitespace ignored) confirms.
pub fn is_confirmation(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

impl MariaDbOpsService {
    /// Creates database `name` and user `name`, scoped to that database only.
    pub async fn create_user(&self, name: Option<&str>) -> Result<UserCredentials> {
        let name = required_name(name)?;
        let secret = DbSecret::generate();

        let script = secret.use_secret(|pw| mariadb::create_user_script(name, pw));
        self.sql.execute(SqlSession::Admin, &script).await?;

        info!("Created database and user '{}'", name);
        Ok(UserCredentials { user: name.to_string(), database: name.to_string(), secret })
    }

    pub async fn reset_user_password(&self, name: Option<&str>) -> Result<UserCredentials> {
        let name = required_name(name)?;
        let secret = DbSecret::generate();

        let script = secret.use_secret(|pw| mariadb::reset_password_script(name, pw));
        self.sql.execute(SqlSession::Admin, &script).await?;

        info!("Password for '{}' rotated", name);
        Ok(UserCredentials { user: name.to_string(), database: name.to_string(), secret })
    }

    /// Drops database and user together. Without `force`, one line is read
    /// from `confirm` and anything but `y` aborts.
    pub async fn drop_user(&self, name: Option<&str>, force: bool, confirm: &mut dyn BufRead) -> Result<DropOutcome> {
        let name = required_name(name)?;

        if !force {
            eprint!("Drop database `{name}` and user '{name}'@'%'? This cannot be undone. [y/N] ");
            let _ = std::io::stderr().flush();

            let mut answer = String::new();
            confirm.read_line(&mut answer).map_err(|e| ToolError::io("<stdin>", e))?;
            if !is_confirmation(&answer) {
                warn!("Drop of '{}' aborted", name);
                return Ok(DropOutcome::Aborted);
            }
        }

        self.sql.execute(SqlSession::Admin, &mariadb::drop_user_script(name)).await?;
        info!("Dropped database and user '{}'", name);
        Ok(DropOutcome::Dropped)
    }

    pub async fn list_users(&self) -> Result<Vec<DbAccount>> {
        let out = self.sql.execute(SqlSession::Admin, mariadb::list_users_script()).await?;
        Ok(out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|line| {
                let (user, host) = line.split_once('\t').unwrap_or((line, ""));
                DbAccount { user: user.to_string(), host: host.to_string() }
            })
            .collect())
    }

    pub async fn show_grants(&self, name: Option<&str>) -> Result<GrantReport> {
        let name = required_name(name)?;
        let out = self.sql.execute(SqlSession::Admin, &mariadb::show_grants_script(name)).await?;
        Ok(GrantReport {
            user: name.to_string(),
            grants: out.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect(),
        })
    }
}
