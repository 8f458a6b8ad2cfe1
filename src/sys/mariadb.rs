// src/sys/mariadb.rs

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use tokio::process::Command;
use zeroize::Zeroizing;

use crate::error::{Result, ToolError};
use crate::sys::exec;
use crate::sys::traits::{SqlClient, SqlSession};

/// Drives the `mariadb` command-line client in batch mode.
pub struct MariaDbClient {
    client: String,
    credentials_file: PathBuf,
}

impl MariaDbClient {
    pub fn new(client: String, credentials_file: PathBuf) -> Self {
        Self { client, credentials_file }
    }

    fn command(&self, session: SqlSession) -> Command {
        let mut cmd = Command::new(&self.client);
        // Option-file flags must come first or the client rejects them.
        match session {
            SqlSession::Admin => {
                cmd.arg(format!("--defaults-extra-file={}", self.credentials_file.display()));
            }
            SqlSession::Bypass => {
                cmd.args(["--no-defaults", "--user=root"]);
            }
        }
        cmd.args(["--batch", "--skip-column-names"]);
        cmd
    }
}

#[async_trait]
impl SqlClient for MariaDbClient {
    async fn execute(&self, session: SqlSession, script: &str) -> Result<String> {
        exec::run_with_stdin(self.command(session), script.as_bytes()).await
    }
}

// ==============================================================================
// Statement builders
// ==============================================================================

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("static regex"))
}

/// 🛡️ Zero-Trust: names are spliced into SQL as identifiers and literals, so
/// only the characters that need no quoting at all are accepted.
pub fn validate_name(name: &str) -> Result<()> {
    if !name_pattern().is_match(name) {
        return Err(ToolError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub fn create_user_script(name: &str, password: &str) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "CREATE DATABASE `{name}`;\n\
         CREATE USER '{name}'@'%' IDENTIFIED BY '{password}';\n\
         GRANT ALL PRIVILEGES ON `{name}`.* TO '{name}'@'%';\n\
         FLUSH PRIVILEGES;\n"
    ))
}

pub fn reset_password_script(name: &str, password: &str) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "ALTER USER '{name}'@'%' IDENTIFIED BY '{password}';\n\
         FLUSH PRIVILEGES;\n"
    ))
}

pub fn drop_user_script(name: &str) -> String {
    format!(
        "DROP DATABASE IF EXISTS `{name}`;\n\
         DROP USER IF EXISTS '{name}'@'%';\n\
         FLUSH PRIVILEGES;\n"
    )
}

pub fn list_users_script() -> &'static str {
    "SELECT User, Host FROM mysql.user ORDER BY User, Host;\n"
}

pub fn show_grants_script(name: &str) -> String {
    format!("SHOW GRANTS FOR '{name}'@'%';\n")
}

/// Grant tables must be loaded before `ALTER USER` works under
/// `--skip-grant-tables`, hence the leading flush.
pub fn root_password_script(password: &str) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "FLUSH PRIVILEGES;\n\
         ALTER USER 'root'@'localhost' IDENTIFIED BY '{password}';\n\
         FLUSH PRIVILEGES;\n"
    ))
}
