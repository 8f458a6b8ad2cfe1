// 🛡️ Zero-Trust Architecture: every external collaborator sits behind a trait.

pub mod traits;     // Global contracts
pub mod exec;       // Process spawning + exit status mapping
pub mod secrets;    // Memory hygiene (DbSecret)
pub mod packages;   // apt-get + lock wait
pub mod systemd;    // Service control
pub mod certbot;    // Certificate authority client
pub mod mariadb;    // SQL client + statement builders
pub mod network;    // Host identity (FQDN, DNS, interfaces)
pub mod release;    // Self-update download
pub mod ssl;        // Certificate sync

#[cfg(test)]
pub mod fakes;      // Recording collaborators for workflow tests
