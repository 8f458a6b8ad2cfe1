// Each workflow is an `impl MariaDbOpsService` block; the dispatcher in
// main.rs picks one per invocation.

pub mod bootstrap;  // configure
pub mod certs;      // verify_hostname, acquisition, renewal, hook
pub mod toggles;    // require_secure_transport, bind-address
pub mod update;     // self-update
pub mod users;      // user/database lifecycle
