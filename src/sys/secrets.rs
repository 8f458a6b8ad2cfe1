// src/sys/secrets.rs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

/// Bytes of CSPRNG output behind every generated password (43 base64 chars).
const SECRET_BYTES: usize = 32;

/// DbSecret is an ephemeral, memory-safe wrapper for a database password.
///
/// 1. It cannot be accidentally logged (`{:?}` prints `[REDACTED ...]`).
/// 2. When the struct goes out of scope, the memory is zeroized.
pub struct DbSecret {
    value: SecretString,
}

impl DbSecret {
    /// Draws a fresh password from the OS CSPRNG.
    ///
    /// Standard base64 without `=` padding: only `[A-Za-z0-9+/]`, so the
    /// value can sit inside a single-quoted SQL literal or an option file
    /// without escaping.
    pub fn generate() -> Self {
        let mut raw = Zeroizing::new([0u8; SECRET_BYTES]);
        OsRng.fill_bytes(raw.as_mut());

        let mut encoded = STANDARD.encode(raw.as_ref());
        encoded.retain(|c| c != '=');
        Self { value: SecretString::new(encoded) }
    }

    /// Exposes the plaintext only for the duration of `action`; the borrow
    /// cannot escape the closure.
    pub fn use_secret<F, R>(&self, action: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        action(self.value.expose_secret())
    }
}

impl std::fmt::Debug for DbSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DbSecret([REDACTED])")
    }
}
