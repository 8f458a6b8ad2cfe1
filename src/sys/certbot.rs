// src/sys/certbot.rs

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Result, ToolError};
use crate::sys::exec;
use crate::sys::traits::CertAuthority;

/// Issues certificates through certbot's standalone authenticator. Port 80
/// must be reachable from the CA for the HTTP-01 challenge.
pub struct CertbotAuthority;

impl CertbotAuthority {
    fn args(domain: &str, email: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = [
            "certonly",
            "--standalone",
            "--non-interactive",
            "--agree-tos",
            "--keep-until-expiring",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        match email {
            Some(addr) => {
                args.push("--email".into());
                args.push(addr.into());
            }
            None => args.push("--register-unsafely-without-email".into()),
        }

        args.push("-d".into());
        args.push(domain.into());
        args
    }
}

#[async_trait]
impl CertAuthority for CertbotAuthority {
    async fn obtain(&self, domain: &str, email: Option<&str>) -> Result<()> {
        // 🛡️ Zero-Trust Guard: Argument Injection Protection
        if domain.starts_with('-') || email.is_some_and(|e| e.starts_with('-')) {
            return Err(ToolError::HostnameInvalid(domain.to_string()));
        }

        let mut cmd = Command::new("certbot");
        cmd.args(Self::args(domain, email));
        exec::run(cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_without_email_register_anonymously() {
        let args = CertbotAuthority::args("db.example.com", None);
        assert!(args.contains(&"--register-unsafely-without-email".to_string()));
        assert!(args.contains(&"--keep-until-expiring".to_string()));
        assert_eq!(args[args.len() - 2..], ["-d", "db.example.com"]);
    }

    #[test]
    fn args_with_email() {
        let args = CertbotAuthority::args("db.example.com", Some("ops@example.com"));
        let pos = args.iter().position(|a| a == "--email").unwrap();
        assert_eq!(args[pos + 1], "ops@example.com");
        assert!(!args.contains(&"--register-unsafely-without-email".to_string()));
    }

    #[tokio::test]
    async fn refuses_option_shaped_domains() {
        let err = CertbotAuthority.obtain("--staging", None).await.unwrap_err();
        assert!(matches!(err, ToolError::HostnameInvalid(_)));
    }
}
