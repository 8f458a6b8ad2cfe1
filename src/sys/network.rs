// src/sys/network.rs

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::system_conf::read_system_conf;
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::sys::exec;
use crate::sys::traits::HostResolver;

/// Reads host identity from `hostname -f`, public DNS and `getifaddrs(3)`.
pub struct LinuxHostResolver;

#[async_trait]
impl HostResolver for LinuxHostResolver {
    async fn fqdn(&self) -> Result<String> {
        let mut cmd = Command::new("hostname");
        cmd.arg("-f");
        Ok(exec::run(cmd).await?.trim().to_string())
    }

    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>> {
        let (config, mut opts) = read_system_conf().map_err(|e| ToolError::DnsUnresolvable(format!("{host} ({e})")))?;
        // /etc/hosts commonly maps the FQDN to 127.0.1.1; the CA only sees DNS.
        opts.use_hosts_file = false;
        let resolver = TokioAsyncResolver::tokio(config, opts);

        // Trailing dot: absolute name, no search-domain expansion.
        match resolver.ipv4_lookup(format!("{}.", host.trim_end_matches('.'))).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| a.0).collect()),
            Err(e) => {
                debug!("A lookup for {} failed: {}", host, e);
                Ok(Vec::new())
            }
        }
    }

    fn local_ipv4(&self) -> Result<Vec<Ipv4Addr>> {
        let addrs = nix::ifaddrs::getifaddrs()
            .map_err(|e| ToolError::io("getifaddrs", std::io::Error::from(e)))?;

        let mut local: Vec<Ipv4Addr> = addrs
            .filter_map(|ifa| ifa.address)
            .filter_map(|addr| addr.as_sockaddr_in().map(|sin| *SocketAddrV4::from(*sin).ip()))
            .filter(|ip| !ip.is_loopback())
            .collect();
        local.sort();
        local.dedup();
        Ok(local)
    }
}
