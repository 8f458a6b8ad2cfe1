// src/sys/release.rs

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Result, ToolError};
use crate::sys::traits::ReleaseFetcher;

pub struct HttpReleaseFetcher {
    client: reqwest::Client,
}

impl HttpReleaseFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kari-mariadb/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ToolError::DownloadFailed { url: String::new(), reason: e.to_string() })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReleaseFetcher for HttpReleaseFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let failed = |e: reqwest::Error| ToolError::DownloadFailed { url: url.to_string(), reason: e.to_string() };

        let response = self.client.get(url).send().await.map_err(failed)?;
        let response = response.error_for_status().map_err(failed)?;
        let body = response.bytes().await.map_err(failed)?;
        Ok(body.to_vec())
    }
}
