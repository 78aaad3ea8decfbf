//! TCP banner probe
//!
//! Optionally writes a trigger payload, then reads whatever the service
//! volunteers within the idle window.

use super::Probe;
use crate::connection::TimedConnection;
use crate::target::ScanTarget;
use async_trait::async_trait;
use serde_json::json;

const DEFAULT_MAX_BANNER_LEN: usize = 1024;

pub struct BannerProbe {
    payload: Option<Vec<u8>>,
    max_len: usize,
}

impl Default for BannerProbe {
    fn default() -> Self {
        Self {
            payload: None,
            max_len: DEFAULT_MAX_BANNER_LEN,
        }
    }
}

impl BannerProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload written before reading; services like HTTP need a nudge
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Cap on how many banner bytes are read
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

#[async_trait]
impl Probe for BannerProbe {
    fn name(&self) -> &str {
        "tcp-banner"
    }

    async fn run(
        &self,
        conn: &mut TimedConnection,
        _target: &ScanTarget,
    ) -> crate::Result<serde_json::Value> {
        if let Some(payload) = &self.payload {
            conn.write_all(payload).await?;
        }

        let mut buf = vec![0u8; self.max_len];
        let n = conn.read(&mut buf).await?;

        Ok(json!({
            "banner": String::from_utf8_lossy(&buf[..n]),
            "length": n,
        }))
    }
}
