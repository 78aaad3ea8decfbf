//! Deadline-bounded connections
//!
//! Wraps a TCP stream so every read and write re-arms an idle deadline
//! before executing. The window measures inactivity, not total elapsed
//! time: each completed operation resets it.

use crate::config::PipelineConfig;
use crate::target::ScanTarget;
use crate::ScanError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// One live connection to a scan target, closed on drop
#[derive(Debug)]
pub struct TimedConnection {
    stream: TcpStream,
    idle_timeout: Option<Duration>,
}

impl TimedConnection {
    /// Connect to `target` on the configured port. The dial itself is
    /// bounded by the idle timeout when one is configured; failure is a
    /// [`ScanError::Dial`] and the caller does not retry.
    pub async fn open(target: &ScanTarget, config: &PipelineConfig) -> crate::Result<Self> {
        let idle_timeout = config.idle_timeout();

        let connect = async {
            match target.ip {
                Some(ip) => TcpStream::connect(SocketAddr::new(ip, config.port)).await,
                // Domain-only targets resolve at dial time
                None => {
                    let domain = target.domain.as_deref().unwrap_or_default();
                    TcpStream::connect((domain, config.port)).await
                }
            }
        };

        let stream = match idle_timeout {
            Some(limit) => timeout(limit, connect)
                .await
                .map_err(|_| ScanError::Dial(format!("{}: connect timed out", target.label())))?,
            None => connect.await,
        }
        .map_err(|e| ScanError::Dial(format!("{}: {}", target.label(), e)))?;

        Ok(Self {
            stream,
            idle_timeout,
        })
    }

    /// Read into `buf`, bounded by a freshly armed idle deadline
    pub async fn read(&mut self, buf: &mut [u8]) -> crate::Result<usize> {
        match self.idle_timeout {
            Some(limit) => timeout(limit, self.stream.read(buf))
                .await
                .map_err(|_| ScanError::IoTimeout)?
                .map_err(ScanError::from),
            None => self.stream.read(buf).await.map_err(ScanError::from),
        }
    }

    /// Write all of `buf`, bounded by a freshly armed idle deadline
    pub async fn write_all(&mut self, buf: &[u8]) -> crate::Result<()> {
        match self.idle_timeout {
            Some(limit) => timeout(limit, self.stream.write_all(buf))
                .await
                .map_err(|_| ScanError::IoTimeout)?
                .map_err(ScanError::from),
            None => self.stream.write_all(buf).await.map_err(ScanError::from),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;
    use tokio::time::sleep;

    fn config_for(port: u16, timeout_secs: u64) -> PipelineConfig {
        PipelineConfig::new(port)
            .with_workers(1)
            .with_idle_timeout_secs(timeout_secs)
    }

    async fn local_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn dial_failure_is_a_dial_error() {
        // Bind then drop to find a port with nothing listening
        let (listener, port) = local_listener().await;
        drop(listener);

        let target = ScanTarget::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let err = TimedConnection::open(&target, &config_for(port, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Dial(_)));
    }

    #[tokio::test]
    async fn blocked_read_times_out() {
        let (listener, port) = local_listener().await;
        tokio::spawn(async move {
            // Accept and hold the connection open without writing
            let (_socket, _) = listener.accept().await.unwrap();
            sleep(Duration::from_secs(30)).await;
        });

        let target = ScanTarget::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut conn = TimedConnection::open(&target, &config_for(port, 1))
            .await
            .unwrap();

        let mut buf = [0u8; 16];
        let err = conn.read(&mut buf).await.unwrap_err();
        assert!(matches!(err, ScanError::IoTimeout));
    }

    #[tokio::test]
    async fn deadline_rearms_per_operation() {
        let (listener, port) = local_listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Four writes spaced so each gap is under the 1s idle window
            // while the total comfortably exceeds it
            for _ in 0..4 {
                sleep(Duration::from_millis(400)).await;
                socket.write_all(b"x").await.unwrap();
            }
        });

        let target = ScanTarget::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut conn = TimedConnection::open(&target, &config_for(port, 1))
            .await
            .unwrap();

        let mut buf = [0u8; 1];
        for _ in 0..4 {
            let n = conn.read(&mut buf).await.unwrap();
            assert_eq!(n, 1);
        }
    }
}
