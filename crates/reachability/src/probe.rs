//! Active reachability checks used by the fallback probe.
//!
//! A check answers one question: can the host reach the outside world right
//! now? Every failure (timeout, DNS, refused connection, TLS, bad status) is
//! reported as `false`; checks never return errors.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::future::BoxFuture;
use reachability_core::logging::targets;
use tokio::net::TcpStream;

use crate::error::Result;

/// Default endpoint for [`HttpHeadCheck`].
pub const DEFAULT_PROBE_URL: &str = "http://connectivitycheck.gstatic.com/generate_204";

/// Default per-check timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// A single best-effort reachability check.
pub trait ReachabilityCheck: Send + Sync {
    /// Resolve to `true` if the outside world is reachable.
    fn check(&self) -> BoxFuture<'_, bool>;
}

/// Sends a HEAD request and treats any 2xx/3xx answer as reachable.
#[derive(Debug, Clone)]
pub struct HttpHeadCheck {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpHeadCheck {
    /// Check `url` with the given timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(format!("Reachability/{} (Rust)", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// The checked URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReachabilityCheck for HttpHeadCheck {
    fn check(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let request = self.client.head(&self.url).send();
            match tokio::time::timeout(self.timeout, request).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    let reachable = status.is_success() || status.is_redirection();
                    tracing::trace!(target: targets::PROBE, url = %self.url, %status, reachable, "probe response");
                    reachable
                }
                Ok(Err(err)) => {
                    tracing::trace!(target: targets::PROBE, url = %self.url, error = %err, "probe request failed");
                    false
                }
                Err(_) => {
                    tracing::trace!(target: targets::PROBE, url = %self.url, "probe timed out");
                    false
                }
            }
        })
    }
}

/// Attempts TCP connections to well-known endpoints; the first success wins.
#[derive(Debug, Clone)]
pub struct TcpConnectCheck {
    endpoints: Vec<SocketAddr>,
    timeout: Duration,
}

impl TcpConnectCheck {
    /// Check the given endpoints in order.
    pub fn new(endpoints: Vec<SocketAddr>, timeout: Duration) -> Self {
        Self { endpoints, timeout }
    }

    /// Cloudflare, Google DNS and OpenDNS.
    pub fn well_known(timeout: Duration) -> Self {
        let endpoints = vec![
            SocketAddr::new(Ipv4Addr::new(1, 1, 1, 1).into(), 80),
            SocketAddr::new(Ipv4Addr::new(8, 8, 8, 8).into(), 53),
            SocketAddr::new(Ipv4Addr::new(208, 67, 222, 222).into(), 53),
        ];
        Self::new(endpoints, timeout)
    }
}

impl ReachabilityCheck for TcpConnectCheck {
    fn check(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            for addr in &self.endpoints {
                if let Ok(Ok(_)) = tokio::time::timeout(self.timeout, TcpStream::connect(*addr)).await {
                    return true;
                }
                tracing::trace!(target: targets::PROBE, %addr, "tcp probe failed");
            }
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tcp_check_without_endpoints_is_unreachable() {
        let check = TcpConnectCheck::new(Vec::new(), Duration::from_millis(100));
        assert!(!check.check().await);
    }

    #[tokio::test]
    async fn test_tcp_check_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let check = TcpConnectCheck::new(vec![addr], Duration::from_secs(2));
        assert!(check.check().await);
    }

    #[tokio::test]
    async fn test_http_check_unroutable_is_unreachable() {
        // Port 9 on localhost is discard; nothing listens there in CI.
        let check = HttpHeadCheck::new("http://127.0.0.1:9/", Duration::from_millis(300)).unwrap();
        assert!(!check.check().await);
    }

    #[test]
    fn test_well_known_endpoints() {
        let check = TcpConnectCheck::well_known(DEFAULT_PROBE_TIMEOUT);
        assert_eq!(check.endpoints.len(), 3);
    }
}
