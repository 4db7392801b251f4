//! Cross-platform TCP socket configuration.
//!
//! Encapsulates the socket options the client applies once a session goes
//! active: TCP_NODELAY so small state updates are not coalesced, and
//! keepalive so a silently dead host is eventually detected.

use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

/// Socket options applied to the reliable channel.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm for lower latency. Default: true.
    pub tcp_nodelay: bool,
    /// Enable TCP keepalive. Default: true.
    pub keepalive_enabled: bool,
    /// Keepalive idle time before the first probe. Default: 60s.
    pub keepalive_idle: Duration,
    /// Keepalive probe interval. Default: 10s.
    pub keepalive_interval: Duration,
    /// Probes before declaring the connection dead. Default: 3.
    pub keepalive_retries: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            keepalive_enabled: true,
            keepalive_idle: Duration::from_secs(60),
            keepalive_interval: Duration::from_secs(10),
            keepalive_retries: 3,
        }
    }
}

/// Apply socket configuration to a connected [`TcpStream`].
pub fn configure_stream(stream: &TcpStream, config: &SocketConfig) -> std::io::Result<()> {
    stream.set_nodelay(config.tcp_nodelay)?;

    if config.keepalive_enabled {
        let sock_ref = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(config.keepalive_idle)
            .with_interval(config.keepalive_interval);

        // Retries are supported on Linux and Windows but not macOS.
        #[cfg(any(target_os = "linux", target_os = "windows"))]
        let keepalive = keepalive.with_retries(config.keepalive_retries);

        sock_ref.set_tcp_keepalive(&keepalive)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn test_tcp_nodelay_is_set() {
        let (client, _server) = connected_pair().await;
        configure_stream(&client, &SocketConfig::default()).unwrap();
        assert!(client.nodelay().unwrap(), "TCP_NODELAY should be enabled");
    }

    #[tokio::test]
    async fn test_nodelay_disabled_when_configured() {
        let (client, _server) = connected_pair().await;
        let config = SocketConfig {
            tcp_nodelay: false,
            ..Default::default()
        };
        configure_stream(&client, &config).unwrap();
        assert!(!client.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_keepalive_is_configured() {
        let (client, _server) = connected_pair().await;
        configure_stream(&client, &SocketConfig::default()).unwrap();

        let sock_ref = SockRef::from(&client);
        assert!(sock_ref.keepalive().unwrap(), "Keepalive should be enabled");
    }

    #[tokio::test]
    async fn test_default_config_succeeds_on_this_platform() {
        let (client, _server) = connected_pair().await;
        let result = configure_stream(&client, &SocketConfig::default());
        assert!(result.is_ok(), "{:?}", result.err());
    }
}
