use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context as _;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// How long to wait for the forwarder's reply
pub const FORWARDER_TIMEOUT: Duration = Duration::from_secs(1);
/// Largest possible UDP payload; the query may advertise a big EDNS buffer to the upstream
const MAX_UDP_PAYLOAD: usize = 65535;

/// Outcome of a single exchange with the upstream resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Forwarded {
    /// Raw reply bytes, exactly as received
    Reply(Vec<u8>),
    /// No reply arrived in time
    TimedOut,
}

/// Abstracts the upstream resolver to simplify testing the dispatcher
pub trait Upstream {
    fn ask(&self, query: &[u8]) -> impl Future<Output = anyhow::Result<Forwarded>>;
}

/// Forwards raw queries to a single upstream resolver over UDP
#[derive(Debug, Clone)]
pub struct Forwarder {
    upstream_resolver: SocketAddr,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(upstream_resolver: SocketAddr) -> Self {
        Forwarder::with_timeout(upstream_resolver, FORWARDER_TIMEOUT)
    }

    pub fn with_timeout(upstream_resolver: SocketAddr, timeout: Duration) -> Self {
        Forwarder {
            upstream_resolver,
            timeout,
        }
    }

    pub fn upstream_resolver(&self) -> SocketAddr {
        self.upstream_resolver
    }
}

impl Upstream for Forwarder {
    async fn ask(&self, query: &[u8]) -> anyhow::Result<Forwarded> {
        let bind_addr: SocketAddr = if self.upstream_resolver.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .context("UDP: unable to bind a socket")?;
        socket
            .connect(self.upstream_resolver)
            .await
            .context("UDP: error while connecting to the upstream resolver")?;
        socket
            .send(query)
            .await
            .context("UDP: error while forwarding a DNS query")?;

        let mut buf = vec![0; MAX_UDP_PAYLOAD];
        match timeout(self.timeout, socket.recv(&mut buf)).await {
            Ok(received) => {
                let length = received.context("UDP: error while reading the reply")?;
                buf.truncate(length);
                Ok(Forwarded::Reply(buf))
            }
            Err(_) => {
                tracing::debug!(resolver = ?self.upstream_resolver, "Upstream resolver timed out");
                Ok(Forwarded::TimedOut)
            }
        }
    }
}
