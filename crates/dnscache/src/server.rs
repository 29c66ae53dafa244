use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context as _;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::{Dispatcher, Upstream, UDP_BUF_CAPACITY};

/// Upper bound on a single wait for an incoming datagram
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A single UDP listener that answers queries one at a time.
pub struct DnsServer<U> {
    udp_socket: UdpSocket,
    dispatcher: Dispatcher<U>,
}

impl<U: Upstream> DnsServer<U> {
    pub async fn bind(addr: SocketAddr, dispatcher: Dispatcher<U>) -> anyhow::Result<Self> {
        let udp_socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("error while binding a UDP socket to {}", addr))?;

        Ok(DnsServer {
            udp_socket,
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.udp_socket
            .local_addr()
            .context("error while getting the local addr")
    }

    pub fn dispatcher(&self) -> &Dispatcher<U> {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> Dispatcher<U> {
        self.dispatcher
    }

    /// Serves queries until `shutdown` resolves.
    ///
    /// Errors while handling a single query are logged and never stop the loop.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        tokio::pin!(shutdown);

        tracing::info!(addr = ?self.local_addr()?, "Serving DNS queries");

        let mut recv = vec![0; UDP_BUF_CAPACITY];
        loop {
            let received = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutting down the DNS server");
                    break;
                }
                received = timeout(RECV_TIMEOUT, self.udp_socket.recv_from(&mut recv)) => received,
            };

            let (length, from) = match received {
                // Nothing arrived, go around and check for shutdown again
                Err(_) => continue,
                Ok(Err(e)) => {
                    tracing::debug!("UDP: error while reading a packet: {}", e);
                    continue;
                }
                Ok(Ok(received)) => received,
            };

            tracing::trace!(?from, length, "new UDP query");

            let reply = match self.dispatcher.handle(&recv[..length]).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(?from, "Error while answering a query: {:#}", e);
                    continue;
                }
            };

            if let Err(e) = self.udp_socket.send_to(&reply, from).await {
                // Do not propagate the error, as it's per-client and thus recoverable
                tracing::error!(?from, "Error while sending a DNS reply: {:#}", e);
            }
        }

        Ok(())
    }
}
