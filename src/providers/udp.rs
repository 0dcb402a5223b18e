//! Live UDP listener

use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{info, trace, warn};

use crate::config::ListenSettings;
use crate::provider::Provider;
use crate::types::Datagram;
use crate::{FreedError, Result};

/// Receives FreeD datagrams on a bound UDP socket.
///
/// Each `recv` returns one whole datagram; nothing is buffered or
/// reassembled across datagrams.
pub struct UdpProvider {
    socket: UdpSocket,
    local_addr: SocketAddr,
    buffer: Vec<u8>,
}

impl UdpProvider {
    /// Bind the listening socket described by `settings`.
    pub async fn bind(settings: &ListenSettings) -> Result<Self> {
        let addr = settings.addr();
        let socket = UdpSocket::bind(addr).await.map_err(|e| FreedError::bind_failed(addr, e))?;

        if settings.broadcast {
            if let Err(error) = socket.set_broadcast(true) {
                warn!(error = %error, "Could not enable broadcast reception");
            }
        }

        let local_addr = socket.local_addr().map_err(|e| FreedError::bind_failed(addr, e))?;
        info!(addr = %local_addr, recv_buffer = settings.recv_buffer, "FreeD listener bound");

        Ok(Self { socket, local_addr, buffer: vec![0; settings.recv_buffer] })
    }

    /// Address actually bound, useful when port 0 was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait::async_trait]
impl Provider for UdpProvider {
    async fn next_datagram(&mut self) -> Result<Option<Datagram>> {
        let (len, origin) = self.socket.recv_from(&mut self.buffer).await.map_err(FreedError::receive_failed)?;
        trace!(len, origin = %origin, "Datagram received");
        Ok(Some(Datagram::new(self.buffer[..len].to_vec(), Some(origin))))
    }

    fn describe(&self) -> String {
        format!("udp://{}", self.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback() -> ListenSettings {
        ListenSettings { host: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 0, broadcast: false, ..Default::default() }
    }

    #[tokio::test]
    async fn receives_whole_datagrams() {
        let mut provider = UdpProvider::bind(&loopback()).await.unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        sender.send_to(&[0xD1; 29], provider.local_addr()).await.unwrap();
        sender.send_to(&[1, 2, 3], provider.local_addr()).await.unwrap();

        let first = provider.next_datagram().await.unwrap().unwrap();
        assert_eq!(first.payload, vec![0xD1; 29]);
        assert_eq!(first.origin, Some(sender.local_addr().unwrap()));

        let second = provider.next_datagram().await.unwrap().unwrap();
        assert_eq!(second.payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = UdpProvider::bind(&loopback()).await.unwrap();
        let taken = ListenSettings { port: first.local_addr().port(), ..loopback() };

        match UdpProvider::bind(&taken).await {
            Err(FreedError::Bind { addr, .. }) => assert_eq!(addr, taken.addr()),
            Err(other) => panic!("Expected Bind error, got {:?}", other),
            Ok(_) => panic!("Second bind on the same port should fail"),
        }
    }
}
