use std::net::SocketAddr;
use std::time::Instant;

/// One received byte block, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Vec<u8>,
    /// Sender address; `None` for replayed captures.
    pub origin: Option<SocketAddr>,
    pub received_at: Instant,
}

impl Datagram {
    pub fn new(payload: Vec<u8>, origin: Option<SocketAddr>) -> Self {
        Self { payload, origin, received_at: Instant::now() }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
