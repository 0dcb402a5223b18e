//! Provider trait for datagram sources

use crate::Result;
use crate::types::Datagram;

/// A source of received byte blocks.
///
/// Providers own their transport and their own pacing; the driver simply
/// asks for the next block until told the source has ended.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Wait for the next datagram.
    ///
    /// Returns:
    /// - `Ok(Some(datagram))` - a block was received
    /// - `Ok(None)` - the source ended (normal termination)
    /// - `Err(e)` - transport failure
    ///
    /// Idle periods are not errors; a live listener simply keeps waiting.
    async fn next_datagram(&mut self) -> Result<Option<Datagram>>;

    /// Short label used in logs.
    fn describe(&self) -> String;
}
