//! Transport-facing types shared by providers, the driver and connections.

mod datagram;
mod update_rate;

pub use datagram::Datagram;
pub use update_rate::UpdateRate;
