//! Connections: a running driver plus the handles observers need.

use futures::{Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionSettings;
use crate::driver::{Driver, Update};
use crate::pipeline::Pipeline;
use crate::provider::Provider;
use crate::providers::{ReplayProvider, UdpProvider};
use crate::stream::ThrottleExt;
use crate::tracking::{SourceKey, TrackingEntry, TrackingTable};
use crate::types::UpdateRate;
use crate::Result;

/// A running decode session.
///
/// Dropping the connection stops the receive task.
pub struct Connection {
    updates: watch::Receiver<Option<Arc<Update>>>,
    /// Receiver created with the driver; the first subscriber takes it and
    /// sees every update since the session started.
    primed: Mutex<Option<broadcast::Receiver<Arc<Update>>>>,
    /// Later subscribers start from the next update.
    outcomes: broadcast::Receiver<Arc<Update>>,
    tracking: watch::Receiver<Arc<TrackingTable>>,
    /// Expected sender rate, used to decide when throttling applies.
    nominal_rate_hz: f64,
    local_addr: Option<SocketAddr>,
    cancel: CancellationToken,
}

impl Connection {
    /// Bind a UDP listener and start decoding.
    pub async fn listen(settings: SessionSettings) -> Result<Self> {
        let pipeline = Pipeline::new(&settings)?;
        let provider = UdpProvider::bind(&settings.listen).await?;
        let local_addr = provider.local_addr();

        let mut connection = Self::start(provider, pipeline, &settings);
        connection.local_addr = Some(local_addr);
        Ok(connection)
    }

    /// Decode a capture instead of live traffic.
    pub fn replay(provider: ReplayProvider, settings: SessionSettings) -> Result<Self> {
        Self::from_provider(provider, settings)
    }

    /// Decode datagrams from any provider.
    pub fn from_provider<P: Provider>(provider: P, settings: SessionSettings) -> Result<Self> {
        let pipeline = Pipeline::new(&settings)?;
        Ok(Self::start(provider, pipeline, &settings))
    }

    fn start<P: Provider>(provider: P, pipeline: Pipeline, settings: &SessionSettings) -> Self {
        info!(
            source = %provider.describe(),
            checksum = ?pipeline.checksum_mode(),
            convert_units = settings.convert_units,
            source_filter = ?settings.source_filter,
            "Starting decode session"
        );

        let channels = Driver::spawn(provider, pipeline);
        Self {
            updates: channels.updates,
            outcomes: channels.outcomes.resubscribe(),
            primed: Mutex::new(Some(channels.outcomes)),
            tracking: channels.tracking,
            nominal_rate_hz: settings.nominal_rate_hz,
            local_addr: None,
            cancel: channels.cancel,
        }
    }

    /// Stream of processed datagrams, ending when the receive task exits.
    ///
    /// `UpdateRate::Native` yields every update in order. A subscriber that
    /// falls more than [`UPDATE_BUFFER`](crate::driver::UPDATE_BUFFER) updates
    /// behind skips the oldest and a warning is logged. `UpdateRate::Max`
    /// below the nominal sender rate delivers only the newest update per
    /// interval. Counters in the tracking table are not affected by what a
    /// subscriber skips.
    pub fn updates(&self, rate: UpdateRate) -> impl Stream<Item = Arc<Update>> + Send + 'static {
        let receiver = match self.primed.lock() {
            Ok(mut primed) => primed.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
        .unwrap_or_else(|| self.outcomes.resubscribe());

        let updates = BroadcastStream::new(receiver).filter_map(|item| async move {
            match item {
                Ok(update) => Some(update),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Update subscriber lagged, skipping oldest updates");
                    None
                }
            }
        });

        match rate.throttle_interval(self.nominal_rate_hz) {
            None => updates.boxed(),
            Some(period) => updates.throttle(period).boxed(),
        }
    }

    /// Stream of tracking table snapshots, one per processed datagram at most.
    pub fn tracking_updates(&self) -> impl Stream<Item = Arc<TrackingTable>> + Send + 'static {
        WatchStream::new(self.tracking.clone())
    }

    /// Most recent update, if any datagram has been processed and the source is still live.
    pub fn latest(&self) -> Option<Arc<Update>> {
        self.updates.borrow().clone()
    }

    /// Current tracking table.
    pub fn tracking(&self) -> Arc<TrackingTable> {
        Arc::clone(&self.tracking.borrow())
    }

    /// Copy of one source's entry, or `None` if it has never reported.
    pub fn snapshot(&self, source: impl Into<SourceKey>) -> Option<TrackingEntry> {
        self.tracking.borrow().snapshot(source)
    }

    /// Bound address for UDP sessions.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn nominal_rate_hz(&self) -> f64 {
        self.nominal_rate_hz
    }

    /// Stop the receive task. Streams end once it exits.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!("Dropping connection");
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_frame;
    use std::time::Duration;

    fn capture(frames: usize) -> ReplayProvider {
        let datagrams = (0..frames).map(|i| sample_frame((i % 3) as u8).to_vec()).collect();
        ReplayProvider::new(datagrams)
    }

    #[tokio::test]
    async fn replay_reaches_every_source() {
        let _ = tracing_subscriber::fmt::try_init();

        let connection = Connection::replay(capture(30).paced(500.0).unwrap(), SessionSettings::default()).unwrap();
        let mut tables = connection.tracking_updates();

        let table = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(table) = tables.next().await {
                if table.total_packets() == 30 {
                    return Some(table);
                }
            }
            None
        })
        .await
        .unwrap()
        .unwrap();

        for source in 0..3u8 {
            assert_eq!(table.snapshot(source).unwrap().packet_count, 10);
        }
        assert_eq!(connection.snapshot(2).unwrap().packet_count, 10);
        assert_eq!(connection.snapshot(9), None);
    }

    #[tokio::test]
    async fn throttled_updates_skip_but_table_counts_all() {
        let connection = Connection::replay(capture(40).paced(400.0).unwrap(), SessionSettings::default()).unwrap();

        let seen: Vec<Arc<Update>> = tokio::time::timeout(
            Duration::from_secs(5),
            connection.updates(UpdateRate::Max(20)).collect(),
        )
        .await
        .unwrap();

        assert!(seen.len() < 40);
        assert!(seen.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
        assert_eq!(connection.tracking().total_packets(), 40);
    }

    #[tokio::test]
    async fn invalid_settings_fail_before_start() {
        let settings = SessionSettings::default().timecode_fps(Some(0.5));
        assert!(Connection::replay(capture(1), settings).is_err());
    }

    #[tokio::test]
    async fn close_ends_update_stream() {
        let connection = Connection::replay(capture(1_000).paced(50.0).unwrap(), SessionSettings::default()).unwrap();
        let mut updates = connection.updates(UpdateRate::Native);
        assert!(updates.next().await.is_some());

        connection.close();
        assert!(connection.is_closed());
        let drained = tokio::time::timeout(Duration::from_secs(2), async { while updates.next().await.is_some() {} }).await;
        assert!(drained.is_ok());
    }

    #[tokio::test]
    async fn native_updates_are_lossless() {
        let datagrams = (0..200).map(|i| if i % 2 == 0 { sample_frame(4).to_vec() } else { vec![0xD1; 3] }).collect();
        let connection = Connection::replay(ReplayProvider::new(datagrams), SessionSettings::default()).unwrap();

        let seen: Vec<Arc<Update>> =
            tokio::time::timeout(Duration::from_secs(5), connection.updates(UpdateRate::Native).collect())
                .await
                .unwrap();

        assert_eq!(seen.len(), 200);
        assert!(seen.iter().zip(1u64..).all(|(update, expected)| update.sequence == expected));
        assert_eq!(seen.iter().filter(|update| !update.outcome.is_accepted()).count(), 100);
        assert_eq!(connection.snapshot(SourceKey::Unknown).unwrap().error_count, 100);
    }

    #[tokio::test]
    async fn later_subscribers_start_from_the_next_update() {
        let connection = Connection::replay(capture(1_000).paced(200.0).unwrap(), SessionSettings::default()).unwrap();
        let mut first = connection.updates(UpdateRate::Native);
        let opening = first.next().await.unwrap();
        assert_eq!(opening.sequence, 1);

        let mut second = connection.updates(UpdateRate::Native);
        let joined = second.next().await.unwrap();
        assert!(joined.sequence > opening.sequence);
        connection.close();
    }
}
