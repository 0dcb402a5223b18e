//! Driver spawns and manages the receive task

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::pipeline::{Outcome, Pipeline};
use crate::provider::Provider;
use crate::rate::{PacketRate, RateSample};
use crate::tracking::TrackingTable;

/// Consecutive provider failures tolerated before the driver gives up.
pub const MAX_PROVIDER_ERRORS: u32 = 10;

/// Updates buffered per subscriber before a slow one starts skipping.
pub const UPDATE_BUFFER: usize = 1024;

/// One processed datagram, as published to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// 1-based position in the stream of received datagrams.
    pub sequence: u64,
    pub origin: Option<SocketAddr>,
    pub received_at: Instant,
    pub outcome: Outcome,
    /// Arrival rate across all sources.
    pub rate: Option<RateSample>,
}

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Latest update; `None` before the first datagram and after the source ends.
    pub updates: watch::Receiver<Option<Arc<Update>>>,
    /// Every update in order; closes when the task exits.
    pub outcomes: broadcast::Receiver<Arc<Update>>,
    /// Tracking table as of the latest update.
    pub tracking: watch::Receiver<Arc<TrackingTable>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Runs a provider through a pipeline on one task.
///
/// The task owns both, so the tracking table is only ever touched from one
/// place; observers see immutable snapshots.
pub struct Driver;

impl Driver {
    pub fn spawn<P>(provider: P, pipeline: Pipeline) -> DriverChannels
    where
        P: Provider,
    {
        let (update_tx, update_rx) = watch::channel(None);
        let (outcome_tx, outcome_rx) = broadcast::channel(UPDATE_BUFFER);
        let (tracking_tx, tracking_rx) = watch::channel(Arc::new(pipeline.tracking().clone()));
        let cancel = CancellationToken::new();

        let cancel_task = cancel.clone();
        tokio::spawn(async move {
            Self::receive_task(provider, pipeline, update_tx, outcome_tx, tracking_tx, cancel_task).await;
        });

        DriverChannels { updates: update_rx, outcomes: outcome_rx, tracking: tracking_rx, cancel }
    }

    async fn receive_task<P>(
        mut provider: P,
        mut pipeline: Pipeline,
        update_tx: watch::Sender<Option<Arc<Update>>>,
        outcome_tx: broadcast::Sender<Arc<Update>>,
        tracking_tx: watch::Sender<Arc<TrackingTable>>,
        cancel: CancellationToken,
    ) where
        P: Provider,
    {
        let source = provider.describe();
        info!(%source, "Receive task started");

        let mut rate = PacketRate::new();
        let mut sequence = 0u64;
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(%source, "Receive task cancelled");
                    break;
                }
                result = provider.next_datagram() => result,
            };

            match result {
                Ok(Some(datagram)) => {
                    error_count = 0;
                    sequence += 1;

                    let outcome = pipeline.process(&datagram.payload);
                    let sample = rate.record(datagram.received_at);
                    trace!(sequence, len = datagram.len(), source = %outcome.source, "Datagram processed");

                    let update = Update {
                        sequence,
                        origin: datagram.origin,
                        received_at: datagram.received_at,
                        outcome,
                        rate: sample,
                    };

                    let update = Arc::new(update);
                    tracking_tx.send_replace(Arc::new(pipeline.tracking().clone()));
                    // No subscribers is fine; the watch channel decides liveness.
                    let _ = outcome_tx.send(Arc::clone(&update));
                    if update_tx.send(Some(update)).is_err() {
                        debug!("Update receivers dropped, shutting down");
                        break;
                    }
                }
                Ok(None) => {
                    info!(%source, datagrams = sequence, "Source ended");
                    let _ = update_tx.send(None);
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!(%source, "Provider error ({}/{}): {}", error_count, MAX_PROVIDER_ERRORS, e);

                    if !e.is_retryable() || error_count >= MAX_PROVIDER_ERRORS {
                        warn!(%source, suggestions = ?e.recovery_suggestions(), "Giving up on provider");
                        let _ = update_tx.send(None);
                        break;
                    }

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff(error_count)) => {}
                    }
                }
            }
        }

        let table = pipeline.tracking();
        info!(
            %source,
            datagrams = sequence,
            packets = table.total_packets(),
            errors = table.total_errors(),
            "Receive task ended"
        );
    }
}

/// Delay after the `error_count`th consecutive provider error:
/// 50ms, 100ms, 200ms, ... capped at 1.6s.
fn backoff(error_count: u32) -> Duration {
    Duration::from_millis(50u64 << error_count.saturating_sub(1).min(5))
}
