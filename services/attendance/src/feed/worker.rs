//! Background change feed worker.
//!
//! The worker holds one long-lived subscription to the attendance store's
//! change feed and runs until shutdown:
//! 1. Subscribe to the feed
//! 2. Interpret each event as it arrives
//! 3. Spawn one delivery task per signal and move on immediately
//! 4. If the feed errors, log and continue; if it ends, resubscribe after a pause
//!
//! In-flight deliveries are capped by a semaphore. The cap is applied inside the
//! delivery tasks, so a slow push gateway never stalls feed consumption.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rollcall_model::ChangeEvent;
use tokio::sync::{watch, Semaphore};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn, Instrument};

use super::interpreter::{interpret, EntryObserved};
use crate::db::AttendanceStore;
use crate::notify::NotificationDispatcher;

/// Upper bound for `max_in_flight`; shutdown drains by acquiring every permit at once.
pub const MAX_IN_FLIGHT_LIMIT: usize = {
    let u32_max = u32::MAX as usize;
    if Semaphore::MAX_PERMITS < u32_max {
        Semaphore::MAX_PERMITS
    } else {
        u32_max
    }
};

/// Configuration for the change feed worker.
#[derive(Debug, Clone)]
pub struct FeedWorkerConfig {
    /// Maximum number of notifications being delivered at once.
    pub max_in_flight: usize,

    /// How long to wait before resubscribing after the feed is lost.
    pub retry_interval: Duration,

    /// How long shutdown waits for in-flight deliveries.
    pub drain_timeout: Duration,

    /// How often to log progress (in events processed).
    pub log_interval: u64,
}

impl Default for FeedWorkerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 32,
            retry_interval: Duration::from_millis(1000),
            drain_timeout: Duration::from_secs(10),
            log_interval: 1000,
        }
    }
}

/// Background worker that turns change events into notifications.
pub struct ChangeFeedWorker {
    store: Arc<dyn AttendanceStore>,
    dispatcher: NotificationDispatcher,
    deliveries: Arc<Semaphore>,
    config: FeedWorkerConfig,
}

impl ChangeFeedWorker {
    /// Create a new change feed worker.
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        dispatcher: NotificationDispatcher,
        mut config: FeedWorkerConfig,
    ) -> Self {
        config.max_in_flight = config.max_in_flight.clamp(1, MAX_IN_FLIGHT_LIMIT);
        Self {
            store,
            dispatcher,
            deliveries: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
        }
    }

    /// Run the worker until the shutdown signal is received.
    ///
    /// Feed errors never end the loop; only shutdown does.
    #[instrument(skip(self, shutdown), name = "change_feed_worker")]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            max_in_flight = self.config.max_in_flight,
            "Starting change feed worker"
        );

        let mut events_processed: u64 = 0;
        let mut signals_dispatched: u64 = 0;
        let mut last_log_count: u64 = 0;

        'subscription: loop {
            if *shutdown.borrow() {
                break;
            }

            let mut feed = match self.store.subscribe().await {
                Ok(feed) => feed,
                Err(e) => {
                    error!(error = %e, "Failed to subscribe to change feed");
                    if self.pause_or_shutdown(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!(
                                events_processed = events_processed,
                                "Shutdown signal received, stopping change feed worker"
                            );
                            break 'subscription;
                        }
                    }
                    next = feed.next() => {
                        match next {
                            Some(Ok(event)) => {
                                signals_dispatched += self.handle_event(&event) as u64;
                                events_processed += 1;

                                if events_processed - last_log_count >= self.config.log_interval {
                                    info!(
                                        events_processed = events_processed,
                                        signals_dispatched = signals_dispatched,
                                        "Change feed worker progress"
                                    );
                                    last_log_count = events_processed;
                                }
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "Change feed error, continuing with next event");
                            }
                            None => {
                                warn!("Change feed ended, resubscribing");
                                break;
                            }
                        }
                    }
                }
            }

            if self.pause_or_shutdown(&mut shutdown).await {
                break;
            }
        }

        self.drain().await;
        info!(
            events_processed = events_processed,
            signals_dispatched = signals_dispatched,
            "Change feed worker stopped"
        );
    }

    /// Interpret one event and start a delivery for each resulting signal.
    ///
    /// Returns the number of deliveries started. Does not wait for any of them.
    pub fn handle_event(&self, event: &ChangeEvent) -> usize {
        let signals = interpret(event);
        debug!(
            student_id = %event.document_key,
            paths = event.changed_paths.len(),
            signals = signals.len(),
            "Interpreted change event"
        );

        let count = signals.len();
        for signal in signals {
            self.spawn_delivery(signal);
        }
        count
    }

    fn spawn_delivery(&self, signal: EntryObserved) {
        let dispatcher = self.dispatcher.clone();
        let deliveries = Arc::clone(&self.deliveries);
        let span = tracing::info_span!(
            "delivery",
            student_id = %signal.student_id,
            semester = %signal.semester,
            subject = %signal.subject,
            index = signal.index
        );

        tokio::spawn(
            async move {
                let Ok(_permit) = deliveries.acquire_owned().await else {
                    return;
                };
                dispatcher.dispatch(&signal).await;
            }
            .instrument(span),
        );
    }

    /// Sleep for the retry interval. Returns true if shutdown was requested.
    async fn pause_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
            _ = sleep(self.config.retry_interval) => false,
        }
    }

    /// Wait, up to the drain timeout, for in-flight deliveries to finish.
    async fn drain(&self) {
        let Ok(permits) = u32::try_from(self.config.max_in_flight) else {
            warn!(
                max_in_flight = self.config.max_in_flight,
                "In-flight limit too large to drain, skipping"
            );
            return;
        };
        match tokio::time::timeout(self.config.drain_timeout, self.deliveries.acquire_many(permits))
            .await
        {
            Ok(_) => debug!("All in-flight deliveries finished"),
            Err(_) => warn!(
                in_flight = self.config.max_in_flight - self.deliveries.available_permits(),
                "Shutting down with deliveries still in flight"
            ),
        }
    }
}
