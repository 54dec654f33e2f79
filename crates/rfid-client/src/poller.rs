//! Periodic dashboard refresh.
//!
//! Each tick spawns an independent fetch; fetches already in flight are never
//! cancelled. Results are stamped with a monotonic sequence number and only
//! published when newer than the last applied one, so a slow response can
//! not overwrite a fresher snapshot.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::ApiError;
use crate::models::StatsSnapshot;
use crate::services::DashboardService;

/// Latest poll outcome.
#[derive(Debug, Clone)]
pub enum PollUpdate {
    /// No fetch has completed yet.
    Pending,
    Snapshot(Arc<StatsSnapshot>),
    Failed(Arc<ApiError>),
}

struct PollState {
    issued: AtomicU64,
    applied: Mutex<u64>,
    updates: watch::Sender<PollUpdate>,
}

impl PollState {
    fn apply(&self, seq: u64, result: Result<StatsSnapshot, ApiError>) {
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        if seq <= *applied {
            tracing::debug!(seq, applied = *applied, "Discarding stale dashboard response");
            return;
        }
        *applied = seq;

        let update = match result {
            Ok(snapshot) => PollUpdate::Snapshot(Arc::new(snapshot)),
            Err(e) => {
                tracing::warn!(seq, error = %e, "Dashboard refresh failed");
                PollUpdate::Failed(Arc::new(e))
            }
        };
        self.updates.send_replace(update);
    }
}

/// Background refresher publishing on a watch channel.
pub struct StatsPoller {
    ticker: JoinHandle<()>,
    updates: watch::Receiver<PollUpdate>,
}

impl StatsPoller {
    /// Poll the dashboard endpoint every `interval`, starting immediately.
    pub fn for_service(service: DashboardService, interval: Duration) -> Self {
        Self::spawn(interval, move || {
            let service = service.clone();
            async move { service.get_stats().await }
        })
    }

    /// Run `fetch` now and then every `interval`.
    pub fn spawn<F, Fut>(interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StatsSnapshot, ApiError>> + Send + 'static,
    {
        let (tx, updates) = watch::channel(PollUpdate::Pending);
        let state = Arc::new(PollState {
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
            updates: tx,
        });
        let fetch = Arc::new(fetch);

        let ticker = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let seq = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::trace!(seq, "Dashboard refresh triggered");

                let fetch = Arc::clone(&fetch);
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let result = fetch().await;
                    state.apply(seq, result);
                });
            }
        });

        Self { ticker, updates }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollUpdate> {
        self.updates.clone()
    }

    pub fn latest(&self) -> PollUpdate {
        self.updates.borrow().clone()
    }

    /// Suppress future refreshes. In-flight fetches still complete.
    pub fn stop(&self) {
        self.ticker.abort();
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}
