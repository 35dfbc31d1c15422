//! Session worker
//!
//! Periodically purges expired sessions so idle entries do not pile up
//! between lookups. Runs off the request path.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::session::SessionStore;

pub struct SessionWorker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SessionWorker {
    /// Start purging `store` every `interval`. The first sweep runs one
    /// interval after start.
    pub fn spawn(store: Arc<SessionStore>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Session worker started (every {}s)", interval.as_secs());

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = store.purge_expired();
                        debug!(
                            "Session sweep removed {} session(s), {} active",
                            purged,
                            store.active_session_count()
                        );
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Session worker stopped");
        });

        Self { shutdown_tx, handle }
    }

    /// Signal the worker and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
