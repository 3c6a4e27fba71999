//! Background sweeper task for expired ephemeral state.
//!
//! The store removes expired entries lazily on access, but codes that
//! are never touched again would otherwise sit in the backend forever.
//! [`Sweeper`] runs [`EphemeralStore::sweep`] on a fixed interval from
//! a dedicated task and logs the outcome of every pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::traits::EphemeralStore;

/// Handle to a running sweep task.
///
/// Dropping the handle leaves the task running until the runtime shuts
/// down; call [`Sweeper::shutdown`] to stop it promptly and wait for
/// the in-flight pass to finish.
pub struct Sweeper {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

impl Sweeper {
    /// Spawn a sweep task that runs `store.sweep()` every `interval`.
    ///
    /// The first pass fires immediately, then the task ticks at the
    /// configured cadence. Sweep errors are logged and do not stop the
    /// task.
    pub fn spawn<S>(store: Arc<S>, interval: Duration) -> Self
    where
        S: EphemeralStore + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => match store.sweep().await {
                        Ok(report) if report.is_quiet() => {
                            tracing::debug!("sweep pass: nothing to remove");
                        }
                        Ok(report) => {
                            tracing::info!(%report, "sweep pass removed expired entries");
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "sweep pass failed");
                        }
                    },
                    _ = stopped.changed() => break,
                }
            }
        });

        Self { handle, stop }
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn shutdown(self) {
        // Receiver is owned by the task; if it already exited the send
        // fails and the join below returns right away.
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use carepass_core::clock::ManualClock;
    use carepass_core::code::{CodePrefix, ShareCode};
    use carepass_core::entity::RecordBundle;

    use crate::memory::MemoryStore;
    use crate::traits::Lookup;

    fn bundle(code: &ShareCode, created_at: i64, ttl: i64) -> RecordBundle {
        RecordBundle::new(code.clone(), vec![1, 2, 3].into(), created_at, ttl)
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_bundles() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(MemoryStore::new(clock.shared()));

        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 1_000, 500)).await.unwrap();

        clock.advance(1_000);
        let sweeper = Sweeper::spawn(Arc::clone(&store), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.shutdown().await;

        // Swept rows are gone entirely, not just marked expired.
        assert!(matches!(
            store.get_bundle(&code).await.unwrap(),
            Lookup::Missing
        ));
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_task() {
        let clock = ManualClock::new(0);
        let store = Arc::new(MemoryStore::new(clock.shared()));

        let sweeper = Sweeper::spawn(Arc::clone(&store), Duration::from_millis(5));
        sweeper.shutdown().await;

        // After shutdown the task no longer sweeps: a bundle expired
        // now stays in the backend (reported Expired, not Missing).
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 0, 100)).await.unwrap();
        clock.advance(200);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(matches!(
            store.get_bundle(&code).await.unwrap(),
            Lookup::Expired
        ));
    }
}
