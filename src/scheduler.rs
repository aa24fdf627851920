//! Periodic sync passes.

use remote_connector::{Connector, DriverConnector};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::engine::SyncEngine;

/// Owns the single auto-sync timer.
///
/// Starting replaces any running timer, so at most one is ever active.
/// Dropping the scheduler stops the timer.
pub struct AutoSyncScheduler<C: Connector + 'static = DriverConnector> {
    engine: Arc<SyncEngine<C>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Connector + 'static> AutoSyncScheduler<C> {
    pub fn new(engine: Arc<SyncEngine<C>>) -> Self {
        Self {
            engine,
            timer: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine<C>> {
        &self.engine
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a pass every `period`, the first one a full period from now.
    pub fn start(&self, period: Duration) -> anyhow::Result<()> {
        if period.is_zero() {
            anyhow::bail!("Sync interval must be greater than zero");
        }

        let mut timer = self.timer();
        if let Some(previous) = timer.take() {
            previous.abort();
            debug!("Replaced running auto-sync timer");
        }

        let engine = Arc::clone(&self.engine);
        *timer = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let engine = Arc::clone(&engine);
                // A panicking pass must not take the timer down with it.
                match tokio::spawn(async move { engine.run_sync().await }).await {
                    Ok(result) if result.success || result.status.is_none() => {
                        debug!("Auto-sync pass: {}", result.message)
                    }
                    Ok(result) => warn!("Auto-sync pass failed: {}", result.message),
                    Err(e) => error!("Auto-sync pass aborted: {e}"),
                }
            }
        }));

        info!("Auto-sync started, every {}s", period.as_secs());
        Ok(())
    }

    pub fn start_minutes(&self, minutes: u64) -> anyhow::Result<()> {
        let secs = minutes
            .checked_mul(60)
            .ok_or_else(|| anyhow::anyhow!("Sync interval too large: {minutes} minutes"))?;
        self.start(Duration::from_secs(secs))
    }

    /// Cancel the timer; returns whether one was running.
    pub fn stop(&self) -> bool {
        match self.timer().take() {
            Some(handle) => {
                handle.abort();
                info!("Auto-sync stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl<C: Connector + 'static> Drop for AutoSyncScheduler<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubConnector;
    use change_queue::LocalStore;
    use sync_core::{Dialect, RemoteSyncConfig, SyncOperation};

    fn scheduler() -> (AutoSyncScheduler<StubConnector>, StubConnector) {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        store
            .save_sync_config(&RemoteSyncConfig {
                enabled: true,
                driver: Dialect::MySql,
                host: "db.local".to_string(),
                database: "pdv".to_string(),
                user: "sync".to_string(),
                ..Default::default()
            })
            .unwrap();
        let stub = StubConnector::new();
        let engine = Arc::new(SyncEngine::with_connector(store, stub.clone()));
        (AutoSyncScheduler::new(engine), stub)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_pass_after_one_period() {
        let (scheduler, stub) = scheduler();
        scheduler.start_minutes(1).unwrap();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(stub.connects(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(stub.connects(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(stub.connects(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_timer() {
        let (scheduler, stub) = scheduler();
        scheduler.start(Duration::from_secs(60)).unwrap();
        scheduler.start(Duration::from_secs(300)).unwrap();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(stub.connects(), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(stub.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let (scheduler, stub) = scheduler();
        assert!(!scheduler.stop());

        scheduler.start_minutes(1).unwrap();
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(stub.connects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_passes_keep_timer_alive() {
        let (scheduler, stub) = scheduler();
        stub.fail_all(true);
        scheduler
            .engine()
            .store()
            .enqueue("products", SyncOperation::Update, 1, &Default::default());
        scheduler.start_minutes(1).unwrap();

        tokio::time::sleep(Duration::from_secs(181)).await;
        assert_eq!(stub.connects(), 3);
        assert!(scheduler.is_running());
        assert_eq!(scheduler.engine().store().pending_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let (scheduler, _stub) = scheduler();
        assert!(scheduler.start(Duration::ZERO).is_err());
        assert!(!scheduler.is_running());
    }
}
