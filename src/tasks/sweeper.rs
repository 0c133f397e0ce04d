//! Expiration Sweeper Task
//!
//! Background task that periodically purges expired entries from both tiers.
//! A failing or panicking sweep is logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::CacheManager;

/// Handle to a running sweeper.
///
/// Dropping the handle leaves the task running; call [`SweeperHandle::shutdown`]
/// to stop it cleanly.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(err) = self.task.await {
            if !err.is_cancelled() {
                error!(error = %err, "sweeper task ended abnormally");
            }
        }
    }

    /// Aborts the sweeper without waiting.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns the sweeper on the current tokio runtime.
///
/// Every `interval` the sweeper runs [`CacheManager::cleanup_expired`] on the
/// blocking pool, since the persistent tier does disk I/O.
///
/// # Example
/// ```ignore
/// let manager = Arc::new(CacheManager::from_config(&config)?);
/// let sweeper = spawn_sweeper(manager.clone(), config.sweep_period());
/// // Later, during shutdown:
/// sweeper.shutdown().await;
/// ```
pub fn spawn_sweeper(manager: Arc<CacheManager>, interval: Duration) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs_f64(), "starting expiration sweeper");

        let mut detached = false;

        loop {
            if detached {
                tokio::time::sleep(interval).await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    changed = shutdown_rx.changed() => {
                        match changed {
                            Ok(()) if *shutdown_rx.borrow() => break,
                            Ok(()) => continue,
                            // Handle dropped: keep sweeping for the runtime's lifetime
                            Err(_) => {
                                detached = true;
                                continue;
                            }
                        }
                    }
                }
            }

            let manager = Arc::clone(&manager);
            match tokio::task::spawn_blocking(move || manager.cleanup_expired()).await {
                Ok(report) => {
                    if let Some(err) = &report.persistent_error {
                        warn!(
                            memory = report.memory,
                            error = %err,
                            "sweep skipped persistent tier"
                        );
                    } else if report.total() > 0 {
                        info!(
                            memory = report.memory,
                            persistent = report.persistent,
                            "sweep removed expired entries"
                        );
                    } else {
                        debug!("sweep found no expired entries");
                    }
                }
                Err(err) => error!(error = %err, "sweep panicked"),
            }
        }

        info!("expiration sweeper stopped");
    });

    SweeperHandle { shutdown_tx, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Tier;
    use crate::config::Config;
    use tempfile::TempDir;

    fn create_test_manager() -> (Arc<CacheManager>, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let config = Config {
            cache_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        (Arc::new(CacheManager::from_config(&config).unwrap()), temp_dir)
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let (manager, _dir) = create_test_manager();
        manager.set("expire_soon", &"value", Some(1), Tier::Both).unwrap();

        let sweeper = spawn_sweeper(manager.clone(), Duration::from_millis(500));

        // Wait for entry to expire and a sweep to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(manager.memory().peek("expire_soon").is_none());
        assert!(manager.persistent().peek("expire_soon").is_none());

        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let (manager, _dir) = create_test_manager();
        manager.set("long_lived", &"value", Some(3600), Tier::Both).unwrap();

        let sweeper = spawn_sweeper(manager.clone(), Duration::from_millis(200));
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert!(manager.memory().peek("long_lived").is_some());
        assert!(manager.persistent().peek("long_lived").is_some());

        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_survives_failed_sweeps() {
        let (manager, dir) = create_test_manager();
        let sweeper = spawn_sweeper(manager.clone(), Duration::from_millis(100));

        manager.set("mem_only", &1, Some(1), Tier::Memory).unwrap();

        // Removing the directory makes every persistent sweep fail
        std::fs::remove_dir_all(dir.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(!sweeper.is_finished(), "sweeper must keep running after errors");
        assert!(manager.memory().peek("mem_only").is_none());
        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_shutdown_stops_task() {
        let (manager, _dir) = create_test_manager();
        let sweeper = spawn_sweeper(manager, Duration::from_secs(3600));

        tokio::time::timeout(Duration::from_secs(2), sweeper.shutdown())
            .await
            .expect("shutdown should complete promptly");
    }

    #[tokio::test]
    async fn test_sweeper_can_be_aborted() {
        let (manager, _dir) = create_test_manager();
        let sweeper = spawn_sweeper(manager, Duration::from_secs(1));

        sweeper.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sweeper.is_finished(), "Task should be finished after abort");
    }
}
