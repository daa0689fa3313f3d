//! Memoized one-shot synchronization.
//!
//! Document lookup, document creation and table DDL all run at most once per
//! instance. `SyncCell` holds the outcome as an explicit state machine:
//!
//! ```text
//! Unsynced ──run──▶ Syncing ──ok──▶ Synced(value)
//!                      │
//!                      └──err──▶ Failed(error) ──reset──▶ Unsynced
//! ```
//!
//! While a synchronization runs it holds the state lock. Concurrent callers
//! queue on that lock and read the settled state when it is released, so the backend sees a single
//! synchronization no matter how many callers raced. A failure is kept and
//! returned to every later caller until [`SyncCell::reset`] is called.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{OrmError, Result};

/// Observable phase of a [`SyncCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Unsynced,
    Syncing,
    Synced,
    Failed,
}

impl SyncStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Syncing,
            2 => Self::Synced,
            3 => Self::Failed,
            _ => Self::Unsynced,
        }
    }
}

#[derive(Debug)]
enum SyncState<T> {
    Unsynced,
    Synced(T),
    Failed(Arc<OrmError>),
}

#[derive(Debug)]
pub(crate) struct SyncCell<T> {
    state: Mutex<SyncState<T>>,
    /// Last phase written under the state lock, readable without it.
    phase: AtomicU8,
}

impl<T> Default for SyncCell<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(SyncState::Unsynced),
            phase: AtomicU8::new(SyncStatus::Unsynced as u8),
        }
    }
}

impl<T: Clone> SyncCell<T> {
    /// Return the settled value, running `sync` if nothing has run yet.
    pub(crate) async fn get_or_sync<F, Fut>(&self, sync: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = self.state.lock().await;
        match &*state {
            SyncState::Synced(value) => return Ok(value.clone()),
            SyncState::Failed(error) => return Err(OrmError::SyncFailed(error.clone())),
            SyncState::Unsynced => {}
        }

        self.set_phase(SyncStatus::Syncing);
        match sync().await {
            Ok(value) => {
                *state = SyncState::Synced(value.clone());
                self.set_phase(SyncStatus::Synced);
                Ok(value)
            }
            Err(error) => {
                let error = Arc::new(error);
                *state = SyncState::Failed(error.clone());
                self.set_phase(SyncStatus::Failed);
                Err(OrmError::SyncFailed(error))
            }
        }
    }

    /// The settled value, if synchronization succeeded.
    pub(crate) async fn get(&self) -> Option<T> {
        match &*self.state.lock().await {
            SyncState::Synced(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T> SyncCell<T> {
    /// Forget any settled outcome. Waits for an in-flight synchronization.
    pub(crate) async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = SyncState::Unsynced;
        self.set_phase(SyncStatus::Unsynced);
    }

    fn set_phase(&self, status: SyncStatus) {
        self.phase.store(status as u8, Ordering::SeqCst);
    }

    /// Current phase. A reader holding the lock briefly (`get`, `reset`)
    /// does not show up as `Syncing`.
    pub(crate) fn status(&self) -> SyncStatus {
        match self.state.try_lock() {
            // Settled state wins; it also covers a synchronization that was
            // cancelled before writing its outcome.
            Ok(state) => match &*state {
                SyncState::Unsynced => SyncStatus::Unsynced,
                SyncState::Synced(_) => SyncStatus::Synced,
                SyncState::Failed(_) => SyncStatus::Failed,
            },
            Err(_) => SyncStatus::from_u8(self.phase.load(Ordering::SeqCst)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_runs_once() {
        let cell: SyncCell<u32> = SyncCell::default();
        let runs = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cell
                .get_or_sync(|| async {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cell.status(), SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let cell: Arc<SyncCell<u32>> = Arc::new(SyncCell::default());
        let runs = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                let runs = runs.clone();
                tokio::spawn(async move {
                    cell.get_or_sync(|| async {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok(1)
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 1);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_sticks_until_reset() {
        let cell: SyncCell<u32> = SyncCell::default();

        let err = cell
            .get_or_sync(|| async {
                Err(ValidationError::RequiredField("id".to_string()).into())
            })
            .await
            .unwrap_err();
        assert!(matches!(err.root(), OrmError::Validation(_)));
        assert_eq!(cell.status(), SyncStatus::Failed);

        // Not retried automatically.
        let err = cell.get_or_sync(|| async { Ok(1) }).await.unwrap_err();
        assert!(matches!(err, OrmError::SyncFailed(_)));
        assert_eq!(cell.get().await, None);

        cell.reset().await;
        assert_eq!(cell.status(), SyncStatus::Unsynced);
        assert_eq!(cell.get_or_sync(|| async { Ok(2) }).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_status_while_locked() {
        let cell: Arc<SyncCell<u32>> = Arc::new(SyncCell::default());
        assert_eq!(cell.get_or_sync(|| async { Ok(3) }).await.unwrap(), 3);

        // A plain reader holding the lock is not a synchronization.
        {
            let _held = cell.state.lock().await;
            assert_eq!(cell.status(), SyncStatus::Synced);
        }

        cell.reset().await;
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let task = {
            let cell = cell.clone();
            tokio::spawn(async move {
                cell.get_or_sync(|| async move {
                    let _ = started_tx.send(());
                    let _ = release_rx.await;
                    Ok(4)
                })
                .await
            })
        };

        started_rx.await.unwrap();
        assert_eq!(cell.status(), SyncStatus::Syncing);
        release_tx.send(()).unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 4);
        assert_eq!(cell.status(), SyncStatus::Synced);
    }
}
