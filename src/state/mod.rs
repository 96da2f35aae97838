mod clock;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::pool_store::PoolStore,
    engine::code::{CodeSource, RandomCodes},
    error::ServiceError,
};

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

const PUBLIC_SSE_CAPACITY: usize = 64;

/// Central application state storing the storage handle and shared services.
pub struct AppState {
    pool_store: RwLock<Option<Arc<dyn PoolStore>>>,
    public_sse: SseHub,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeSource>,
    result_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct the production state: wall clock in the configured offset and random pool codes.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let clock = Arc::new(SystemClock::new(config.utc_offset()));
        Self::with_parts(config, clock, Arc::new(RandomCodes))
    }

    /// Construct a state with explicit time and code sources.
    pub fn with_parts(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeSource>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            pool_store: RwLock::new(None),
            public_sse: SseHub::new(PUBLIC_SSE_CAPACITY),
            degraded: degraded_tx,
            config,
            clock,
            codes,
            result_locks: DashMap::new(),
        })
    }

    /// Obtain a handle to the current pool store, if one is installed.
    pub async fn pool_store(&self) -> Option<Arc<dyn PoolStore>> {
        let guard = self.pool_store.read().await;
        guard.as_ref().cloned()
    }

    /// Return the installed store, or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_pool_store(&self) -> Result<Arc<dyn PoolStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.pool_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new pool store implementation and leave degraded mode.
    pub async fn install_pool_store(&self, store: Arc<dyn PoolStore>) {
        {
            let mut guard = self.pool_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current pool store and enter degraded mode.
    pub async fn clear_pool_store(&self) {
        {
            let mut guard = self.pool_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn codes(&self) -> &dyn CodeSource {
        self.codes.as_ref()
    }

    /// Wait for exclusive right to update the result of `game_id`.
    pub async fn lock_game_result(&self, game_id: Uuid) -> ResultGuard<'_> {
        let lock = self.result_locks.entry(game_id).or_default().clone();
        let guard = lock.lock_owned().await;
        ResultGuard {
            locks: &self.result_locks,
            game_id,
            guard: Some(guard),
        }
    }
}

/// Held while a game result is applied. The lock slot is freed once nobody waits on it.
pub struct ResultGuard<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    game_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ResultGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.remove_if(&self.game_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::pool_store::memory::MemoryPoolStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_pool_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_pool_store(Arc::new(MemoryPoolStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(state.require_pool_store().await.is_ok());
    }

    #[tokio::test]
    async fn watchers_only_see_changes() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();

        state.update_degraded(true);
        assert!(!watcher.has_changed().unwrap());

        state.update_degraded(false);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
    }

    #[tokio::test]
    async fn result_lock_excludes_and_frees_its_slot() {
        let state = AppState::new(AppConfig::default());
        let game = Uuid::new_v4();

        let held = state.lock_game_result(game).await;
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move {
                let _guard = state.lock_game_result(game).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        assert_eq!(state.result_locks.len(), 1);

        drop(held);
        waiter.await.unwrap();
        assert!(state.result_locks.is_empty());

        let other = state.lock_game_result(Uuid::new_v4()).await;
        let _same_game = state.lock_game_result(game).await;
        assert_eq!(state.result_locks.len(), 2);
        drop(other);
        assert_eq!(state.result_locks.len(), 1);
    }
}
