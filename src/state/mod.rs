pub mod board;
pub mod buzzer;
pub mod feed;
pub mod scoring;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig, dao::game_store::GameStore, dao::models::TeamTag, error::ServiceError,
};

use self::feed::ChangeFeed;

pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected buzzer device.
pub struct BuzzerConnection {
    pub team: TeamTag,
    pub tx: mpsc::UnboundedSender<Message>,
}

/// State-access handle injected into every route and service.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    feed: ChangeFeed,
    buzzers: DashMap<Uuid, BuzzerConnection>,
    degraded: watch::Sender<bool>,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            feed: ChangeFeed::new(config.feed_capacity),
            buzzers: DashMap::new(),
            degraded: degraded_tx,
            config: Arc::new(config),
        })
    }

    /// Build a state with `store` already installed.
    pub async fn with_store(config: AppConfig, store: Arc<dyn GameStore>) -> SharedState {
        let state = Self::new(config);
        state.set_game_store(store).await;
        state
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.feed.restart_state_order();
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
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

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Change feed carrying row images and content notifications.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Registry of active buzzer sockets keyed by connection id.
    pub fn buzzers(&self) -> &DashMap<Uuid, BuzzerConnection> {
        &self.buzzers
    }

    /// Number of live buzzer sockets identified as `team`.
    pub fn connected_buzzers(&self, team: TeamTag) -> usize {
        self.buzzers
            .iter()
            .filter(|entry| entry.value().team == team)
            .count()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::game_store::memory::MemoryGameStore;

    #[tokio::test]
    async fn store_lifecycle_drives_the_degraded_flag() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_game_store(Arc::new(MemoryGameStore::default()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow());
        assert!(state.require_game_store().await.is_ok());

        state.clear_game_store().await;
        assert!(state.is_degraded());
        assert!(state.game_store().await.is_none());
    }
}
