use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::domain::CardCatalog;
use crate::error::AppError;
use crate::services::SessionDispatcher;
use crate::state::app_state::AppState;
use crate::store::{InMemoryRoomStore, RedisRoomStore, RoomStore};
use crate::ws::broker::RealtimeBroker;

/// Builder for creating AppState instances (used in both tests and main)
///
/// Anything not supplied explicitly falls back to the in-process
/// implementation, unless `with_redis` was called.
pub struct StateBuilder {
    config: ServerConfig,
    catalog: CardCatalog,
    store: Option<Arc<dyn RoomStore>>,
    broker: Option<Arc<RealtimeBroker>>,
    use_redis: bool,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            catalog: CardCatalog::standard(),
            store: None,
            broker: None,
            use_redis: false,
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: CardCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn RoomStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_broker(mut self, broker: Arc<RealtimeBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Connect the store and the bus to `config.redis_url`.
    pub fn with_redis(mut self) -> Self {
        self.use_redis = true;
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let store: Arc<dyn RoomStore> = match self.store {
            Some(store) => store,
            None if self.use_redis => {
                Arc::new(RedisRoomStore::connect(&self.config.redis_url).await?)
            }
            None => Arc::new(InMemoryRoomStore::new()),
        };

        let broker = match self.broker {
            Some(broker) => broker,
            None if self.use_redis => {
                RealtimeBroker::connect(&self.config.redis_url, &self.config.events_channel)
                    .await?
            }
            None => RealtimeBroker::local_only(),
        };

        info!(
            room_id = %self.config.room_id,
            instance_id = %broker.instance_id(),
            write_mode = ?self.config.write_mode,
            "Application state built"
        );

        let dispatcher = SessionDispatcher::new(
            self.config.dispatcher_config(),
            self.catalog,
            store,
            broker,
        );
        Ok(AppState::new(dispatcher))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}
