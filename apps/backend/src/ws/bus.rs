//! Cross-process broadcast medium.
//!
//! A bus only moves opaque payloads between server instances; envelope
//! encoding and loop suppression live in the broker.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::{broadcast, Mutex};
use tokio::time::sleep;
use tracing::warn;

use crate::error::AppError;
use crate::errors::ErrorCode;

// Publisher retry configuration (command path)
const PUBLISHER_MAX_ATTEMPTS: u32 = 3;
const PUBLISHER_INITIAL_RETRY_DELAY_MS: u64 = 50;
const PUBLISHER_MAX_RETRY_DELAY_MS: u64 = 200;

const IN_MEMORY_CAPACITY: usize = 1024;

#[async_trait]
pub trait SharedBus: Send + Sync {
    async fn publish(&self, payload: String) -> Result<(), AppError>;
}

pub(crate) fn is_transient_redis_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
}

pub(crate) fn bus_error(detail: impl Into<String>, err: RedisError) -> AppError {
    AppError::internal(ErrorCode::BusUnavailable, detail, err)
}

/// Redis PUBLISH on a single fixed channel.
pub struct RedisBus {
    channel: String,
    publisher: Mutex<ConnectionManager>,
}

impl RedisBus {
    pub async fn connect(client: Client, channel: impl Into<String>) -> Result<Self, AppError> {
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| bus_error("Unable to initialize Redis connection manager", err))?;

        Ok(Self {
            channel: channel.into(),
            publisher: Mutex::new(manager),
        })
    }
}

#[async_trait]
impl SharedBus for RedisBus {
    async fn publish(&self, payload: String) -> Result<(), AppError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let publish_res = {
                let mut publisher = self.publisher.lock().await;
                publisher
                    .publish::<_, _, ()>(self.channel.as_str(), payload.as_str())
                    .await
            };

            match publish_res {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if attempt >= PUBLISHER_MAX_ATTEMPTS || !is_transient_redis_error(&err) {
                        return Err(bus_error("Failed to publish event to Redis", err));
                    }

                    let delay_ms = PUBLISHER_INITIAL_RETRY_DELAY_MS
                        .saturating_mul(2_u64.pow(attempt - 1))
                        .min(PUBLISHER_MAX_RETRY_DELAY_MS);
                    warn!(
                        error = %err,
                        attempt,
                        retry_delay_ms = delay_ms,
                        "Redis publish failed, retrying"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

/// Bus shared by several brokers inside one process. Each attached broker
/// plays the part of a separate server instance.
pub struct InMemoryBus {
    sender: broadcast::Sender<String>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(IN_MEMORY_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedBus for InMemoryBus {
    async fn publish(&self, payload: String) -> Result<(), AppError> {
        // No subscribers just means no other instance is listening.
        let _ = self.sender.send(payload);
        Ok(())
    }
}
