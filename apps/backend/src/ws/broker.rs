use std::sync::Arc;
use std::time::Duration;

use rand::random;
use redis::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::ws::bus::{bus_error, is_transient_redis_error, InMemoryBus, RedisBus, SharedBus};
use crate::ws::hub::WsRegistry;
use crate::ws::protocol::ServerMsg;

/// What travels over the shared bus: the event plus the instance that
/// published it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub origin: Uuid,
    pub event: ServerMsg,
}

// Subscriber retry configuration (background task)
const INITIAL_RETRY_DELAY_SECS: u64 = 1;
const MAX_RETRY_DELAY_SECS: u64 = 60;
const RETRY_DELAY_MULTIPLIER: f64 = 2.0;
const JITTER_PERCENT: f64 = 0.2;

/// Receiving side of the fan-out: decodes bus payloads and hands foreign
/// events to local connections. Has no way to publish.
#[derive(Clone)]
struct Inbound {
    instance_id: Uuid,
    registry: Arc<WsRegistry>,
}

impl Inbound {
    fn handle_payload(&self, payload: &str) {
        match serde_json::from_str::<EventEnvelope>(payload) {
            Ok(envelope) if envelope.origin == self.instance_id => {
                // Already delivered locally at publish time.
            }
            Ok(envelope) => {
                if envelope.event.is_private() {
                    warn!(origin = %envelope.origin, "[WS BROKER] dropping private event from bus");
                    return;
                }
                self.registry.broadcast(&envelope.event);
            }
            Err(err) => {
                error!(error = %err, "Failed to decode realtime payload");
            }
        }
    }
}

/// Event fan-out for this process.
///
/// `publish` delivers to local connections and forwards to the shared bus.
/// Events arriving from the bus only ever take the local path.
pub struct RealtimeBroker {
    inbound: Inbound,
    bus: Option<Arc<dyn SharedBus>>,
}

impl RealtimeBroker {
    /// Broker without a shared bus: single-instance deployments and tests.
    pub fn local_only() -> Arc<Self> {
        Arc::new(Self {
            inbound: Inbound {
                instance_id: Uuid::new_v4(),
                registry: Arc::new(WsRegistry::new()),
            },
            bus: None,
        })
    }

    /// Broker publishing and subscribing on a Redis channel.
    pub async fn connect(redis_url: &str, channel: &str) -> Result<Arc<Self>, AppError> {
        let client = Client::open(redis_url)
            .map_err(|err| AppError::config(format!("Invalid REDIS_URL: {err}")))?;

        let bus = RedisBus::connect(client.clone(), channel).await?;
        let inbound = Inbound {
            instance_id: Uuid::new_v4(),
            registry: Arc::new(WsRegistry::new()),
        };

        spawn_redis_subscriber(client, channel.to_string(), inbound.clone());

        info!(instance_id = %inbound.instance_id, channel, "Realtime broker connected");
        Ok(Arc::new(Self {
            inbound,
            bus: Some(Arc::new(bus)),
        }))
    }

    /// Broker attached to an in-process bus. Must be called inside a Tokio runtime.
    pub fn attach_in_memory(bus: Arc<InMemoryBus>) -> Arc<Self> {
        let inbound = Inbound {
            instance_id: Uuid::new_v4(),
            registry: Arc::new(WsRegistry::new()),
        };
        spawn_in_memory_subscriber(bus.subscribe(), inbound.clone());

        let shared: Arc<dyn SharedBus> = bus;
        Arc::new(Self {
            inbound,
            bus: Some(shared),
        })
    }

    pub fn instance_id(&self) -> Uuid {
        self.inbound.instance_id
    }

    pub fn registry(&self) -> Arc<WsRegistry> {
        self.inbound.registry.clone()
    }

    /// Deliver to this process's connections only.
    pub fn deliver_local(&self, event: &ServerMsg) {
        self.inbound.registry.broadcast(event);
    }

    /// Deliver locally, then forward to every other instance.
    ///
    /// Local delivery happens even when the bus is down; the returned error
    /// only reports that remote instances missed the event.
    pub async fn publish(&self, event: ServerMsg) -> Result<(), AppError> {
        if event.is_private() {
            warn!(?event, "[WS BROKER] refusing to publish private event");
            return Ok(());
        }

        self.deliver_local(&event);

        let Some(bus) = &self.bus else {
            return Ok(());
        };
        let envelope = EventEnvelope {
            origin: self.inbound.instance_id,
            event,
        };
        let encoded = serde_json::to_string(&envelope)?;
        bus.publish(encoded).await
    }
}

fn spawn_in_memory_subscriber(
    mut receiver: tokio::sync::broadcast::Receiver<String>,
    inbound: Inbound,
) {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(payload) => inbound.handle_payload(&payload),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "In-memory bus subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("In-memory bus closed");
                    break;
                }
            }
        }
    });
}

fn spawn_redis_subscriber(client: Client, channel: String, inbound: Inbound) {
    tokio::spawn(async move {
        run_subscription_loop_with_retry(&client, &channel, inbound).await;
    });
}

fn calculate_retry_delay(attempt: u32) -> Duration {
    let base_delay =
        INITIAL_RETRY_DELAY_SECS as f64 * RETRY_DELAY_MULTIPLIER.powi(attempt as i32 - 1);
    let capped_delay = base_delay.min(MAX_RETRY_DELAY_SECS as f64);

    let jitter_range = capped_delay * JITTER_PERCENT;
    let jitter = (random::<f64>() * 2.0 - 1.0) * jitter_range;
    let final_delay = (capped_delay + jitter).max(0.1);

    Duration::from_secs_f64(final_delay)
}

async fn run_subscription_loop_with_retry(client: &Client, channel: &str, inbound: Inbound) {
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match run_subscription_loop(client, channel, &inbound).await {
            Ok(()) => {
                info!("Redis subscription loop completed normally");
                break;
            }
            Err(err) => {
                let delay = calculate_retry_delay(attempt);
                warn!(
                    error = %err,
                    attempt,
                    retry_delay_secs = delay.as_secs_f64(),
                    "Redis subscription failed, retrying"
                );
                sleep(delay).await;

                if attempt >= 20 {
                    attempt = 10;
                }
            }
        }
    }
}

async fn run_subscription_loop(
    client: &Client,
    channel: &str,
    inbound: &Inbound,
) -> Result<(), AppError> {
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .map_err(|err| subscribe_error("Failed to open Redis pubsub connection", err))?;

    pubsub
        .subscribe(channel)
        .await
        .map_err(|err| subscribe_error("Failed to subscribe to Redis channel", err))?;

    info!(channel, "Redis subscription established, processing messages");

    let mut stream = pubsub.into_on_message();
    while let Some(msg) = stream.next().await {
        match msg.get_payload::<String>() {
            Ok(payload) => inbound.handle_payload(&payload),
            Err(err) => warn!(error = %err, "Skipping non-text Redis payload"),
        }
    }

    warn!("Redis subscription stream ended, connection lost");
    Err(AppError::internal(
        crate::errors::ErrorCode::BusUnavailable,
        "Redis subscription stream ended unexpectedly",
        std::io::Error::new(std::io::ErrorKind::ConnectionAborted, "Stream ended"),
    ))
}

fn subscribe_error(detail: &str, err: redis::RedisError) -> AppError {
    if !is_transient_redis_error(&err) {
        error!(error = %err, "Redis subscription hit a non-transient error");
    }
    bus_error(detail.to_string(), err)
}
