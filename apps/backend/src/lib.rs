#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod config;
pub mod domain;
pub mod error;
pub mod errors;
pub mod infra;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod ws;

// Re-exports for public API
pub use config::ServerConfig;
pub use domain::{Card, CardCatalog, GameRoom, Player};
pub use error::AppError;
pub use errors::{DomainError, ErrorCode};
pub use services::{DispatcherConfig, SessionDispatcher, WriteMode};
pub use state::app_state::AppState;
pub use store::{InMemoryRoomStore, RedisRoomStore, RoomStore};
pub use ws::broker::RealtimeBroker;
pub use ws::protocol::{ClientMsg, ServerMsg};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    backend_test_support::logging::init();
}
