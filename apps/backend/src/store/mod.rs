//! Shared snapshot store for the room.
//!
//! Every server instance reads and writes the same record; the in-process
//! `GameRoom` is only a per-command cache of it.

use async_trait::async_trait;

use crate::domain::GameRoom;
use crate::error::AppError;

pub mod memory;
pub mod redis_store;

pub use self::memory::InMemoryRoomStore;
pub use self::redis_store::RedisRoomStore;

/// Record key for a room snapshot.
pub fn room_key(room_id: &str) -> String {
    format!("game:{room_id}")
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Latest snapshot, or `None` when no record exists.
    async fn load(&self, room_id: &str) -> Result<Option<GameRoom>, AppError>;

    /// Overwrite the record unconditionally (last write wins).
    async fn save(&self, room: &GameRoom) -> Result<(), AppError>;

    /// Write only if the stored version still equals `expected_version`.
    ///
    /// An absent record counts as version 0. Returns `false` when another
    /// writer got there first; the record is left untouched in that case.
    async fn compare_and_save(
        &self,
        room: &GameRoom,
        expected_version: u64,
    ) -> Result<bool, AppError>;

    async fn delete(&self, room_id: &str) -> Result<(), AppError>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> Result<(), AppError>;
}

pub(crate) fn encode(room: &GameRoom) -> Result<String, AppError> {
    Ok(serde_json::to_string(room)?)
}

pub(crate) fn decode(raw: &str) -> Result<GameRoom, AppError> {
    let room: GameRoom = serde_json::from_str(raw)?;
    room.check_invariants().map_err(|detail| AppError::DataCorruption {
        detail: format!("room {} snapshot is inconsistent: {detail}", room.id()),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            detail.clone(),
        )),
    })?;
    Ok(room)
}
