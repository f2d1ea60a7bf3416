use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{decode, encode, room_key, RoomStore};
use crate::domain::GameRoom;
use crate::error::AppError;

/// Process-local store with the same encoding as the Redis store.
///
/// Used for single-instance runs and tests. Several dispatchers sharing one
/// `Arc<InMemoryRoomStore>` behave like several server instances sharing Redis.
#[derive(Default)]
pub struct InMemoryRoomStore {
    records: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the backing store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Raw JSON record for a room, exactly as persisted.
    pub fn raw(&self, room_id: &str) -> Option<String> {
        self.records.lock().get(&room_key(room_id)).cloned()
    }

    pub fn put_raw(&self, room_id: &str, raw: impl Into<String>) {
        self.records.lock().insert(room_key(room_id), raw.into());
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable(
                "in-memory store marked unavailable",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "store down"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn load(&self, room_id: &str) -> Result<Option<GameRoom>, AppError> {
        self.check_available()?;
        let raw = self.raw(room_id);
        raw.as_deref().map(decode).transpose()
    }

    async fn save(&self, room: &GameRoom) -> Result<(), AppError> {
        self.check_available()?;
        let payload = encode(room)?;
        self.records.lock().insert(room_key(room.id()), payload);
        Ok(())
    }

    async fn compare_and_save(
        &self,
        room: &GameRoom,
        expected_version: u64,
    ) -> Result<bool, AppError> {
        self.check_available()?;
        let payload = encode(room)?;
        let key = room_key(room.id());

        let mut records = self.records.lock();
        let stored_version = match records.get(&key) {
            Some(raw) => decode(raw)?.version(),
            None => 0,
        };
        if stored_version != expected_version {
            return Ok(false);
        }
        records.insert(key, payload);
        Ok(true)
    }

    async fn delete(&self, room_id: &str) -> Result<(), AppError> {
        self.check_available()?;
        self.records.lock().remove(&room_key(room_id));
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}
